use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::cleanup::CleanupContext;
use crate::runtime::{Runtime, make_directories};

/// Eggs are shared between every app on the device's storage.
const SHARED_MODE: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EggImport {
    pub egg: PathBuf,
    pub pth: PathBuf,
}

/// Copy `egg_path` into `library_root` and register it on `sys.path` with a
/// `<egg-name>.pth` file in `site_packages`.
#[tracing::instrument(skip(runtime))]
pub fn import_egg<R: Runtime + ?Sized>(
    runtime: &R,
    egg_path: &Path,
    library_root: &Path,
    site_packages: &Path,
) -> Result<EggImport> {
    let Some(name) = egg_path.file_name() else {
        bail!("Not an egg file: {:?}", egg_path);
    };
    if !runtime.exists(egg_path) || runtime.is_dir(egg_path) {
        bail!("Egg file not found: {:?}", egg_path);
    }

    let mut created = CleanupContext::new();
    let result = copy_and_register(runtime, egg_path, name, library_root, site_packages, &mut created);
    if result.is_err() {
        debug!("Removing what the failed import of {:?} created", egg_path);
        created.cleanup(runtime);
    }
    let (egg, pth) = result?;

    info!("Imported {:?} (registered in {:?})", egg, pth);
    Ok(EggImport { egg, pth })
}

fn copy_and_register<R: Runtime + ?Sized>(
    runtime: &R,
    egg_path: &Path,
    name: &OsStr,
    library_root: &Path,
    site_packages: &Path,
    created: &mut CleanupContext,
) -> Result<(PathBuf, PathBuf)> {
    for dir in [library_root, site_packages] {
        for path in make_directories(runtime, dir, SHARED_MODE)? {
            created.add(path);
        }
    }

    let egg = library_root.join(name);
    if !runtime.exists(&egg) {
        created.add(egg.clone());
    }
    runtime
        .copy(egg_path, &egg)
        .with_context(|| format!("Failed to copy {:?} to {:?}", egg_path, egg))?;
    if let Err(e) = runtime.set_permissions(&egg, SHARED_MODE) {
        debug!("Failed to set permissions on {:?}: {}", egg, e);
    }

    let mut pth_name = name.to_os_string();
    pth_name.push(".pth");
    let pth = site_packages.join(pth_name);
    if !runtime.exists(&pth) {
        created.add(pth.clone());
    }
    runtime
        .write(&pth, egg.to_string_lossy().as_bytes())
        .with_context(|| format!("Failed to write {:?}", pth))?;
    if let Err(e) = runtime.set_permissions(&pth, SHARED_MODE) {
        debug!("Failed to set permissions on {:?}: {}", pth, e);
    }
    Ok((egg, pth))
}
