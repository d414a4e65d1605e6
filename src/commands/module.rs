use anyhow::{Result, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::module::{self, import_egg, list_modules};
use crate::runtime::Runtime;

use crate::config::Config;
use super::follow_operation;

/// Import one or more module archives, one after another.
#[tracing::instrument(skip(config))]
pub async fn install<R: Runtime + 'static>(config: &Config<R>, archives: &[PathBuf]) -> Result<()> {
    let roots = config.module_roots();
    let mut failed = Vec::new();

    for archive in archives {
        if !config.runtime.exists(archive) {
            println!("Error: {} not found", archive.display());
            failed.push(archive.display().to_string());
            continue;
        }
        let label = archive_label(archive);
        debug!("Importing {:?} with roots {:?}", archive, roots);
        let handle = module::spawn_install(config.runtime.clone(), roots.clone(), archive.clone());
        let outcome = follow_operation(&label, handle).await;
        if !outcome.is_success() {
            failed.push(label);
        }
    }

    if !failed.is_empty() {
        bail!("Failed to import: {}", failed.join(", "));
    }
    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn uninstall<R: Runtime + 'static>(config: &Config<R>, name: &str, yes: bool) -> Result<()> {
    let roots = config.module_roots();
    let metadata_dir = roots.module_metadata_dir(name);
    if !config.runtime.exists(&metadata_dir) {
        println!("Module {} is not installed; removing leftovers if any.", name);
    }

    if !yes {
        println!("Uninstall module {}", name);
        println!("  metadata: {}", metadata_dir.display());
        if !config.runtime.confirm("Proceed with uninstall?")? {
            println!("Uninstall cancelled.");
            return Ok(());
        }
    }

    let handle = module::spawn_uninstall(config.runtime.clone(), roots, name.to_string());
    let outcome = follow_operation(name, handle).await;
    if !outcome.is_success() {
        bail!("{}", outcome.message());
    }
    Ok(())
}

pub fn list<R: Runtime>(config: &Config<R>) -> Result<()> {
    let roots = config.module_roots();
    let modules = list_modules(config.runtime.as_ref(), &roots.metadata_root)?;
    if modules.is_empty() {
        println!("No modules imported.");
        return Ok(());
    }
    for name in modules {
        println!("{}", name);
    }
    Ok(())
}

#[tracing::instrument(skip(config))]
pub fn import<R: Runtime>(config: &Config<R>, egg: &Path) -> Result<()> {
    let roots = config.module_roots();
    let imported = import_egg(
        config.runtime.as_ref(),
        egg,
        &roots.library_root,
        &config.site_packages(),
    )?;
    println!("Imported {}", imported.egg.display());
    println!("Registered {}", imported.pth.display());
    Ok(())
}

fn archive_label(archive: &Path) -> String {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}
