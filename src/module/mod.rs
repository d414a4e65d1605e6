//! Third-party module archives: install, uninstall, egg import and listing.

mod egg;
mod install;
mod layout;
mod manifest;
mod uninstall;

pub use egg::{EggImport, import_egg};
pub use install::{BOOTSTRAP_MARKER, InstallReport, ModuleInstaller};
pub use layout::{
    Destination, DestinationRoots, PACKAGE_KEY_SUFFIX, package_key, package_key_for_path,
};
pub use manifest::{
    MANIFEST_FILE, TOP_LEVEL_FILE, read_manifest, read_top_level, write_manifest,
};
pub use uninstall::uninstall;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::runtime::Runtime;
use crate::task::{self, OperationHandle};

/// Names of imported modules: every `*.egg` directory under `metadata_root`,
/// suffix stripped, sorted.
pub fn list_modules<R: Runtime + ?Sized>(runtime: &R, metadata_root: &Path) -> Result<Vec<String>> {
    if !runtime.exists(metadata_root) {
        return Ok(Vec::new());
    }
    let mut modules: Vec<String> = runtime
        .read_dir(metadata_root)?
        .into_iter()
        .filter(|path| runtime.is_dir(path))
        .filter_map(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(PACKAGE_KEY_SUFFIX))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .collect();
    modules.sort();
    Ok(modules)
}

/// Install `archive` on a blocking worker.
pub fn spawn_install<R: Runtime + 'static>(
    runtime: Arc<R>,
    roots: DestinationRoots,
    archive: PathBuf,
) -> OperationHandle {
    task::spawn(move |sink| ModuleInstaller::new(runtime.as_ref(), &roots).install(&archive, sink))
}

/// Uninstall `module` on a blocking worker.
pub fn spawn_uninstall<R: Runtime + 'static>(
    runtime: Arc<R>,
    roots: DestinationRoots,
    module: String,
) -> OperationHandle {
    task::spawn(move |sink| uninstall(runtime.as_ref(), &roots, &module, sink))
}
