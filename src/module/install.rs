use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveEntry, NATIVE_LIBRARY_SUFFIX, PackageArchive};
use crate::cleanup::CleanupContext;
use crate::runtime::{Runtime, make_directories};
use crate::task::{Outcome, Progress, ProgressSink};

use super::layout::{Destination, DestinationRoots, package_key};
use super::manifest::{read_first_line, write_manifest};

/// setuptools writes this into generated loader stubs for native extensions.
pub const BOOTSTRAP_MARKER: &str = "__bootstrap__";

const DIR_MODE: u32 = 0o755;
const NATIVE_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// What a successful module install produced.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub package_key: String,
    pub metadata_dir: PathBuf,
    pub manifest: PathBuf,
    pub has_native_library: bool,
    /// Code files written, in archive order. Matches `files.txt` exactly.
    pub installed: Vec<PathBuf>,
    /// Bootstrap stubs written and then removed.
    pub stubs_removed: Vec<PathBuf>,
}

/// Installs module archives into a [`DestinationRoots`] set.
pub struct ModuleInstaller<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    roots: &'a DestinationRoots,
}

impl<'a, R: Runtime + ?Sized> ModuleInstaller<'a, R> {
    pub fn new(runtime: &'a R, roots: &'a DestinationRoots) -> Self {
        Self { runtime, roots }
    }

    /// Install `archive_path`, reporting progress to `sink`. Errors end up in
    /// the returned [`Outcome`]; nothing written by a failed install survives.
    #[tracing::instrument(skip(self, sink))]
    pub fn install(&self, archive_path: &Path, sink: &dyn ProgressSink) -> Outcome {
        let mut progress = Progress::new(sink);
        let result = self.try_install(archive_path, &mut progress);
        if let Err(e) = &result {
            warn!("Install of {:?} failed: {:#}", archive_path, e);
        }
        progress.finish(Outcome::from_result(result, |report| {
            format!(
                "Installed {} files from {}",
                report.installed.len(),
                archive_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )
        }))
    }

    pub fn try_install(&self, archive_path: &Path, progress: &mut Progress<'_>) -> Result<InstallReport> {
        let mut archive = PackageArchive::open(self.runtime, archive_path)?;
        let has_native_library = archive.has_native_library();
        let key = package_key(&archive);
        let entries = archive.entries()?;
        progress.start(entries.len())?;

        debug!(
            "Installing {} ({} entries, native: {}) into {:?}",
            key,
            entries.len(),
            has_native_library,
            self.roots.code_root(has_native_library)
        );

        let mut written = CleanupContext::new();
        let result = self.extract_entries(
            &mut archive,
            &entries,
            has_native_library,
            &key,
            progress,
            &mut written,
        );

        match result {
            Ok(report) => {
                info!(
                    "Installed {} files for {} (manifest {:?})",
                    report.installed.len(),
                    key,
                    report.manifest
                );
                Ok(report)
            }
            Err(e) => {
                debug!("Rolling back partial install of {}", key);
                written.cleanup(self.runtime);
                Err(e)
            }
        }
    }

    fn extract_entries(
        &self,
        archive: &mut PackageArchive,
        entries: &[ArchiveEntry],
        has_native_library: bool,
        key: &str,
        progress: &mut Progress<'_>,
        written: &mut CleanupContext,
    ) -> Result<InstallReport> {
        let mut installed = Vec::new();
        let mut stubs_removed = Vec::new();

        for (position, entry) in entries.iter().enumerate() {
            progress.advance_to(position + 1);
            if entry.is_dir {
                continue;
            }

            let destination = match self.roots.route(&entry.name, has_native_library, key) {
                Some(destination) => destination,
                None => {
                    warn!("Skipping entry with invalid path: {}", entry.name);
                    continue;
                }
            };
            let path = destination.path().to_path_buf();

            if let Some(parent) = path.parent() {
                for dir in make_directories(self.runtime, parent, DIR_MODE)? {
                    written.add(dir);
                }
            }

            // files from earlier installs (shared namespace packages) are not ours to roll back
            if !self.runtime.exists(&path) {
                written.add(path.clone());
            }
            {
                let mut output = self
                    .runtime
                    .create_file(&path)
                    .with_context(|| format!("Failed to create {:?}", path))?;
                archive.copy_entry(entry.index, &mut output)?;
                output
                    .flush()
                    .with_context(|| format!("Failed to write {:?}", path))?;
            }

            if entry.name.ends_with(".py")
                && read_first_line(self.runtime, &path).contains(BOOTSTRAP_MARKER)
            {
                debug!("Dropping generated bootstrap stub {:?}", path);
                self.runtime.remove_file(&path)?;
                written.remove(&path);
                stubs_removed.push(path);
                continue;
            }

            if let Some(modified) = entry.modified
                && let Err(e) = self.runtime.set_modified(&path, modified)
            {
                debug!("Failed to set modification time on {:?}: {}", path, e);
            }
            let mode = if entry.name.ends_with(NATIVE_LIBRARY_SUFFIX) {
                NATIVE_MODE
            } else {
                FILE_MODE
            };
            if let Err(e) = self.runtime.set_permissions(&path, mode) {
                debug!("Failed to set permissions on {:?}: {}", path, e);
            }

            if let Destination::Code(_) = destination
                && !installed.contains(&path)
            {
                installed.push(path);
            }
        }

        let metadata_dir = self.roots.metadata_dir(key);
        for dir in make_directories(self.runtime, &metadata_dir, DIR_MODE)? {
            written.add(dir);
        }
        let manifest = write_manifest(self.runtime, &metadata_dir, &installed)?;

        Ok(InstallReport {
            package_key: key.to_string(),
            metadata_dir,
            manifest,
            has_native_library,
            installed,
            stubs_removed,
        })
    }
}
