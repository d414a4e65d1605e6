use crate::cleanup::{self, SharedCleanupContext};
use crate::runtime::{Runtime, make_directories};
use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::Path;

use super::{ArchiveExtractor, PackageArchive};

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Extractor for .zip interpreter distributions. Entries land under
/// `extract_to` with their archive paths unchanged.
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<usize> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let mut archive = PackageArchive::open(runtime, archive_path)?;
        if archive.is_empty() {
            bail!("Archive appears to be empty.");
        }

        if !runtime.exists(extract_to) {
            make_directories(runtime, extract_to, DEFAULT_DIR_MODE)?;
            cleanup::lock(&cleanup_ctx).add(extract_to.to_path_buf());
        }

        let mut written = 0;
        for entry in archive.entries()? {
            let relative = match safe_relative_path(&entry.name) {
                Some(path) => path,
                None => {
                    debug!("Skipping entry with invalid path: {}", entry.name);
                    continue;
                }
            };
            let full_path = extract_to.join(&relative);

            if entry.is_dir {
                make_directories(runtime, &full_path, DEFAULT_DIR_MODE)?;
                continue;
            }

            if let Some(parent) = full_path.parent() {
                make_directories(runtime, parent, DEFAULT_DIR_MODE)?;
            }
            {
                let mut dest_file = runtime.create_file(&full_path)?;
                archive
                    .copy_entry(entry.index, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;
            }

            let mode = entry
                .unix_mode
                .map(|m| m & 0o7777)
                .filter(|m| *m != 0)
                .unwrap_or(DEFAULT_FILE_MODE);
            if let Err(e) = runtime.set_permissions(&full_path, mode) {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
            if let Some(modified) = entry.modified
                && let Err(e) = runtime.set_modified(&full_path, modified)
            {
                debug!("Failed to set modification time on {:?}: {}", full_path, e);
            }
            written += 1;
        }

        cleanup::lock(&cleanup_ctx).remove(extract_to);
        info!("Extracted {} files to {:?}.", written, extract_to);
        Ok(written)
    }
}

/// Reject absolute entry names and any `..` component.
pub(crate) fn safe_relative_path(name: &str) -> Option<std::path::PathBuf> {
    use std::path::Component;

    let path = Path::new(name);
    let mut out = std::path::PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
