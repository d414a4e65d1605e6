//! `files.txt` and `top_level.txt` handling.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

pub const MANIFEST_FILE: &str = "files.txt";
pub const TOP_LEVEL_FILE: &str = "top_level.txt";

/// Write one absolute path per line, newline-terminated.
pub fn write_manifest<R: Runtime + ?Sized>(
    runtime: &R,
    metadata_dir: &Path,
    paths: &[PathBuf],
) -> Result<PathBuf> {
    let manifest = metadata_dir.join(MANIFEST_FILE);
    let mut content = String::new();
    for path in paths {
        content.push_str(&path.to_string_lossy());
        content.push('\n');
    }
    runtime
        .write(&manifest, content.as_bytes())
        .with_context(|| format!("Failed to write manifest {:?}", manifest))?;
    debug!("Wrote {} entries to {:?}", paths.len(), manifest);
    Ok(manifest)
}

pub fn read_manifest<R: Runtime + ?Sized>(runtime: &R, metadata_dir: &Path) -> Result<Vec<PathBuf>> {
    let manifest = metadata_dir.join(MANIFEST_FILE);
    let content = runtime
        .read_to_string(&manifest)
        .with_context(|| format!("Failed to read manifest {:?}", manifest))?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// First line of `top_level.txt`, or an empty string when it cannot be read.
pub fn read_top_level<R: Runtime + ?Sized>(runtime: &R, metadata_dir: &Path) -> String {
    read_first_line(runtime, &metadata_dir.join(TOP_LEVEL_FILE))
}

pub fn read_first_line<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> String {
    match runtime.read_to_string(path) {
        Ok(content) => content.lines().next().unwrap_or("").trim().to_string(),
        Err(e) => {
            debug!("Could not read {:?}: {}", path, e);
            String::new()
        }
    }
}
