use std::path::{Path, PathBuf};

use crate::archive::{METADATA_MARKER, PackageArchive};

/// Suffix of per-module metadata directories under the metadata root.
pub const PACKAGE_KEY_SUFFIX: &str = ".egg";

/// The three places a module archive can write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationRoots {
    /// Receives the whole payload when the archive ships a native library.
    pub library_root: PathBuf,
    /// Receives the whole payload of pure-Python archives.
    pub interpreter_root: PathBuf,
    /// Parent of every module's metadata directory.
    pub metadata_root: PathBuf,
}

/// Where a single archive entry ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Payload file; recorded in the install manifest.
    Code(PathBuf),
    /// Installer bookkeeping under the module's metadata directory.
    Metadata(PathBuf),
}

impl Destination {
    pub fn path(&self) -> &Path {
        match self {
            Destination::Code(p) | Destination::Metadata(p) => p,
        }
    }
}

impl DestinationRoots {
    pub fn new(
        library_root: impl Into<PathBuf>,
        interpreter_root: impl Into<PathBuf>,
        metadata_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            library_root: library_root.into(),
            interpreter_root: interpreter_root.into(),
            metadata_root: metadata_root.into(),
        }
    }

    /// Root for every non-metadata entry of an archive.
    pub fn code_root(&self, has_native_library: bool) -> &Path {
        if has_native_library {
            &self.library_root
        } else {
            &self.interpreter_root
        }
    }

    /// `<metadata_root>/<package_key>`
    pub fn metadata_dir(&self, package_key: &str) -> PathBuf {
        self.metadata_root.join(package_key)
    }

    /// Metadata directory of an installed module, by module name.
    pub fn module_metadata_dir(&self, module: &str) -> PathBuf {
        self.metadata_dir(&module_key(module))
    }

    /// Map an archive entry to its destination. Returns `None` for names that
    /// would escape their root.
    pub fn route(
        &self,
        entry_name: &str,
        has_native_library: bool,
        package_key: &str,
    ) -> Option<Destination> {
        let segments: Vec<&str> = entry_name.split('/').collect();
        if segments
            .iter()
            .any(|s| *s == ".." || (s.is_empty() && entry_name.starts_with('/')))
        {
            return None;
        }

        if let Some(marker) = segments.iter().position(|s| *s == METADATA_MARKER) {
            let remainder: PathBuf = segments[marker + 1..]
                .iter()
                .filter(|s| !s.is_empty())
                .collect();
            if remainder.as_os_str().is_empty() {
                return None;
            }
            return Some(Destination::Metadata(
                self.metadata_dir(package_key).join(remainder),
            ));
        }

        let relative: PathBuf = segments.iter().filter(|s| !s.is_empty()).collect();
        if relative.as_os_str().is_empty() {
            return None;
        }
        Some(Destination::Code(
            self.code_root(has_native_library).join(relative),
        ))
    }
}

/// Metadata directory name for an archive: its file stem plus `.egg`.
pub fn package_key(archive: &PackageArchive) -> String {
    package_key_for_path(archive.path())
}

pub fn package_key_for_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    module_key(&stem)
}

fn module_key(module: &str) -> String {
    if module.ends_with(PACKAGE_KEY_SUFFIX) {
        module.to_string()
    } else {
        format!("{}{}", module, PACKAGE_KEY_SUFFIX)
    }
}
