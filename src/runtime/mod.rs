//! Runtime abstraction for system operations.
//!
//! Every file system touch made by the installers goes through [`Runtime`],
//! so the install and uninstall logic can be exercised against a mock.
//!
//! # Structure
//!
//! - `env` - Well-known directories
//! - `fs` - File system operations (read, write, directory, permissions, times)
//! - `user` - User interaction (confirmation prompts)

mod env;
mod fs;
mod user;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>>;

    /// Set file permissions (mode) on Unix systems. No-op on Windows.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    /// Set the last modification time of a file.
    fn set_modified(&self, path: &Path, time: SystemTime) -> Result<()>;

    // Directories
    fn data_dir(&self) -> Option<PathBuf>;

    // User interaction
    /// Prompt user for confirmation. Returns true if user confirms (y/yes), false otherwise.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.copy_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove_dir_all_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        self.open_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> Result<()> {
        self.set_modified_impl(path, time)
    }

    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir_impl()
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.confirm_impl(prompt)
    }
}

/// Create `dir` and any missing ancestors, applying `mode` to every directory
/// this call created. Directories that already existed keep their mode.
/// Returns the created directories, outermost first.
pub fn make_directories<R: Runtime + ?Sized>(
    runtime: &R,
    dir: &Path,
    mode: u32,
) -> Result<Vec<PathBuf>> {
    let mut missing = Vec::new();
    let mut cursor = Some(dir);
    while let Some(path) = cursor {
        if path.as_os_str().is_empty() || runtime.exists(path) {
            break;
        }
        missing.push(path.to_path_buf());
        cursor = path.parent();
    }
    if missing.is_empty() {
        return Ok(missing);
    }
    missing.reverse();

    runtime.create_dir_all(dir)?;
    for path in &missing {
        if let Err(e) = runtime.set_permissions(path, mode) {
            log::debug!("Failed to set permissions on {:?}: {}", path, e);
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_make_directories_only_chmods_created_dirs() {
        let mut runtime = MockRuntime::new();
        let existing = PathBuf::from("/data");
        let target = PathBuf::from("/data/lib/pkg");

        runtime
            .expect_exists()
            .returning(move |p| p == existing.as_path() || p == Path::new("/"));
        runtime
            .expect_create_dir_all()
            .with(eq(target.clone()))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_set_permissions()
            .with(eq(PathBuf::from("/data/lib")), eq(0o755))
            .times(1)
            .returning(|_, _| Ok(()));
        runtime
            .expect_set_permissions()
            .with(eq(target.clone()), eq(0o755))
            .times(1)
            .returning(|_, _| Ok(()));

        let created = make_directories(&runtime, &target, 0o755).unwrap();
        assert_eq!(created, vec![PathBuf::from("/data/lib"), target]);
    }

    #[test]
    fn test_make_directories_existing_is_noop() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);

        let created = make_directories(&runtime, Path::new("/data/lib"), 0o755).unwrap();
        assert!(created.is_empty());
    }
}
