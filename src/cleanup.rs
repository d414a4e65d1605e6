use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::runtime::Runtime;

/// Tracks paths that must be removed if an operation does not finish:
/// files written by a module install that later fails, or temporary
/// downloads interrupted by Ctrl-C.
#[derive(Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to be cleaned up on failure or interruption
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Remove a path from cleanup list (e.g., when operation succeeds)
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove all registered paths from disk, newest first.
    pub fn cleanup<R: Runtime + ?Sized>(&self, runtime: &R) {
        for path in self.paths.iter().rev() {
            debug!("Cleaning up: {:?}", path);
            if runtime.is_dir(path) {
                let _ = runtime.remove_dir_all(path);
            } else if runtime.exists(path) {
                let _ = runtime.remove_file(path);
            }
        }
    }
}

/// Type alias for shared cleanup context
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

/// Create a new shared cleanup context
pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// Lock a shared context, recovering the data if a previous holder panicked.
pub fn lock(ctx: &SharedCleanupContext) -> MutexGuard<'_, CleanupContext> {
    ctx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cleanup_context_add_remove() {
        let mut ctx = CleanupContext::new();
        let path = PathBuf::from("/tmp/test");

        ctx.add(path.clone());
        assert_eq!(ctx.paths.len(), 1);

        ctx.remove(&path);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_cleanup_removes_files_and_dirs() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        fs::write(&file_path, "test").unwrap();
        let sub_dir = dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();
        fs::write(sub_dir.join("file.txt"), "test").unwrap();

        let mut ctx = CleanupContext::new();
        ctx.add(file_path.clone());
        ctx.add(sub_dir.clone());
        ctx.add(dir.path().join("never-created"));

        ctx.cleanup(&RealRuntime);
        assert!(!file_path.exists());
        assert!(!sub_dir.exists());
    }

    #[test]
    fn test_shared_lock_survives_poison() {
        let ctx = new_shared();
        let clone = Arc::clone(&ctx);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        lock(&ctx).add(PathBuf::from("/tmp/after-poison"));
        assert_eq!(lock(&ctx).paths.len(), 1);
    }
}
