//! ZIP archive access.
//!
//! [`PackageArchive`] gives entry-level access used by the module installer,
//! which routes every entry itself. [`ZipExtractor`] unpacks a whole archive
//! into one directory and is used for interpreter distributions.

mod zip;

use crate::cleanup::SharedCleanupContext;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use ::zip::ZipArchive;

pub use self::zip::ZipExtractor;

/// Entry names ending with this suffix are native shared objects.
pub const NATIVE_LIBRARY_SUFFIX: &str = ".so";

/// Path segment marking installer metadata inside a module archive.
pub const METADATA_MARKER: &str = "EGG-INFO";

/// Trait for whole-archive extractors
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract the archive into `extract_to`, returning the number of files written.
    /// Directories created along the way are registered with `cleanup_ctx`.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<usize>;
}

/// One entry of a package archive, in archive order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub name: String,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
    pub unix_mode: Option<u32>,
}

impl ArchiveEntry {
    pub fn is_native_library(&self) -> bool {
        self.name.ends_with(NATIVE_LIBRARY_SUFFIX)
    }

    pub fn is_metadata(&self) -> bool {
        self.name.split('/').any(|segment| segment == METADATA_MARKER)
    }
}

/// A module archive loaded into memory for random access.
pub struct PackageArchive {
    path: PathBuf,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl PackageArchive {
    #[tracing::instrument(skip(runtime))]
    pub fn open<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        let mut reader = runtime
            .open(path)
            .with_context(|| format!("Failed to open archive at {:?}", path))?;

        // zip needs Read + Seek; Runtime::open only gives Read
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", path))?;

        let archive = ZipArchive::new(Cursor::new(buffer))
            .with_context(|| format!("Failed to parse ZIP archive {:?}", path))?;

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// True when any entry is a native shared object. Decided once per archive.
    pub fn has_native_library(&self) -> bool {
        self.archive
            .file_names()
            .any(|name| name.ends_with(NATIVE_LIBRARY_SUFFIX))
    }

    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index(index)
                .with_context(|| format!("Failed to read ZIP entry {}", index))?;
            entries.push(ArchiveEntry {
                index,
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                modified: entry.last_modified().and_then(dos_to_system_time),
                unix_mode: entry.unix_mode(),
            });
        }
        Ok(entries)
    }

    /// Stream the bytes of entry `index` into `writer`.
    pub fn copy_entry(&mut self, index: usize, writer: &mut dyn Write) -> Result<u64> {
        let mut entry = self
            .archive
            .by_index(index)
            .with_context(|| format!("Failed to read ZIP entry {}", index))?;
        let name = entry.name().to_string();
        std::io::copy(&mut entry, writer).with_context(|| format!("Failed to extract {}", name))
    }
}

/// Convert a ZIP (MS-DOS) timestamp to a `SystemTime`, reading it as UTC.
pub fn dos_to_system_time(dt: ::zip::DateTime) -> Option<SystemTime> {
    let days = days_from_civil(dt.year() as i64, dt.month() as i64, dt.day() as i64);
    let secs = days * 86_400 + dt.hour() as i64 * 3_600 + dt.minute() as i64 * 60 + dt.second() as i64;
    u64::try_from(secs)
        .ok()
        .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
}

// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}


#[cfg(test)]
mod tests {
    use super::test_support::write_zip;
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    #[test]
    fn test_entries_in_archive_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mymodule.zip");
        write_zip(
            &path,
            &[
                ("mymodule/", ""),
                ("mymodule/__init__.py", "x = 1\n"),
                ("EGG-INFO/top_level.txt", "mymodule\n"),
            ],
        )?;

        let mut archive = PackageArchive::open(&RealRuntime, &path)?;
        let entries = archive.entries()?;
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["mymodule/", "mymodule/__init__.py", "EGG-INFO/top_level.txt"]
        );
        assert!(entries[0].is_dir);
        assert!(!entries[1].is_dir);
        assert!(entries[2].is_metadata());
        assert!(!entries[1].is_metadata());
        assert!(!archive.has_native_library());
        Ok(())
    }

    #[test]
    fn test_has_native_library() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mymodule.zip");
        write_zip(
            &path,
            &[("mymodule/__init__.py", ""), ("mymodule/_native.so", "ELF")],
        )?;

        let archive = PackageArchive::open(&RealRuntime, &path)?;
        assert!(archive.has_native_library());
        assert_eq!(archive.len(), 2);
        Ok(())
    }

    #[test]
    fn test_copy_entry() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("a.zip");
        write_zip(&path, &[("a/b.txt", "payload")])?;

        let mut archive = PackageArchive::open(&RealRuntime, &path)?;
        let mut out = Vec::new();
        let copied = archive.copy_entry(0, &mut out)?;
        assert_eq!(copied, 7);
        assert_eq!(out, b"payload");
        Ok(())
    }

    #[test]
    fn test_open_corrupted_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, "not a zip").unwrap();

        let result = PackageArchive::open(&RealRuntime, &path);
        assert!(result.is_err());
        assert!(
            format!("{:#}", result.err().unwrap()).contains("Failed to parse ZIP archive")
        );
    }

    #[test]
    fn test_open_missing_archive() {
        let result = PackageArchive::open(&RealRuntime, Path::new("/nonexistent/x.zip"));
        assert!(result.is_err());
    }

    #[test]
    fn test_dos_to_system_time() {
        let dt = ::zip::DateTime::from_date_and_time(2011, 3, 13, 7, 6, 40).unwrap();
        let expected = SystemTime::UNIX_EPOCH + Duration::from_secs(1_300_000_000);
        assert_eq!(dos_to_system_time(dt), Some(expected));
    }

    #[test]
    fn test_days_from_civil_epoch() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
    }
}
