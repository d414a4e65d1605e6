//! Sample script extensions. Scripts for the preferred major version use
//! `.py`; the other interpreter's scripts use `.py3`.

use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;
use crate::task::{Outcome, Progress, ProgressSink};

pub const PREFERRED_EXTENSION_FILE: &str = ".pyextpreffered";
pub const DEFAULT_PREFERRED_MAJOR: u8 = 2;

/// What to do when the renamed file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenameMode {
    Skip,
    Overwrite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub renamed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Rename every file in `dir` ending in `from_ext` to end in `to_ext`.
#[tracing::instrument(skip(runtime, sink))]
pub fn rename_scripts<R: Runtime + ?Sized>(
    runtime: &R,
    dir: &Path,
    from_ext: &str,
    to_ext: &str,
    mode: RenameMode,
    sink: &dyn ProgressSink,
) -> Result<RenameReport> {
    let mut progress = Progress::new(sink);
    let result = rename_all(runtime, dir, from_ext, to_ext, mode, &mut progress);
    progress.finish(Outcome::from_result(
        result.as_ref().map_err(|e| anyhow::anyhow!("{:#}", e)),
        |report| {
            format!(
                "Renamed {} scripts to {} ({} skipped)",
                report.renamed.len(),
                to_ext,
                report.skipped.len()
            )
        },
    ));
    result
}

fn rename_all<R: Runtime + ?Sized>(
    runtime: &R,
    dir: &Path,
    from_ext: &str,
    to_ext: &str,
    mode: RenameMode,
    progress: &mut Progress<'_>,
) -> Result<RenameReport> {
    if from_ext == to_ext {
        bail!("Source and target extension are both {}", from_ext);
    }
    let mut candidates: Vec<PathBuf> = runtime
        .read_dir(dir)?
        .into_iter()
        .filter(|path| {
            !runtime.is_dir(path)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(from_ext) && n.len() > from_ext.len())
        })
        .collect();
    candidates.sort();
    progress.start(candidates.len())?;

    let mut report = RenameReport::default();
    for (position, source) in candidates.into_iter().enumerate() {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = &name[..name.len() - from_ext.len()];
        let target = source.with_file_name(format!("{}{}", stem, to_ext));

        let renamed = if runtime.exists(&target) {
            match mode {
                RenameMode::Skip => {
                    debug!("{:?} exists, skipping {:?}", target, source);
                    false
                }
                RenameMode::Overwrite if runtime.is_dir(&target) => {
                    warn!("{:?} is a directory, skipping {:?}", target, source);
                    false
                }
                RenameMode::Overwrite => {
                    runtime.remove_file(&target)?;
                    runtime.rename(&source, &target)?;
                    true
                }
            }
        } else {
            runtime.rename(&source, &target)?;
            true
        };

        if renamed {
            report.renamed.push(target);
        } else {
            report.skipped.push(source);
        }
        progress.advance_to(position + 1);
    }

    info!(
        "Renamed {} scripts in {:?} from {} to {}",
        report.renamed.len(),
        dir,
        from_ext,
        to_ext
    );
    Ok(report)
}

/// Preferred major version, read from `<language_root>/.pyextpreffered`.
/// Anything unreadable falls back to 2.
pub fn preferred_major<R: Runtime + ?Sized>(runtime: &R, language_root: &Path) -> u8 {
    let path = language_root.join(PREFERRED_EXTENSION_FILE);
    match runtime.read_to_string(&path) {
        Ok(content) => match content.bytes().next() {
            Some(b @ b'0'..=b'9') => b - b'0',
            _ => {
                warn!("Unexpected content in {:?}, using {}", path, DEFAULT_PREFERRED_MAJOR);
                DEFAULT_PREFERRED_MAJOR
            }
        },
        Err(e) => {
            debug!("Can't read {:?} ({}), using {}", path, e, DEFAULT_PREFERRED_MAJOR);
            DEFAULT_PREFERRED_MAJOR
        }
    }
}

pub fn set_preferred_major<R: Runtime + ?Sized>(runtime: &R, language_root: &Path, major: u8) -> Result<()> {
    if !(2..=3).contains(&major) {
        bail!("Preferred version must be 2 or 3, got {}", major);
    }
    let path = language_root.join(PREFERRED_EXTENSION_FILE);
    runtime.write(&path, &[b'0' + major])?;
    Ok(())
}

/// Record `major` as preferred and rename the sample scripts to match:
/// preferring 3 turns `.py3` into `.py`, preferring 2 turns `.py` into `.py3`.
pub fn switch_preferred<R: Runtime + ?Sized>(
    runtime: &R,
    language_root: &Path,
    scripts_dir: &Path,
    major: u8,
    mode: RenameMode,
    sink: &dyn ProgressSink,
) -> Result<RenameReport> {
    set_preferred_major(runtime, language_root, major)?;
    let (from_ext, to_ext) = if major == 3 { (".py3", ".py") } else { (".py", ".py3") };
    rename_scripts(runtime, scripts_dir, from_ext, to_ext, mode, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::task::{NullSink, ProgressEvent};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[test]
    fn test_rename_skip_existing() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("hello.py"), "new")?;
        fs::write(dir.path().join("clash.py"), "new")?;
        fs::write(dir.path().join("clash.py3"), "old")?;
        fs::write(dir.path().join("readme.txt"), "")?;

        let report = rename_scripts(
            &RealRuntime,
            dir.path(),
            ".py",
            ".py3",
            RenameMode::Skip,
            &NullSink,
        )?;

        assert_eq!(report.renamed, vec![dir.path().join("hello.py3")]);
        assert_eq!(report.skipped, vec![dir.path().join("clash.py")]);
        assert_eq!(fs::read_to_string(dir.path().join("clash.py3"))?, "old");
        assert!(dir.path().join("readme.txt").exists());
        Ok(())
    }

    #[test]
    fn test_rename_overwrite_existing() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("clash.py3"), "new")?;
        fs::write(dir.path().join("clash.py"), "old")?;

        let events = Mutex::new(Vec::new());
        let sink = |e: ProgressEvent| events.lock().unwrap().push(e);
        let report = rename_scripts(
            &RealRuntime,
            dir.path(),
            ".py3",
            ".py",
            RenameMode::Overwrite,
            &sink,
        )?;

        assert_eq!(report.renamed.len(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("clash.py"))?, "new");
        assert!(!dir.path().join("clash.py3").exists());

        let events = events.into_inner().unwrap();
        assert_eq!(events[0], ProgressEvent::Started { total: 1 });
        assert!(matches!(events.last(), Some(ProgressEvent::Finished(o)) if o.is_success()));
        Ok(())
    }

    #[test]
    fn test_preferred_major_defaults_to_two() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("permission denied")));
        assert_eq!(preferred_major(&runtime, Path::new("/sdcard/py4a")), 2);
    }

    #[test]
    fn test_switch_preferred() -> Result<()> {
        let root = tempdir()?;
        let scripts = root.path().join("scripts");
        fs::create_dir_all(&scripts)?;
        fs::write(scripts.join("hello.py3"), "")?;

        switch_preferred(&RealRuntime, root.path(), &scripts, 3, RenameMode::Skip, &NullSink)?;

        assert_eq!(fs::read_to_string(root.path().join(PREFERRED_EXTENSION_FILE))?, "3");
        assert_eq!(preferred_major(&RealRuntime, root.path()), 3);
        assert!(scripts.join("hello.py").exists());

        assert!(set_preferred_major(&RealRuntime, root.path(), 4).is_err());
        Ok(())
    }
}
