use anyhow::Result;

use crate::config::Config;
use crate::runtime::Runtime;
use crate::scripts::{RenameMode, preferred_major, switch_preferred};
use crate::task::NullSink;

/// Make `major` the interpreter that owns the `.py` extension for the sample scripts.
#[tracing::instrument(skip(config))]
pub fn prefer<R: Runtime>(config: &Config<R>, major: u8, mode: RenameMode) -> Result<()> {
    let report = switch_preferred(
        config.runtime.as_ref(),
        &config.layout.root,
        &config.layout.scripts_root,
        major,
        mode,
        &NullSink,
    )?;

    println!(
        "Python {} scripts now use .py ({} renamed, {} skipped)",
        major,
        report.renamed.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  skipped {}", skipped.display());
    }
    Ok(())
}

pub fn show<R: Runtime>(config: &Config<R>) -> Result<()> {
    let major = preferred_major(config.runtime.as_ref(), &config.layout.root);
    println!("Preferred for .py: Python {}", major);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_prefer_three_then_two() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::new(RealRuntime, Some(dir.path().to_path_buf()), "python3", None, None)?;
        fs::create_dir_all(&config.layout.scripts_root)?;
        fs::write(config.layout.scripts_root.join("hello.py3"), "")?;

        prefer(&config, 3, RenameMode::Skip)?;
        assert!(config.layout.scripts_root.join("hello.py").exists());
        assert_eq!(preferred_major(&RealRuntime, &config.layout.root), 3);

        prefer(&config, 2, RenameMode::Skip)?;
        assert!(config.layout.scripts_root.join("hello.py3").exists());
        assert_eq!(preferred_major(&RealRuntime, &config.layout.root), 2);
        Ok(())
    }

    #[test]
    fn test_prefer_rejects_other_majors() {
        let dir = tempdir().unwrap();
        let config =
            Config::new(RealRuntime, Some(dir.path().to_path_buf()), "python", None, None).unwrap();
        assert!(prefer(&config, 4, RenameMode::Skip).is_err());
    }
}
