use anyhow::{Result, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::descriptor::ArchiveKind;
use crate::runtime::Runtime;

use super::VersionTriple;

/// One archive of each kind found in a local folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDistribution {
    pub interpreter: PathBuf,
    pub extras: PathBuf,
    pub scripts: PathBuf,
    pub versions: VersionTriple,
}

impl LocalDistribution {
    pub fn archive(&self, kind: ArchiveKind) -> &Path {
        match kind {
            ArchiveKind::Interpreter => &self.interpreter,
            ArchiveKind::Extras => &self.extras,
            ArchiveKind::Scripts => &self.scripts,
        }
    }
}

fn name_prefix(prefix: &str, kind: ArchiveKind) -> String {
    match kind {
        ArchiveKind::Interpreter => format!("{}_r", prefix),
        ArchiveKind::Extras => format!("{}_extras_r", prefix),
        ArchiveKind::Scripts => format!("{}_scripts_r", prefix),
    }
}

/// Revision encoded after `name_prefix`. Digits that do not parse count as 0.
fn revision_of(file_name: &str, name_prefix: &str) -> i64 {
    let rest = file_name
        .strip_prefix(name_prefix)
        .and_then(|s| s.strip_suffix(".zip"))
        .unwrap_or("");
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Find `<prefix>_r<N>.zip`, `<prefix>_extras_r<N>.zip` and
/// `<prefix>_scripts_r<N>.zip` in `dir`, keeping the highest revision of each.
#[tracing::instrument(skip(runtime))]
pub fn scan_local<R: Runtime + ?Sized>(runtime: &R, dir: &Path, prefix: &str) -> Result<LocalDistribution> {
    if !runtime.exists(dir) {
        bail!("Can't find {:?}", dir);
    }
    if !runtime.is_dir(dir) {
        bail!("{:?} is not a directory", dir);
    }

    let files: Vec<PathBuf> = runtime
        .read_dir(dir)?
        .into_iter()
        .filter(|path| !runtime.is_dir(path))
        .collect();

    let mut found: Vec<Option<(PathBuf, i64)>> = Vec::new();
    for kind in ArchiveKind::ALL {
        let name_prefix = name_prefix(prefix, kind);
        let pattern = glob::Pattern::new(&format!("{}*.zip", glob::Pattern::escape(&name_prefix)))?;

        let best = files
            .iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                pattern.matches(name).then(|| (path.clone(), revision_of(name, &name_prefix)))
            })
            .inspect(|(path, rev)| debug!("Found {} archive {:?} (r{})", kind.label(), path, rev))
            .max_by_key(|(_, rev)| *rev);
        found.push(best);
    }

    let missing: Vec<&str> = ArchiveKind::ALL
        .iter()
        .zip(&found)
        .filter(|(_, f)| f.is_none())
        .map(|(kind, _)| kind.label())
        .collect();
    if !missing.is_empty() {
        bail!("Please put {} zips to: {}", missing.join(","), dir.display());
    }

    let mut found = found.into_iter().flatten();
    let (Some(interpreter), Some(extras), Some(scripts)) = (found.next(), found.next(), found.next())
    else {
        bail!("Incomplete distribution in {:?}", dir);
    };

    let distribution = LocalDistribution {
        versions: VersionTriple::new(interpreter.1, extras.1, scripts.1),
        interpreter: interpreter.0,
        extras: extras.0,
        scripts: scripts.0,
    };
    info!("Local distribution in {:?}: {}", dir, distribution.versions);
    Ok(distribution)
}
