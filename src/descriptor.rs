//! Static description of a hosted interpreter: names, paths inside its home,
//! where its archives live and the environment it runs with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PYTHON_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/kuri65536/python-for-android/master/";
pub const PYTHON_RELEASE_URL: &str =
    "https://github.com/kuri65536/python-for-android/releases/download/";

pub const VERSION_FILE: &str = "python-build/LATEST_VERSION";

pub const ENV_HOME: &str = "PYTHONHOME";
pub const ENV_PATH: &str = "PYTHONPATH";
pub const ENV_TEMP: &str = "TEMP";
pub const ENV_LD: &str = "LD_LIBRARY_PATH";
pub const ENV_EXTRAS: &str = "PY4A_EXTRAS";
pub const ENV_EGGS: &str = "PYTHON_EGG_CACHE";
pub const ENV_USERBASE: &str = "PYTHONUSERBASE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterDescriptor {
    /// Short name; also the directory under the extras root.
    pub name: String,
    pub nice_name: String,
    /// Script extension, with the dot.
    pub extension: String,
    /// Interpreter binary, relative to the home.
    pub binary: PathBuf,
    /// Shared library directory, relative to the home.
    pub shlib_dir: PathBuf,
    /// Standard library directory, relative to the home.
    pub lib_dir: PathBuf,
    /// Base URL the archive names are appended to.
    pub install_url: String,
    /// Base URL of the `LATEST_VERSION*` files.
    pub version_url: String,
    /// First component of every archive file name.
    pub archive_prefix: String,
    /// Revision used for all three archives instead of asking `version_url`.
    pub pinned_revision: Option<i64>,
}

/// The three archives making up an interpreter distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Interpreter,
    Extras,
    Scripts,
}

impl ArchiveKind {
    pub const ALL: [ArchiveKind; 3] = [
        ArchiveKind::Interpreter,
        ArchiveKind::Extras,
        ArchiveKind::Scripts,
    ];

    /// Suffix of the matching `LATEST_VERSION` file.
    pub fn version_file_suffix(self) -> &'static str {
        match self {
            ArchiveKind::Interpreter => "",
            ArchiveKind::Extras => "_EXTRA",
            ArchiveKind::Scripts => "_SCRIPTS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArchiveKind::Interpreter => "interpreter",
            ArchiveKind::Extras => "extras",
            ArchiveKind::Scripts => "scripts",
        }
    }
}

impl InterpreterDescriptor {
    pub fn python() -> Self {
        Self {
            name: "python".into(),
            nice_name: "Python 2.7.12".into(),
            extension: ".py".into(),
            binary: PathBuf::from("bin/python"),
            shlib_dir: PathBuf::from("lib"),
            lib_dir: PathBuf::from("lib/python2.7"),
            install_url: PYTHON_RELEASE_URL.into(),
            version_url: PYTHON_SOURCE_URL.into(),
            archive_prefix: "python".into(),
            pinned_revision: None,
        }
    }

    pub fn python3() -> Self {
        Self {
            name: "python3".into(),
            nice_name: "Python 3.2.2".into(),
            extension: ".py".into(),
            binary: PathBuf::from("python3/bin/python3"),
            shlib_dir: PathBuf::from("python3/lib"),
            lib_dir: PathBuf::from("python3/lib/python3.2"),
            install_url: PYTHON_RELEASE_URL.into(),
            version_url: PYTHON_SOURCE_URL.into(),
            archive_prefix: "python3".into(),
            pinned_revision: Some(1),
        }
    }

    /// Look a preset up by its short name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "python" | "python2" => Some(Self::python()),
            "python3" => Some(Self::python3()),
            _ => None,
        }
    }

    pub fn with_version_url(mut self, url: impl Into<String>) -> Self {
        self.version_url = ensure_trailing_slash(url.into());
        self
    }

    pub fn with_install_url(mut self, url: impl Into<String>) -> Self {
        self.install_url = ensure_trailing_slash(url.into());
        self
    }

    pub fn binary_path(&self, home: &Path) -> PathBuf {
        home.join(&self.binary)
    }

    pub fn path_shlib(&self, home: &Path) -> PathBuf {
        home.join(&self.shlib_dir)
    }

    pub fn path_egg(&self, home: &Path) -> PathBuf {
        home.join(&self.lib_dir).join("egg-info")
    }

    pub fn path_dynload(&self, home: &Path) -> PathBuf {
        home.join(&self.lib_dir).join("lib-dynload")
    }

    pub fn path_sitepkgs(&self, home: &Path) -> PathBuf {
        home.join(&self.lib_dir).join("site-packages")
    }

    /// Where pure-Python modules are imported: `<extras_root>/<name>`.
    pub fn extras_dir(&self, extras_root: &Path) -> PathBuf {
        extras_root.join(&self.name)
    }

    pub fn temp_dir(&self, extras_root: &Path) -> PathBuf {
        self.extras_dir(extras_root).join("tmp")
    }

    pub fn version_file_url(&self, kind: ArchiveKind) -> String {
        format!(
            "{}{}{}",
            self.version_url,
            VERSION_FILE,
            kind.version_file_suffix()
        )
    }

    /// `r<rev>/<prefix>_r<rev><platform>.zip` and the extras/scripts variants.
    pub fn archive_name(&self, kind: ArchiveKind, revision: i64, platform: &str) -> String {
        let prefix = &self.archive_prefix;
        match kind {
            ArchiveKind::Interpreter => {
                format!("r{rev}/{prefix}_r{rev}{platform}.zip", rev = revision)
            }
            ArchiveKind::Extras => format!("r{rev}/{prefix}_extras_r{rev}.zip", rev = revision),
            ArchiveKind::Scripts => format!("r{rev}/{prefix}_scripts_r{rev}.zip", rev = revision),
        }
    }

    pub fn archive_url(&self, kind: ArchiveKind, revision: i64, platform: &str) -> String {
        format!(
            "{}{}",
            self.install_url,
            self.archive_name(kind, revision, platform)
        )
    }

    /// Variables the interpreter process needs, keyed by name.
    pub fn environment_variables(&self, home: &Path, extras_root: &Path) -> BTreeMap<String, String> {
        let dynload = self.path_dynload(home);
        let python_path = [
            self.extras_dir(extras_root),
            home.join(&self.lib_dir),
            dynload.clone(),
        ]
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(":");

        let mut values = BTreeMap::new();
        values.insert(ENV_HOME.to_string(), display(home));
        values.insert(ENV_LD.to_string(), display(&self.path_shlib(home)));
        values.insert(ENV_PATH.to_string(), python_path);
        values.insert(ENV_EXTRAS.to_string(), display(extras_root));
        values.insert(ENV_TEMP.to_string(), display(&self.temp_dir(extras_root)));
        values.insert(ENV_EGGS.to_string(), display(&dynload));
        values.insert(ENV_USERBASE.to_string(), display(home));
        values
    }
}

/// Archive platform suffix for a CPU architecture name.
pub fn platform_suffix(arch: &str) -> &'static str {
    let arch = arch.to_lowercase();
    if arch.starts_with("arm") || arch.starts_with("aarch64") {
        ""
    } else if arch.starts_with("x86") || arch.starts_with("i686") || arch.starts_with("amd64") {
        "_x86"
    } else if arch.starts_with("mips") {
        "_mips"
    } else {
        ""
    }
}

/// Suffix for the architecture this binary was built for.
pub fn host_platform_suffix() -> &'static str {
    platform_suffix(std::env::consts::ARCH)
}

fn ensure_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_names() {
        let py = InterpreterDescriptor::python();
        assert_eq!(
            py.archive_name(ArchiveKind::Interpreter, 17, ""),
            "r17/python_r17.zip"
        );
        assert_eq!(
            py.archive_name(ArchiveKind::Interpreter, 17, "_x86"),
            "r17/python_r17_x86.zip"
        );
        assert_eq!(
            py.archive_name(ArchiveKind::Extras, 16, ""),
            "r16/python_extras_r16.zip"
        );
        assert_eq!(
            py.archive_name(ArchiveKind::Scripts, 15, "_mips"),
            "r15/python_scripts_r15.zip"
        );
        assert_eq!(
            py.archive_url(ArchiveKind::Extras, 16, ""),
            "https://github.com/kuri65536/python-for-android/releases/download/r16/python_extras_r16.zip"
        );
    }

    #[test]
    fn test_version_file_urls() {
        let py = InterpreterDescriptor::python().with_version_url("http://localhost:1234");
        assert_eq!(
            py.version_file_url(ArchiveKind::Interpreter),
            "http://localhost:1234/python-build/LATEST_VERSION"
        );
        assert_eq!(
            py.version_file_url(ArchiveKind::Extras),
            "http://localhost:1234/python-build/LATEST_VERSION_EXTRA"
        );
        assert_eq!(
            py.version_file_url(ArchiveKind::Scripts),
            "http://localhost:1234/python-build/LATEST_VERSION_SCRIPTS"
        );
    }

    #[test]
    fn test_platform_suffix() {
        assert_eq!(platform_suffix("arm"), "");
        assert_eq!(platform_suffix("aarch64"), "");
        assert_eq!(platform_suffix("x86"), "_x86");
        assert_eq!(platform_suffix("x86_64"), "_x86");
        assert_eq!(platform_suffix("i686"), "_x86");
        assert_eq!(platform_suffix("AMD64"), "_x86");
        assert_eq!(platform_suffix("mips64"), "_mips");
        assert_eq!(platform_suffix("riscv64"), "");
    }

    #[test]
    fn test_paths() {
        let py = InterpreterDescriptor::python();
        let home = Path::new("/data/py4a/python");
        assert_eq!(py.path_shlib(home), PathBuf::from("/data/py4a/python/lib"));
        assert_eq!(
            py.path_egg(home),
            PathBuf::from("/data/py4a/python/lib/python2.7/egg-info")
        );
        assert_eq!(
            py.path_sitepkgs(home),
            PathBuf::from("/data/py4a/python/lib/python2.7/site-packages")
        );
        assert_eq!(py.binary_path(home), PathBuf::from("/data/py4a/python/bin/python"));
    }

    #[test]
    fn test_environment_variables() {
        let py = InterpreterDescriptor::python();
        let env = py.environment_variables(Path::new("/h"), Path::new("/sd/extras"));

        assert_eq!(env.len(), 7);
        assert_eq!(env[ENV_HOME], "/h");
        assert_eq!(env[ENV_LD], "/h/lib");
        assert_eq!(
            env[ENV_PATH],
            "/sd/extras/python:/h/lib/python2.7:/h/lib/python2.7/lib-dynload"
        );
        assert_eq!(env[ENV_EXTRAS], "/sd/extras");
        assert_eq!(env[ENV_TEMP], "/sd/extras/python/tmp");
        assert_eq!(env[ENV_EGGS], "/h/lib/python2.7/lib-dynload");
        assert_eq!(env[ENV_USERBASE], "/h");
    }

    #[test]
    fn test_by_name() {
        assert_eq!(InterpreterDescriptor::by_name("python3").unwrap().pinned_revision, Some(1));
        assert_eq!(InterpreterDescriptor::by_name("python2").unwrap().name, "python");
        assert!(InterpreterDescriptor::by_name("ruby").is_none());
    }
}
