use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::descriptor::InterpreterDescriptor;
use crate::module::DestinationRoots;
use crate::runtime::Runtime;
use crate::version::JsonPreferenceStore;

pub const PREFERENCES_FILE: &str = "preferences.json";

/// Every directory py4a reads or writes, derived from one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub root: PathBuf,
    /// Interpreter home: `<root>/<interpreter name>`.
    pub home: PathBuf,
    /// Extras archives unpack here; pure-Python modules live in `<extras_root>/<name>`.
    pub extras_root: PathBuf,
    pub scripts_root: PathBuf,
    /// Default place to look for local archives and to stage downloads.
    pub downloads: PathBuf,
    pub preferences: PathBuf,
}

impl InstallLayout {
    pub fn new(root: &Path, descriptor: &InterpreterDescriptor) -> Self {
        Self {
            root: root.to_path_buf(),
            home: root.join(&descriptor.name),
            extras_root: root.join("extras"),
            scripts_root: root.join("scripts"),
            downloads: root.join("downloads"),
            preferences: root.join(PREFERENCES_FILE),
        }
    }
}

/// Resolved settings for one invocation.
pub struct Config<R: Runtime> {
    pub runtime: Arc<R>,
    pub descriptor: InterpreterDescriptor,
    pub layout: InstallLayout,
}

impl<R: Runtime> Config<R> {
    pub fn new(
        runtime: R,
        root: Option<PathBuf>,
        interpreter: &str,
        source_url: Option<String>,
        release_url: Option<String>,
    ) -> Result<Self> {
        let mut descriptor = InterpreterDescriptor::by_name(interpreter).with_context(|| {
            format!(
                "Unknown interpreter {:?}. Expected python or python3.",
                interpreter
            )
        })?;
        if let Some(url) = source_url {
            descriptor = descriptor.with_version_url(url);
        }
        if let Some(url) = release_url {
            descriptor = descriptor.with_install_url(url);
        }

        let root = match root {
            Some(path) => path,
            None => default_root(&runtime)?,
        };
        debug!("Using root {:?} for {}", root, descriptor.name);
        let layout = InstallLayout::new(&root, &descriptor);

        Ok(Self {
            runtime: Arc::new(runtime),
            descriptor,
            layout,
        })
    }

    /// Destinations for imported modules of this interpreter.
    pub fn module_roots(&self) -> DestinationRoots {
        DestinationRoots::new(
            self.descriptor.path_shlib(&self.layout.home),
            self.descriptor.extras_dir(&self.layout.extras_root),
            self.descriptor.path_egg(&self.layout.home),
        )
    }

    pub fn site_packages(&self) -> PathBuf {
        self.descriptor.path_sitepkgs(&self.layout.home)
    }

    pub fn open_preferences(&self) -> Result<JsonPreferenceStore<R>> {
        JsonPreferenceStore::open(self.runtime.clone(), &self.layout.preferences)
    }
}

/// `<data dir>/py4a`
#[tracing::instrument(skip(runtime))]
pub fn default_root<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    let data_dir = runtime
        .data_dir()
        .context("Could not find the user data directory; pass --root")?;
    Ok(data_dir.join("py4a"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_layout_from_explicit_root() {
        let config = Config::new(
            MockRuntime::new(),
            Some(PathBuf::from("/sdcard/py4a")),
            "python",
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.layout.home, PathBuf::from("/sdcard/py4a/python"));
        assert_eq!(config.layout.preferences, PathBuf::from("/sdcard/py4a/preferences.json"));

        let roots = config.module_roots();
        assert_eq!(roots.library_root, PathBuf::from("/sdcard/py4a/python/lib"));
        assert_eq!(roots.interpreter_root, PathBuf::from("/sdcard/py4a/extras/python"));
        assert_eq!(
            roots.metadata_root,
            PathBuf::from("/sdcard/py4a/python/lib/python2.7/egg-info")
        );
        assert_eq!(
            config.site_packages(),
            PathBuf::from("/sdcard/py4a/python/lib/python2.7/site-packages")
        );
    }

    #[test]
    fn test_default_root_uses_data_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_data_dir()
            .returning(|| Some(PathBuf::from("/home/user/.local/share")));

        let config = Config::new(runtime, None, "python3", None, None).unwrap();
        assert_eq!(config.layout.root, PathBuf::from("/home/user/.local/share/py4a"));
        assert_eq!(config.layout.home, PathBuf::from("/home/user/.local/share/py4a/python3"));
    }

    #[test]
    fn test_no_data_dir_is_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_data_dir().returning(|| None);
        assert!(Config::new(runtime, None, "python", None, None).is_err());
    }

    #[test]
    fn test_url_overrides() {
        let config = Config::new(
            MockRuntime::new(),
            Some(PathBuf::from("/r")),
            "python",
            Some("http://localhost:8080".into()),
            Some("http://localhost:8080/releases".into()),
        )
        .unwrap();
        assert_eq!(config.descriptor.version_url, "http://localhost:8080/");
        assert_eq!(config.descriptor.install_url, "http://localhost:8080/releases/");
    }

    #[test]
    fn test_unknown_interpreter() {
        let err = Config::new(MockRuntime::new(), Some(PathBuf::from("/r")), "perl", None, None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown interpreter"));
    }
}
