//! Interpreter distribution revisions: what is installed, what is available
//! and where the latter comes from.

mod check;
mod local;
mod store;

pub use check::{HttpVersionSource, VersionChecker, VersionSource, parse_revision};
pub use local::{LocalDistribution, scan_local};
pub use store::{JsonPreferenceStore, PreferenceStore};

use std::fmt;

pub const INSTALLED_VERSION_KEY: &str = "py4a.installed.version";
pub const INSTALLED_EXTRAS_KEY: &str = "py4a.installed.extras";
pub const INSTALLED_SCRIPTS_KEY: &str = "py4a.installed.scripts";
pub const AVAIL_VERSION_KEY: &str = "py4a.available.version";
pub const AVAIL_EXTRAS_KEY: &str = "py4a.available.extras";
pub const AVAIL_SCRIPTS_KEY: &str = "py4a.available.scripts";

const INSTALLED_KEYS: [&str; 3] = [INSTALLED_VERSION_KEY, INSTALLED_EXTRAS_KEY, INSTALLED_SCRIPTS_KEY];
const AVAILABLE_KEYS: [&str; 3] = [AVAIL_VERSION_KEY, AVAIL_EXTRAS_KEY, AVAIL_SCRIPTS_KEY];

/// Revisions of the interpreter, extras and scripts archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct VersionTriple {
    pub interpreter: i64,
    pub extras: i64,
    pub scripts: i64,
}

impl VersionTriple {
    pub fn new(interpreter: i64, extras: i64, scripts: i64) -> Self {
        Self {
            interpreter,
            extras,
            scripts,
        }
    }

    fn as_array(self) -> [i64; 3] {
        [self.interpreter, self.extras, self.scripts]
    }

    fn from_array([interpreter, extras, scripts]: [i64; 3]) -> Self {
        Self::new(interpreter, extras, scripts)
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bin: {} Extra: {} Scripts: {}",
            self.interpreter, self.extras, self.scripts
        )
    }
}

/// True when `available` has any component newer than `installed`. Nothing
/// installed counts as outdated; nothing known to be available never does.
pub fn needs_update(installed: Option<VersionTriple>, available: Option<VersionTriple>) -> bool {
    match (installed, available) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(installed), Some(available)) => installed
            .as_array()
            .iter()
            .zip(available.as_array().iter())
            .any(|(have, latest)| latest > have),
    }
}

pub fn load_installed(store: &dyn PreferenceStore) -> Option<VersionTriple> {
    load(store, &INSTALLED_KEYS)
}

pub fn load_available(store: &dyn PreferenceStore) -> Option<VersionTriple> {
    load(store, &AVAILABLE_KEYS)
}

/// Stage the installed triple. Callers commit.
pub fn save_installed(store: &mut dyn PreferenceStore, versions: VersionTriple) {
    save(store, &INSTALLED_KEYS, versions)
}

/// Stage the available triple. Callers commit.
pub fn save_available(store: &mut dyn PreferenceStore, versions: VersionTriple) {
    save(store, &AVAILABLE_KEYS, versions)
}

pub fn clear_installed(store: &mut dyn PreferenceStore) {
    for key in INSTALLED_KEYS {
        store.remove(key);
    }
}

fn load(store: &dyn PreferenceStore, keys: &[&str; 3]) -> Option<VersionTriple> {
    let mut values = [0; 3];
    for (value, key) in values.iter_mut().zip(keys) {
        *value = store.get(key)?;
    }
    Some(VersionTriple::from_array(values))
}

fn save(store: &mut dyn PreferenceStore, keys: &[&str; 3], versions: VersionTriple) {
    for (key, value) in keys.iter().zip(versions.as_array()) {
        store.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MemoryStore(BTreeMap<String, i64>);

    impl PreferenceStore for MemoryStore {
        fn get(&self, key: &str) -> Option<i64> {
            self.0.get(key).copied()
        }
        fn set(&mut self, key: &str, value: i64) {
            self.0.insert(key.to_string(), value);
        }
        fn remove(&mut self, key: &str) {
            self.0.remove(key);
        }
        fn commit(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_needs_update() {
        let installed = VersionTriple::new(17, 16, 15);
        assert!(!needs_update(Some(installed), Some(installed)));
        assert!(needs_update(Some(installed), Some(VersionTriple::new(17, 16, 16))));
        assert!(needs_update(Some(installed), Some(VersionTriple::new(18, 1, 1))));
        assert!(!needs_update(Some(installed), Some(VersionTriple::new(16, 16, 15))));
        assert!(needs_update(None, Some(installed)));
        assert!(!needs_update(Some(installed), None));
        assert!(!needs_update(None, None));
    }

    #[test]
    fn test_triples_round_trip_through_store() {
        let mut store = MemoryStore::default();
        assert_eq!(load_installed(&store), None);

        save_installed(&mut store, VersionTriple::new(17, 16, 15));
        save_available(&mut store, VersionTriple::new(18, 16, 15));

        assert_eq!(store.get("py4a.installed.extras"), Some(16));
        assert_eq!(load_installed(&store), Some(VersionTriple::new(17, 16, 15)));
        assert_eq!(load_available(&store), Some(VersionTriple::new(18, 16, 15)));

        clear_installed(&mut store);
        assert_eq!(load_installed(&store), None);
        assert!(load_available(&store).is_some());
    }

    #[test]
    fn test_partial_triple_is_none() {
        let mut store = MemoryStore::default();
        store.set(AVAIL_VERSION_KEY, 17);
        store.set(AVAIL_EXTRAS_KEY, 16);
        assert_eq!(load_available(&store), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            VersionTriple::new(17, 16, 15).to_string(),
            "Bin: 17 Extra: 16 Scripts: 15"
        );
    }
}
