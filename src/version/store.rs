use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::runtime::{Runtime, make_directories};

/// Integer key-value settings with explicit commit.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<i64>;
    /// Stage a value. Not persisted until [`PreferenceStore::commit`].
    fn set(&mut self, key: &str, value: i64);
    fn remove(&mut self, key: &str);
    fn commit(&mut self) -> Result<()>;
}

/// A flat JSON object of integers stored in a single file.
pub struct JsonPreferenceStore<R: Runtime + ?Sized> {
    runtime: Arc<R>,
    path: PathBuf,
    values: BTreeMap<String, i64>,
}

impl<R: Runtime + ?Sized> JsonPreferenceStore<R> {
    /// Load `path`. A missing file is an empty store; a corrupt one is an error.
    #[tracing::instrument(skip(runtime))]
    pub fn open(runtime: Arc<R>, path: &Path) -> Result<Self> {
        let values = if runtime.exists(path) {
            let content = runtime.read_to_string(path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse preferences at {:?}", path))?
        } else {
            debug!("No preferences at {:?}, starting empty", path);
            BTreeMap::new()
        };
        Ok(Self {
            runtime,
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &BTreeMap<String, i64> {
        &self.values
    }
}

impl<R: Runtime + ?Sized> PreferenceStore for JsonPreferenceStore<R> {
    fn get(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            make_directories(self.runtime.as_ref(), parent, 0o755)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        self.runtime.write(&tmp, json.as_bytes())?;
        self.runtime
            .rename(&tmp, &self.path)
            .with_context(|| format!("Failed to save preferences to {:?}", self.path))?;
        debug!("Saved {} preferences to {:?}", self.values.len(), self.path);
        Ok(())
    }
}
