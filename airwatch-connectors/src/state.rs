//! JSON file state store
//!
//! The whole key space is one JSON object on disk. Writes go to memory;
//! `flush` replaces the file atomically. The engine flushes once at the end
//! of every run, so a crashed run leaves the previous run's state intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use airwatch_core::{EngineError, EngineResult, StateStore};
use log::debug;
use serde_json::Value;

use crate::{write_atomic, ConnectorError};

/// File-backed [`StateStore`]
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConnectorError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| ConnectorError::Parse(format!("{}: {}", path.display(), e)))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("state file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(err) => return Err(ConnectorError::io(&path, err)),
        };
        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unflushed changes pending
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> EngineResult<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> EngineResult<()> {
        self.entries.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> EngineResult<()> {
        if self.entries.remove(key).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> EngineResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &json).map_err(|e| EngineError::Store(e.to_string()))?;
        self.dirty = false;
        debug!("flushed {} state keys to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}
