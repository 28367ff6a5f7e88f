//! On-disk snapshot of resolver caches.
//!
//! Format: one JSON object mapping cache name to a `key → value` object.
//! ```json
//! {"importPath": {"/src/app/model": "example.com/app/model"}}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default snapshot file name, relative to the working directory
pub const CACHE_FILENAME: &str = ".annogencache";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl CacheSnapshot {
    /// Reads a snapshot. A missing or unreadable snapshot is treated as empty.
    pub fn read(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&data) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::warn!("ignoring corrupt cache file {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Overwrites `path` with this snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn contains(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn take(&mut self, section: &str) -> Option<BTreeMap<String, String>> {
        self.sections.remove(section)
    }

    pub fn put(&mut self, section: &str, entries: BTreeMap<String, String>) {
        self.sections.insert(section.to_string(), entries);
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
