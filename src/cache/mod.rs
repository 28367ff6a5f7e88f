//! Process caches with an explicit lifecycle.
//!
//! [`Caches`] is constructed at start-up (optionally from a persisted
//! snapshot), passed by reference to the parser, pipeline and resolver, and
//! flushed at shutdown. Tests use fresh instances.

pub mod snapshot;
pub mod store;

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::pipeline::AnnotatedDecls;
use crate::source::SourceUnit;

pub use snapshot::CacheSnapshot;
pub use store::{ResolverCache, StringStore};

/// Content fingerprint used as cache version
pub fn fingerprint(data: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(data)
}

struct Versioned<V> {
    version: u64,
    value: Arc<V>,
}

type Slot<V> = Arc<Mutex<Option<Versioned<V>>>>;

/// Key→value store where every entry is tagged with the content version it
/// was computed from. A lookup with a different version recomputes.
///
/// Each key has its own slot lock, so concurrent loads of one key compute
/// once while distinct keys proceed in parallel.
pub struct VersionStore<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K: Eq + Hash + Clone, V> VersionStore<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn load<F>(&self, key: &K, version: u64, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(key.clone()).or_default().clone()
        };

        let mut entry = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = entry.as_ref() {
            if cached.version == version {
                return Ok(Arc::clone(&cached.value));
            }
        }

        let value = Arc::new(compute()?);
        *entry = Some(Versioned {
            version,
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    /// Cached value for `key` if it was computed from `version`
    pub fn get(&self, key: &K, version: u64) -> Option<Arc<V>> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()?;
        let entry = slot.lock().unwrap_or_else(|e| e.into_inner());
        entry
            .as_ref()
            .filter(|cached| cached.version == version)
            .map(|cached| Arc::clone(&cached.value))
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V> Default for VersionStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every cache shared by one run
#[derive(Default)]
pub struct Caches {
    /// Parsed units keyed by path
    pub units: VersionStore<PathBuf, SourceUnit>,
    /// Annotated declarations keyed by (path, annotation prefix)
    pub decls: VersionStore<(PathBuf, String), AnnotatedDecls>,
    /// Import identity and module queries
    pub modules: ResolverCache,
    /// Snapshot sections this version does not know, written back on flush
    unknown: Mutex<CacheSnapshot>,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches seeded from a snapshot file. A missing file yields empty caches.
    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = CacheSnapshot::read(path)?;
        let caches = Self::new();
        let unknown = caches.modules.restore(snapshot);
        tracing::debug!(
            "restored resolver cache from {} ({} unknown sections)",
            path.display(),
            unknown.len()
        );
        *caches.unknown.lock().unwrap_or_else(|e| e.into_inner()) = unknown;
        Ok(caches)
    }

    /// Overwrites `path` with the resolver stores plus any unknown sections.
    pub fn flush(&self, path: &Path) -> Result<()> {
        let mut snapshot = self
            .unknown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.modules.capture(&mut snapshot);
        snapshot.write(path)
    }
}
