use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use super::snapshot::CacheSnapshot;

/// Memoized string query results. Only non-empty results are stored, so an
/// unresolvable key is retried on the next lookup.
pub struct StringStore {
    name: &'static str,
    entries: RwLock<HashMap<String, String>>,
    // serializes computation: the queries may shell out and must not run twice
    compute: Mutex<()>,
}

impl StringStore {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            compute: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key`, or the result of `compute` stored when non-empty.
    pub fn load_with<F>(&self, key: &str, compute: F) -> Option<String>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(hit) = self.get(key) {
            return Some(hit);
        }

        let _guard = self.compute.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = self.get(key) {
            return Some(hit);
        }

        let value = compute().filter(|v| !v.is_empty())?;
        tracing::debug!("{} cache miss: {} -> {}", self.name, key, value);
        self.insert(key, value.clone());
        Some(value)
    }

    fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Stores backing the module resolver
pub struct ResolverCache {
    pub import_name: StringStore,
    pub import_path: StringStore,
    pub package_name: StringStore,
    pub package_dir: StringStore,
    pub mod_file: StringStore,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self {
            import_name: StringStore::new("importName"),
            import_path: StringStore::new("importPath"),
            package_name: StringStore::new("importPackageName"),
            package_dir: StringStore::new("importPackageDir"),
            mod_file: StringStore::new("modFile"),
        }
    }

    fn stores(&self) -> [&StringStore; 5] {
        [
            &self.import_name,
            &self.import_path,
            &self.package_name,
            &self.package_dir,
            &self.mod_file,
        ]
    }

    /// Fills the stores from `snapshot`; returns the sections no store claimed.
    pub fn restore(&self, mut snapshot: CacheSnapshot) -> CacheSnapshot {
        for store in self.stores() {
            if let Some(section) = snapshot.take(store.name()) {
                for (k, v) in section {
                    if !v.is_empty() {
                        store.insert(k, v);
                    }
                }
            }
        }
        snapshot
    }

    /// Writes every store as a section of `snapshot`.
    pub fn capture(&self, snapshot: &mut CacheSnapshot) {
        for store in self.stores() {
            snapshot.put(store.name(), store.entries());
        }
    }
}

impl Default for ResolverCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_stores_non_empty() {
        let store = StringStore::new("test");
        assert_eq!(store.load_with("a", || Some("x".into())), Some("x".into()));
        assert_eq!(store.load_with("a", || Some("y".into())), Some("x".into()));
    }

    #[test]
    fn test_load_with_skips_empty() {
        let store = StringStore::new("test");
        assert_eq!(store.load_with("a", || Some(String::new())), None);
        assert_eq!(store.load_with("a", || None), None);
        assert!(store.is_empty());
        assert_eq!(store.load_with("a", || Some("z".into())), Some("z".into()));
    }

    #[test]
    fn test_restore_and_capture() {
        let cache = ResolverCache::new();
        let mut snapshot = CacheSnapshot::default();
        let mut section = BTreeMap::new();
        section.insert("/src/app".to_string(), "example.com/app".to_string());
        snapshot.put("importPath", section);
        snapshot.put("futureSection", BTreeMap::new());

        let unknown = cache.restore(snapshot);
        assert_eq!(
            cache.import_path.get("/src/app").as_deref(),
            Some("example.com/app")
        );
        assert!(unknown.contains("futureSection"));
        assert!(!unknown.contains("importPath"));

        let mut out = CacheSnapshot::default();
        cache.capture(&mut out);
        assert!(out.contains("modFile"));
        assert_eq!(
            out.get("importPath", "/src/app"),
            Some("example.com/app")
        );
    }
}
