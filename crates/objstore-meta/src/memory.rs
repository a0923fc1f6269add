use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use objstore_types::AttributeMap;

use crate::error::MetaResult;
use crate::traits::{MetadataBackend, MetadataStore, Namespace};

/// In-memory, HashMap-based metadata namespace.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` for
/// safe concurrent access and cloned on read/write.
pub struct InMemoryMetadataStore {
    records: RwLock<HashMap<String, AttributeMap>>,
}

impl InMemoryMetadataStore {
    /// Create a new empty namespace.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the namespace is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, key: &str) -> MetaResult<Option<AttributeMap>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: AttributeMap) -> MetaResult<()> {
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn update(&self, key: &str, fields: AttributeMap) -> MetaResult<AttributeMap> {
        let mut map = self.records.write().expect("lock poisoned");
        let record = map.entry(key.to_string()).or_default();
        record.extend(fields);
        Ok(record.clone())
    }

    fn delete(&self, key: &str) -> MetaResult<bool> {
        let mut map = self.records.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn keys(&self) -> MetaResult<Vec<String>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }

    fn as_map(&self) -> MetaResult<BTreeMap<String, AttributeMap>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl std::fmt::Debug for InMemoryMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetadataStore")
            .field("record_count", &self.len())
            .finish()
    }
}

/// Backend that keeps every namespace in memory.
///
/// Nothing survives the backend itself; use it for tests and embedding.
#[derive(Default)]
pub struct InMemoryBackend {
    stores: Mutex<HashMap<(PathBuf, Namespace), Arc<InMemoryMetadataStore>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataBackend for InMemoryBackend {
    fn open(&self, bucket_dir: &Path, namespace: Namespace) -> MetaResult<Arc<dyn MetadataStore>> {
        let mut stores = self.stores.lock().expect("lock poisoned");
        let store = stores
            .entry((bucket_dir.to_path_buf(), namespace))
            .or_insert_with(|| Arc::new(InMemoryMetadataStore::new()));
        Ok(Arc::clone(store) as Arc<dyn MetadataStore>)
    }

    fn evict(&self, bucket_dir: &Path) {
        let mut stores = self.stores.lock().expect("lock poisoned");
        stores.retain(|(dir, _), _| dir != bucket_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_types::AttrValue;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
            .collect()
    }

    #[test]
    fn set_and_get() {
        let store = InMemoryMetadataStore::new();
        store.set("k", attrs(&[("a", "1")])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(attrs(&[("a", "1")])));
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn set_replaces_update_merges() {
        let store = InMemoryMetadataStore::new();
        store.set("k", attrs(&[("a", "1"), ("b", "2")])).unwrap();
        store.set("k", attrs(&[("a", "3")])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(attrs(&[("a", "3")])));

        let merged = store.update("k", attrs(&[("c", "4")])).unwrap();
        assert_eq!(merged, attrs(&[("a", "3"), ("c", "4")]));
        assert_eq!(store.get("k").unwrap(), Some(merged));
    }

    #[test]
    fn update_creates_missing_record() {
        let store = InMemoryMetadataStore::new();
        store.update("new", attrs(&[("x", "y")])).unwrap();
        assert!(store.contains("new").unwrap());
    }

    #[test]
    fn delete_reports_presence() {
        let store = InMemoryMetadataStore::new();
        store.set("k", AttributeMap::new()).unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn keys_and_as_map() {
        let store = InMemoryMetadataStore::new();
        store.set("a", attrs(&[("n", "1")])).unwrap();
        store.set("b", attrs(&[("n", "2")])).unwrap();
        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(store.as_map().unwrap().len(), 2);
    }

    #[test]
    fn backend_shares_handles_per_namespace() {
        let backend = InMemoryBackend::new();
        let dir = Path::new("/buckets/b1");
        let first = backend.open(dir, Namespace::Objects).unwrap();
        first.set("id", attrs(&[("k", "v")])).unwrap();

        let second = backend.open(dir, Namespace::Objects).unwrap();
        assert!(second.contains("id").unwrap());

        let other_ns = backend.open(dir, Namespace::Bucket).unwrap();
        assert!(!other_ns.contains("id").unwrap());
    }

    #[test]
    fn evict_forgets_bucket() {
        let backend = InMemoryBackend::new();
        let dir = Path::new("/buckets/b1");
        backend
            .open(dir, Namespace::Objects)
            .unwrap()
            .set("id", AttributeMap::new())
            .unwrap();
        backend.evict(dir);
        assert!(!backend
            .open(dir, Namespace::Objects)
            .unwrap()
            .contains("id")
            .unwrap());
    }

    #[test]
    fn debug_format() {
        let store = InMemoryMetadataStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryMetadataStore"));
        assert!(debug.contains("record_count"));
    }
}
