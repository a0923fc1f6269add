use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use objstore_types::AttributeMap;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::{MetaError, MetaResult};
use crate::traits::{MetadataBackend, MetadataStore, Namespace};

/// Directory inside a bucket that holds the metadata database.
pub const METADATA_DIR: &str = "metadata";

/// File name of the per-bucket metadata database.
pub const METADATA_FILE: &str = "metadata.redb";

const BUCKET_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bucket");
const OBJECTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

fn table_for(namespace: Namespace) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match namespace {
        Namespace::Bucket => BUCKET_TABLE,
        Namespace::Objects => OBJECTS_TABLE,
    }
}

/// One namespace of a bucket's redb database.
///
/// Each record is a serde_json-encoded attribute map under its key. Every
/// write is a single committed transaction touching only that key, so a write
/// is durable once the call returns.
pub struct RedbStore {
    db: Arc<Database>,
    namespace: Namespace,
    table: TableDefinition<'static, &'static str, &'static [u8]>,
    path: PathBuf,
}

impl RedbStore {
    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, key: &str, bytes: &[u8]) -> MetaResult<AttributeMap> {
        serde_json::from_slice(bytes).map_err(|e| MetaError::Corrupt {
            path: self.path.clone(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn put(&self, key: &str, value: &AttributeMap) -> MetaResult<()> {
        let bytes = encode(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table)?;
            table.insert(key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn encode(value: &AttributeMap) -> MetaResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| MetaError::Serialization(e.to_string()))
}

impl MetadataStore for RedbStore {
    fn get(&self, key: &str) -> MetaResult<Option<AttributeMap>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table)?;
        let record = table
            .get(key)?
            .map(|value| self.decode(key, value.value()))
            .transpose()?;
        Ok(record)
    }

    fn set(&self, key: &str, value: AttributeMap) -> MetaResult<()> {
        self.put(key, &value)?;
        debug!(path = %self.path.display(), key, "metadata record written");
        Ok(())
    }

    fn update(&self, key: &str, fields: AttributeMap) -> MetaResult<AttributeMap> {
        let write_txn = self.db.begin_write()?;
        let merged = {
            let mut table = write_txn.open_table(self.table)?;
            let mut record = table
                .get(key)?
                .map(|current| self.decode(key, current.value()))
                .transpose()?
                .unwrap_or_default();
            record.extend(fields);
            table.insert(key, encode(&record)?.as_slice())?;
            record
        };
        write_txn.commit()?;
        debug!(path = %self.path.display(), key, "metadata record merged");
        Ok(merged)
    }

    fn delete(&self, key: &str) -> MetaResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(self.table)?;
            let removed = table.remove(key)?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn keys(&self) -> MetaResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    fn as_map(&self) -> MetaResult<BTreeMap<String, AttributeMap>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table)?;
        let mut records = BTreeMap::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key = key.value().to_string();
            let record = self.decode(&key, value.value())?;
            records.insert(key, record);
        }
        Ok(records)
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Durable backend keeping one redb database per bucket at
/// `<bucket>/metadata/metadata.redb`, with one table per namespace.
///
/// A database file can only be opened once per process, so handles are
/// cached per bucket directory and shared by both namespaces.
#[derive(Default)]
pub struct RedbBackend {
    databases: Mutex<HashMap<PathBuf, Arc<Database>>>,
}

impl RedbBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of the metadata database for the bucket rooted at `bucket_dir`.
    pub fn database_path(bucket_dir: &Path) -> PathBuf {
        bucket_dir.join(METADATA_DIR).join(METADATA_FILE)
    }

    fn database(&self, bucket_dir: &Path) -> MetaResult<(Arc<Database>, PathBuf)> {
        let path = Self::database_path(bucket_dir);
        let mut databases = self.databases.lock().expect("lock poisoned");
        if let Some(db) = databases.get(bucket_dir) {
            return Ok((Arc::clone(db), path));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)?;

        // Create both tables up front so read transactions never miss one.
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(BUCKET_TABLE)?;
            let _t = write_txn.open_table(OBJECTS_TABLE)?;
        }
        write_txn.commit()?;

        debug!(path = %path.display(), "metadata database opened");
        let db = Arc::new(db);
        databases.insert(bucket_dir.to_path_buf(), Arc::clone(&db));
        Ok((db, path))
    }
}

impl MetadataBackend for RedbBackend {
    fn open(&self, bucket_dir: &Path, namespace: Namespace) -> MetaResult<Arc<dyn MetadataStore>> {
        let (db, path) = self.database(bucket_dir)?;
        Ok(Arc::new(RedbStore {
            db,
            namespace,
            table: table_for(namespace),
            path,
        }))
    }

    fn evict(&self, bucket_dir: &Path) {
        let mut databases = self.databases.lock().expect("lock poisoned");
        databases.retain(|dir, _| !dir.starts_with(bucket_dir));
    }
}
