use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use objstore_meta::{
    MetadataBackend, MetadataStore, Namespace, RedbBackend, BUCKET_RECORD_KEY,
};
use objstore_types::{
    AttrValue, AttributeMap, BucketName, IdentityBasis, ObjectId, OBJECT_KEY_ATTRIBUTE,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout::BucketLayout;
use crate::lock::IdentityLocks;
use crate::object::ObjectStore;

/// Attribute every bucket record carries.
pub const NAME_ATTRIBUTE: &str = "name";

/// A bucket's name and metadata, as returned by create and list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: BucketName,
    pub attributes: AttributeMap,
}

impl BucketInfo {
    fn new(name: BucketName, mut attributes: AttributeMap) -> Self {
        attributes.insert(NAME_ATTRIBUTE.into(), name.as_str().into());
        Self { name, attributes }
    }

    /// The identity basis selected by the `object-key` attribute.
    pub fn identity_basis(&self) -> IdentityBasis {
        IdentityBasis::from_object_key(
            self.attributes
                .get(OBJECT_KEY_ATTRIBUTE)
                .and_then(AttrValue::as_str),
        )
    }
}

/// Owns bucket existence, creation, deletion and listing under one storage
/// root.
///
/// A bucket exists iff its directory exists. Create and delete on the same
/// name are serialized in-process; bucket directory creation is exclusive,
/// so two creators can never both succeed.
pub struct BucketManager {
    config: StoreConfig,
    backend: Arc<dyn MetadataBackend>,
    locks: Arc<IdentityLocks>,
}

impl BucketManager {
    /// Open the storage root described by `config`.
    pub fn open(config: StoreConfig, backend: Arc<dyn MetadataBackend>) -> StoreResult<Self> {
        if !config.storage_root.is_dir() {
            return Err(StoreError::StorageRootMissing(config.storage_root.clone()));
        }
        debug!(root = %config.storage_root.display(), "bucket manager opened");
        Ok(Self {
            config,
            backend,
            locks: Arc::new(IdentityLocks::new()),
        })
    }

    /// Open with durable redb metadata, one database per bucket.
    pub fn open_persistent(config: StoreConfig) -> StoreResult<Self> {
        Self::open(config, Arc::new(RedbBackend::new()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn layout(&self, name: &BucketName) -> BucketLayout {
        BucketLayout::new(&self.config.storage_root, name)
    }

    /// Create a bucket with initial metadata. `name` is always recorded.
    pub fn create(&self, name: &str, metadata: AttributeMap) -> StoreResult<BucketInfo> {
        let name = BucketName::parse(name)?;
        let layout = self.layout(&name);

        self.locks.with(&bucket_lock_key(&name), || -> StoreResult<BucketInfo> {
            match fs::create_dir(layout.bucket_dir()) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(StoreError::BucketAlreadyExists(name.clone()));
                }
                Err(e) => return Err(creation_error(&name, e)),
            }

            for dir in [layout.data_dir(), layout.tmp_dir()] {
                fs::create_dir(&dir).map_err(|e| creation_error(&name, e))?;
            }

            let info = BucketInfo::new(name.clone(), metadata);
            self.backend
                .open(layout.bucket_dir(), Namespace::Bucket)
                .and_then(|store| store.set(BUCKET_RECORD_KEY, info.attributes.clone()))
                .map_err(|e| creation_error(&name, e))?;

            info!(bucket = %name, path = %layout.bucket_dir().display(), "bucket created");
            Ok(info)
        })
    }

    /// Whether the bucket directory exists. Invalid names never exist.
    pub fn exists(&self, name: &str) -> bool {
        BucketName::parse(name)
            .map(|name| self.layout(&name).bucket_dir().is_dir())
            .unwrap_or(false)
    }

    /// Remove an empty bucket, its directory tree and its metadata.
    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let name = BucketName::parse(name)?;
        let layout = self.layout(&name);

        self.locks.with(&bucket_lock_key(&name), || -> StoreResult<()> {
            if !layout.bucket_dir().is_dir() {
                return Err(StoreError::BucketNotFound(name.clone()));
            }
            if holds_any_file(&layout.data_dir())? {
                return Err(StoreError::BucketNotEmpty(name.clone()));
            }

            self.backend.evict(layout.bucket_dir());
            fs::remove_dir_all(layout.bucket_dir())?;
            info!(bucket = %name, "bucket deleted");
            Ok(())
        })
    }

    /// One entry per bucket directory under the storage root, in directory
    /// enumeration order.
    pub fn list(&self) -> StoreResult<Vec<BucketInfo>> {
        let mut buckets = Vec::new();
        for entry in fs::read_dir(&self.config.storage_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let raw = entry.file_name();
            let name = match raw.to_str().map(BucketName::parse) {
                Some(Ok(name)) if name.as_str() == raw.to_str().unwrap_or_default() => name,
                _ => {
                    warn!(entry = ?raw, "skipping directory that is not a valid bucket name");
                    continue;
                }
            };
            let info = self
                .open_bucket(name.as_str())
                .and_then(|bucket| bucket.info())
                .unwrap_or_else(|e| {
                    warn!(bucket = %name, error = %e, "unreadable bucket metadata");
                    BucketInfo::new(name.clone(), AttributeMap::new())
                });
            buckets.push(info);
        }
        Ok(buckets)
    }

    /// Resolve an existing bucket for object operations.
    pub fn open_bucket(&self, name: &str) -> StoreResult<Bucket> {
        let name = BucketName::parse(name)?;
        let layout = self.layout(&name);
        if !layout.bucket_dir().is_dir() {
            return Err(StoreError::InvalidBucketReference(name.to_string()));
        }

        Ok(Bucket {
            bucket_meta: self.backend.open(layout.bucket_dir(), Namespace::Bucket)?,
            objects_meta: self.backend.open(layout.bucket_dir(), Namespace::Objects)?,
            name,
            layout,
            config: self.config.clone(),
            locks: Arc::clone(&self.locks),
        })
    }

    /// Merge `metadata` into an existing bucket's record.
    pub fn set_metadata(&self, name: &str, metadata: AttributeMap) -> StoreResult<BucketInfo> {
        let bucket = self.open_bucket(name)?;
        bucket.set_metadata(metadata)?;
        bucket.info()
    }
}

impl std::fmt::Debug for BucketManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketManager")
            .field("storage_root", &self.config.storage_root)
            .finish()
    }
}

pub(crate) fn bucket_lock_key(name: &BucketName) -> String {
    format!("bucket:{name}")
}

fn creation_error(name: &BucketName, err: impl std::fmt::Display) -> StoreError {
    StoreError::BucketCreation {
        name: name.clone(),
        reason: err.to_string(),
    }
}

/// Whether anything other than directories lives below `dir`.
fn holds_any_file(dir: &Path) -> StoreResult<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// An existing bucket, resolved for one request.
///
/// Holds the bucket's metadata namespaces; object operations go through
/// [`Bucket::objects`].
pub struct Bucket {
    name: BucketName,
    layout: BucketLayout,
    pub(crate) config: StoreConfig,
    bucket_meta: Arc<dyn MetadataStore>,
    pub(crate) objects_meta: Arc<dyn MetadataStore>,
    pub(crate) locks: Arc<IdentityLocks>,
}

impl Bucket {
    pub fn name(&self) -> &BucketName {
        &self.name
    }

    pub fn layout(&self) -> &BucketLayout {
        &self.layout
    }

    /// The bucket's metadata record; always includes `name`.
    pub fn metadata(&self) -> StoreResult<AttributeMap> {
        Ok(self.info()?.attributes)
    }

    pub fn info(&self) -> StoreResult<BucketInfo> {
        let attributes = self.bucket_meta.get(BUCKET_RECORD_KEY)?.unwrap_or_default();
        Ok(BucketInfo::new(self.name.clone(), attributes))
    }

    /// Merge `metadata` into the bucket record. The `name` attribute is
    /// fixed and cannot be overwritten.
    pub fn set_metadata(&self, mut metadata: AttributeMap) -> StoreResult<AttributeMap> {
        if metadata.is_empty() {
            return Err(StoreError::MetadataType(
                "bucket metadata must be a non-empty map".into(),
            ));
        }
        metadata.insert(NAME_ATTRIBUTE.into(), self.name.as_str().into());
        let merged = self.bucket_meta.update(BUCKET_RECORD_KEY, metadata)?;
        debug!(bucket = %self.name, keys = merged.len(), "bucket metadata updated");
        Ok(merged)
    }

    /// The identity basis this bucket's objects are keyed by.
    pub fn identity_basis(&self) -> StoreResult<IdentityBasis> {
        Ok(self.info()?.identity_basis())
    }

    /// An object store bound to this bucket and its identity basis.
    pub fn objects(&self) -> StoreResult<ObjectStore<'_>> {
        Ok(ObjectStore::new(self, self.identity_basis()?))
    }

    /// Ids of every object registered in the bucket, unordered.
    pub fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        Ok(self
            .objects_meta
            .keys()?
            .into_iter()
            .map(ObjectId::from_digest)
            .collect())
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("dir", &self.layout.bucket_dir())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_meta::InMemoryBackend;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> BucketManager {
        BucketManager::open_persistent(StoreConfig::new(dir.path())).unwrap()
    }

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
            .collect()
    }

    #[test]
    fn open_requires_existing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            BucketManager::open_persistent(StoreConfig::new(&missing)),
            Err(StoreError::StorageRootMissing(_))
        ));
    }

    #[test]
    fn create_builds_layout_and_records_name() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);

        let info = buckets.create("b1", attrs(&[("owner", "ops")])).unwrap();
        assert_eq!(info.name.as_str(), "b1");
        assert_eq!(info.attributes.get("name"), Some(&AttrValue::from("b1")));
        assert_eq!(info.attributes.get("owner"), Some(&AttrValue::from("ops")));

        assert!(dir.path().join("b1").join("data").is_dir());
        assert!(dir.path().join("b1").join("tmp").is_dir());
        assert!(buckets.exists("b1"));
    }

    #[test]
    fn create_trims_name() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        let info = buckets.create("  spaced  ", AttributeMap::new()).unwrap();
        assert_eq!(info.name.as_str(), "spaced");
        assert!(dir.path().join("spaced").is_dir());
    }

    #[test]
    fn create_rejects_invalid_name() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        assert!(matches!(
            buckets.create("bad#name", AttributeMap::new()),
            Err(StoreError::InvalidName { .. })
        ));
        assert!(matches!(
            buckets.create("..", AttributeMap::new()),
            Err(StoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn create_twice_conflicts() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("b1", AttributeMap::new()).unwrap();
        assert!(matches!(
            buckets.create("b1", AttributeMap::new()),
            Err(StoreError::BucketAlreadyExists(_))
        ));
    }

    #[test]
    fn caller_cannot_override_name() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        let info = buckets.create("b1", attrs(&[("name", "other")])).unwrap();
        assert_eq!(info.attributes.get("name"), Some(&AttrValue::from("b1")));
    }

    #[test]
    fn exists_is_a_directory_check() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        assert!(!buckets.exists("b1"));
        fs::create_dir(dir.path().join("b1")).unwrap();
        assert!(buckets.exists("b1"));
        assert!(!buckets.exists("b#1"));
    }

    #[test]
    fn delete_missing_bucket() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        assert!(matches!(
            buckets.delete("ghost"),
            Err(StoreError::BucketNotFound(_))
        ));
    }

    #[test]
    fn delete_refuses_nested_data() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("b1", AttributeMap::new()).unwrap();
        let shard = dir.path().join("b1/data/aa/bb");
        fs::create_dir_all(&shard).unwrap();
        fs::write(shard.join("aabbcc"), b"x").unwrap();

        assert!(matches!(
            buckets.delete("b1"),
            Err(StoreError::BucketNotEmpty(_))
        ));
        assert!(buckets.exists("b1"));
    }

    #[test]
    fn delete_ignores_empty_shard_directories() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("b1", AttributeMap::new()).unwrap();
        fs::create_dir_all(dir.path().join("b1/data/aa/bb")).unwrap();

        buckets.delete("b1").unwrap();
        assert!(!buckets.exists("b1"));
        assert!(!dir.path().join("b1").exists());
    }

    #[test]
    fn recreate_after_delete_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("b1", attrs(&[("color", "red")])).unwrap();
        buckets.delete("b1").unwrap();

        let info = buckets.create("b1", AttributeMap::new()).unwrap();
        assert!(info.attributes.get("color").is_none());
    }

    #[test]
    fn list_returns_every_bucket() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("alpha", attrs(&[("tier", "hot")])).unwrap();
        buckets.create("beta", AttributeMap::new()).unwrap();
        fs::write(dir.path().join("stray-file"), b"").unwrap();
        fs::create_dir(dir.path().join("not#bucket")).unwrap();

        let mut listed = buckets.list().unwrap();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<&str> = listed.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(listed[0].attributes.get("tier"), Some(&AttrValue::from("hot")));
    }

    #[test]
    fn list_reports_partial_bucket_by_name() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        fs::create_dir(dir.path().join("partial")).unwrap();
        let listed = buckets.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].attributes,
            attrs(&[("name", "partial")])
        );
    }

    #[test]
    fn open_bucket_requires_existing_bucket() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        assert!(matches!(
            buckets.open_bucket("ghost"),
            Err(StoreError::InvalidBucketReference(_))
        ));
    }

    #[test]
    fn set_metadata_merges() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("b1", attrs(&[("a", "1")])).unwrap();

        let bucket = buckets.open_bucket("b1").unwrap();
        let merged = bucket.set_metadata(attrs(&[("b", "2")])).unwrap();
        assert_eq!(merged, attrs(&[("a", "1"), ("b", "2"), ("name", "b1")]));
        assert_eq!(bucket.metadata().unwrap(), merged);
    }

    #[test]
    fn set_metadata_rejects_empty_map() {
        let dir = TempDir::new().unwrap();
        let buckets = manager(&dir);
        buckets.create("b1", AttributeMap::new()).unwrap();
        assert!(matches!(
            buckets.set_metadata("b1", AttributeMap::new()),
            Err(StoreError::MetadataType(_))
        ));
    }

    #[test]
    fn metadata_survives_a_new_manager() {
        let dir = TempDir::new().unwrap();
        manager(&dir)
            .create("b1", attrs(&[("object-key", "content-md5")]))
            .unwrap();

        let bucket = manager(&dir).open_bucket("b1").unwrap();
        assert_eq!(bucket.identity_basis().unwrap(), IdentityBasis::Md5);
    }

    #[test]
    fn identity_basis_defaults_to_sha1() {
        let dir = TempDir::new().unwrap();
        let buckets = BucketManager::open(
            StoreConfig::new(dir.path()),
            Arc::new(InMemoryBackend::new()),
        )
        .unwrap();
        buckets.create("b1", AttributeMap::new()).unwrap();
        let bucket = buckets.open_bucket("b1").unwrap();
        assert_eq!(bucket.identity_basis().unwrap(), IdentityBasis::Sha1);
        assert!(bucket.object_ids().unwrap().is_empty());
    }
}
