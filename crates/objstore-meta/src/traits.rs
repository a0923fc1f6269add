use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use objstore_types::AttributeMap;

use crate::error::MetaResult;

/// The two metadata namespaces every bucket owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// One record, under [`BUCKET_RECORD_KEY`], holding the bucket's own metadata.
    Bucket,
    /// One record per stored object, keyed by object id.
    Objects,
}

/// Key of the single record in the [`Namespace::Bucket`] namespace.
pub const BUCKET_RECORD_KEY: &str = "bucket";

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Objects => "objects",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable mapping from string key to attribute map, for one namespace.
///
/// All implementations must satisfy these invariants:
/// - A write is durable and visible to every subsequent read in the same
///   process as soon as the call returns. No write buffering.
/// - Key order is unspecified.
/// - All I/O errors are propagated, never silently ignored.
pub trait MetadataStore: Send + Sync {
    /// Read a record. Returns `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> MetaResult<Option<AttributeMap>>;

    /// Replace the record stored under `key`.
    fn set(&self, key: &str, value: AttributeMap) -> MetaResult<()>;

    /// Merge `fields` into the record under `key`, creating it if absent.
    /// Returns the merged record.
    fn update(&self, key: &str, fields: AttributeMap) -> MetaResult<AttributeMap>;

    /// Remove a record. Returns `true` if the key existed.
    fn delete(&self, key: &str) -> MetaResult<bool>;

    /// All keys currently present.
    fn keys(&self) -> MetaResult<Vec<String>>;

    /// Snapshot of the whole namespace.
    fn as_map(&self) -> MetaResult<BTreeMap<String, AttributeMap>>;

    /// Check whether a record exists.
    fn contains(&self, key: &str) -> MetaResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Opens metadata namespaces for bucket directories.
///
/// Backends hand out one shared store per (bucket, namespace) so that every
/// view of a bucket in the process observes the same state.
pub trait MetadataBackend: Send + Sync {
    /// Open (or create) `namespace` for the bucket rooted at `bucket_dir`.
    fn open(&self, bucket_dir: &Path, namespace: Namespace) -> MetaResult<Arc<dyn MetadataStore>>;

    /// Forget every handle belonging to `bucket_dir`, after the bucket has
    /// been removed from disk.
    fn evict(&self, bucket_dir: &Path);
}
