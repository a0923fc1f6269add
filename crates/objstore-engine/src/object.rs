use std::fs::{self, File};
use std::io::{self, Read, Write};

use objstore_crypto::{validate, ContentHasher, Expectations, ValidationError};
use objstore_types::{
    keys, AttrValue, AttributeMap, BucketName, DeclaredHeaders, IdentityBasis, ObjectId,
    ObjectRecord,
};
use tracing::{debug, info, warn};

use crate::bucket::{bucket_lock_key, Bucket};
use crate::error::{StoreError, StoreResult};

/// Prefix of in-flight upload files under a bucket's `tmp` directory.
pub const UPLOAD_PREFIX: &str = "upload-";

/// Object operations on one bucket, keyed by the bucket's identity basis.
///
/// Uploads are spooled to a temp file, hashed, validated, then renamed into
/// the shard tree. Nothing reaches `data/` or the objects namespace unless
/// every declared expectation held.
pub struct ObjectStore<'a> {
    bucket: &'a Bucket,
    basis: IdentityBasis,
    hasher: ContentHasher,
}

impl<'a> ObjectStore<'a> {
    pub fn new(bucket: &'a Bucket, basis: IdentityBasis) -> Self {
        Self {
            hasher: ContentHasher::new(bucket.config.hash_block_size),
            bucket,
            basis,
        }
    }

    pub fn basis(&self) -> IdentityBasis {
        self.basis
    }

    /// Store the bytes of `reader` as a new object.
    pub fn store<R: Read>(&self, mut reader: R, declared: DeclaredHeaders) -> StoreResult<ObjectRecord> {
        let bucket = self.bucket;
        let mut upload = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .tempfile_in(bucket.layout().tmp_dir())?;

        let received = spool(&mut reader, upload.as_file_mut(), bucket.config.read_chunk_size)?;
        if received == 0 {
            return Err(ValidationError::ZeroContentLength.into());
        }

        let digests = self.hasher.hash_file(upload.path())?;
        validate(&digests, &Expectations::from(&declared))?;

        let object_id = digests.object_id(self.basis);
        let target = bucket
            .layout()
            .object_path(object_id.as_str(), bucket.config.shard_depth)?;
        let mut extra = declared.extra;
        let record = ObjectRecord {
            content_name: declared
                .content_name
                .or_else(|| take_text(&mut extra, keys::CONTENT_NAME)),
            content_length: digests.length,
            content_md5: digests.md5,
            content_sha1: digests.sha1,
            content_sha256: digests.sha256,
            content_type: declared
                .content_type
                .or_else(|| take_text(&mut extra, keys::CONTENT_TYPE)),
            extra: without_reserved(extra),
        };

        with_object_lock(bucket, &object_id.clone(), || {
            if let Some(existing) = bucket.objects_meta.get(object_id.as_str())? {
                debug!(bucket = %bucket.name(), object = %object_id, "duplicate upload rejected");
                return Err(StoreError::ObjectAlreadyExists {
                    existing: Box::new(decode(&object_id, existing)?),
                    object_id,
                });
            }

            if let Some(shard) = target.parent() {
                fs::create_dir_all(shard)?;
            }
            upload.persist(&target).map_err(|e| StoreError::Io(e.error))?;
            bucket.objects_meta.set(object_id.as_str(), record.to_attributes())?;

            info!(
                bucket = %bucket.name(),
                object = %object_id,
                bytes = record.content_length,
                "object stored"
            );
            Ok(record)
        })
    }

    /// The stored record for `id`.
    pub fn head(&self, id: &ObjectId) -> StoreResult<ObjectRecord> {
        let attributes = self
            .bucket
            .objects_meta
            .get(id.as_str())?
            .ok_or_else(|| StoreError::ObjectNotFound(id.clone()))?;
        decode(id, attributes)
    }

    /// Open the object for reading, together with its record.
    pub fn get(&self, id: &ObjectId) -> StoreResult<(File, ObjectRecord)> {
        let record = self.head(id)?;
        let path = self.object_path(id)?;
        match File::open(&path) {
            Ok(file) => Ok((file, record)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    bucket = %self.bucket.name(),
                    object = %id,
                    path = %path.display(),
                    "metadata present but object file is missing"
                );
                Err(StoreError::ObjectNotFound(id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the object file and its record.
    ///
    /// A record whose file is already gone is still removed, and the call
    /// reports `ObjectNotFound`.
    pub fn delete(&self, id: &ObjectId) -> StoreResult<()> {
        let bucket = self.bucket;

        with_object_lock(bucket, id, || {
            if !bucket.objects_meta.contains(id.as_str())? {
                return Err(StoreError::ObjectNotFound(id.clone()));
            }
            let path = self.object_path(id)?;

            let file_missing = match fs::remove_file(&path) {
                Ok(()) => false,
                Err(e) if e.kind() == io::ErrorKind::NotFound => true,
                Err(e) => return Err(e.into()),
            };
            bucket.objects_meta.delete(id.as_str())?;

            if file_missing {
                warn!(bucket = %bucket.name(), object = %id, "deleted record of missing object file");
                return Err(StoreError::ObjectNotFound(id.clone()));
            }
            info!(bucket = %bucket.name(), object = %id, "object deleted");
            Ok(())
        })
    }

    pub fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.bucket.objects_meta.contains(id.as_str())?)
    }

    /// Ids of every stored object, unordered.
    pub fn list(&self) -> StoreResult<Vec<ObjectId>> {
        self.bucket.object_ids()
    }

    /// Every stored object with its record, ordered by id.
    pub fn records(&self) -> StoreResult<Vec<(ObjectId, ObjectRecord)>> {
        self.bucket
            .objects_meta
            .as_map()?
            .into_iter()
            .map(|(key, attributes)| -> StoreResult<_> {
                let id = ObjectId::from_digest(key);
                let record = decode(&id, attributes)?;
                Ok((id, record))
            })
            .collect()
    }

    fn object_path(&self, id: &ObjectId) -> StoreResult<std::path::PathBuf> {
        self.bucket
            .layout()
            .object_path(id.as_str(), self.bucket.config.shard_depth)
    }
}

impl std::fmt::Debug for ObjectStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("bucket", self.bucket.name())
            .field("basis", &self.basis)
            .finish()
    }
}

fn object_lock_key(bucket: &BucketName, id: &ObjectId) -> String {
    format!("{bucket}/{id}")
}

/// Run `f` holding the bucket lock shared and the object lock exclusively.
///
/// Bucket delete takes the bucket lock exclusively, so a commit never lands
/// in a bucket that is being removed, and never recreates one that is gone.
fn with_object_lock<T>(
    bucket: &Bucket,
    id: &ObjectId,
    f: impl FnOnce() -> StoreResult<T>,
) -> StoreResult<T> {
    let locks = &bucket.locks;
    locks.with_shared(&bucket_lock_key(bucket.name()), || {
        if !bucket.layout().bucket_dir().is_dir() {
            return Err(StoreError::InvalidBucketReference(bucket.name().to_string()));
        }
        locks.with(&object_lock_key(bucket.name(), id), f)
    })
}

fn take_text(extra: &mut AttributeMap, key: &str) -> Option<String> {
    match extra.remove(key)? {
        AttrValue::Text(s) => Some(s),
        AttrValue::Int(_) => None,
    }
}

/// Drop extension entries that would shadow record fields.
fn without_reserved(mut extra: AttributeMap) -> AttributeMap {
    for key in [
        keys::CONTENT_NAME,
        keys::CONTENT_LENGTH,
        keys::CONTENT_MD5,
        keys::CONTENT_SHA1,
        keys::CONTENT_SHA256,
        keys::CONTENT_TYPE,
    ] {
        extra.remove(key);
    }
    extra
}

fn decode(id: &ObjectId, attributes: AttributeMap) -> StoreResult<ObjectRecord> {
    ObjectRecord::from_attributes(attributes).map_err(|source| StoreError::CorruptRecord {
        object_id: id.clone(),
        source,
    })
}

/// Copy `reader` into `file` in `chunk_size` pieces and flush to disk.
fn spool<R: Read>(reader: &mut R, file: &mut File, chunk_size: usize) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
    file.sync_all()?;
    Ok(total)
}
