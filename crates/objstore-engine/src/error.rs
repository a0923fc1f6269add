use std::path::PathBuf;

use objstore_crypto::ValidationError;
use objstore_meta::MetaError;
use objstore_types::{BucketName, ObjectId, ObjectRecord, TypeError};

/// Caller-visible class of a failure, for transport layers to translate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    BadRequest,
    Conflict,
    NotFound,
    ServerError,
}

/// Errors from bucket and object operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bucket name is syntactically invalid.
    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The configured storage root does not exist.
    #[error("storage root is missing: {}", .0.display())]
    StorageRootMissing(PathBuf),

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(BucketName),

    /// A step after the bucket directory was created failed. The bucket may
    /// be left partially constructed.
    #[error("bucket {name} could not be created: {reason}")]
    BucketCreation { name: BucketName, reason: String },

    #[error("bucket not found: {0}")]
    BucketNotFound(BucketName),

    #[error("bucket is not empty: {0}")]
    BucketNotEmpty(BucketName),

    /// An object operation named a bucket that does not exist.
    #[error("no such bucket: {0}")]
    InvalidBucketReference(String),

    /// The upload did not match what the caller declared.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An object with the same identity digest is already stored.
    #[error("object already exists: {object_id}")]
    ObjectAlreadyExists {
        object_id: ObjectId,
        existing: Box<ObjectRecord>,
    },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Metadata assignment with an unusable value.
    #[error("incorrect metadata: {0}")]
    MetadataType(String),

    /// The digest is too short to be placed in the shard tree.
    #[error("digest too short: expected more than {min} characters, got {actual}")]
    DigestTooShort { min: usize, actual: usize },

    /// The digest contains characters other than hex digits.
    #[error("invalid digest: {0:?}")]
    InvalidDigest(String),

    /// A stored object record cannot be decoded.
    #[error("corrupt metadata for object {object_id}: {source}")]
    CorruptRecord {
        object_id: ObjectId,
        #[source]
        source: TypeError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// The caller-visible category of this failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidName { .. }
            | Self::InvalidBucketReference(_)
            | Self::Validation(_)
            | Self::MetadataType(_)
            | Self::DigestTooShort { .. }
            | Self::InvalidDigest(_) => ErrorCategory::BadRequest,
            Self::BucketAlreadyExists(_)
            | Self::BucketNotEmpty(_)
            | Self::ObjectAlreadyExists { .. } => ErrorCategory::Conflict,
            Self::BucketNotFound(_) | Self::ObjectNotFound(_) => ErrorCategory::NotFound,
            Self::StorageRootMissing(_)
            | Self::BucketCreation { .. }
            | Self::CorruptRecord { .. }
            | Self::Config(_)
            | Self::Metadata(_)
            | Self::Io(_) => ErrorCategory::ServerError,
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidBucketName { name, reason } => Self::InvalidName { name, reason },
            TypeError::InvalidHex(digest) => Self::InvalidDigest(digest),
            other => Self::MetadataType(other.to_string()),
        }
    }
}

/// Result alias for engine operations.
pub type StoreResult<T> = Result<T, StoreError>;
