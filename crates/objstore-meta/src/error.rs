use std::path::PathBuf;

/// Errors from metadata store operations.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted record cannot be decoded.
    #[error("corrupt metadata record {key:?} in {}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        key: String,
        reason: String,
    },

    #[error("metadata database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("metadata storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("metadata table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("metadata transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),

    #[error("metadata commit error: {0}")]
    Commit(#[from] redb::CommitError),
}

impl From<redb::TransactionError> for MetaError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

/// Result alias for metadata operations.
pub type MetaResult<T> = Result<T, MetaError>;
