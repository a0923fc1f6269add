use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("missing attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("attribute {key} has the wrong type: expected {expected}")]
    AttributeType {
        key: &'static str,
        expected: &'static str,
    },
}
