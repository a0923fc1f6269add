//! Checks a received payload against what the caller declared.
//!
//! Checks run in a fixed order and stop at the first failure:
//! zero length, declared length, md5, sha1.

use objstore_types::DeclaredHeaders;

use crate::hasher::{Algorithm, ContentDigests};

/// Errors from upload validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The payload was empty.
    #[error("content length is zero")]
    ZeroContentLength,

    /// The payload size differs from the declared `content-length`.
    #[error("content length mismatch: declared {declared}, received {actual}")]
    BadContentLength { declared: u64, actual: u64 },

    /// A declared digest differs from the computed one.
    #[error("{algorithm} digest mismatch: declared {declared}, computed {computed}")]
    BadDigest {
        algorithm: Algorithm,
        declared: String,
        computed: String,
    },
}

/// Caller-declared properties an upload must satisfy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expectations {
    pub length: Option<u64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

impl From<&DeclaredHeaders> for Expectations {
    fn from(declared: &DeclaredHeaders) -> Self {
        Self {
            length: declared.content_length,
            md5: declared.content_md5.clone(),
            sha1: declared.content_sha1.clone(),
        }
    }
}

/// Validate computed digests against the expectations.
///
/// Declared digests match case-insensitively, ignoring surrounding whitespace.
pub fn validate(digests: &ContentDigests, expected: &Expectations) -> Result<(), ValidationError> {
    if digests.length == 0 {
        return Err(ValidationError::ZeroContentLength);
    }

    if let Some(declared) = expected.length {
        if declared != digests.length {
            return Err(ValidationError::BadContentLength {
                declared,
                actual: digests.length,
            });
        }
    }

    check_digest(Algorithm::Md5, expected.md5.as_deref(), digests)?;
    check_digest(Algorithm::Sha1, expected.sha1.as_deref(), digests)?;
    Ok(())
}

fn check_digest(
    algorithm: Algorithm,
    declared: Option<&str>,
    digests: &ContentDigests,
) -> Result<(), ValidationError> {
    let Some(declared) = declared else {
        return Ok(());
    };
    let computed = digests.get(algorithm);
    if declared.trim().eq_ignore_ascii_case(computed) {
        Ok(())
    } else {
        Err(ValidationError::BadDigest {
            algorithm,
            declared: declared.to_string(),
            computed: computed.to_string(),
        })
    }
}
