use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Bucket attribute that selects the identity basis.
pub const OBJECT_KEY_ATTRIBUTE: &str = "object-key";

/// Content-addressed identifier for an object inside a bucket.
///
/// An `ObjectId` is the lowercase hex digest of the object's bytes under the
/// bucket's [`IdentityBasis`]. Identical content in the same bucket always
/// produces the same `ObjectId`, which is what makes uploads deduplicatable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse a caller-supplied hex digest.
    ///
    /// Surrounding whitespace is ignored and upper-case digits are folded to
    /// lower case, so `"AB01"` and `"ab01"` name the same object.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidHex(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Wrap a digest already known to be lowercase hex, as produced by the
    /// content hasher.
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// The full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which digest serves as the canonical [`ObjectId`] for a bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IdentityBasis {
    /// `content-sha1` (the default).
    #[default]
    Sha1,
    /// `content-md5`, selected by `object-key = "content-md5"`.
    Md5,
}

impl IdentityBasis {
    /// Resolve the basis from a bucket's `object-key` attribute.
    ///
    /// Only the exact value `content-md5` selects md5; anything else,
    /// including an absent attribute, falls back to sha1.
    pub fn from_object_key(value: Option<&str>) -> Self {
        match value {
            Some("content-md5") => Self::Md5,
            _ => Self::Sha1,
        }
    }

    /// The record attribute holding this basis' digest.
    pub fn attribute_key(&self) -> &'static str {
        match self {
            Self::Sha1 => "content-sha1",
            Self::Md5 => "content-md5",
        }
    }
}

impl fmt::Display for IdentityBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_key())
    }
}
