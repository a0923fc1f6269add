use serde::{Deserialize, Serialize};

use crate::attributes::{AttrValue, AttributeMap};
use crate::error::TypeError;
use crate::object::IdentityBasis;

/// Attribute keys used in object records and declared headers.
pub mod keys {
    pub const CONTENT_NAME: &str = "content-name";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_MD5: &str = "content-md5";
    pub const CONTENT_SHA1: &str = "content-sha1";
    pub const CONTENT_SHA256: &str = "content-sha256";
    pub const CONTENT_TYPE: &str = "content-type";
}

/// The metadata record of a committed object.
///
/// Digests and length are always computed from the bytes actually received.
/// `extra` carries any other caller-supplied headers verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub content_name: Option<String>,
    pub content_length: u64,
    pub content_md5: String,
    pub content_sha1: String,
    pub content_sha256: String,
    pub content_type: Option<String>,
    pub extra: AttributeMap,
}

impl ObjectRecord {
    /// The digest that identifies this object under `basis`.
    pub fn digest(&self, basis: IdentityBasis) -> &str {
        match basis {
            IdentityBasis::Sha1 => &self.content_sha1,
            IdentityBasis::Md5 => &self.content_md5,
        }
    }

    /// Flatten into an attribute map. Named fields win over `extra` entries
    /// with the same key.
    pub fn to_attributes(&self) -> AttributeMap {
        let mut map = self.extra.clone();
        if let Some(name) = &self.content_name {
            map.insert(keys::CONTENT_NAME.into(), name.as_str().into());
        }
        map.insert(keys::CONTENT_LENGTH.into(), self.content_length.into());
        map.insert(keys::CONTENT_MD5.into(), self.content_md5.as_str().into());
        map.insert(keys::CONTENT_SHA1.into(), self.content_sha1.as_str().into());
        map.insert(
            keys::CONTENT_SHA256.into(),
            self.content_sha256.as_str().into(),
        );
        if let Some(content_type) = &self.content_type {
            map.insert(keys::CONTENT_TYPE.into(), content_type.as_str().into());
        }
        map
    }

    /// Rebuild a record from its attribute map.
    pub fn from_attributes(mut map: AttributeMap) -> Result<Self, TypeError> {
        let content_length = match map.remove(keys::CONTENT_LENGTH) {
            Some(AttrValue::Int(n)) if n >= 0 => n as u64,
            Some(_) => {
                return Err(TypeError::AttributeType {
                    key: keys::CONTENT_LENGTH,
                    expected: "non-negative integer",
                })
            }
            None => return Err(TypeError::MissingAttribute(keys::CONTENT_LENGTH)),
        };

        Ok(Self {
            content_name: take_optional_text(&mut map, keys::CONTENT_NAME)?,
            content_length,
            content_md5: take_text(&mut map, keys::CONTENT_MD5)?,
            content_sha1: take_text(&mut map, keys::CONTENT_SHA1)?,
            content_sha256: take_text(&mut map, keys::CONTENT_SHA256)?,
            content_type: take_optional_text(&mut map, keys::CONTENT_TYPE)?,
            extra: map,
        })
    }
}

fn take_text(map: &mut AttributeMap, key: &'static str) -> Result<String, TypeError> {
    take_optional_text(map, key)?.ok_or(TypeError::MissingAttribute(key))
}

fn take_optional_text(
    map: &mut AttributeMap,
    key: &'static str,
) -> Result<Option<String>, TypeError> {
    match map.remove(key) {
        Some(AttrValue::Text(s)) => Ok(Some(s)),
        Some(AttrValue::Int(_)) => Err(TypeError::AttributeType {
            key,
            expected: "string",
        }),
        None => Ok(None),
    }
}

/// What the caller declared about an upload.
///
/// `content_length`, `content_md5` and `content_sha1` are checked against
/// the received bytes. `content_type` and `content_name` are stored as given.
/// Every other header lands in `extra` and is stored without validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclaredHeaders {
    pub content_length: Option<u64>,
    pub content_md5: Option<String>,
    pub content_sha1: Option<String>,
    pub content_type: Option<String>,
    pub content_name: Option<String>,
    pub extra: AttributeMap,
}

impl DeclaredHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect declarations from request-style header pairs.
    ///
    /// Header names are matched case-insensitively and stored lower-cased.
    /// A `content-length` of zero or one that does not parse counts as not
    /// declared; empty recognized values are ignored.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut declared = Self::default();
        for (name, value) in headers {
            let name = name.as_ref().trim().to_ascii_lowercase();
            let value = value.as_ref();
            match name.as_str() {
                keys::CONTENT_LENGTH => {
                    declared.content_length =
                        value.trim().parse::<u64>().ok().filter(|n| *n > 0);
                }
                keys::CONTENT_MD5 => declared.content_md5 = non_empty(value),
                keys::CONTENT_SHA1 => declared.content_sha1 = non_empty(value),
                keys::CONTENT_TYPE => declared.content_type = non_empty(value),
                _ => {
                    declared.extra.insert(name, AttrValue::Text(value.to_string()));
                }
            }
        }
        declared
    }

    pub fn with_content_name(mut self, name: impl Into<String>) -> Self {
        self.content_name = Some(name.into());
        self
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn with_content_md5(mut self, digest: impl Into<String>) -> Self {
        self.content_md5 = Some(digest.into());
        self
    }

    pub fn with_content_sha1(mut self, digest: impl Into<String>) -> Self {
        self.content_sha1 = Some(digest.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
