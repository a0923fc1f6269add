//! Bucket name validation.
//!
//! Valid bucket names:
//! - Are trimmed of surrounding whitespace before checking
//! - Must be non-empty
//! - Contain only ASCII letters, digits, `.`, `_` and `-`
//! - Must not consist solely of dots (`.`, `..`), which would resolve
//!   outside the storage root

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A validated bucket name, safe to use as a single path component.
///
/// # Examples
///
/// ```
/// use objstore_types::BucketName;
///
/// assert!(BucketName::parse("photos-2024").is_ok());
/// assert_eq!(BucketName::parse("  b1 ").unwrap().as_str(), "b1");
/// assert!(BucketName::parse("bad#name").is_err());
/// assert!(BucketName::parse("..").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Validate and normalize a raw bucket name.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(invalid(raw, "bucket name must not be empty"));
        }

        if let Some(ch) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(invalid(raw, &format!("contains forbidden character: {ch:?}")));
        }

        if name.chars().all(|c| c == '.') {
            return Err(invalid(raw, "must not consist only of dots"));
        }

        Ok(Self(name.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn invalid(name: &str, reason: &str) -> TypeError {
    TypeError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Debug for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketName({})", self.0)
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BucketName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BucketName> for String {
    fn from(name: BucketName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_simple_names() {
        assert!(BucketName::parse("b1").is_ok());
        assert!(BucketName::parse("my-bucket").is_ok());
        assert!(BucketName::parse("My_Bucket.v2").is_ok());
        assert!(BucketName::parse(".hidden").is_ok());
    }

    #[test]
    fn trims_whitespace() {
        let name = BucketName::parse("\t media \n").unwrap();
        assert_eq!(name.as_str(), "media");
    }

    #[test]
    fn reject_empty_name() {
        assert!(BucketName::parse("").is_err());
        assert!(BucketName::parse("   ").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for raw in ["a#b", "a/b", "a\\b", "a b", "a:b", "ä", "a*"] {
            assert!(
                matches!(
                    BucketName::parse(raw),
                    Err(TypeError::InvalidBucketName { .. })
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn reject_dot_only_names() {
        assert!(BucketName::parse(".").is_err());
        assert!(BucketName::parse("..").is_err());
        assert!(BucketName::parse("...").is_err());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let name: BucketName = serde_json::from_str("\"b1\"").unwrap();
        assert_eq!(name.as_str(), "b1");
        assert!(serde_json::from_str::<BucketName>("\"b#1\"").is_err());
    }

    proptest! {
        #[test]
        fn accepts_allowed_alphabet(raw in "[A-Za-z0-9._-]{0,30}[A-Za-z0-9_-][A-Za-z0-9._-]{0,30}") {
            let name = BucketName::parse(&raw).unwrap();
            prop_assert_eq!(name.as_str(), raw.as_str());
        }

        #[test]
        fn rejects_any_other_character(
            prefix in "[a-z0-9]{0,8}",
            bad in "[^A-Za-z0-9._\\-\\s]",
            suffix in "[a-z0-9]{0,8}",
        ) {
            let raw = format!("{prefix}{bad}{suffix}");
            prop_assert!(BucketName::parse(&raw).is_err());
        }
    }
}
