use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A metadata value: either an integer or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Text(String),
}

impl AttrValue {
    /// Parse a raw string, preferring an integer reading when it fits.
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(raw.to_string()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for AttrValue {
    fn from(n: u64) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Arbitrary string-keyed metadata, ordered by key.
pub type AttributeMap = BTreeMap<String, AttrValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(AttrValue::parse("42"), AttrValue::Int(42));
        assert_eq!(AttrValue::parse("-7"), AttrValue::Int(-7));
        assert_eq!(AttrValue::parse("4.2"), AttrValue::Text("4.2".into()));
        assert_eq!(AttrValue::parse("abc"), AttrValue::Text("abc".into()));
    }

    #[test]
    fn untagged_json_shape() {
        let mut map = AttributeMap::new();
        map.insert("name".into(), "b1".into());
        map.insert("quota".into(), AttrValue::Int(10));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"name":"b1","quota":10}"#);
        let parsed: AttributeMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn accessors() {
        assert_eq!(AttrValue::from("x").as_str(), Some("x"));
        assert_eq!(AttrValue::from("x").as_int(), None);
        assert_eq!(AttrValue::from(5u64).as_int(), Some(5));
        assert_eq!(AttrValue::from(u64::MAX).as_int(), Some(i64::MAX));
        assert_eq!(AttrValue::Int(3).to_string(), "3");
    }
}
