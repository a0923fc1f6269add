use std::path::{Path, PathBuf};

use objstore_crypto::DEFAULT_BLOCK_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::layout::DEFAULT_SHARD_DEPTH;

/// Chunk size used when draining an upload into its temp file.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per bucket. Must already exist.
    pub storage_root: PathBuf,
    /// Number of two-character shard directories above each object file.
    pub shard_depth: usize,
    pub read_chunk_size: usize,
    pub hash_block_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("."),
            shard_depth: DEFAULT_SHARD_DEPTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            hash_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl StoreConfig {
    /// Default settings rooted at `storage_root`.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.storage_root, PathBuf::from("."));
        assert_eq!(c.shard_depth, 2);
        assert_eq!(c.read_chunk_size, 4096);
        assert_eq!(c.hash_block_size, 1024 * 1024);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = StoreConfig::from_toml_str(
            r#"
            storage_root = "/srv/objstore"
            shard_depth = 3
            "#,
        )
        .unwrap();
        assert_eq!(c.storage_root, PathBuf::from("/srv/objstore"));
        assert_eq!(c.shard_depth, 3);
        assert_eq!(c.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            StoreConfig::from_toml_str("shard_depth = \"two\""),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            StoreConfig::from_toml_file(Path::new("/definitely/not/here.toml")),
            Err(StoreError::Config(_))
        ));
    }
}
