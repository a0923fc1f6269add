//! On-disk placement of buckets and objects.
//!
//! ```text
//! <storage_root>/<bucket>/
//! ├── data/<d[0..2]>/<d[2..4]>/<digest>   committed object bytes
//! ├── tmp/upload-XXXXXX                   in-flight uploads
//! └── metadata/metadata.redb              bucket and objects tables
//! ```

use std::path::{Path, PathBuf};

use objstore_types::BucketName;

use crate::error::{StoreError, StoreResult};

pub const DATA_DIR: &str = "data";
pub const TMP_DIR: &str = "tmp";
pub const DEFAULT_SHARD_DEPTH: usize = 2;

/// Map a hex digest to its sharded relative path.
///
/// The first `2 * shard_depth` characters become `shard_depth` two-character
/// directories, and the full digest is the file name. Fails if the digest is
/// not longer than `2 * shard_depth`.
///
/// ```
/// use objstore_engine::layout::pairtree_path;
/// use std::path::Path;
///
/// let path = pairtree_path("fa0ec35541f4f17a68e3d03acd04146f39ae5d2e", 2).unwrap();
/// assert_eq!(path, Path::new("fa/0e/fa0ec35541f4f17a68e3d03acd04146f39ae5d2e"));
/// ```
pub fn pairtree_path(digest: &str, shard_depth: usize) -> StoreResult<PathBuf> {
    let prefix = 2 * shard_depth;
    if digest.len() <= prefix {
        return Err(StoreError::DigestTooShort {
            min: prefix + 1,
            actual: digest.len(),
        });
    }
    if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StoreError::InvalidDigest(digest.to_string()));
    }

    let mut path = PathBuf::new();
    for i in 0..shard_depth {
        path.push(&digest[2 * i..2 * i + 2]);
    }
    path.push(digest);
    Ok(path)
}

/// Paths of one bucket under the storage root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketLayout {
    dir: PathBuf,
}

impl BucketLayout {
    pub fn new(storage_root: &Path, name: &BucketName) -> Self {
        Self {
            dir: storage_root.join(name.as_str()),
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.join(DATA_DIR)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.dir.join(TMP_DIR)
    }

    /// Absolute path of the object file for `digest`.
    pub fn object_path(&self, digest: &str, shard_depth: usize) -> StoreResult<PathBuf> {
        Ok(self.data_dir().join(pairtree_path(digest, shard_depth)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sha1_digest_default_depth() {
        let path = pairtree_path("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d", 2).unwrap();
        assert_eq!(
            path,
            Path::new("aa/f4/aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d")
        );
    }

    #[test]
    fn depth_zero_is_flat() {
        assert_eq!(pairtree_path("ab", 0).unwrap(), Path::new("ab"));
    }

    #[test]
    fn too_short_digest_fails() {
        assert!(matches!(
            pairtree_path("abcd", 2),
            Err(StoreError::DigestTooShort { min: 5, actual: 4 })
        ));
        assert!(pairtree_path("", 1).is_err());
        assert!(pairtree_path("abcde", 2).is_ok());
    }

    #[test]
    fn non_hex_digest_fails() {
        assert!(matches!(
            pairtree_path("../../etc/passwd", 2),
            Err(StoreError::InvalidDigest(_))
        ));
    }

    #[test]
    fn layout_paths() {
        let name = BucketName::parse("b1").unwrap();
        let layout = BucketLayout::new(Path::new("/srv"), &name);
        assert_eq!(layout.bucket_dir(), Path::new("/srv/b1"));
        assert_eq!(layout.data_dir(), Path::new("/srv/b1/data"));
        assert_eq!(layout.tmp_dir(), Path::new("/srv/b1/tmp"));
        assert_eq!(
            layout.object_path("5d41402abc4b2a76b9719d911017c592", 2).unwrap(),
            Path::new("/srv/b1/data/5d/41/5d41402abc4b2a76b9719d911017c592")
        );
    }

    proptest! {
        #[test]
        fn shards_then_digest(digest in "[0-9a-f]{1,64}", depth in 0usize..5) {
            let result = pairtree_path(&digest, depth);
            if digest.len() <= 2 * depth {
                prop_assert!(result.is_err());
            } else {
                let path = result.unwrap();
                let parts: Vec<String> = path
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                prop_assert_eq!(parts.len(), depth + 1);
                for (i, part) in parts[..depth].iter().enumerate() {
                    prop_assert_eq!(part.as_str(), &digest[2 * i..2 * i + 2]);
                }
                prop_assert_eq!(parts[depth].as_str(), digest.as_str());
            }
        }
    }
}
