use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use objstore_types::{IdentityBasis, ObjectId};
use sha1::{Digest, Sha1};
use sha2::Sha256;

/// Default read block for hashing passes (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

/// Digest algorithms computed for every object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
}

impl Algorithm {
    /// The record attribute / header carrying this digest.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::Md5 => "content-md5",
            Self::Sha1 => "content-sha1",
            Self::Sha256 => "content-sha256",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Lowercase hex digests of one payload, plus the number of bytes hashed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDigests {
    pub length: u64,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl ContentDigests {
    pub fn get(&self, algorithm: Algorithm) -> &str {
        match algorithm {
            Algorithm::Md5 => &self.md5,
            Algorithm::Sha1 => &self.sha1,
            Algorithm::Sha256 => &self.sha256,
        }
    }

    /// The object identity under `basis`.
    pub fn object_id(&self, basis: IdentityBasis) -> ObjectId {
        let digest = match basis {
            IdentityBasis::Sha1 => &self.sha1,
            IdentityBasis::Md5 => &self.md5,
        };
        ObjectId::from_digest(digest.clone())
    }
}

/// Running state of all three digests over the same byte stream.
struct MultiDigest {
    length: u64,
    md5: md5::Context,
    sha1: Sha1,
    sha256: Sha256,
}

impl MultiDigest {
    fn new() -> Self {
        Self {
            length: 0,
            md5: md5::Context::new(),
            sha1: Sha1::new(),
            sha256: Sha256::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.length += data.len() as u64;
        self.md5.consume(data);
        self.sha1.update(data);
        self.sha256.update(data);
    }

    fn finalize(self) -> ContentDigests {
        ContentDigests {
            length: self.length,
            md5: format!("{:x}", self.md5.compute()),
            sha1: hex::encode(self.sha1.finalize()),
            sha256: hex::encode(self.sha256.finalize()),
        }
    }
}

/// Streaming content hasher.
///
/// Reads its input in fixed-size blocks so memory use stays bounded no
/// matter how large the payload is. All three digests are fed from the same
/// block, which yields exactly what three separate passes would.
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    block_size: usize,
}

impl ContentHasher {
    /// Create a hasher reading `block_size` bytes at a time (at least 1).
    pub const fn new(block_size: usize) -> Self {
        let block_size = if block_size == 0 { 1 } else { block_size };
        Self { block_size }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Hash everything `reader` yields.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<ContentDigests> {
        let mut state = MultiDigest::new();
        let mut block = vec![0u8; self.block_size];
        loop {
            let n = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&block[..n]);
        }
        Ok(state.finalize())
    }

    /// Hash the file at `path`.
    pub fn hash_file(&self, path: &Path) -> io::Result<ContentDigests> {
        self.hash_reader(File::open(path)?)
    }

    /// Hash an in-memory buffer.
    pub fn hash_bytes(data: &[u8]) -> ContentDigests {
        let mut state = MultiDigest::new();
        state.update(data);
        state.finalize()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn known_digests_of_hello() {
        let d = ContentHasher::hash_bytes(b"hello");
        assert_eq!(d.length, 5);
        assert_eq!(d.md5, HELLO_MD5);
        assert_eq!(d.sha1, HELLO_SHA1);
        assert_eq!(d.sha256, HELLO_SHA256);
    }

    #[test]
    fn known_digests_of_empty_input() {
        let d = ContentHasher::default().hash_reader(&b""[..]).unwrap();
        assert_eq!(d.length, 0);
        assert_eq!(d.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(d.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            d.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn block_size_does_not_change_digests() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reference = ContentHasher::hash_bytes(&payload);
        for block_size in [1, 3, 64, 4096, DEFAULT_BLOCK_SIZE] {
            let d = ContentHasher::new(block_size)
                .hash_reader(payload.as_slice())
                .unwrap();
            assert_eq!(d, reference, "block size {block_size}");
        }
    }

    #[test]
    fn combined_pass_matches_separate_passes() {
        let payload = b"the quick brown fox jumps over the lazy dog";
        let d = ContentHasher::hash_bytes(payload);
        assert_eq!(d.md5, format!("{:x}", md5::compute(payload)));
        assert_eq!(d.sha1, hex::encode(Sha1::digest(payload)));
        assert_eq!(d.sha256, hex::encode(Sha256::digest(payload)));
    }

    #[test]
    fn hash_file_streams_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();
        let d = ContentHasher::new(2).hash_file(file.path()).unwrap();
        assert_eq!(d.sha1, HELLO_SHA1);
        assert_eq!(d.length, 5);
    }

    #[test]
    fn zero_block_size_is_clamped() {
        assert_eq!(ContentHasher::new(0).block_size(), 1);
    }

    #[test]
    fn object_id_follows_basis() {
        let d = ContentHasher::hash_bytes(b"hello");
        assert_eq!(d.object_id(IdentityBasis::Sha1).as_str(), HELLO_SHA1);
        assert_eq!(d.object_id(IdentityBasis::Md5).as_str(), HELLO_MD5);
        assert_eq!(d.get(Algorithm::Sha256), HELLO_SHA256);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(Algorithm::Md5.to_string(), "md5");
        assert_eq!(Algorithm::Sha1.header_name(), "content-sha1");
    }
}
