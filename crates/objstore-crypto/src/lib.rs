//! Content hashing and upload validation for objstore.
//!
//! Provides a streaming hasher that computes md5, sha1 and sha256 in one
//! bounded-memory pass, and the validator that checks those digests against
//! what an uploader declared.
//!
//! All digest operations wrap established libraries; there is no custom
//! cryptography.

pub mod hasher;
pub mod validate;

pub use hasher::{Algorithm, ContentDigests, ContentHasher, DEFAULT_BLOCK_SIZE};
pub use validate::{validate, Expectations, ValidationError};
