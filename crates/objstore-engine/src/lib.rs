//! Bucket-scoped, content-addressable object engine.
//!
//! Every object is stored once per bucket under the lowercase hex digest of
//! its content (sha1 by default, md5 when the bucket's `object-key`
//! attribute is `content-md5`). Uploads that match an existing digest are
//! rejected rather than overwritten.
//!
//! # Components
//!
//! - [`BucketManager`] -- bucket create / exists / delete / list
//! - [`Bucket`] -- one existing bucket and its metadata namespaces
//! - [`ObjectStore`] -- store / head / get / delete / list of objects
//! - [`layout`] -- pairtree placement of object files
//! - [`StoreConfig`] -- storage root and tuning knobs, loadable from TOML
//!
//! # Design Rules
//!
//! 1. A bucket exists iff its directory exists.
//! 2. Object bytes are spooled to `tmp/`, hashed and validated before they
//!    are renamed into `data/`. Failed uploads leave no trace.
//! 3. Dedup check, rename and metadata write for one identity run under a
//!    single in-process lock.
//! 4. Errors carry an [`ErrorCategory`] so transports can map them without
//!    matching every variant.

pub mod bucket;
pub mod config;
pub mod error;
pub mod layout;
pub mod lock;
pub mod object;

pub use bucket::{Bucket, BucketInfo, BucketManager, NAME_ATTRIBUTE};
pub use config::{StoreConfig, DEFAULT_READ_CHUNK_SIZE};
pub use error::{ErrorCategory, StoreError, StoreResult};
pub use layout::{pairtree_path, BucketLayout, DEFAULT_SHARD_DEPTH};
pub use lock::IdentityLocks;
pub use object::{ObjectStore, UPLOAD_PREFIX};
