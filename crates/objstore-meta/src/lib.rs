//! Metadata persistence for objstore.
//!
//! Every bucket owns two key-value namespaces: `bucket` (a single record with
//! the bucket's own metadata) and `objects` (one record per stored object,
//! keyed by object id). The engine talks to them only through the
//! [`MetadataStore`] trait and never assumes how they are backed.
//!
//! # Backends
//!
//! All backends implement [`MetadataBackend`]:
//!
//! - [`RedbBackend`] -- durable, one redb database per bucket, one table per
//!   namespace
//! - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. A write is durable and visible to later reads as soon as it returns.
//! 2. One shared handle per (bucket, namespace) inside a process.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod db;
pub mod error;
pub mod memory;
pub mod traits;

pub use error::{MetaError, MetaResult};
pub use db::{RedbBackend, RedbStore, METADATA_DIR, METADATA_FILE};
pub use memory::{InMemoryBackend, InMemoryMetadataStore};
pub use traits::{MetadataBackend, MetadataStore, Namespace, BUCKET_RECORD_KEY};
