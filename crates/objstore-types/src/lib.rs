//! Foundation types for objstore.
//!
//! This crate provides the identity and metadata types shared by every other
//! objstore crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (hex digest of the object bytes)
//! - [`IdentityBasis`] -- Which digest a bucket uses as its object identity
//! - [`BucketName`] -- Validated bucket name, safe as a path component
//! - [`AttrValue`] / [`AttributeMap`] -- Untyped metadata values
//! - [`ObjectRecord`] -- Typed metadata record of a committed object
//! - [`DeclaredHeaders`] -- Caller-declared expectations for an upload

pub mod attributes;
pub mod bucket;
pub mod error;
pub mod object;
pub mod record;

pub use attributes::{AttrValue, AttributeMap};
pub use bucket::BucketName;
pub use error::TypeError;
pub use object::{IdentityBasis, ObjectId, OBJECT_KEY_ATTRIBUTE};
pub use record::{keys, DeclaredHeaders, ObjectRecord};
