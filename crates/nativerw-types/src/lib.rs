//! Foundation types for the native store.
//!
//! A native store keeps raw, untransformed documents ("native content") keyed
//! by a resource identifier and a revision, partitioned into a fixed set of
//! named collections. Every other `nativerw` crate depends on this one.
//!
//! # Key Types
//!
//! - [`ResourceId`]: UUID identifier addressing a resource across all revisions
//! - [`Revision`]: signed 64-bit revision marker; the largest is the latest
//! - [`MediaType`]: parsed `Content-Type`, directives stripped
//! - [`Content`]: tagged payload: decoded JSON or raw bytes
//! - [`Resource`]: the persisted unit
//! - [`CollectionSet`]: the allow-list of collection names

pub mod collection;
pub mod content;
pub mod error;
pub mod identifier;
pub mod media;
pub mod resource;
pub mod revision;

pub use collection::CollectionSet;
pub use content::Content;
pub use error::TypeError;
pub use identifier::ResourceId;
pub use media::MediaType;
pub use resource::Resource;
pub use revision::Revision;
