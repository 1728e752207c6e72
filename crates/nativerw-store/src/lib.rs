//! Backend plumbing for the native store.
//!
//! This crate defines what a storage engine has to offer for the access layer
//! in `nativerw-db` to work, without tying that layer to a particular engine.
//! The model is deliberately document-shaped: a collection holds documents,
//! documents are field maps, and lookups are equality filters.
//!
//! # Pieces
//!
//! - [`Value`] / [`Document`]: the persisted field model
//! - [`Filter`], [`Sort`], [`IndexSpec`]: query and index descriptions
//! - [`DocumentBackend`]: the operations an engine must support
//! - [`DocumentCursor`]: batched, forward-only scans
//! - [`Dialer`]: establishes a backend handle
//! - [`CodecRegistry`]: content type → encode/decode strategy
//! - [`InMemoryBackend`] / [`InMemoryDialer`]: reference engine for tests and embedding
//!
//! # Rules every backend follows
//!
//! 1. Unique indexes are enforced by the backend, not by callers.
//! 2. `upsert` replaces the first document matching the filter or inserts.
//! 3. Scans are bounded by the collection's size when the scan was opened.
//! 4. Backends are `Send + Sync` and safe for concurrent operations.

pub mod codec;
pub mod document;
pub mod error;
pub mod memory;
pub mod traits;

pub use codec::{BinaryCodec, CodecRegistry, ContentCodec, JsonCodec};
pub use document::{Binary, BinarySubtype, Document, Filter, IndexSpec, Sort, SortDirection, Value};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryBackend, InMemoryDialer};
pub use traits::{Dialer, DocumentBackend, DocumentCursor, UpsertOutcome};
