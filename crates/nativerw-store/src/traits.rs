use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Document, Filter, IndexSpec, Sort, Value};
use crate::error::StoreResult;

/// What an upsert did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// A document storage engine.
///
/// All implementations must satisfy these invariants:
/// - Unique indexes created through `ensure_index` are enforced on every
///   write; a violating write fails with `StoreError::DuplicateKey`.
/// - `upsert` replaces the whole of the first document matching `filter`, or
///   inserts `document` if none matches.
/// - Lookups never report "no match" as an error: absence is `None`, `0`, or
///   an empty `Vec`.
/// - Safe for concurrent use from many tasks.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Round-trip to the engine.
    async fn ping(&self) -> StoreResult<()>;

    /// Create `index` on `collection` if it does not already exist.
    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()>;

    /// Replace the first document matching `filter`, or insert `document`.
    async fn upsert(&self, collection: &str, filter: &Filter, document: Document) -> StoreResult<UpsertOutcome>;

    /// The first matching document, in `sort` order if given.
    async fn find_one(&self, collection: &str, filter: &Filter, sort: Option<&Sort>) -> StoreResult<Option<Document>>;

    /// Project `field` out of every matching document. Documents lacking the
    /// field contribute `Value::Null`.
    async fn find_values(&self, collection: &str, filter: &Filter, field: &str) -> StoreResult<Vec<Value>>;

    /// Number of matching documents.
    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Remove the first matching document. Returns how many were removed.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Open a forward-only scan over `field` of every document in
    /// `collection`, delivered `batch_size` values at a time.
    async fn scan(&self, collection: &str, field: &str, batch_size: usize) -> StoreResult<Box<dyn DocumentCursor>>;
}

/// Batched, forward-only cursor returned by [`DocumentBackend::scan`].
#[async_trait]
pub trait DocumentCursor: Send {
    /// The next batch, or `None` once the scan is exhausted.
    async fn next_batch(&mut self) -> StoreResult<Option<Vec<Value>>>;
}

/// Establishes a handle to a backend.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> StoreResult<Arc<dyn DocumentBackend>>;

    /// Human-readable target, for logs.
    fn target(&self) -> String;
}
