use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use nativerw_store::{CodecRegistry, DocumentBackend, Sort, StoreResult, UpsertOutcome};
use nativerw_types::{CollectionSet, Resource, ResourceId, Revision};

use crate::config::ConnectionSettings;
use crate::error::{DbError, DbResult};
use crate::ids::{CancelToken, IdStream};
use crate::layout;

/// What [`Connection::write_if_absent`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The `(identifier, revision)` key was already stored; nothing written.
    SkippedExistingRevision,
}

/// A live handle to the native store.
///
/// Cheap to clone; every clone shares the same backend handle, allow-list,
/// codec registry and settings. All collection-scoped operations reject
/// collections outside the allow-list and malformed identifiers before the
/// backend is touched. Every backend call is bounded by a timeout; a
/// [`DbError::Timeout`] means the outcome is unknown.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn DocumentBackend>,
    collections: CollectionSet,
    codecs: CodecRegistry,
    settings: ConnectionSettings,
}

impl Connection {
    /// Wrap `backend` with the default codec registry.
    pub fn new(backend: Arc<dyn DocumentBackend>, collections: CollectionSet, settings: ConnectionSettings) -> Self {
        Self::with_codecs(backend, collections, CodecRegistry::default(), settings)
    }

    /// Wrap `backend` with a caller-supplied codec registry.
    pub fn with_codecs(
        backend: Arc<dyn DocumentBackend>,
        collections: CollectionSet,
        codecs: CodecRegistry,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                collections,
                codecs,
                settings,
            }),
        }
    }

    /// Collections this connection accepts.
    pub fn supported_collections(&self) -> &CollectionSet {
        &self.inner.collections
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.inner.codecs
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.inner.settings
    }

    /// Whether `self` and `other` share one underlying handle.
    pub fn same_handle(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Round-trip to the backend, bounded by the operation timeout.
    pub async fn ping(&self) -> DbResult<()> {
        self.op("ping", self.inner.backend.ping()).await
    }

    /// Upsert `resource` under its `(identifier, revision)` key.
    pub async fn write(&self, collection: &str, resource: &Resource) -> DbResult<()> {
        self.check_collection(collection)?;
        self.write_unchecked(collection, resource).await
    }

    /// Write `resource` unless its `(identifier, revision)` key is already
    /// stored.
    ///
    /// The check and the write are separate backend calls; two concurrent
    /// callers can both see the key absent and both write. The unique index
    /// and upsert semantics keep that harmless.
    pub async fn write_if_absent(&self, collection: &str, resource: &Resource) -> DbResult<WriteOutcome> {
        self.check_collection(collection)?;
        let filter = layout::key_filter(&resource.identifier, resource.revision);
        let existing = self.op("count", self.inner.backend.count(collection, &filter)).await?;
        if existing > 0 {
            info!(
                collection,
                identifier = %resource.identifier,
                revision = %resource.revision,
                "revision already stored, skipping write"
            );
            return Ok(WriteOutcome::SkippedExistingRevision);
        }
        self.write_unchecked(collection, resource).await?;
        Ok(WriteOutcome::Written)
    }

    /// The highest stored revision of `id`, or `None`.
    pub async fn read(&self, collection: &str, id: &str) -> DbResult<Option<Resource>> {
        self.check_collection(collection)?;
        let id = ResourceId::parse(id)?;
        self.read_unchecked(collection, &id).await
    }

    /// The stored resource at exactly `revision`, if any.
    pub async fn read_single_revision(
        &self,
        collection: &str,
        id: &str,
        revision: Revision,
    ) -> DbResult<Option<Resource>> {
        self.check_collection(collection)?;
        let id = ResourceId::parse(id)?;
        let filter = layout::key_filter(&id, revision);
        let found = self
            .op("read_single_revision", self.inner.backend.find_one(collection, &filter, None))
            .await?;
        found
            .map(|doc| layout::from_document(doc, &self.inner.codecs))
            .transpose()
    }

    /// Every stored revision of `id`, ascending. Empty if `id` is unknown.
    pub async fn read_revisions(&self, collection: &str, id: &str) -> DbResult<Vec<Revision>> {
        self.check_collection(collection)?;
        let id = ResourceId::parse(id)?;
        let values = self
            .op(
                "read_revisions",
                self.inner
                    .backend
                    .find_values(collection, &layout::id_filter(&id), layout::CONTENT_REVISION),
            )
            .await?;
        let mut revisions = values
            .iter()
            .map(layout::decode_revision)
            .collect::<DbResult<Vec<_>>>()?;
        revisions.sort_unstable();
        revisions.dedup();
        Ok(revisions)
    }

    /// Number of documents stored under `(id, revision)`: 0 or 1.
    pub async fn count(&self, collection: &str, id: &str, revision: Revision) -> DbResult<u64> {
        self.check_collection(collection)?;
        let id = ResourceId::parse(id)?;
        let filter = layout::key_filter(&id, revision);
        self.op("count", self.inner.backend.count(collection, &filter)).await
    }

    /// Remove exactly `(id, revision)`. Removing a missing key is not an error.
    pub async fn delete(&self, collection: &str, id: &str, revision: Revision) -> DbResult<()> {
        self.check_collection(collection)?;
        let id = ResourceId::parse(id)?;
        let filter = layout::key_filter(&id, revision);
        let removed = self.op("delete", self.inner.backend.delete_one(collection, &filter)).await?;
        debug!(collection, identifier = %id, revision = %revision, removed, "delete");
        Ok(())
    }

    /// Stream every identifier in `collection`.
    ///
    /// Opening the scan happens here, so failures to open are returned
    /// directly. Everything after that is reported by the stream closing.
    pub async fn read_ids(&self, cancel: &CancelToken, collection: &str) -> DbResult<IdStream> {
        self.check_collection(collection)?;
        let settings = &self.inner.settings;
        let cursor = self
            .op(
                "read_ids",
                self.inner
                    .backend
                    .scan(collection, layout::IDENTIFIER, settings.id_batch_size),
            )
            .await?;
        Ok(IdStream::spawn(
            cursor,
            cancel.clone(),
            collection.to_string(),
            settings.id_buffer,
            settings.operation_timeout,
        ))
    }

    /// Create the unique `(identifier, content-revision)` index on every
    /// allow-listed collection. Failures are logged per collection and do not
    /// stop the rest.
    pub async fn ensure_index(&self) {
        let index = layout::identifier_revision_index();
        let limit = self.inner.settings.index_timeout;
        for collection in self.inner.collections.iter() {
            let created = self
                .bounded("ensure_index", limit, self.inner.backend.ensure_index(collection, &index))
                .await;
            match created {
                Ok(()) => debug!(collection, index = %index.name, "index ensured"),
                Err(e) => warn!(collection, index = %index.name, error = %e, "failed to ensure index"),
            }
        }
    }

    pub(crate) async fn write_unchecked(&self, collection: &str, resource: &Resource) -> DbResult<()> {
        let document = layout::to_document(resource, &self.inner.codecs)?;
        let filter = layout::key_filter(&resource.identifier, resource.revision);
        let outcome = self
            .op("write", self.inner.backend.upsert(collection, &filter, document))
            .await?;
        debug!(
            collection,
            identifier = %resource.identifier,
            revision = %resource.revision,
            replaced = outcome == UpsertOutcome::Replaced,
            "write"
        );
        Ok(())
    }

    pub(crate) async fn read_unchecked(&self, collection: &str, id: &ResourceId) -> DbResult<Option<Resource>> {
        let latest = Sort::descending(layout::CONTENT_REVISION);
        let found = self
            .op(
                "read",
                self.inner
                    .backend
                    .find_one(collection, &layout::id_filter(id), Some(&latest)),
            )
            .await?;
        found
            .map(|doc| layout::from_document(doc, &self.inner.codecs))
            .transpose()
    }

    fn check_collection(&self, collection: &str) -> DbResult<()> {
        if self.inner.collections.contains(collection) {
            Ok(())
        } else {
            Err(DbError::UnsupportedCollection(collection.to_string()))
        }
    }

    async fn op<T>(&self, operation: &'static str, fut: impl Future<Output = StoreResult<T>>) -> DbResult<T> {
        self.bounded(operation, self.inner.settings.operation_timeout, fut)
            .await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        limit: Duration,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> DbResult<T> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DbError::Timeout {
                operation,
                after: limit,
            }),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("collections", &self.inner.collections)
            .field("codecs", &self.inner.codecs)
            .field("settings", &self.inner.settings)
            .finish()
    }
}
