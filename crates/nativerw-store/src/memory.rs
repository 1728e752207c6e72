use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::document::{Document, Filter, IndexSpec, Sort, SortDirection, Value};
use crate::error::{StoreError, StoreResult};
use crate::traits::{Dialer, DocumentBackend, DocumentCursor, UpsertOutcome};

type Collections = HashMap<String, CollectionData>;

#[derive(Debug, Default)]
struct CollectionData {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

/// In-memory, `HashMap`-based document backend.
///
/// Intended for tests and embedding. Collections are created on first write.
/// Unique indexes are enforced exactly as a real engine would. Latency and
/// outages can be injected to exercise timeout and health paths.
pub struct InMemoryBackend {
    collections: RwLock<Collections>,
    latency_micros: Arc<AtomicU64>,
    available: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            latency_micros: Arc::new(AtomicU64::new(0)),
            available: AtomicBool::new(true),
        }
    }

    /// Delay every subsequent operation, and every batch of open cursors, by
    /// `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_micros
            .store(latency.as_micros().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    /// Make every subsequent operation fail with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Insert a document verbatim, bypassing indexes. Used to seed fixtures,
    /// including deliberately malformed ones.
    pub fn insert_raw(&self, collection: &str, document: Document) -> StoreResult<()> {
        let mut map = self.write_collections()?;
        map.entry(collection.to_string())
            .or_default()
            .documents
            .push(document);
        Ok(())
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.read_collections()
            .map(|map| map.get(collection).map_or(0, |c| c.documents.len()))
            .unwrap_or(0)
    }

    /// Indexes defined on `collection`.
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.read_collections()
            .map(|map| map.get(collection).map(|c| c.indexes.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Sorted names of every collection that has been touched.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_collections()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn latency(&self) -> Duration {
        Duration::from_micros(self.latency_micros.load(Ordering::SeqCst))
    }

    async fn before_op(&self) -> StoreResult<()> {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory backend is marked unavailable".into()));
        }
        Ok(())
    }

    fn read_collections(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_collections(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("collections", &self.collection_names())
            .field("latency", &self.latency())
            .finish()
    }
}

fn sort_key<'a>(document: &'a Document, field: &str) -> &'a Value {
    const NULL: &Value = &Value::Null;
    document.get(field).unwrap_or(NULL)
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    async fn ping(&self) -> StoreResult<()> {
        self.before_op().await
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        self.before_op().await?;
        let mut map = self.write_collections()?;
        let data = map.entry(collection.to_string()).or_default();
        if data.indexes.iter().any(|existing| existing.name == index.name) {
            return Ok(());
        }
        if index.unique {
            let mut seen: Vec<Vec<Value>> = Vec::with_capacity(data.documents.len());
            for document in &data.documents {
                let key = index.key_of(document);
                if seen.contains(&key) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        index: index.name.clone(),
                    });
                }
                seen.push(key);
            }
        }
        debug!(collection, index = %index.name, "index created");
        data.indexes.push(index.clone());
        Ok(())
    }

    async fn upsert(&self, collection: &str, filter: &Filter, document: Document) -> StoreResult<UpsertOutcome> {
        self.before_op().await?;
        let mut map = self.write_collections()?;
        let data = map.entry(collection.to_string()).or_default();
        let position = data.documents.iter().position(|d| d.matches(filter));

        for index in data.indexes.iter().filter(|i| i.unique) {
            let key = index.key_of(&document);
            let clash = data
                .documents
                .iter()
                .enumerate()
                .any(|(i, existing)| Some(i) != position && index.key_of(existing) == key);
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.clone(),
                });
            }
        }

        match position {
            Some(i) => {
                data.documents[i] = document;
                Ok(UpsertOutcome::Replaced)
            }
            None => {
                data.documents.push(document);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn find_one(&self, collection: &str, filter: &Filter, sort: Option<&Sort>) -> StoreResult<Option<Document>> {
        self.before_op().await?;
        let map = self.read_collections()?;
        let Some(data) = map.get(collection) else {
            return Ok(None);
        };
        let mut matching = data.documents.iter().filter(|d| d.matches(filter));
        let found = match sort {
            None => matching.next(),
            Some(sort) => {
                let cmp = |a: &&Document, b: &&Document| sort_key(a, &sort.field).sort_cmp(sort_key(b, &sort.field));
                match sort.direction {
                    SortDirection::Descending => matching.max_by(cmp),
                    SortDirection::Ascending => matching.min_by(cmp),
                }
            }
        };
        Ok(found.cloned())
    }

    async fn find_values(&self, collection: &str, filter: &Filter, field: &str) -> StoreResult<Vec<Value>> {
        self.before_op().await?;
        let map = self.read_collections()?;
        Ok(map
            .get(collection)
            .map(|data| {
                data.documents
                    .iter()
                    .filter(|d| d.matches(filter))
                    .map(|d| d.get(field).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.before_op().await?;
        let map = self.read_collections()?;
        Ok(map
            .get(collection)
            .map_or(0, |data| data.documents.iter().filter(|d| d.matches(filter)).count() as u64))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.before_op().await?;
        let mut map = self.write_collections()?;
        let Some(data) = map.get_mut(collection) else {
            return Ok(0);
        };
        match data.documents.iter().position(|d| d.matches(filter)) {
            Some(i) => {
                data.documents.remove(i);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn scan(&self, collection: &str, field: &str, batch_size: usize) -> StoreResult<Box<dyn DocumentCursor>> {
        self.before_op().await?;
        let values: Vec<Value> = {
            let map = self.read_collections()?;
            map.get(collection)
                .map(|data| {
                    data.documents
                        .iter()
                        .map(|d| d.get(field).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(Box::new(InMemoryCursor {
            values: values.into_iter(),
            batch_size: batch_size.max(1),
            latency_micros: Arc::clone(&self.latency_micros),
        }))
    }
}

/// Cursor over a snapshot taken when the scan was opened.
struct InMemoryCursor {
    values: std::vec::IntoIter<Value>,
    batch_size: usize,
    latency_micros: Arc<AtomicU64>,
}

#[async_trait]
impl DocumentCursor for InMemoryCursor {
    async fn next_batch(&mut self) -> StoreResult<Option<Vec<Value>>> {
        let latency = Duration::from_micros(self.latency_micros.load(Ordering::SeqCst));
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let batch: Vec<Value> = self.values.by_ref().take(self.batch_size).collect();
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}

// ---------------------------------------------------------------------------
// Dialer
// ---------------------------------------------------------------------------

/// Dialer handing out a shared [`InMemoryBackend`].
///
/// Can be told to refuse the first N dials, to exercise retry paths.
pub struct InMemoryDialer {
    backend: Arc<InMemoryBackend>,
    failures_remaining: AtomicU32,
    attempts: AtomicU32,
    dial_latency: Duration,
}

impl InMemoryDialer {
    /// A dialer that always hands out `backend`.
    pub fn new(backend: Arc<InMemoryBackend>) -> Self {
        Self {
            backend,
            failures_remaining: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
            dial_latency: Duration::ZERO,
        }
    }

    /// Refuse the first `n` dial attempts.
    pub fn failing_first(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Delay each dial attempt.
    pub fn with_dial_latency(mut self, latency: Duration) -> Self {
        self.dial_latency = latency;
        self
    }

    /// Total dial attempts so far, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The backend handed out on a successful dial.
    pub fn backend(&self) -> &Arc<InMemoryBackend> {
        &self.backend
    }
}

#[async_trait]
impl Dialer for InMemoryDialer {
    async fn dial(&self) -> StoreResult<Arc<dyn DocumentBackend>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.dial_latency.is_zero() {
            tokio::time::sleep(self.dial_latency).await;
        }
        let refused = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StoreError::Unavailable(format!(
                "dial attempt {attempt} to {} refused",
                self.target()
            )));
        }
        Ok(self.backend.clone() as Arc<dyn DocumentBackend>)
    }

    fn target(&self) -> String {
        "memory://local".into()
    }
}
