//! Streaming enumeration of every identifier in a collection.
//!
//! [`Connection::read_ids`](crate::Connection::read_ids) opens a backend scan
//! and hands the decoding to a spawned producer task. The producer pushes
//! identifiers into a bounded channel, so at most `id_buffer` of them sit
//! between it and the consumer. Cancellation is cooperative: the producer
//! looks at the [`CancelToken`] before every element and while waiting for
//! buffer space.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use nativerw_store::DocumentCursor;
use nativerw_types::ResourceId;

use crate::layout;

/// Cloneable cancellation handle. All clones observe the same state.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender gone without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a `read_ids` scan.
///
/// Yields identifiers until the collection is exhausted, the scan is
/// cancelled, or the producer hits an error (logged, never surfaced as a
/// bogus identifier). Dropping the stream stops the producer.
pub struct IdStream {
    rx: mpsc::Receiver<ResourceId>,
    producer: JoinHandle<()>,
}

impl IdStream {
    pub(crate) fn spawn(
        cursor: Box<dyn DocumentCursor>,
        cancel: CancelToken,
        collection: String,
        buffer: usize,
        batch_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let producer = tokio::spawn(produce(cursor, tx, cancel, collection, batch_timeout));
        Self { rx, producer }
    }

    /// The next identifier, or `None` once the stream is closed.
    pub async fn next(&mut self) -> Option<ResourceId> {
        self.rx.recv().await
    }

    /// Drain every remaining identifier.
    pub async fn collect(mut self) -> Vec<ResourceId> {
        let mut ids = Vec::new();
        while let Some(id) = self.rx.recv().await {
            ids.push(id);
        }
        ids
    }

    /// Identifiers produced but not yet taken by [`next`](Self::next).
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Whether the producer task has exited. Buffered identifiers may remain.
    pub fn producer_finished(&self) -> bool {
        self.producer.is_finished()
    }
}

impl Drop for IdStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

impl std::fmt::Debug for IdStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdStream")
            .field("producer_finished", &self.producer_finished())
            .finish()
    }
}

async fn produce(
    mut cursor: Box<dyn DocumentCursor>,
    tx: mpsc::Sender<ResourceId>,
    cancel: CancelToken,
    collection: String,
    batch_timeout: Duration,
) {
    let mut delivered = 0usize;
    'scan: loop {
        if cancel.is_cancelled() {
            break;
        }
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            fetched = tokio::time::timeout(batch_timeout, cursor.next_batch()) => fetched,
        };
        let batch = match fetched {
            Ok(Ok(Some(batch))) => batch,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                warn!(collection = %collection, error = %e, "identifier scan failed");
                break;
            }
            Err(_) => {
                warn!(collection = %collection, after = ?batch_timeout, "identifier scan batch timed out");
                break;
            }
        };

        for value in batch {
            if cancel.is_cancelled() {
                break 'scan;
            }
            let id = match layout::decode_identifier(value) {
                Ok(id) => id,
                Err(e) => {
                    warn!(collection = %collection, error = %e, "malformed identifier, ending scan");
                    break 'scan;
                }
            };
            // Send first: a slot the consumer freed before cancelling is still
            // filled, so one more identifier may follow a cancel. Intentional.
            tokio::select! {
                biased;
                sent = tx.send(id) => {
                    if sent.is_err() {
                        break 'scan;
                    }
                    delivered += 1;
                }
                _ = cancel.cancelled() => break 'scan,
            }
        }
    }
    debug!(
        collection = %collection,
        delivered,
        cancelled = cancel.is_cancelled(),
        "identifier scan finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use nativerw_store::{Document, InMemoryBackend, Value};
    use nativerw_types::{CollectionSet, Content, Resource, Revision};

    use crate::config::ConnectionSettings;
    use crate::connection::Connection;

    const UC: &str = "universal-content";

    #[tokio::test]
    async fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        clone.cancelled().await;
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_a_waiting_task() {
        let token = CancelToken::new();
        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        token.cancel();
        waiter.await.unwrap();
    }

    // -----------------------------------------------------------------------
    // Streaming through a connection
    // -----------------------------------------------------------------------

    async fn seeded(n: usize) -> (Arc<InMemoryBackend>, Connection, Vec<ResourceId>) {
        let backend = Arc::new(InMemoryBackend::new());
        let conn = Connection::new(backend.clone(), CollectionSet::new([UC]), ConnectionSettings::default());
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            let id = ResourceId::generate();
            let resource = Resource::new(id, Content::json(serde_json::json!({})), "application/json", Revision::new(1));
            conn.write(UC, &resource).await.unwrap();
            ids.push(id);
        }
        (backend, conn, ids)
    }

    #[tokio::test]
    async fn streams_every_identifier() {
        let (_, conn, ids) = seeded(70).await;
        let stream = conn.read_ids(&CancelToken::new(), UC).await.unwrap();
        let streamed = stream.collect().await;
        assert_eq!(streamed.len(), 70);
        let expected: HashSet<ResourceId> = ids.into_iter().collect();
        let got: HashSet<ResourceId> = streamed.into_iter().collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn empty_collection_closes_immediately() {
        let (_, conn, _) = seeded(0).await;
        let mut stream = conn.read_ids(&CancelToken::new(), UC).await.unwrap();
        assert!(stream.next().await.is_none());
    }

    async fn wait_until_full(stream: &IdStream, capacity: usize) {
        while stream.buffered() < capacity {
            tokio::task::yield_now().await;
        }
        // One more turn so the producer parks on the next send.
        tokio::task::yield_now().await;
    }

    // Single-threaded so the producer is parked on a full buffer, not
    // mid-element, when the consumer cancels.
    #[tokio::test(flavor = "current_thread")]
    async fn cancel_after_one_leaves_only_the_buffer() {
        let (_, conn, _) = seeded(64).await;
        let cancel = CancelToken::new();
        let mut stream = conn.read_ids(&cancel, UC).await.unwrap();
        wait_until_full(&stream, 8).await;
        assert_eq!(stream.buffered(), 8);

        assert!(stream.next().await.is_some());
        cancel.cancel();

        let rest = stream.collect().await;
        assert_eq!(rest.len(), 8);
    }

    #[tokio::test]
    async fn cancel_before_first_read_yields_nothing() {
        let (_, conn, _) = seeded(20).await;
        let cancel = CancelToken::new();
        cancel.cancel();
        let stream = conn.read_ids(&cancel, UC).await.unwrap();
        assert!(stream.collect().await.is_empty());
    }

    #[tokio::test]
    async fn producer_waits_on_full_buffer() {
        let (_, conn, _) = seeded(64).await;
        let stream = conn.read_ids(&CancelToken::new(), UC).await.unwrap();
        wait_until_full(&stream, 8).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(stream.buffered(), 8);
        assert!(!stream.producer_finished());
        drop(stream);
    }

    #[tokio::test]
    async fn malformed_identifier_ends_the_stream() {
        let (backend, conn, _) = seeded(0).await;
        let good = ResourceId::generate();
        backend
            .insert_raw(UC, Document::new().with("identifier", crate::layout::identifier_value(&good)))
            .unwrap();
        backend
            .insert_raw(UC, Document::new().with("identifier", Value::Int64(12)))
            .unwrap();
        backend
            .insert_raw(UC, Document::new().with("identifier", crate::layout::identifier_value(&ResourceId::generate())))
            .unwrap();

        let stream = conn.read_ids(&CancelToken::new(), UC).await.unwrap();
        assert_eq!(stream.collect().await, vec![good]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_batch_ends_the_stream() {
        let (backend, conn, _) = seeded(3).await;
        let stream = conn.read_ids(&CancelToken::new(), UC).await.unwrap();
        backend.set_latency(Duration::from_secs(60));
        assert!(stream.collect().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_scan_open_is_a_timeout() {
        let (backend, conn, _) = seeded(3).await;
        backend.set_latency(Duration::from_secs(60));
        let err = conn.read_ids(&CancelToken::new(), UC).await.unwrap_err();
        assert!(matches!(err, crate::error::DbError::Timeout { operation: "read_ids", .. }));
    }
}
