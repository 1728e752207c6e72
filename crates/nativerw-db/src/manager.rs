use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{error, info};

use nativerw_store::{CodecRegistry, Dialer};
use nativerw_types::CollectionSet;

use crate::config::{ConnectionSettings, StoreConfig};
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::retry::RetryPolicy;

#[derive(Clone, Debug)]
enum DialState {
    /// No dial has been started.
    Idle,
    Dialing,
    Ready(Connection),
    /// The last dial gave up; the next `open` starts over.
    Failed(String),
}

/// Owns the lifecycle of the single shared [`Connection`].
///
/// The first [`open`](Self::open) dials, retrying per the [`RetryPolicy`];
/// concurrent callers wait for that dial instead of starting their own.
/// Once established, the same handle is returned to everyone.
pub struct ConnectionManager {
    dialer: Arc<dyn Dialer>,
    collections: CollectionSet,
    codecs: CodecRegistry,
    settings: ConnectionSettings,
    retry: RetryPolicy,
    state: watch::Sender<DialState>,
    dial_lock: Mutex<()>,
}

impl ConnectionManager {
    /// Build an idle manager. Nothing is dialed until [`open`](Self::open).
    pub fn new(
        dialer: Arc<dyn Dialer>,
        collections: CollectionSet,
        settings: ConnectionSettings,
        retry: RetryPolicy,
    ) -> Self {
        let (state, _) = watch::channel(DialState::Idle);
        Self {
            dialer,
            collections,
            codecs: CodecRegistry::default(),
            settings,
            retry,
            state,
            dial_lock: Mutex::new(()),
        }
    }

    /// Build a manager from the collections, timeouts and retry policy in `config`.
    pub fn from_config(dialer: Arc<dyn Dialer>, config: &StoreConfig) -> Self {
        Self::new(dialer, config.collection_set(), config.settings(), config.retry_policy())
    }

    /// Replace the default codec registry handed to the connection.
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Return the connection, dialing first if nobody has yet.
    ///
    /// Blocks until a dial succeeds. With an unbounded policy that may be
    /// forever; with a bounded one this returns [`DbError::Unavailable`] once
    /// the attempts are used up.
    pub async fn open(&self) -> DbResult<Connection> {
        if let Some(conn) = self.try_get() {
            return Ok(conn);
        }

        let _dial = self.dial_lock.lock().await;
        if let Some(conn) = self.try_get() {
            return Ok(conn);
        }

        self.state.send_replace(DialState::Dialing);
        let mut reset = ResetOnDrop {
            state: &self.state,
            armed: true,
        };
        let result = self.dial_with_retry().await;
        reset.armed = false;

        match result {
            Ok(conn) => {
                self.state.send_replace(DialState::Ready(conn.clone()));
                Ok(conn)
            }
            Err(e) => {
                self.state.send_replace(DialState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Wait for a connection someone else is opening.
    ///
    /// Never dials. Fails with [`DbError::NotOpened`] if no dial was ever
    /// started, and with [`DbError::Unavailable`] if the last dial gave up.
    pub async fn await_connection(&self) -> DbResult<Connection> {
        let mut rx = self.state.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                DialState::Idle => return Err(DbError::NotOpened),
                DialState::Ready(conn) => return Ok(conn),
                DialState::Failed(reason) => return Err(DbError::Unavailable(reason)),
                DialState::Dialing => {
                    if rx.changed().await.is_err() {
                        return Err(DbError::NotOpened);
                    }
                }
            }
        }
    }

    /// Whether a connection has been established.
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), DialState::Ready(_))
    }

    /// The connection, if one is established. Never blocks.
    pub fn try_get(&self) -> Option<Connection> {
        match &*self.state.borrow() {
            DialState::Ready(conn) => Some(conn.clone()),
            _ => None,
        }
    }

    async fn dial_with_retry(&self) -> DbResult<Connection> {
        let target = self.dialer.target();
        let limit = self.settings.dial_timeout;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let dialed = match tokio::time::timeout(limit, self.dialer.dial()).await {
                Ok(result) => result.map_err(DbError::from),
                Err(_) => Err(DbError::Timeout {
                    operation: "dial",
                    after: limit,
                }),
            };
            match dialed {
                Ok(backend) => {
                    info!(store = %target, attempt, "connected to store");
                    return Ok(Connection::with_codecs(
                        backend,
                        self.collections.clone(),
                        self.codecs.clone(),
                        self.settings.clone(),
                    ));
                }
                Err(e) => {
                    error!(store = %target, attempt, error = %e, "couldn't establish connection to store");
                    if !self.retry.should_retry(attempt) {
                        return Err(DbError::Unavailable(format!(
                            "gave up on {target} after {attempt} attempts: {e}"
                        )));
                    }
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("target", &self.dialer.target())
            .field("retry", &self.retry)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Puts the state back to `Idle` if an in-flight `open` is dropped, so
/// waiters are not left blocked on a dial nobody is driving.
struct ResetOnDrop<'a> {
    state: &'a watch::Sender<DialState>,
    armed: bool,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(DialState::Idle);
        }
    }
}
