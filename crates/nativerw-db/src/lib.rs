//! Storage access layer for the native store.
//!
//! Callers get a [`Connection`] from a [`ConnectionManager`] and run every
//! operation through it:
//!
//! - [`ConnectionManager`]: lazy, retrying dial; one shared handle
//! - [`Connection`]: revision-aware writes, reads, counts and deletes
//! - [`Connection::read_ids`] / [`IdStream`]: cancellable, bounded identifier scan
//! - [`Deduper`]: skip writes whose content matches the latest revision
//! - [`health`]: write/read probes against the `healthcheck` collection
//! - [`StoreConfig`]: JSON or TOML configuration
//!
//! ```no_run
//! # async fn demo() -> nativerw_db::DbResult<()> {
//! use std::sync::Arc;
//! use nativerw_db::{ConnectionManager, StoreConfig};
//! use nativerw_store::{InMemoryBackend, InMemoryDialer};
//!
//! let config = StoreConfig::load("config.json")?;
//! let dialer = Arc::new(InMemoryDialer::new(Arc::new(InMemoryBackend::new())));
//! let manager = ConnectionManager::from_config(dialer, &config);
//! let conn = manager.open().await?;
//! conn.ensure_index().await;
//! let latest = conn.read("universal-content", "9694733e-163a-4393-801f-000ab7de5041").await?;
//! # let _ = latest;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dedup;
pub mod error;
pub mod health;
pub mod ids;
pub mod layout;
pub mod logging;
pub mod manager;
pub mod retry;

pub use config::{ConnectionSettings, StoreConfig};
pub use connection::{Connection, WriteOutcome};
pub use dedup::{compute_content_hash, compute_hash, Deduper};
pub use error::{DbError, DbResult, ErrorCategory};
pub use health::HealthReport;
pub use ids::{CancelToken, IdStream};
pub use logging::init_logging;
pub use manager::ConnectionManager;
pub use retry::RetryPolicy;
