//! Liveness probes for the store.
//!
//! The probes write and read a fixed sample resource in a dedicated
//! `healthcheck` collection, which is always accessible regardless of the
//! configured allow-list.

use tracing::warn;

use nativerw_types::{Content, Resource, ResourceId, Revision};

use crate::connection::Connection;
use crate::error::DbResult;

pub const HEALTHCHECK_COLLECTION: &str = "healthcheck";
pub const SAMPLE_IDENTIFIER: &str = "cda5d6a9-cd25-4d76-8bad-9eaa35e85f4a";

/// Outcome of a probe. `message` is `"OK"` on success, otherwise a summary
/// suitable for an operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthReport {
    pub ok: bool,
    pub message: String,
}

impl HealthReport {
    /// A passing report.
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: "OK".into(),
        }
    }

    /// A failing report carrying `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

fn sample_resource() -> DbResult<Resource> {
    let id = ResourceId::parse(SAMPLE_IDENTIFIER)?;
    let content = Content::json(serde_json::json!({"foo": ["a", "b"], "bar": 10.4}));
    Ok(Resource::new(id, content, "application/json", Revision::new(1)))
}

/// Ping, then write the sample resource.
pub async fn check_writable(connection: &Connection) -> HealthReport {
    if let Err(e) = connection.ping().await {
        warn!(error = %e, "health: ping failed");
        return HealthReport::failed("Failed to establish connection to the store");
    }
    let written = match sample_resource() {
        Ok(sample) => connection.write_unchecked(HEALTHCHECK_COLLECTION, &sample).await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => HealthReport::ok(),
        Err(e) => {
            warn!(error = %e, "health: write failed");
            HealthReport::failed("Failed to write data to the store, please check the connection.")
        }
    }
}

/// Ping, then read the sample resource. A missing sample is still healthy.
pub async fn check_readable(connection: &Connection) -> HealthReport {
    if let Err(e) = connection.ping().await {
        warn!(error = %e, "health: ping failed");
        return HealthReport::failed("Failed to establish connection to the store");
    }
    let read = match ResourceId::parse(SAMPLE_IDENTIFIER) {
        Ok(id) => connection.read_unchecked(HEALTHCHECK_COLLECTION, &id).await,
        Err(e) => Err(e.into()),
    };
    match read {
        Ok(_) => HealthReport::ok(),
        Err(e) => {
            warn!(error = %e, "health: read failed");
            HealthReport::failed("Failed to read data from the store, please check the connection.")
        }
    }
}

/// Run both probes concurrently. The first failure wins; otherwise OK.
pub async fn good_to_go(connection: &Connection) -> HealthReport {
    let readable = async {
        let report = check_readable(connection).await;
        if report.ok {
            Ok(())
        } else {
            Err(report)
        }
    };
    let writable = async {
        let report = check_writable(connection).await;
        if report.ok {
            Ok(())
        } else {
            Err(report)
        }
    };
    match tokio::try_join!(readable, writable) {
        Ok(_) => HealthReport::ok(),
        Err(report) => report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use nativerw_store::InMemoryBackend;
    use nativerw_types::CollectionSet;

    use crate::config::ConnectionSettings;

    fn connection() -> (Arc<InMemoryBackend>, Connection) {
        let backend = Arc::new(InMemoryBackend::new());
        let conn = Connection::new(
            backend.clone(),
            CollectionSet::new(["universal-content"]),
            ConnectionSettings::default(),
        );
        (backend, conn)
    }

    #[tokio::test]
    async fn healthy_store_passes_every_probe() {
        let (backend, conn) = connection();
        assert_eq!(check_readable(&conn).await, HealthReport::ok());
        assert_eq!(check_writable(&conn).await, HealthReport::ok());
        assert_eq!(good_to_go(&conn).await, HealthReport::ok());
        assert_eq!(backend.len(HEALTHCHECK_COLLECTION), 1);
    }

    #[tokio::test]
    async fn probes_bypass_the_allow_list() {
        let (_, conn) = connection();
        assert!(!conn.supported_collections().contains(HEALTHCHECK_COLLECTION));
        assert!(check_writable(&conn).await.ok);
        assert!(conn.read(HEALTHCHECK_COLLECTION, SAMPLE_IDENTIFIER).await.is_err());
    }

    #[tokio::test]
    async fn repeated_writes_do_not_grow_the_collection() {
        let (backend, conn) = connection();
        for _ in 0..3 {
            assert!(check_writable(&conn).await.ok);
        }
        assert_eq!(backend.len(HEALTHCHECK_COLLECTION), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_on_ping() {
        let (backend, conn) = connection();
        backend.set_available(false);
        let report = check_writable(&conn).await;
        assert!(!report.ok);
        assert_eq!(report.message, "Failed to establish connection to the store");
        assert!(!good_to_go(&conn).await.ok);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_fails_probes() {
        let (backend, conn) = connection();
        backend.set_latency(Duration::from_secs(30));
        let report = good_to_go(&conn).await;
        assert!(!report.ok);
    }
}
