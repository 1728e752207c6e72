use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use nativerw_types::CollectionSet;

use crate::error::{DbError, DbResult};
use crate::logging::{init_logging, parse_level};
use crate::retry::RetryPolicy;

/// Runtime knobs handed to every [`Connection`](crate::Connection).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Bound on a single dial attempt.
    pub dial_timeout: Duration,
    /// Bound on point operations (read, write, count, delete, ping, cursor batches).
    pub operation_timeout: Duration,
    /// Bound on index creation.
    pub index_timeout: Duration,
    /// Identifiers fetched per cursor round-trip in `read_ids`.
    pub id_batch_size: usize,
    /// Identifiers buffered ahead of the consumer in `read_ids`.
    pub id_buffer: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(5),
            index_timeout: Duration::from_secs(60),
            id_batch_size: 32,
            id_buffer: 8,
        }
    }
}

/// File-level configuration.
///
/// Reads the service's JSON layout (`dbName`, `collections`; a `server`
/// section, if present, is ignored) as well as an equivalent TOML form.
/// Every other section is optional and falls back to the defaults below.
///
/// `db_name` and `addresses` are not used by this crate; they are carried
/// for the caller's [`Dialer`](nativerw_store::Dialer), which owns the
/// wire connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(rename = "dbName", alias = "db_name")]
    pub db_name: String,
    pub collections: Vec<String>,
    /// Backend nodes as `host:port`, given as a list or a comma-separated string.
    #[serde(deserialize_with = "address_list")]
    pub addresses: Vec<String>,
    #[serde(alias = "expectedNodeCount")]
    pub expected_node_count: Option<usize>,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub ids: IdsConfig,
    /// Passed to [`init_logging`](Self::init_logging).
    #[serde(alias = "logLevel")]
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_name: "native-store".into(),
            collections: Vec::new(),
            addresses: Vec::new(),
            expected_node_count: None,
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            ids: IdsConfig::default(),
            log_level: "info".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub dial_ms: u64,
    pub operation_ms: u64,
    pub index_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_ms: 30_000,
            operation_ms: 5_000,
            index_ms: 60_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub backoff_ms: u64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_ms: 5_000,
            max_attempts: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    pub batch_size: usize,
    pub buffer: usize,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            buffer: 8,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> DbResult<Self> {
        let config: Self = serde_json::from_str(s).map_err(|e| DbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> DbResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. Files ending in `.toml` are read as TOML, anything
    /// else as JSON.
    pub fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Reject configurations no connection could run with.
    pub fn validate(&self) -> DbResult<()> {
        parse_level(&self.log_level)?;
        if !self.addresses.is_empty() || self.expected_node_count.is_some() {
            check_addresses(&self.addresses, self.expected_node_count)?;
        }
        if self.collections.iter().any(|c| c.trim().is_empty()) {
            return Err(DbError::Config("collection names must not be empty".into()));
        }
        if self.ids.batch_size == 0 || self.ids.buffer == 0 {
            return Err(DbError::Config("ids.batch_size and ids.buffer must be positive".into()));
        }
        if self.timeouts.dial_ms == 0 || self.timeouts.operation_ms == 0 || self.timeouts.index_ms == 0 {
            return Err(DbError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Install the global log subscriber at the configured level.
    pub fn init_logging(&self) -> DbResult<()> {
        init_logging(&self.log_level)
    }

    /// The configured collections as an allow-list.
    pub fn collection_set(&self) -> CollectionSet {
        self.collections.iter().collect()
    }

    /// Timeouts and scan sizes for [`Connection`](crate::Connection).
    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            dial_timeout: Duration::from_millis(self.timeouts.dial_ms),
            operation_timeout: Duration::from_millis(self.timeouts.operation_ms),
            index_timeout: Duration::from_millis(self.timeouts.index_ms),
            id_batch_size: self.ids.batch_size,
            id_buffer: self.ids.buffer,
        }
    }

    /// Dial retry policy; unbounded unless `max_attempts` is set.
    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = Duration::from_millis(self.retry.backoff_ms);
        match self.retry.max_attempts {
            Some(n) => RetryPolicy::bounded(backoff, n),
            None => RetryPolicy::unbounded(backoff),
        }
    }
}

/// Split a comma-separated node list (`"host1:27017,host2:27017"`).
pub fn parse_address_list(list: &str) -> Vec<String> {
    list.split(',').map(|a| a.trim().to_string()).collect()
}

fn address_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Addresses {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Addresses::deserialize(deserializer)? {
        Addresses::List(list) => list,
        Addresses::Joined(joined) if joined.trim().is_empty() => Vec::new(),
        Addresses::Joined(joined) => parse_address_list(&joined),
    })
}

/// Check that every address is `host:port` and, if given, that there are
/// exactly `expected` of them.
pub fn check_addresses(addresses: &[String], expected: Option<usize>) -> DbResult<()> {
    if let Some(expected) = expected {
        if addresses.len() != expected {
            return Err(DbError::Config(format!(
                "expected {expected} backend addresses but got {}: {}",
                addresses.len(),
                addresses.join(",")
            )));
        }
    }
    for address in addresses {
        let valid = match address.split_once(':') {
            Some((host, port)) => !host.is_empty() && !port.is_empty() && !port.contains(':'),
            None => false,
        };
        if !valid {
            return Err(DbError::Config(format!(
                "invalid backend address {address:?}: expected host:port"
            )));
        }
    }
    Ok(())
}
