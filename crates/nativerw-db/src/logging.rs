use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{DbError, DbResult};

/// Install a global `tracing` fmt subscriber at `level`
/// (`trace`, `debug`, `info`, `warn` or `error`, case-insensitive).
///
/// Fails if `level` is unknown or a global subscriber is already set.
pub fn init_logging(level: &str) -> DbResult<()> {
    install(level, std::io::stdout)
}

fn install<W>(level: &str, writer: W) -> DbResult<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let level = parse_level(level)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(writer)
        .try_init()
        .map_err(|e| DbError::Config(format!("cannot install log subscriber: {e}")))
}

pub(crate) fn parse_level(level: &str) -> DbResult<Level> {
    Level::from_str(level.trim()).map_err(|_| DbError::Config(format!("unknown log level {level:?}")))
}
