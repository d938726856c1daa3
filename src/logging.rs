//! File-backed tracing setup. The terminal belongs to the UI, so log lines go
//! to `<log dir>/bookshelf.log` instead of stderr.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "bookshelf.log";
/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "bookshelf=info";

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered lines get flushed.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir).context("failed to create log directory")?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    Ok(guard)
}
