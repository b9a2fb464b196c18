//! Tracing setup for the binary.
//!
//! Logs go to a daily rolling file under the logs directory so the REPL
//! output stays readable. `--verbose` mirrors them to stderr as well.
//! The filter comes from `RIYA_LOG` (default `info`).

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "RIYA_LOG";

/// Installs the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init_logging(logs_dir: &Path, verbose: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "riya.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);
    let stderr_layer = verbose.then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .ok();

    Ok(guard)
}
