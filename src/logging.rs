//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Stdout belongs to the hub line protocol, so no mode ever logs there.
//! - **Production** ([`init_production`]): rotated JSON files + stderr, chosen
//!   by [`init`] when `[logging] logs_dir` is set
//! - **CLI** ([`init_cli`]): stderr only

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// File name prefix for rotated logs.
const LOG_FILE_PREFIX: &str = "chatlink.log";

/// Keeps the file writer alive. Dropping it flushes pending entries.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

/// `RUST_LOG` when set, otherwise the configured level.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Pick the logging mode from `config`.
///
/// Returns a guard only in production mode; hold it until exit.
///
/// # Errors
///
/// Propagates [`init_production`] failures.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logs_dir {
        Some(dir) => init_production(dir, &config.level).map(Some),
        None => {
            init_cli(&config.level);
            Ok(None)
        }
    }
}

/// JSON lines to `{logs_dir}/chatlink.log.YYYY-MM-DD`, plus readable stderr.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path, default_level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(tracing_subscriber::fmt::layer().json().with_writer(file_writer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(LoggingGuard { _guard: guard })
}

/// Stderr only. A subscriber installed earlier wins.
pub fn init_cli(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}
