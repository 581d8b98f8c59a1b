// src/logging.rs

//! `tracing` subscriber setup for the `gradflow` binary.
//!
//! `--log-level` wins over `GRADFLOW_LOG`. The variable takes full
//! `EnvFilter` directives, e.g. `GRADFLOW_LOG=info,gradflow::dag=trace`
//! to follow individual jobs through a pass. Without either, `info`.
//!
//! Events go to stderr; stdout only carries the buffer dump.

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "GRADFLOW_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(cli_level, env_value.as_deref());

    // Worker thread names tell interleaved node events apart.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing tracing subscriber")?;

    if let Some(value) = rejected {
        warn!(%value, "ignoring unparsable {LOG_ENV}; using `{DEFAULT_DIRECTIVE}`");
    }
    Ok(())
}

/// Pick the filter for this run. The second value is an env setting that
/// failed to parse, reported once the subscriber is up.
pub fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> (EnvFilter, Option<String>) {
    if let Some(level) = cli_level {
        return (EnvFilter::new(directive(level)), None);
    }

    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => match EnvFilter::try_new(value) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(value.to_string())),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVE), None),
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
