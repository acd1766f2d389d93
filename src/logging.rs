// src/logging.rs

//! Logging setup for `lhpci` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (applies to `lhpci` itself)
//! 2. `LHPCI_LOG`, either a bare level (`debug`) or full directives
//!    (`lhpci=debug,reqwest=info`)
//! 3. `info`
//!
//! HTTP client internals are capped at `warn` unless a directive names them.
//! Logs go to STDERR; stdout carries the progress lines a user reads
//! (server started, warnings, `Lighthouse Done`).

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV: &str = "LHPCI_LOG";
const QUIET_DEPENDENCIES: [&str; 3] = ["hyper", "hyper_util", "reqwest"];

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env_value.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    let directives = filter_directives(cli_level, env_value);
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{directives}'"))
}

fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    let base = match (cli_level, env_value.map(str::trim)) {
        (Some(lvl), _) => level_name(lvl).to_string(),
        (None, Some(value)) if !value.is_empty() => value.to_string(),
        _ => "info".to_string(),
    };

    let mut directives = vec![base.clone()];
    for dep in QUIET_DEPENDENCIES {
        if !base.split(',').any(|d| d.trim().starts_with(dep)) {
            directives.push(format!("{dep}=warn"));
        }
    }
    directives.join(",")
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
