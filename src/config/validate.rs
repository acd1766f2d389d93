// src/config/validate.rs

use std::path::PathBuf;

use crate::config::duration::parse_duration;
use crate::config::model::{
    CollectSection, CollectSettings, DEFAULT_CHROME_BIN, DEFAULT_LIGHTHOUSE_BIN,
    DEFAULT_NUMBER_OF_RUNS, DEFAULT_PORT, DEFAULT_READY_PATTERN, DEFAULT_READY_TIMEOUT,
    DEFAULT_REPORT_DIR,
};
use crate::errors::{LhpciError, Result};
use crate::exec::ReadinessPattern;

impl TryFrom<CollectSection> for CollectSettings {
    type Error = crate::errors::LhpciError;

    fn try_from(raw: CollectSection) -> std::result::Result<Self, Self::Error> {
        validate_section(&raw)?;

        let port = raw.port.unwrap_or(DEFAULT_PORT);
        let ready_timeout = parse_duration(
            raw.start_server_ready_timeout
                .as_deref()
                .unwrap_or(DEFAULT_READY_TIMEOUT),
        )
        .map_err(LhpciError::ConfigError)?;

        let urls = if raw.url.is_empty() {
            vec![format!("http://localhost:{port}/")]
        } else {
            raw.url
        };

        Ok(CollectSettings {
            urls,
            report_dir: PathBuf::from(raw.report_dir.as_deref().unwrap_or(DEFAULT_REPORT_DIR)),
            start_server_command: raw.start_server_command,
            ready_pattern: raw
                .start_server_ready_pattern
                .unwrap_or_else(|| DEFAULT_READY_PATTERN.to_string()),
            ready_timeout,
            port,
            number_of_runs: raw.number_of_runs.unwrap_or(DEFAULT_NUMBER_OF_RUNS),
            headful: raw.headful.unwrap_or(false),
            additive: raw.additive.unwrap_or(false),
            lighthouse_bin: raw
                .lighthouse_bin
                .unwrap_or_else(|| DEFAULT_LIGHTHOUSE_BIN.to_string()),
            chrome_bin: raw
                .chrome_bin
                .unwrap_or_else(|| DEFAULT_CHROME_BIN.to_string()),
            login_service_url: raw.login_service_url,
        })
    }
}

/// Check the values that are present; missing values fall back to defaults.
pub fn validate_section(cfg: &CollectSection) -> Result<()> {
    validate_port_and_runs(cfg)?;
    validate_strings(cfg)?;
    validate_pattern_and_timeout(cfg)?;
    Ok(())
}

fn validate_port_and_runs(cfg: &CollectSection) -> Result<()> {
    if cfg.port == Some(0) {
        return Err(LhpciError::ConfigError(
            "[collect].port must be between 1 and 65535 (got 0)".to_string(),
        ));
    }
    if cfg.number_of_runs == Some(0) {
        return Err(LhpciError::ConfigError(
            "[collect].number_of_runs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_strings(cfg: &CollectSection) -> Result<()> {
    if let Some(dir) = &cfg.report_dir {
        if dir.trim().is_empty() {
            return Err(LhpciError::ConfigError(
                "[collect].report_dir must not be empty".to_string(),
            ));
        }
    }
    if let Some(cmd) = &cfg.start_server_command {
        if cmd.trim().is_empty() {
            return Err(LhpciError::ConfigError(
                "[collect].start_server_command must not be empty".to_string(),
            ));
        }
    }
    for url in &cfg.url {
        if reqwest::Url::parse(url).is_err() {
            return Err(LhpciError::ConfigError(format!(
                "[collect].url '{url}' is not an absolute URL"
            )));
        }
    }
    Ok(())
}

fn validate_pattern_and_timeout(cfg: &CollectSection) -> Result<()> {
    if let Some(pattern) = &cfg.start_server_ready_pattern {
        ReadinessPattern::new(pattern)?;
    }
    if let Some(timeout) = &cfg.start_server_ready_timeout {
        let parsed = parse_duration(timeout).map_err(LhpciError::ConfigError)?;
        if parsed.is_zero() {
            return Err(LhpciError::ConfigError(
                "[collect].start_server_ready_timeout must be greater than zero".to_string(),
            ));
        }
    }
    Ok(())
}
