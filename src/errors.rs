// src/errors.rs

//! Crate-wide error type.
//!
//! Only `ReadinessTimedOut` is recoverable: the orchestrator turns it into a
//! warning and keeps going. Every other variant aborts the run after teardown.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LhpciError {
    #[error("failed to launch `{command}`: {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {waited:?} waiting for output matching /{pattern}/")]
    ReadinessTimedOut { pattern: String, waited: Duration },

    #[error("process `{command}` exited prematurely (exit code {exit_code:?})")]
    ProcessExitedPrematurely {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("measurement failed: {0}")]
    MeasurementFailed(String),

    #[error("failed to write artifact {path:?}: {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("login exchange failed: {0}")]
    LoginFailed(String),

    #[error("automation session error: {0}")]
    SessionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LhpciError {
    /// Captured stdout/stderr of a process, if this error carries any.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            LhpciError::ProcessExitedPrematurely { stdout, stderr, .. } => {
                Some((stdout.as_str(), stderr.as_str()))
            }
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LhpciError>;
