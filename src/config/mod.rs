// src/config/mod.rs

//! Configuration loading and validation for lhpci.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate values and resolve defaults (`validate.rs`).
//! - Merge the file with command-line flags ([`resolve_settings`]).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

use std::path::Path;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{CollectSection, CollectSettings, ConfigFile};
pub use validate::validate_section;

use crate::errors::{LhpciError, Result};

/// Produce the final settings for a `collect` run.
///
/// Precedence: flags / `LHPCI_*` environment (the `overlay`), then the
/// config file, then built-in defaults. An explicitly named config file must
/// exist; the default `Lhpci.toml` is optional.
pub fn resolve_settings(
    config_path: Option<&Path>,
    overlay: CollectSection,
) -> Result<CollectSettings> {
    let file = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(LhpciError::ConfigError(format!(
                    "config file {:?} does not exist",
                    path
                )));
            }
            load_and_validate(path)?
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                load_and_validate(&path)?
            } else {
                ConfigFile::default()
            }
        }
    };

    CollectSettings::try_from(file.collect.merged_with(overlay))
}
