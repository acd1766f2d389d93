// src/project.rs

//! Project metadata from `package.json`.

use std::path::Path;

use serde::Deserialize;

use crate::errors::{LhpciError, Result};
use crate::fs::FileSystem;

pub const PACKAGE_MANIFEST: &str = "package.json";

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    name: Option<String>,
}

/// Name of the project in `dir`.
///
/// `Ok(None)` when there is no manifest; a manifest without a `name` yields
/// an empty name. A manifest that is not valid JSON is a configuration error.
pub fn read_project_name(fs: &dyn FileSystem, dir: &Path) -> Result<Option<String>> {
    let path = dir.join(PACKAGE_MANIFEST);
    if !fs.exists(&path) {
        return Ok(None);
    }

    let text = fs.read_to_string(&path)?;
    let manifest: PackageManifest = serde_json::from_str(&text)
        .map_err(|e| LhpciError::ConfigError(format!("{path:?} is not valid JSON: {e}")))?;

    Ok(Some(manifest.name.unwrap_or_default()))
}
