// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_REPORT_DIR: &str = "lhreport";
pub const DEFAULT_READY_PATTERN: &str = "listen|ready";
pub const DEFAULT_READY_TIMEOUT: &str = "10s";
pub const DEFAULT_PORT: u16 = 12306;
pub const DEFAULT_NUMBER_OF_RUNS: u32 = 3;
pub const DEFAULT_LIGHTHOUSE_BIN: &str = "lighthouse";
pub const DEFAULT_CHROME_BIN: &str = "google-chrome";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [collect]
/// url = ["http://localhost:12306/"]
/// report_dir = "lhreport"
/// start_server_command = "npm run serve"
/// start_server_ready_pattern = "compiled successfully"
/// start_server_ready_timeout = "30s"
/// port = 12306
/// number_of_runs = 1
/// ```
///
/// Every field is optional; command-line flags win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub collect: CollectSection,
}

/// `[collect]` section. Also used as the "overlay" the CLI produces, so
/// that file values and flags can be merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectSection {
    /// Target URLs; each is collected `number_of_runs` times.
    #[serde(default)]
    pub url: Vec<String>,

    #[serde(default)]
    pub report_dir: Option<String>,

    /// Command that starts the server. When unset, a static build directory
    /// (`dist`, `build`, `lib`) is served with `http-server-spa`.
    #[serde(default)]
    pub start_server_command: Option<String>,

    /// Case-insensitive regex matched against the server output.
    #[serde(default)]
    pub start_server_ready_pattern: Option<String>,

    /// Duration string such as `"10s"` or `"500ms"`.
    #[serde(default)]
    pub start_server_ready_timeout: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub number_of_runs: Option<u32>,

    #[serde(default)]
    pub headful: Option<bool>,

    /// Keep artifacts from previous collections.
    #[serde(default)]
    pub additive: Option<bool>,

    #[serde(default)]
    pub lighthouse_bin: Option<String>,

    #[serde(default)]
    pub chrome_bin: Option<String>,

    /// Project settings endpoint of the login service; login is skipped when
    /// unset.
    #[serde(default)]
    pub login_service_url: Option<String>,
}

impl CollectSection {
    /// Field-wise merge where values set in `overlay` win.
    pub fn merged_with(self, overlay: CollectSection) -> CollectSection {
        CollectSection {
            url: if overlay.url.is_empty() {
                self.url
            } else {
                overlay.url
            },
            report_dir: overlay.report_dir.or(self.report_dir),
            start_server_command: overlay.start_server_command.or(self.start_server_command),
            start_server_ready_pattern: overlay
                .start_server_ready_pattern
                .or(self.start_server_ready_pattern),
            start_server_ready_timeout: overlay
                .start_server_ready_timeout
                .or(self.start_server_ready_timeout),
            port: overlay.port.or(self.port),
            number_of_runs: overlay.number_of_runs.or(self.number_of_runs),
            headful: overlay.headful.or(self.headful),
            additive: overlay.additive.or(self.additive),
            lighthouse_bin: overlay.lighthouse_bin.or(self.lighthouse_bin),
            chrome_bin: overlay.chrome_bin.or(self.chrome_bin),
            login_service_url: overlay.login_service_url.or(self.login_service_url),
        }
    }
}

/// Fully resolved and validated settings for `lhpci collect`.
///
/// Built from a [`CollectSection`] via `TryFrom` (see `validate.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSettings {
    pub urls: Vec<String>,
    pub report_dir: PathBuf,
    pub start_server_command: Option<String>,
    pub ready_pattern: String,
    pub ready_timeout: Duration,
    pub port: u16,
    pub number_of_runs: u32,
    pub headful: bool,
    pub additive: bool,
    pub lighthouse_bin: String,
    pub chrome_bin: String,
    pub login_service_url: Option<String>,
}
