// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every `collect` option can also be given through an `LHPCI_*`
//! environment variable; flags left unset fall back to the config file and
//! then to built-in defaults (see [`crate::config::resolve_settings`]).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::CollectSection;

/// Command-line arguments for `lhpci`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lhpci",
    version,
    about = "Start a local server, run Lighthouse against it and keep the reports.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a TOML config file with a `[collect]` section.
    ///
    /// Default: `Lhpci.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH", env = "LHPCI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LHPCI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run Lighthouse and save the results to a local folder.
    Collect(CollectArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// A URL to run Lighthouse on. Use this flag multiple times to evaluate
    /// multiple URLs.
    #[arg(long = "url", value_name = "URL", env = "LHPCI_URL")]
    pub urls: Vec<String>,

    /// The report directory [default: lhreport]
    #[arg(long, value_name = "DIR", env = "LHPCI_REPORT_DIR", alias = "reportDir")]
    pub report_dir: Option<String>,

    /// The command to run to start the server.
    #[arg(
        long,
        value_name = "CMD",
        env = "LHPCI_START_SERVER_COMMAND",
        alias = "startServerCommand"
    )]
    pub start_server_command: Option<String>,

    /// Pattern to listen for in the server output [default: listen|ready]
    #[arg(
        long,
        value_name = "REGEX",
        env = "LHPCI_START_SERVER_READY_PATTERN",
        alias = "startServerReadyPattern"
    )]
    pub start_server_ready_pattern: Option<String>,

    /// How long to wait for the ready pattern before carrying on anyway
    /// [default: 10s]
    #[arg(long, value_name = "DURATION", env = "LHPCI_START_SERVER_READY_TIMEOUT")]
    pub start_server_ready_timeout: Option<String>,

    /// Port the server should listen on [default: 12306]
    #[arg(long, value_name = "PORT", env = "LHPCI_PORT")]
    pub port: Option<u16>,

    /// The number of times to run Lighthouse [default: 3]
    #[arg(
        short = 'n',
        long,
        value_name = "N",
        env = "LHPCI_NUMBER_OF_RUNS",
        alias = "numberOfRuns"
    )]
    pub number_of_runs: Option<u32>,

    /// Run with a headful Chrome.
    #[arg(long, env = "LHPCI_HEADFUL")]
    pub headful: bool,

    /// Skips clearing of previous collect data.
    #[arg(long, env = "LHPCI_ADDITIVE")]
    pub additive: bool,

    /// Lighthouse executable [default: lighthouse]
    #[arg(long, value_name = "PATH", env = "LHPCI_LIGHTHOUSE_BIN")]
    pub lighthouse_bin: Option<String>,

    /// Chrome executable [default: google-chrome]
    #[arg(long, value_name = "PATH", env = "LHPCI_CHROME_BIN")]
    pub chrome_bin: Option<String>,

    /// Project settings endpoint of the login service.
    #[arg(long, value_name = "URL", env = "LHPCI_LOGIN_SERVICE_URL")]
    pub login_service_url: Option<String>,
}

impl CollectArgs {
    /// The flags as an overlay for the config file. Boolean switches only
    /// override the file when they are actually set.
    pub fn to_overlay(&self) -> CollectSection {
        CollectSection {
            url: self.urls.clone(),
            report_dir: self.report_dir.clone(),
            start_server_command: self.start_server_command.clone(),
            start_server_ready_pattern: self.start_server_ready_pattern.clone(),
            start_server_ready_timeout: self.start_server_ready_timeout.clone(),
            port: self.port,
            number_of_runs: self.number_of_runs,
            headful: self.headful.then_some(true),
            additive: self.additive.then_some(true),
            lighthouse_bin: self.lighthouse_bin.clone(),
            chrome_bin: self.chrome_bin.clone(),
            login_service_url: self.login_service_url.clone(),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
