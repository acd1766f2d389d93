// src/lib.rs

pub mod artifacts;
pub mod cli;
pub mod collect;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod login;
pub mod measure;
pub mod orchestrator;
pub mod project;
pub mod session;
pub mod types;

use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::resolve_settings;
use crate::errors::Result;

/// High-level entry point used by `main.rs`.
///
/// Resolves settings (flags, then config file, then defaults) and dispatches
/// the subcommand.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Collect(collect_args) => {
            let settings = resolve_settings(args.config.as_deref(), collect_args.to_overlay())?;
            debug!(?settings, "resolved collect settings");
            collect::run_collect(settings).await?;
        }
    }
    Ok(())
}
