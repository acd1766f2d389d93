// src/collect.rs

//! The `collect` command: every URL, `number_of_runs` times, one run after
//! the other.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::artifacts::{ArtifactWriter, RunResult};
use crate::config::CollectSettings;
use crate::errors::Result;
use crate::exec::{ProcessTreeTerminator, ReadinessPattern, SystemTerminator};
use crate::fs::{FileSystem, RealFileSystem};
use crate::login::{HttpLoginProvider, LoginProvider, NoLogin};
use crate::measure::LighthouseCli;
use crate::orchestrator::{Collaborators, RunOrchestrator, RunPlan, resolve_start_command};
use crate::project::read_project_name;
use crate::session::ChromeLauncher;

/// Production collaborators for `settings`.
pub fn production_collaborators(settings: &CollectSettings) -> Result<Collaborators> {
    let terminator: Arc<dyn ProcessTreeTerminator> = Arc::new(SystemTerminator);
    let login: Arc<dyn LoginProvider> = match &settings.login_service_url {
        Some(url) => Arc::new(HttpLoginProvider::new(url.clone())?),
        None => Arc::new(NoLogin),
    };

    Ok(Collaborators {
        engine: Arc::new(LighthouseCli::new(settings.lighthouse_bin.clone())),
        browser: Arc::new(ChromeLauncher::new(
            settings.chrome_bin.clone(),
            settings.headful,
            Arc::clone(&terminator),
        )),
        login,
        terminator,
        fs: Arc::new(RealFileSystem),
    })
}

/// Run the whole collection in `root` with the given collaborators.
///
/// Stops at the first failed run.
pub async fn collect_with(
    settings: &CollectSettings,
    collab: Collaborators,
    root: &Path,
    ci: bool,
) -> Result<Vec<RunResult>> {
    let fs: &dyn FileSystem = collab.fs.as_ref();
    let report_dir = root.join(&settings.report_dir);

    if !settings.additive {
        ArtifactWriter::new(Arc::clone(&collab.fs), report_dir.clone()).clear_previous()?;
    }

    let project_name = read_project_name(fs, root)?;
    let server = resolve_start_command(
        settings.start_server_command.as_deref(),
        settings.port,
        fs,
        root,
    )?;
    let ready_pattern = ReadinessPattern::new(&settings.ready_pattern)?;

    let mut orchestrator = RunOrchestrator::new(collab);
    let mut results = Vec::new();

    for url in &settings.urls {
        for run in 1..=settings.number_of_runs {
            info!(url = %url, run, of = settings.number_of_runs, "starting collection run");
            let plan = RunPlan {
                server: server.clone(),
                ready_pattern: ready_pattern.clone(),
                ready_timeout: settings.ready_timeout,
                base_url: url.clone(),
                project_name: project_name.clone(),
                report_dir: report_dir.clone(),
                ci,
            };
            results.push(orchestrator.run(&plan).await?);
        }
    }

    info!(runs = results.len(), "collection finished");
    Ok(results)
}

/// `lhpci collect` in the current directory with production collaborators.
pub async fn run_collect(settings: CollectSettings) -> Result<Vec<RunResult>> {
    let collab = production_collaborators(&settings)?;
    collect_with(&settings, collab, Path::new("."), running_in_ci()).await
}

/// `CI` set to a non-empty value.
pub fn running_in_ci() -> bool {
    std::env::var("CI").is_ok_and(|v| !v.is_empty())
}
