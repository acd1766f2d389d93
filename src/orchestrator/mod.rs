// src/orchestrator/mod.rs

//! One collection run, start to finish.
//!
//! ```text
//! Idle -> ServerStarting -> ServerReady | ServerDegraded -> Measuring
//!      -> Persisting -> TearingDown -> Done
//! ```
//!
//! Any stage may fail; the run then goes through `TearingDown` and ends in
//! `Failed`. Everything the run starts is owned by a [`Teardown`] guard so
//! that cleanup happens on every exit path, including cancellation.

pub mod server;
pub mod teardown;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::artifacts::{ArtifactWriter, RunResult};
use crate::errors::{LhpciError, Result};
use crate::exec::{
    LaunchSpec, ProcessExit, ProcessHandle, ProcessTreeTerminator, ReadinessOutcome,
    ReadinessPattern, launch, wait_for_pattern,
};
use crate::fs::FileSystem;
use crate::login::LoginProvider;
use crate::measure::{MeasureOptions, MeasurementEngine};
use crate::session::{BrowserLauncher, NavigationHook, SessionAuth};

pub use server::{find_build_dir, resolve_start_command};
pub use teardown::Teardown;

/// How long to keep reading output after the server exited on its own.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ServerStarting,
    ServerReady,
    ServerDegraded,
    Measuring,
    Persisting,
    TearingDown,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The external systems a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn MeasurementEngine>,
    pub browser: Arc<dyn BrowserLauncher>,
    pub login: Arc<dyn LoginProvider>,
    pub terminator: Arc<dyn ProcessTreeTerminator>,
    pub fs: Arc<dyn FileSystem>,
}

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub server: LaunchSpec,
    pub ready_pattern: ReadinessPattern,
    pub ready_timeout: Duration,
    /// URL to measure, before any login page suffix.
    pub base_url: String,
    /// `None` when the working directory has no `package.json`.
    pub project_name: Option<String>,
    pub report_dir: PathBuf,
    /// Running under continuous integration: server output is dumped on a
    /// readiness timeout.
    pub ci: bool,
}

pub struct RunOrchestrator {
    collab: Collaborators,
    states: Vec<RunState>,
}

impl RunOrchestrator {
    pub fn new(collab: Collaborators) -> Self {
        Self {
            collab,
            states: Vec::new(),
        }
    }

    /// States visited by the most recent run, in order.
    pub fn states(&self) -> &[RunState] {
        &self.states
    }

    pub async fn run(&mut self, plan: &RunPlan) -> Result<RunResult> {
        self.states.clear();
        self.transition(RunState::Idle);

        let mut teardown = Teardown::new(Arc::clone(&self.collab.terminator));
        let outcome = self.run_stages(plan, &mut teardown).await;

        self.transition(RunState::TearingDown);
        teardown.release().await;

        match outcome {
            Ok(result) => {
                self.transition(RunState::Done);
                Ok(result)
            }
            Err(err) => {
                self.transition(RunState::Failed);
                error!(error = %err, "run failed");
                Err(err)
            }
        }
    }

    async fn run_stages(&mut self, plan: &RunPlan, teardown: &mut Teardown) -> Result<RunResult> {
        self.transition(RunState::ServerStarting);
        let server = Arc::new(launch(&plan.server)?);
        teardown.track_server(Arc::clone(&server));

        let readiness = self.await_readiness(&server, plan).await?;
        println!("Started a web server with \"{}\"...", plan.server.command());

        match readiness {
            ReadinessOutcome::Matched(found) => {
                info!(pid = server.pid(), matched = %found.text, "server ready");
                self.transition(RunState::ServerReady);
            }
            ReadinessOutcome::TimedOut { waited } => {
                self.report_degraded(&server, plan, waited);
                self.transition(RunState::ServerDegraded);
            }
        }

        let (target_url, auth) = self.resolve_target(plan).await?;

        self.transition(RunState::Measuring);
        let hook = NavigationHook::new(target_url.clone(), auth);
        let session = self.collab.browser.open().await?;
        let endpoint = session.endpoint();
        teardown.track_session(session);

        ensure_alive(&server)?;

        let options = MeasureOptions {
            port: endpoint.port,
            navigation: Some(hook),
        };
        info!(url = %target_url, port = endpoint.port, "measuring");
        let measurement = self.collab.engine.measure(&target_url, &options).await?;

        self.transition(RunState::Persisting);
        let writer = ArtifactWriter::new(Arc::clone(&self.collab.fs), plan.report_dir.clone());
        let result = writer.write_now(plan.project_name.as_deref().unwrap_or(""), &measurement)?;

        println!("Lighthouse Done");
        Ok(result)
    }

    /// Race readiness detection against the server exiting.
    async fn await_readiness(
        &self,
        server: &ProcessHandle,
        plan: &RunPlan,
    ) -> Result<ReadinessOutcome> {
        let detect = wait_for_pattern(server, &plan.ready_pattern, plan.ready_timeout);
        tokio::select! {
            outcome = detect => Ok(outcome),
            exit = server.wait_exit() => {
                // The banner may still be in flight in the pipes.
                server.drain_output(OUTPUT_DRAIN_GRACE).await;
                match plan.ready_pattern.find(&server.combined_output()) {
                    Some(found) => Ok(ReadinessOutcome::Matched(found)),
                    None => Err(exited_prematurely(server, exit)),
                }
            }
        }
    }

    fn report_degraded(&self, server: &ProcessHandle, plan: &RunPlan, waited: Duration) {
        let timed_out = LhpciError::ReadinessTimedOut {
            pattern: plan.ready_pattern.as_str().to_string(),
            waited,
        };
        warn!(pid = server.pid(), "{timed_out}; continuing");

        println!("WARNING: Timed out waiting for the server to start listening.");
        println!(
            "         Ensure the server prints a pattern that matches {} when it is ready.",
            plan.ready_pattern
        );
        if plan.ci {
            eprintln!(
                "\nServer Output:\n{}\n{}",
                server.stdout().text(),
                server.stderr().text()
            );
        }
    }

    /// Final URL and auth, from the login exchange when the project has one.
    async fn resolve_target(&self, plan: &RunPlan) -> Result<(String, Option<SessionAuth>)> {
        let project = match plan.project_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Ok((plan.base_url.clone(), None)),
        };

        let Some(login) = self.collab.login.login(project).await? else {
            return Ok((plan.base_url.clone(), None));
        };

        let mut url = plan.base_url.clone();
        if let Some(suffix) = login.page_url.as_deref() {
            url.push_str(suffix);
        }
        let auth = login.token.map(|token| SessionAuth { token });
        Ok((url, auth))
    }

    fn transition(&mut self, state: RunState) {
        info!(%state, "run state");
        self.states.push(state);
    }
}

fn ensure_alive(server: &ProcessHandle) -> Result<()> {
    match server.try_exit() {
        Some(exit) => Err(exited_prematurely(server, exit)),
        None if !server.is_alive() => Err(exited_prematurely(server, ProcessExit::default())),
        None => Ok(()),
    }
}

fn exited_prematurely(server: &ProcessHandle, exit: ProcessExit) -> LhpciError {
    LhpciError::ProcessExitedPrematurely {
        command: server.command().to_string(),
        exit_code: exit.code,
        stdout: server.stdout().text(),
        stderr: server.stderr().text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_matches_variant_name() {
        assert_eq!(RunState::ServerDegraded.to_string(), "ServerDegraded");
        assert_eq!(RunState::Failed.to_string(), "Failed");
    }
}
