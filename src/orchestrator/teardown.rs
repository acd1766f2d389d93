// src/orchestrator/teardown.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::exec::{ProcessHandle, ProcessTreeTerminator};
use crate::session::AutomationSession;

const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Owns everything a run started and releases it exactly once.
///
/// [`release`](Teardown::release) is the normal path. If the guard is
/// dropped without it (error unwinding, panic, the run future being
/// cancelled), `Drop` kills the server tree and aborts the session without
/// awaiting.
pub struct Teardown {
    terminator: Arc<dyn ProcessTreeTerminator>,
    server: Option<Arc<ProcessHandle>>,
    session: Option<Box<dyn AutomationSession>>,
}

impl Teardown {
    pub fn new(terminator: Arc<dyn ProcessTreeTerminator>) -> Self {
        Self {
            terminator,
            server: None,
            session: None,
        }
    }

    pub fn track_server(&mut self, server: Arc<ProcessHandle>) {
        self.server = Some(server);
    }

    pub fn track_session(&mut self, session: Box<dyn AutomationSession>) {
        self.session = Some(session);
    }

    /// Terminate the server tree, then close the session.
    ///
    /// Failures are logged, never returned: teardown must not replace the
    /// error that ended the run.
    pub async fn release(mut self) {
        if let Some(server) = self.server.take() {
            server.terminate(&*self.terminator);
            if timeout(EXIT_GRACE, server.wait_exit()).await.is_err() {
                warn!(pid = server.pid(), "server did not exit after termination");
            }
        }

        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close().await {
                warn!(error = %err, "closing automation session failed");
                session.abort();
            }
        }

        debug!("teardown released");
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            warn!(pid = server.pid(), "teardown dropped without release; killing server tree");
            server.terminate(&*self.terminator);
        }
        if let Some(mut session) = self.session.take() {
            session.abort();
        }
    }
}
