// src/session/chrome.rs

//! Chrome started with a remote-debugging port.
//!
//! Launching reuses the same launcher and readiness detection as the server:
//! Chrome announces `DevTools listening on ws://HOST:PORT/...` on stderr once
//! the debugging endpoint is up.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::errors::{LhpciError, Result};
use crate::exec::{
    LaunchSpec, ProcessHandle, ProcessTreeTerminator, ReadinessOutcome, ReadinessPattern, launch,
    wait_for_pattern,
};
use crate::session::{AutomationSession, BrowserEndpoint, BrowserLauncher};
use crate::types::BoxFuture;

const DEVTOOLS_PATTERN: &str = r"devtools listening on (ws://\S+)";
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const CLOSE_GRACE: Duration = Duration::from_secs(5);
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Starts Chrome sessions.
#[derive(Clone)]
pub struct ChromeLauncher {
    binary: String,
    headful: bool,
    startup_timeout: Duration,
    terminator: Arc<dyn ProcessTreeTerminator>,
}

impl ChromeLauncher {
    pub fn new(
        binary: impl Into<String>,
        headful: bool,
        terminator: Arc<dyn ProcessTreeTerminator>,
    ) -> Self {
        Self {
            binary: binary.into(),
            headful,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            terminator,
        }
    }

    pub fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    fn command_line(&self, profile_dir: &Path) -> String {
        let mut args = vec![
            format!("\"{}\"", self.binary),
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir=\"{}\"", profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
        ];
        if !self.headful {
            args.push("--headless=new".to_string());
        }
        args.push("about:blank".to_string());
        args.join(" ")
    }

    async fn start(&self) -> Result<ChromeSession> {
        let pattern = ReadinessPattern::new(DEVTOOLS_PATTERN)?;
        let profile = tempfile::Builder::new()
            .prefix("lhpci-chrome-")
            .tempdir()
            .map_err(|e| LhpciError::SessionFailed(format!("creating browser profile dir: {e}")))?;

        let spec = LaunchSpec::new(self.command_line(profile.path()));
        let process = launch(&spec)?;

        let outcome = tokio::select! {
            outcome = wait_for_pattern(&process, &pattern, self.startup_timeout) => outcome,
            exit = process.wait_exit() => {
                process.drain_output(OUTPUT_DRAIN_GRACE).await;
                match pattern.find(&process.combined_output()) {
                    Some(found) => ReadinessOutcome::Matched(found),
                    None => {
                        process.terminate(&*self.terminator);
                        return Err(LhpciError::SessionFailed(format!(
                            "browser exited (code {:?}) before exposing a DevTools endpoint: {}",
                            exit.code,
                            process.stderr().text().trim()
                        )));
                    }
                }
            }
        };

        if let ReadinessOutcome::TimedOut { waited } = outcome {
            process.terminate(&*self.terminator);
            return Err(LhpciError::SessionFailed(format!(
                "browser did not expose a DevTools endpoint within {waited:?}"
            )));
        }

        let endpoint = match pattern
            .capture(&process.combined_output(), 1)
            .ok_or_else(|| "DevTools URL missing from browser output".to_string())
            .and_then(|ws_url| parse_endpoint(&ws_url))
        {
            Ok(endpoint) => endpoint,
            Err(msg) => {
                process.terminate(&*self.terminator);
                return Err(LhpciError::SessionFailed(msg));
            }
        };

        info!(pid = process.pid(), port = endpoint.port, "browser session started");

        Ok(ChromeSession {
            process,
            endpoint,
            terminator: Arc::clone(&self.terminator),
            closed: false,
            _profile: profile,
        })
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn AutomationSession>>> {
        Box::pin(async move {
            let session = self.start().await?;
            Ok(Box::new(session) as Box<dyn AutomationSession>)
        })
    }
}

fn parse_endpoint(ws_url: &str) -> std::result::Result<BrowserEndpoint, String> {
    let parsed = reqwest::Url::parse(ws_url)
        .map_err(|e| format!("invalid DevTools URL '{ws_url}': {e}"))?;
    let port = parsed
        .port()
        .ok_or_else(|| format!("DevTools URL '{ws_url}' has no port"))?;
    Ok(BrowserEndpoint {
        port,
        ws_url: Some(ws_url.to_string()),
    })
}

struct ChromeSession {
    process: ProcessHandle,
    endpoint: BrowserEndpoint,
    terminator: Arc<dyn ProcessTreeTerminator>,
    closed: bool,
    // Removed from disk when the session is dropped.
    _profile: TempDir,
}

impl AutomationSession for ChromeSession {
    fn endpoint(&self) -> BrowserEndpoint {
        self.endpoint.clone()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            self.process.terminate(&*self.terminator);
            if timeout(CLOSE_GRACE, self.process.wait_exit()).await.is_err() {
                warn!(pid = self.process.pid(), "browser did not exit after termination");
            }
            info!(pid = self.process.pid(), "browser session closed");
            Ok(())
        })
    }

    fn abort(&mut self) {
        if !self.closed {
            self.closed = true;
            self.process.terminate(&*self.terminator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::SystemTerminator;

    #[test]
    fn endpoint_port_comes_from_ws_url() {
        let endpoint =
            parse_endpoint("ws://127.0.0.1:40123/devtools/browser/5f0c").unwrap();
        assert_eq!(endpoint.port, 40123);
        assert!(parse_endpoint("ws://127.0.0.1/devtools").is_err());
    }

    #[test]
    fn headless_unless_headful() {
        let launcher = ChromeLauncher::new("chromium", false, Arc::new(SystemTerminator));
        let line = launcher.command_line(Path::new("/tmp/profile"));
        assert!(line.starts_with("\"chromium\" --remote-debugging-port=0"));
        assert!(line.contains("--headless=new"));

        let headful = ChromeLauncher::new("chromium", true, Arc::new(SystemTerminator));
        assert!(!headful.command_line(Path::new("/tmp/p")).contains("--headless"));
    }

    #[tokio::test]
    async fn missing_browser_binary_is_a_session_error() {
        let launcher = ChromeLauncher::new(
            "/nonexistent/lhpci-test-chrome",
            false,
            Arc::new(SystemTerminator),
        )
        .with_startup_timeout(Duration::from_secs(5));

        let err = match launcher.open().await {
            Err(err) => err,
            Ok(_) => panic!("expected the browser launch to fail"),
        };
        assert!(matches!(err, LhpciError::SessionFailed(_)), "got {err:?}");
    }
}
