use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lhpci::errors::{LhpciError, Result};
use lhpci::exec::{ProcessTreeTerminator, SystemTerminator};
use lhpci::fs::FileSystem;
use lhpci::login::{LoginProvider, LoginResult};
use lhpci::measure::{MeasureOptions, Measurement, MeasurementEngine};
use lhpci::orchestrator::Collaborators;
use lhpci::session::{AutomationSession, BrowserEndpoint, BrowserLauncher};
use lhpci::types::BoxFuture;
use serde_json::json;

/// Terminator that records every call and then really kills the tree, so
/// tests never leak processes.
#[derive(Debug, Clone, Default)]
pub struct RecordingTerminator {
    calls: Arc<Mutex<Vec<u32>>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessTreeTerminator for RecordingTerminator {
    fn terminate(&self, root_pid: u32) {
        self.calls.lock().unwrap().push(root_pid);
        SystemTerminator.terminate(root_pid);
    }
}

/// A fake engine that:
/// - records the URL and options of every call
/// - returns a fixed payload, or `MeasurementFailed` when told to fail.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    calls: Arc<Mutex<Vec<(String, MeasureOptions)>>>,
    fail: Arc<AtomicBool>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let engine = Self::default();
        engine.fail.store(true, Ordering::SeqCst);
        engine
    }

    pub fn calls(&self) -> Vec<(String, MeasureOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MeasurementEngine for FakeEngine {
    fn measure<'a>(
        &'a self,
        url: &'a str,
        options: &'a MeasureOptions,
    ) -> BoxFuture<'a, Result<Measurement>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), options.clone()));

            if self.fail.load(Ordering::SeqCst) {
                return Err(LhpciError::MeasurementFailed("injected failure".into()));
            }

            Ok(Measurement {
                payload: json!({
                    "requestedUrl": url,
                    "categories": { "performance": { "score": 0.9 } }
                }),
                rendered_report: format!("<html><body>{url}</body></html>"),
            })
        })
    }
}

/// Shared counters of every [`FakeSession`] a [`FakeBrowser`] opened.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub aborted: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    stats: Arc<SessionStats>,
    fail_open: bool,
}

impl FakeBrowser {
    pub const PORT: u16 = 9222;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }
}

impl BrowserLauncher for FakeBrowser {
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn AutomationSession>>> {
        Box::pin(async move {
            if self.fail_open {
                return Err(LhpciError::SessionFailed("injected failure".into()));
            }
            self.stats.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                stats: Arc::clone(&self.stats),
            }) as Box<dyn AutomationSession>)
        })
    }
}

pub struct FakeSession {
    stats: Arc<SessionStats>,
}

impl AutomationSession for FakeSession {
    fn endpoint(&self) -> BrowserEndpoint {
        BrowserEndpoint {
            port: FakeBrowser::PORT,
            ws_url: None,
        }
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn abort(&mut self) {
        self.stats.aborted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Login provider with a canned answer.
#[derive(Debug, Clone, Default)]
pub struct FakeLogin {
    result: Option<LoginResult>,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeLogin {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn returning(result: LoginResult) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl LoginProvider for FakeLogin {
    fn login<'a>(&'a self, project_name: &'a str) -> BoxFuture<'a, Result<Option<LoginResult>>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(project_name.to_string());
            if self.fail {
                return Err(LhpciError::LoginFailed("injected failure".into()));
            }
            Ok(self.result.clone())
        })
    }
}

/// One set of fakes plus handles to inspect them after a run.
#[derive(Debug, Clone)]
pub struct Fakes {
    pub engine: FakeEngine,
    pub browser: FakeBrowser,
    pub login: FakeLogin,
    pub terminator: RecordingTerminator,
    pub fs: Arc<dyn FileSystem>,
}

impl Fakes {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            engine: FakeEngine::new(),
            browser: FakeBrowser::new(),
            login: FakeLogin::none(),
            terminator: RecordingTerminator::new(),
            fs,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            engine: Arc::new(self.engine.clone()),
            browser: Arc::new(self.browser.clone()),
            login: Arc::new(self.login.clone()),
            terminator: Arc::new(self.terminator.clone()),
            fs: Arc::clone(&self.fs),
        }
    }
}
