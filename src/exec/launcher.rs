// src/exec/launcher.rs

//! Spawning a command and collecting its output in the background.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::errors::{LhpciError, Result};
use crate::exec::terminate::ProcessTreeTerminator;

const READ_BUF_SIZE: usize = 8 * 1024;

/// What to run. Built once by the caller and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    command: String,
    current_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// A command line that will be run through the platform shell.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            current_dir: None,
            env: Vec::new(),
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn env_overrides(&self) -> &[(String, String)] {
        &self.env
    }

    fn to_command(&self) -> Command {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The child leads its own process group so the whole tree can be
        // signalled at once on teardown.
        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(0x0000_0200); // CREATE_NEW_PROCESS_GROUP

        cmd
    }
}

/// Append-only record of everything one output stream produced.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone, Default)]
pub struct OutputAccumulator {
    chunks: Arc<Mutex<Vec<String>>>,
}

impl OutputAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, chunk: String) {
        self.lock().push(chunk);
    }

    /// Chunks in arrival order.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Chunks from index `start` on; empty when nothing new arrived.
    pub fn chunks_from(&self, start: usize) -> Vec<String> {
        self.lock().get(start..).map(<[String]>::to_vec).unwrap_or_default()
    }

    pub fn text(&self) -> String {
        self.lock().concat()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A poisoned lock only means a reader panicked mid-clone; the data is
        // append-only so it is still consistent.
        self.chunks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was killed by a signal or waiting failed.
    pub code: Option<i32>,
}

/// A running (or finished) child process plus its collected output.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    command: String,
    alive: Arc<AtomicBool>,
    stdout: OutputAccumulator,
    stderr: OutputAccumulator,
    chunks_seen: watch::Receiver<usize>,
    exit: watch::Receiver<Option<ProcessExit>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Becomes `false` once, when the process exits or is terminated.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn stdout(&self) -> &OutputAccumulator {
        &self.stdout
    }

    pub fn stderr(&self) -> &OutputAccumulator {
        &self.stderr
    }

    /// Everything captured so far: stdout, then stderr.
    pub fn combined_output(&self) -> String {
        let mut text = self.stdout.text();
        let stderr = self.stderr.text();
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        text
    }

    /// Receiver that ticks on every appended chunk (either stream).
    ///
    /// `changed()` starts failing once both streams have closed.
    pub fn subscribe_output(&self) -> watch::Receiver<usize> {
        self.chunks_seen.clone()
    }

    /// Exit information if the process has already been reaped.
    pub fn try_exit(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }

    /// Wait for the process itself to exit.
    pub async fn wait_exit(&self) -> ProcessExit {
        let mut exit = self.exit.clone();
        match exit.wait_for(|state| state.is_some()).await {
            Ok(state) => (*state).unwrap_or_default(),
            // The reaper went away without reporting; nothing left to wait on.
            Err(_) => ProcessExit::default(),
        }
    }

    /// Wait until both output streams have been closed and drained.
    pub async fn wait_output_closed(&self) {
        let mut seen = self.chunks_seen.clone();
        while seen.changed().await.is_ok() {}
    }

    /// Like [`wait_output_closed`](Self::wait_output_closed), but gives up
    /// after `grace` (descendants may keep the pipes open indefinitely).
    pub async fn drain_output(&self, grace: Duration) {
        if tokio::time::timeout(grace, self.wait_output_closed())
            .await
            .is_err()
        {
            debug!(pid = self.pid, "output streams still open after grace period");
        }
    }

    /// Tear down this process and everything it spawned.
    ///
    /// Safe to call on a process that already exited.
    pub fn terminate(&self, terminator: &dyn ProcessTreeTerminator) {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        debug!(pid = self.pid, was_alive, "terminating process tree");
        terminator.terminate(self.pid);
    }
}

/// Spawn `spec` and start collecting its output.
///
/// Returns as soon as the process exists; copying stdout/stderr and reaping
/// the exit status happen on background tasks that outlive any single
/// observer of the handle.
pub fn launch(spec: &LaunchSpec) -> Result<ProcessHandle> {
    info!(cmd = %spec.command(), "starting process");

    let mut child = spec
        .to_command()
        .spawn()
        .map_err(|source| LhpciError::LaunchFailed {
            command: spec.command().to_string(),
            source,
        })?;

    let pid = child.id().ok_or_else(|| LhpciError::LaunchFailed {
        command: spec.command().to_string(),
        source: std::io::Error::other("process exited before its pid could be read"),
    })?;

    let stdout = OutputAccumulator::new();
    let stderr = OutputAccumulator::new();
    let (chunks_tx, chunks_rx) = watch::channel(0usize);
    let chunks_tx = Arc::new(chunks_tx);

    if let Some(out) = child.stdout.take() {
        spawn_copy_task(pid, "stdout", out, stdout.clone(), Arc::clone(&chunks_tx));
    }
    if let Some(err) = child.stderr.take() {
        spawn_copy_task(pid, "stderr", err, stderr.clone(), Arc::clone(&chunks_tx));
    }
    // Only the copy tasks may keep the counter open.
    drop(chunks_tx);

    let alive = Arc::new(AtomicBool::new(true));
    let (exit_tx, exit_rx) = watch::channel(None);
    {
        let alive = Arc::clone(&alive);
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    warn!(pid, error = %err, "failed to wait for process");
                    None
                }
            };
            alive.store(false, Ordering::SeqCst);
            info!(pid, exit_code = ?code, "process exited");
            exit_tx.send_replace(Some(ProcessExit { code }));
        });
    }

    debug!(pid, "process spawned");

    Ok(ProcessHandle {
        pid,
        command: spec.command().to_string(),
        alive,
        stdout,
        stderr,
        chunks_seen: chunks_rx,
        exit: exit_rx,
    })
}

fn spawn_copy_task<R>(
    pid: u32,
    stream: &'static str,
    mut reader: R,
    sink: OutputAccumulator,
    chunks_tx: Arc<watch::Sender<usize>>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUF_SIZE];
        let mut pending = Vec::new();

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = decode_chunk(&mut pending, &buf[..n]);
                    if chunk.is_empty() {
                        continue;
                    }
                    trace!(pid, stream, "{}", chunk.trim_end());
                    sink.push(chunk);
                    chunks_tx.send_modify(|count| *count += 1);
                }
                Err(err) => {
                    debug!(pid, stream, error = %err, "read failed; closing stream");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            sink.push(String::from_utf8_lossy(&pending).into_owned());
            chunks_tx.send_modify(|count| *count += 1);
        }

        debug!(pid, stream, "output stream closed");
    });
}

/// Decode `bytes` as UTF-8, holding back a multi-byte sequence that was cut
/// at the end of the read so it can be completed by the next one.
fn decode_chunk(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);

    let keep_from = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(_) => pending.len(),
    };

    let rest = pending.split_off(keep_from);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}
