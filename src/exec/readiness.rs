// src/exec/readiness.rs

//! Waiting for a process to announce that it is ready.
//!
//! [`wait_for_pattern`] races two watchers against the same handle:
//!
//! - a scan watcher that searches stdout and stderr as chunks arrive, looking
//!   only at new text plus a short overlap of what came before,
//! - a deadline watcher that fires once the timeout has elapsed.
//!
//! Whichever finishes first decides the outcome. Losing the race does not
//! stop the output copy tasks; the handle keeps collecting until the streams
//! close.

use std::fmt;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::errors::{LhpciError, Result};
use crate::exec::launcher::{OutputAccumulator, ProcessHandle};

/// Already scanned output kept in front of new chunks, so a match split
/// across chunk boundaries is still found. Matches longer than this that
/// straddle a boundary are missed.
const SCAN_OVERLAP: usize = 4 * 1024;

/// Case-insensitive text rule that signals readiness.
#[derive(Debug, Clone)]
pub struct ReadinessPattern {
    regex: Regex,
}

impl ReadinessPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                LhpciError::ConfigError(format!("invalid readiness pattern /{pattern}/: {e}"))
            })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// First match of the pattern in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<PatternMatch> {
        self.regex.find(haystack).map(|m| PatternMatch {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
        })
    }

    /// Capture group `group` of the first match, if any.
    pub fn capture(&self, haystack: &str, group: usize) -> Option<String> {
        self.regex
            .captures(haystack)
            .and_then(|caps| caps.get(group))
            .map(|m| m.as_str().to_string())
    }
}

impl fmt::Display for ReadinessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.regex.as_str())
    }
}

/// Where the pattern matched. Offsets are bytes into the searched text; for
/// [`wait_for_pattern`] that is the stream the match was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Result of one detection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Matched(PatternMatch),
    TimedOut { waited: Duration },
}

impl ReadinessOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, ReadinessOutcome::Matched(_))
    }
}

/// Wait until `pattern` shows up in the output of `handle`, or `timeout`
/// elapses.
///
/// Process exit is not interpreted here: if the process dies without
/// printing a match, this simply times out. Callers that care race this
/// against [`ProcessHandle::wait_exit`].
pub async fn wait_for_pattern(
    handle: &ProcessHandle,
    pattern: &ReadinessPattern,
    timeout: Duration,
) -> ReadinessOutcome {
    let started = Instant::now();

    let outcome = tokio::select! {
        // A match already present at the deadline still counts.
        biased;

        found = scan_output(handle, pattern) => ReadinessOutcome::Matched(found),
        _ = sleep(timeout) => ReadinessOutcome::TimedOut { waited: started.elapsed() },
    };

    debug!(
        pid = handle.pid(),
        pattern = %pattern,
        matched = outcome.is_matched(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "readiness detection finished"
    );

    outcome
}

async fn scan_output(handle: &ProcessHandle, pattern: &ReadinessPattern) -> PatternMatch {
    let mut chunks = handle.subscribe_output();
    let mut stdout = StreamScan::new(handle.stdout());
    let mut stderr = StreamScan::new(handle.stderr());

    loop {
        // Mark the current chunk count as seen before scanning so a chunk
        // appended during the scan still wakes us up.
        chunks.borrow_and_update();

        if let Some(found) = stdout.advance(pattern).or_else(|| stderr.advance(pattern)) {
            return found;
        }

        if chunks.changed().await.is_err() {
            // Both streams closed without a match; leave it to the deadline.
            std::future::pending::<()>().await;
        }
    }
}

/// Incremental search over one output stream.
struct StreamScan<'a> {
    output: &'a OutputAccumulator,
    next_chunk: usize,
    /// Bytes of the stream consumed so far.
    scanned: usize,
    tail: String,
}

impl<'a> StreamScan<'a> {
    fn new(output: &'a OutputAccumulator) -> Self {
        Self {
            output,
            next_chunk: 0,
            scanned: 0,
            tail: String::new(),
        }
    }

    /// Search the chunks that arrived since the last call.
    fn advance(&mut self, pattern: &ReadinessPattern) -> Option<PatternMatch> {
        let fresh = self.output.chunks_from(self.next_chunk);
        if fresh.is_empty() {
            return None;
        }
        self.next_chunk += fresh.len();

        let window_start = self.scanned - self.tail.len();
        let mut window = std::mem::take(&mut self.tail);
        for chunk in &fresh {
            window.push_str(chunk);
            self.scanned += chunk.len();
        }

        if let Some(found) = pattern.find(&window) {
            return Some(PatternMatch {
                start: window_start + found.start,
                end: window_start + found.end,
                text: found.text,
            });
        }

        self.tail = tail_of(&window, SCAN_OVERLAP).to_string();
        None
    }
}

/// The last `max` bytes of `text` at most, starting on a char boundary.
fn tail_of(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
