// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`launcher`] spawns a command and copies its stdout/stderr into
//!   [`OutputAccumulator`]s on background tasks.
//! - [`readiness`] races a scan of that output for a readiness pattern
//!   against a timeout.
//! - [`terminate`] tears down a process together with all its descendants.

pub mod launcher;
pub mod readiness;
pub mod terminate;

pub use launcher::{LaunchSpec, OutputAccumulator, ProcessExit, ProcessHandle, launch};
pub use readiness::{PatternMatch, ReadinessOutcome, ReadinessPattern, wait_for_pattern};
pub use terminate::{ProcessTreeTerminator, SystemTerminator};
