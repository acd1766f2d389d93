// src/exec/terminate.rs

//! Killing a process together with everything it spawned.
//!
//! Start commands are frequently wrappers (`npm start`, `sh -c ...`) that
//! fork the real server, so killing only the direct child would leave a
//! listener bound to the port.

use tracing::debug;

/// Terminates a root process and all of its descendants.
///
/// Best effort and idempotent: terminating an already-exited tree is a no-op
/// and never fails.
pub trait ProcessTreeTerminator: Send + Sync {
    fn terminate(&self, root_pid: u32);
}

/// Platform implementation (process groups on unix, `taskkill /T` on
/// windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTerminator;

impl ProcessTreeTerminator for SystemTerminator {
    fn terminate(&self, root_pid: u32) {
        debug!(pid = root_pid, "terminating process tree");
        platform::terminate_tree(root_pid);
    }
}

#[cfg(unix)]
mod platform {
    use std::collections::{HashMap, VecDeque};

    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::Pid;
    use sysinfo::System;
    use tracing::{debug, warn};

    pub(super) fn terminate_tree(root_pid: u32) {
        // Collect before signalling: once the root dies its children are
        // re-parented and the links are gone.
        let descendants = descendants_of(root_pid);

        // The launcher makes the root a group leader, so its pid is the pgid.
        match killpg(Pid::from_raw(root_pid as i32), Signal::SIGKILL) {
            Ok(()) => debug!(pgid = root_pid, "process group killed"),
            Err(Errno::ESRCH) => debug!(pgid = root_pid, "process group already gone"),
            Err(err) => warn!(pgid = root_pid, error = %err, "failed to kill process group"),
        }

        // The root itself when it was not launched as a group leader, and
        // descendants that moved to a group of their own.
        for pid in std::iter::once(root_pid).chain(descendants) {
            match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) => debug!(pid, "descendant killed"),
                Err(Errno::ESRCH) => {}
                Err(err) => warn!(pid, error = %err, "failed to kill descendant process"),
            }
        }
    }

    /// Transitive children of `root_pid` from a single process-table snapshot.
    pub(super) fn descendants_of(root_pid: u32) -> Vec<u32> {
        let mut system = System::new();
        system.refresh_processes();

        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (pid, process) in system.processes() {
            if let Some(parent) = process.parent() {
                children
                    .entry(parent.as_u32())
                    .or_default()
                    .push(pid.as_u32());
            }
        }

        let mut found = Vec::new();
        let mut queue = VecDeque::from([root_pid]);
        while let Some(pid) = queue.pop_front() {
            if let Some(kids) = children.get(&pid) {
                for &kid in kids {
                    if kid != root_pid && !found.contains(&kid) {
                        found.push(kid);
                        queue.push_back(kid);
                    }
                }
            }
        }
        found
    }
}

#[cfg(windows)]
mod platform {
    use std::process::{Command, Stdio};

    use tracing::{debug, warn};

    pub(super) fn terminate_tree(root_pid: u32) {
        let result = Command::new("taskkill")
            .args(["/PID", &root_pid.to_string(), "/T", "/F"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            // taskkill exits non-zero when the tree is already gone.
            Ok(status) => debug!(pid = root_pid, success = status.success(), "taskkill finished"),
            Err(err) => warn!(pid = root_pid, error = %err, "failed to run taskkill"),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn terminating_a_nonexistent_pid_is_a_no_op() {
        // Above the largest pid_max linux allows.
        let pid = 2_000_000_000;
        SystemTerminator.terminate(pid);
        SystemTerminator.terminate(pid);
    }

    #[test]
    fn descendants_of_unknown_pid_is_empty() {
        assert!(platform::descendants_of(2_000_000_000).is_empty());
    }
}
