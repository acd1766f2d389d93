// tests/terminate.rs
#![cfg(target_os = "linux")]

use std::time::Duration;

use lhpci::errors::LhpciError;
use lhpci::exec::{
    LaunchSpec, ProcessTreeTerminator, ReadinessPattern, SystemTerminator, launch, wait_for_pattern,
};
use lhpci_test_utils::{init_tracing, pid_alive, with_timeout};

/// Pids printed as `child=<pid>` lines.
fn child_pids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("child="))
        .filter_map(|pid| pid.trim().parse().ok())
        .collect()
}

async fn wait_until_gone(pids: &[u32]) {
    for _ in 0..50 {
        if pids.iter().all(|pid| !pid_alive(*pid)) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn test_terminate_kills_whole_tree() {
    init_tracing();

    let handle = launch(&LaunchSpec::new(
        "sleep 100 & echo child=$!; sh -c 'sleep 100' & echo child=$!; echo spawned; wait",
    ))
    .unwrap();
    let spawned = ReadinessPattern::new("spawned").unwrap();
    let outcome = with_timeout(wait_for_pattern(&handle, &spawned, Duration::from_secs(5))).await;
    assert!(outcome.is_matched());

    let children = child_pids(&handle.stdout().text());
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|pid| pid_alive(*pid)));

    handle.terminate(&SystemTerminator);
    with_timeout(handle.wait_exit()).await;

    let mut all = children.clone();
    all.push(handle.pid());
    wait_until_gone(&all).await;
    for pid in all {
        assert!(!pid_alive(pid), "pid {pid} survived termination");
    }
}

#[tokio::test]
async fn test_terminate_is_idempotent_on_exited_tree() {
    init_tracing();

    let handle = launch(&LaunchSpec::new("true")).unwrap();
    with_timeout(handle.wait_exit()).await;

    handle.terminate(&SystemTerminator);
    handle.terminate(&SystemTerminator);
    SystemTerminator.terminate(handle.pid());
    assert!(!handle.is_alive());
}

#[tokio::test]
async fn test_unspawnable_command_is_launch_failure() {
    init_tracing();

    let spec = LaunchSpec::new("echo hi").current_dir("/nonexistent/lhpci-test-dir");
    match launch(&spec) {
        Err(LhpciError::LaunchFailed { command, .. }) => assert_eq!(command, "echo hi"),
        Err(other) => panic!("expected LaunchFailed, got {other:?}"),
        Ok(_) => panic!("expected LaunchFailed, got a running process"),
    }
}
