// tests/collect.rs
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;

use lhpci::collect::collect_with;
use lhpci::errors::LhpciError;
use lhpci::fs::RealFileSystem;
use lhpci_test_utils::builders::SettingsBuilder;
use lhpci_test_utils::fakes::Fakes;
use lhpci_test_utils::{init_tracing, with_timeout};

const READY_SERVER: &str = "echo server ready && sleep 100";

fn artifact_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_every_url_is_collected_number_of_runs_times() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("package.json"), r#"{"name":"shop"}"#).unwrap();

    let settings = SettingsBuilder::new(READY_SERVER)
        .urls(&["http://localhost:12306/", "http://localhost:12306/about"])
        .runs(2)
        .build();
    let fakes = Fakes::new(Arc::new(RealFileSystem));

    let results = with_timeout(collect_with(&settings, fakes.collaborators(), root.path(), false))
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    let urls: Vec<String> = fakes.engine.calls().into_iter().map(|(url, _)| url).collect();
    assert_eq!(
        urls,
        vec![
            "http://localhost:12306/",
            "http://localhost:12306/",
            "http://localhost:12306/about",
            "http://localhost:12306/about",
        ]
    );
    assert_eq!(fakes.terminator.calls().len(), 4);
    assert_eq!(fakes.login.calls(), vec!["shop"; 4]);

    let names = artifact_names(&root.path().join("lhreport"));
    assert_eq!(names.len(), 8);
    assert!(names.iter().all(|n| n.ends_with("-shop.json") || n.ends_with("-shop.html")));
}

#[tokio::test]
async fn test_previous_artifacts_cleared_unless_additive() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let report_dir = root.path().join("lhreport");
    std::fs::create_dir_all(&report_dir).unwrap();
    std::fs::write(report_dir.join("lhpci-1-old.json"), "{}").unwrap();
    std::fs::write(report_dir.join("keep.txt"), "x").unwrap();

    let fakes = Fakes::new(Arc::new(RealFileSystem));
    let additive = SettingsBuilder::new(READY_SERVER).additive(true).build();
    with_timeout(collect_with(&additive, fakes.collaborators(), root.path(), false))
        .await
        .unwrap();
    let names = artifact_names(&report_dir);
    assert!(names.contains(&"lhpci-1-old.json".to_string()));
    assert_eq!(names.len(), 4);

    let fresh = SettingsBuilder::new(READY_SERVER).build();
    with_timeout(collect_with(&fresh, fakes.collaborators(), root.path(), false))
        .await
        .unwrap();
    let names = artifact_names(&report_dir);
    assert!(!names.contains(&"lhpci-1-old.json".to_string()));
    assert!(names.contains(&"keep.txt".to_string()));
    assert_eq!(names.len(), 3);
}

#[tokio::test]
async fn test_first_failure_stops_collection() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();

    let settings = SettingsBuilder::new("exit 1")
        .urls(&["http://localhost:12306/", "http://localhost:12306/about"])
        .runs(3)
        .build();
    let fakes = Fakes::new(Arc::new(RealFileSystem));

    let err = with_timeout(collect_with(&settings, fakes.collaborators(), root.path(), false))
        .await
        .unwrap_err();

    assert!(matches!(err, LhpciError::ProcessExitedPrematurely { .. }), "got {err:?}");
    assert_eq!(fakes.terminator.calls().len(), 1);
    assert!(fakes.engine.calls().is_empty());
}

#[tokio::test]
async fn test_default_server_needs_a_build_dir() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();

    let mut settings = SettingsBuilder::new(READY_SERVER).build();
    settings.start_server_command = None;
    let fakes = Fakes::new(Arc::new(RealFileSystem));

    let err = with_timeout(collect_with(&settings, fakes.collaborators(), root.path(), false))
        .await
        .unwrap_err();

    assert!(matches!(err, LhpciError::ConfigError(_)), "got {err:?}");
    assert!(fakes.terminator.calls().is_empty());
}
