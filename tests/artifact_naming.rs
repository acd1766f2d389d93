// tests/artifact_naming.rs

use std::collections::HashSet;
use std::sync::Arc;

use lhpci::artifacts::{ArtifactWriter, artifact_stem, is_artifact_name};
use lhpci::fs::RealFileSystem;
use lhpci::fs::mock::MockFileSystem;
use lhpci::measure::Measurement;
use proptest::prelude::*;
use serde_json::json;

fn measurement() -> Measurement {
    Measurement {
        payload: json!({"score": 1}),
        rendered_report: "<html/>".to_string(),
    }
}

proptest! {
    #[test]
    fn stem_embeds_timestamp_and_project(
        ts in 0i64..4_102_444_800_000,
        project in "[a-z0-9@/-]{0,16}"
    ) {
        let stem = artifact_stem(ts, &project);
        let expected_prefix = format!("lhpci-{ts}-");
        prop_assert!(stem.starts_with(&expected_prefix));
        prop_assert!(stem.ends_with(&project.replace('/', "-")));
        prop_assert!(!stem.contains('/'));
        let json_name = format!("{stem}.json");
        let html_name = format!("{stem}.html");
        prop_assert!(is_artifact_name(&json_name));
        prop_assert!(is_artifact_name(&html_name));
    }

    #[test]
    fn repeated_writes_never_share_a_name(ts in 0i64..1_000_000, writes in 1usize..8) {
        let fs = MockFileSystem::new();
        let writer = ArtifactWriter::new(Arc::new(fs), "./lhreport");

        let mut seen = HashSet::new();
        for _ in 0..writes {
            let result = writer.write("app", &measurement(), ts).unwrap();
            let json_stem = result.json_path.file_stem().unwrap().to_owned();
            let html_stem = result.html_path.file_stem().unwrap().to_owned();
            prop_assert_eq!(&json_stem, &html_stem);
            prop_assert!(seen.insert(json_stem));
        }
    }
}

#[test]
fn scoped_package_name_writes_into_report_dir() {
    let root = tempfile::tempdir().unwrap();
    let report_dir = root.path().join("lhreport");
    let writer = ArtifactWriter::new(Arc::new(RealFileSystem), &report_dir);

    let result = writer.write("@acme/shop", &measurement(), 1).unwrap();

    assert_eq!(result.json_path, report_dir.join("lhpci-1-@acme-shop.json"));
    assert!(result.json_path.is_file());
    assert!(result.html_path.is_file());
    assert_eq!(std::fs::read_dir(&report_dir).unwrap().count(), 2);
}
