// src/artifacts.rs

//! Persisting measurement results.
//!
//! Each run produces a pair `lhpci-<millis>-<project>.json` /
//! `lhpci-<millis>-<project>.html` in the report directory. Both files of a
//! pair share the timestamp; when either name is already taken the
//! timestamp is bumped by one millisecond until both are free.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{LhpciError, Result};
use crate::fs::FileSystem;
use crate::measure::Measurement;

const ARTIFACT_PREFIX: &str = "lhpci-";

/// Where one run's artifacts ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub json_path: PathBuf,
    pub html_path: PathBuf,
    pub payload: Value,
}

/// File name (without extension) for a run.
///
/// Path separators in the project name (scoped packages such as
/// `@acme/shop`) become `-` so the pair stays inside the report directory.
pub fn artifact_stem(timestamp_ms: i64, project: &str) -> String {
    let project = project.replace(['/', '\\'], "-");
    format!("{ARTIFACT_PREFIX}{timestamp_ms}-{project}")
}

/// Whether `name` looks like something [`ArtifactWriter`] produced.
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && (name.ends_with(".json") || name.ends_with(".html"))
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    fs: Arc<dyn FileSystem>,
    report_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(fs: Arc<dyn FileSystem>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Write with the current wall-clock time.
    pub fn write_now(&self, project: &str, measurement: &Measurement) -> Result<RunResult> {
        self.write(project, measurement, chrono::Utc::now().timestamp_millis())
    }

    pub fn write(
        &self,
        project: &str,
        measurement: &Measurement,
        timestamp_ms: i64,
    ) -> Result<RunResult> {
        self.fs
            .create_dir_all(&self.report_dir)
            .map_err(|source| LhpciError::ArtifactWriteFailed {
                path: self.report_dir.clone(),
                source,
            })?;

        let (json_path, html_path) = self.free_pair(project, timestamp_ms);

        let json = serde_json::to_vec(&measurement.payload).map_err(|e| {
            LhpciError::ArtifactWriteFailed {
                path: json_path.clone(),
                source: e.into(),
            }
        })?;
        self.write_file(&json_path, &json)?;
        self.write_file(&html_path, measurement.rendered_report.as_bytes())?;

        info!(json = ?json_path, html = ?html_path, "artifacts written");

        Ok(RunResult {
            json_path,
            html_path,
            payload: measurement.payload.clone(),
        })
    }

    /// Remove artifacts left by earlier collections. A missing report
    /// directory is not an error.
    pub fn clear_previous(&self) -> Result<usize> {
        if !self.fs.is_dir(&self.report_dir) {
            return Ok(0);
        }

        let entries = self.fs.read_dir(&self.report_dir)?;
        let mut removed = 0;
        for path in entries {
            let is_artifact = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_artifact_name);
            if is_artifact && !self.fs.is_dir(&path) {
                self.fs.remove_file(&path)?;
                removed += 1;
            }
        }

        debug!(dir = ?self.report_dir, removed, "cleared previous artifacts");
        Ok(removed)
    }

    fn free_pair(&self, project: &str, timestamp_ms: i64) -> (PathBuf, PathBuf) {
        let mut ts = timestamp_ms;
        loop {
            let stem = artifact_stem(ts, project);
            let json = self.report_dir.join(format!("{stem}.json"));
            let html = self.report_dir.join(format!("{stem}.html"));
            if !self.fs.exists(&json) && !self.fs.exists(&html) {
                return (json, html);
            }
            ts += 1;
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.fs
            .write(path, contents)
            .map_err(|source| LhpciError::ArtifactWriteFailed {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn measurement() -> Measurement {
        Measurement {
            payload: json!({"categories": {"performance": {"score": 0.93}}}),
            rendered_report: "<html>report</html>".to_string(),
        }
    }

    #[test]
    fn writes_pair_and_creates_dir() {
        let fs = MockFileSystem::new();
        let writer = ArtifactWriter::new(Arc::new(fs.clone()), "./lhreport");

        let result = writer.write("shop", &measurement(), 1_700_000_000_000).unwrap();

        assert_eq!(
            result.json_path,
            PathBuf::from("./lhreport/lhpci-1700000000000-shop.json")
        );
        assert_eq!(
            result.html_path,
            PathBuf::from("./lhreport/lhpci-1700000000000-shop.html")
        );
        let html = fs.read_to_string(&result.html_path).unwrap();
        assert_eq!(html, "<html>report</html>");
        let json: Value =
            serde_json::from_str(&fs.read_to_string(&result.json_path).unwrap()).unwrap();
        assert_eq!(json, measurement().payload);
    }

    #[test]
    fn same_millisecond_does_not_overwrite() {
        let fs = MockFileSystem::new();
        let writer = ArtifactWriter::new(Arc::new(fs.clone()), "./lhreport");

        let first = writer.write("shop", &measurement(), 42).unwrap();
        let second = writer.write("shop", &measurement(), 42).unwrap();

        assert_ne!(first.json_path, second.json_path);
        assert_eq!(
            second.html_path,
            PathBuf::from("./lhreport/lhpci-43-shop.html")
        );
    }

    #[test]
    fn read_only_dir_is_write_failure() {
        let fs = MockFileSystem::new();
        fs.set_read_only(true);
        let writer = ArtifactWriter::new(Arc::new(fs), "./lhreport");

        let err = writer.write("shop", &measurement(), 1).unwrap_err();
        assert!(matches!(err, LhpciError::ArtifactWriteFailed { .. }));
    }

    #[test]
    fn clear_previous_only_removes_artifacts() {
        let fs = MockFileSystem::new();
        fs.add_file("./lhreport/lhpci-1-shop.json", "{}");
        fs.add_file("./lhreport/lhpci-1-shop.html", "<html/>");
        fs.add_file("./lhreport/notes.txt", "keep me");
        let writer = ArtifactWriter::new(Arc::new(fs.clone()), "./lhreport");

        assert_eq!(writer.clear_previous().unwrap(), 2);
        assert_eq!(fs.list("./lhreport"), vec!["notes.txt".to_string()]);

        let missing = ArtifactWriter::new(Arc::new(MockFileSystem::new()), "./nothing");
        assert_eq!(missing.clear_previous().unwrap(), 0);
    }

    #[test]
    fn scoped_project_name_stays_in_report_dir() {
        let fs = MockFileSystem::new();
        let writer = ArtifactWriter::new(Arc::new(fs.clone()), "./lhreport");

        let result = writer.write("@acme/shop", &measurement(), 7).unwrap();

        assert_eq!(
            result.json_path,
            PathBuf::from("./lhreport/lhpci-7-@acme-shop.json")
        );
        assert_eq!(fs.list("./lhreport").len(), 2);
        assert_eq!(artifact_stem(7, "a\\b"), "lhpci-7-a-b");
    }

    #[test]
    fn artifact_names() {
        assert!(is_artifact_name("lhpci-17-app.json"));
        assert!(is_artifact_name("lhpci-17-.html"));
        assert!(!is_artifact_name("lhpci-17-app.txt"));
        assert!(!is_artifact_name("report.json"));
    }
}
