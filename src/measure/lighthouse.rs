// src/measure/lighthouse.rs

//! `MeasurementEngine` that shells out to the Lighthouse CLI.
//!
//! Lighthouse connects to the already running browser through `--port`; the
//! navigation hook's cookies travel as `--extra-headers` on every request of
//! the audit. Both outputs are written next to each other:
//! `<dir>/report.report.json` and `<dir>/report.report.html`.

use std::path::Path;
use std::process::Stdio;

use serde_json::{Value, json};
use tokio::process::Command;
use tracing::info;

use crate::errors::{LhpciError, Result};
use crate::measure::{MeasureOptions, Measurement, MeasurementEngine};
use crate::types::BoxFuture;

const OUTPUT_STEM: &str = "report";

#[derive(Debug, Clone)]
pub struct LighthouseCli {
    binary: String,
}

impl LighthouseCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(&self, url: &str, options: &MeasureOptions, out_dir: &Path) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            format!("--port={}", options.port),
            "--output=json".to_string(),
            "--output=html".to_string(),
            format!("--output-path={}", out_dir.join(OUTPUT_STEM).display()),
            "--quiet".to_string(),
        ];

        let overrides = options
            .navigation
            .as_ref()
            .and_then(|hook| hook.on_navigate(url));
        if let Some(cookie) = overrides.and_then(|o| o.cookie_header()) {
            args.push(format!("--extra-headers={}", json!({ "Cookie": cookie })));
        }

        args
    }

    async fn run(&self, url: &str, options: &MeasureOptions) -> Result<Measurement> {
        let out_dir = tempfile::Builder::new()
            .prefix("lhpci-lighthouse-")
            .tempdir()?;
        let args = self.args(url, options, out_dir.path());

        info!(url, port = options.port, bin = %self.binary, "running lighthouse");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                LhpciError::MeasurementFailed(format!("could not run `{}`: {e}", self.binary))
            })?;

        if !output.status.success() {
            return Err(LhpciError::MeasurementFailed(format!(
                "`{}` exited with {:?}: {}",
                self.binary,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let json_path = out_dir.path().join(format!("{OUTPUT_STEM}.report.json"));
        let html_path = out_dir.path().join(format!("{OUTPUT_STEM}.report.html"));

        let payload_text = read_output(&json_path).await?;
        let payload: Value = serde_json::from_str(&payload_text).map_err(|e| {
            LhpciError::MeasurementFailed(format!("invalid JSON in {json_path:?}: {e}"))
        })?;
        let rendered_report = read_output(&html_path).await?;

        Ok(Measurement {
            payload,
            rendered_report,
        })
    }
}

impl MeasurementEngine for LighthouseCli {
    fn measure<'a>(
        &'a self,
        url: &'a str,
        options: &'a MeasureOptions,
    ) -> BoxFuture<'a, Result<Measurement>> {
        Box::pin(self.run(url, options))
    }
}

async fn read_output(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        LhpciError::MeasurementFailed(format!("missing Lighthouse output {path:?}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::SessionToken;
    use crate::session::{NavigationHook, SessionAuth};

    #[test]
    fn args_without_navigation_hook() {
        let cli = LighthouseCli::new("lighthouse");
        let options = MeasureOptions {
            port: 9222,
            navigation: None,
        };
        let args = cli.args("http://localhost:12306/", &options, Path::new("/tmp/out"));
        assert_eq!(args[0], "http://localhost:12306/");
        assert!(args.contains(&"--port=9222".to_string()));
        assert!(args.contains(&"--output-path=/tmp/out/report".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--extra-headers")));
    }

    #[test]
    fn auth_cookie_is_sent_as_extra_header() {
        let cli = LighthouseCli::new("lighthouse");
        let url = "http://localhost:12306/#/home";
        let options = MeasureOptions {
            port: 9222,
            navigation: Some(NavigationHook::new(
                url,
                Some(SessionAuth {
                    token: SessionToken::Text("abc".into()),
                }),
            )),
        };
        let args = cli.args(url, &options, Path::new("/tmp/out"));
        assert!(args.contains(&r#"--extra-headers={"Cookie":"lhtoken=abc"}"#.to_string()));
    }

    #[tokio::test]
    async fn failing_binary_is_a_measurement_error() {
        let cli = LighthouseCli::new("/nonexistent/lhpci-test-lighthouse");
        let options = MeasureOptions {
            port: 9222,
            navigation: None,
        };
        let err = cli.measure("http://localhost/", &options).await.unwrap_err();
        assert!(matches!(err, LhpciError::MeasurementFailed(_)), "got {err:?}");
    }
}
