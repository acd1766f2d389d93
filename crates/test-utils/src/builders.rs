use std::path::PathBuf;
use std::time::Duration;

use lhpci::config::CollectSettings;
use lhpci::exec::{LaunchSpec, ReadinessPattern};
use lhpci::orchestrator::RunPlan;

/// Builder for `RunPlan` to simplify test setup.
pub struct RunPlanBuilder {
    command: String,
    current_dir: Option<PathBuf>,
    pattern: String,
    timeout: Duration,
    base_url: String,
    project_name: Option<String>,
    report_dir: PathBuf,
    ci: bool,
}

impl RunPlanBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            current_dir: None,
            pattern: "ready".to_string(),
            timeout: Duration::from_secs(5),
            base_url: "http://localhost:12306/".to_string(),
            project_name: Some("demo-app".to_string()),
            report_dir: PathBuf::from("./lhreport"),
            ci: false,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn project(mut self, name: Option<&str>) -> Self {
        self.project_name = name.map(str::to_string);
        self
    }

    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    pub fn build(self) -> RunPlan {
        let mut server = LaunchSpec::new(self.command);
        if let Some(dir) = self.current_dir {
            server = server.current_dir(dir);
        }
        RunPlan {
            server,
            ready_pattern: ReadinessPattern::new(&self.pattern)
                .expect("Failed to build readiness pattern from builder"),
            ready_timeout: self.timeout,
            base_url: self.base_url,
            project_name: self.project_name,
            report_dir: self.report_dir,
            ci: self.ci,
        }
    }
}

/// Settings for `collect_with`, defaults matching the CLI but with a short
/// readiness timeout and a single run.
pub struct SettingsBuilder {
    settings: CollectSettings,
}

impl SettingsBuilder {
    pub fn new(start_server_command: &str) -> Self {
        Self {
            settings: CollectSettings {
                urls: vec!["http://localhost:12306/".to_string()],
                report_dir: PathBuf::from("lhreport"),
                start_server_command: Some(start_server_command.to_string()),
                ready_pattern: "ready".to_string(),
                ready_timeout: Duration::from_secs(5),
                port: 12306,
                number_of_runs: 1,
                headful: false,
                additive: false,
                lighthouse_bin: "lighthouse".to_string(),
                chrome_bin: "google-chrome".to_string(),
                login_service_url: None,
            },
        }
    }

    pub fn urls(mut self, urls: &[&str]) -> Self {
        self.settings.urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn runs(mut self, n: u32) -> Self {
        self.settings.number_of_runs = n;
        self
    }

    pub fn additive(mut self, additive: bool) -> Self {
        self.settings.additive = additive;
        self
    }

    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.report_dir = dir.into();
        self
    }

    pub fn build(self) -> CollectSettings {
        self.settings
    }
}
