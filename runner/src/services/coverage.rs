//! Istanbul coverage report

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use shared::{ProcessId, process_debug};

use crate::error::{RunnerError, RunnerResult};
use crate::traits::CoverageReporter;

pub struct IstanbulCoverage {
    istanbul: String,
    base_dir: PathBuf,
    opener: String,
}

impl IstanbulCoverage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            istanbul: "istanbul".to_string(),
            base_dir,
            opener: default_opener().to_string(),
        }
    }

    pub fn with_istanbul(mut self, istanbul: impl Into<String>) -> Self {
        self.istanbul = istanbul.into();
        self
    }

    /// Command used to show the report
    pub fn with_opener(mut self, opener: impl Into<String>) -> Self {
        self.opener = opener.into();
        self
    }

    pub fn report_path(&self) -> PathBuf {
        self.base_dir.join("coverage").join("index.html")
    }
}

fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    }
}

#[async_trait]
impl CoverageReporter for IstanbulCoverage {
    async fn generate(&self) -> RunnerResult<PathBuf> {
        let status = Command::new(&self.istanbul)
            .args(["report", "--root=.embark", "--format=html", "--format=lcov"])
            .current_dir(&self.base_dir)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| RunnerError::coverage(format!("failed to run {}: {e}", self.istanbul)))?;

        if !status.success() {
            return Err(RunnerError::coverage(format!("{} exited with {status}", self.istanbul)));
        }
        Ok(self.report_path())
    }

    async fn open(&self, report: &Path) -> RunnerResult<()> {
        // Not awaited: the browser outlives the run
        Command::new(&self.opener)
            .arg(report)
            .spawn()
            .map_err(|e| RunnerError::coverage(format!("failed to open report: {e}")))?;
        process_debug!(ProcessId::current(), "🌐 Opened {}", report.display());
        Ok(())
    }
}
