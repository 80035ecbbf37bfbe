//! Test run aggregator
//!
//! Discovers test files, runs the mode the request selects, optionally
//! builds a coverage report and prints one terminal line. Build artifacts
//! are removed on every path, after that line.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use shared::{ProcessId, logging, process_debug, process_info, process_warn};

use crate::config::{Mode, TestRunRequest};
use crate::core::{TotalResult, classify};
use crate::error::{RunnerError, RunnerResult};
use crate::reporter::{Output, Tone, paint};
use crate::traits::{CoverageReporter, FileSystem, ModePipeline};

/// Time the browser gets to pick up the coverage report
const BROWSER_GRACE: Duration = Duration::from_secs(1);

pub struct TestRunner<F, C, S, K>
where
    F: FileSystem + Send + Sync + 'static,
    C: CoverageReporter + Send + Sync + 'static,
    S: ModePipeline + Send + Sync + 'static,
    K: ModePipeline + Send + Sync + 'static,
{
    file_system: F,
    coverage: C,
    /// Script suites (`.js`)
    script: S,
    /// Contract tests (`_test.sol`)
    contract: K,
    output: Output,
    colors: bool,
}

impl<F, C, S, K> TestRunner<F, C, S, K>
where
    F: FileSystem + Send + Sync + 'static,
    C: CoverageReporter + Send + Sync + 'static,
    S: ModePipeline + Send + Sync + 'static,
    K: ModePipeline + Send + Sync + 'static,
{
    pub fn new(file_system: F, coverage: C, script: S, contract: K) -> Self {
        Self {
            file_system,
            coverage,
            script,
            contract,
            output: Output::Stdout,
            colors: true,
        }
    }

    /// Write the terminal line somewhere other than stdout
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Run the request to its terminal line
    ///
    /// Any failed test turns into `RunnerError::Failures`.
    pub async fn run(&self, request: &TestRunRequest) -> RunnerResult<TotalResult> {
        let outcome = self.execute(request).await;

        let message = match &outcome {
            Ok(total) if total.is_success() => paint(" > All tests passed", Tone::Success, self.colors),
            Ok(total) => paint(
                &format!(" > Total number of failures: {}", total.failure_count),
                Tone::Fail,
                self.colors,
            ),
            Err(e) => paint(&e.to_string(), Tone::Fail, self.colors),
        };
        self.print(&message);

        if let Err(e) = self.file_system.remove_artifacts().await {
            process_warn!(ProcessId::current(), "⚠️ Could not remove build artifacts: {}", e);
        }

        let total = outcome?;
        if !total.is_success() {
            return Err(RunnerError::Failures {
                count: total.failure_count,
            });
        }
        Ok(total)
    }

    async fn execute(&self, request: &TestRunRequest) -> RunnerResult<TotalResult> {
        let files = self.file_system.list_files(&request.root_path).await?;
        let groups = classify(&files);
        process_debug!(
            ProcessId::current(),
            "📂 Found {} script files and {} contract test files under {}",
            groups.script_files.len(),
            groups.contract_test_files.len(),
            request.root_path.display()
        );

        let mode = request.mode.resolve();
        let selected: &[PathBuf] = match mode {
            Mode::Solidity => &groups.contract_test_files,
            Mode::Javascript | Mode::Auto => &groups.script_files,
        };
        if selected.is_empty() {
            return Err(RunnerError::NoTests);
        }

        let results = match mode {
            Mode::Solidity => self.contract.run(selected, request).await?,
            Mode::Javascript | Mode::Auto => self.script.run(selected, request).await?,
        };

        if request.coverage {
            self.report_coverage(request.no_browser).await?;
        }

        Ok(results.iter().sum())
    }

    async fn report_coverage(&self, no_browser: bool) -> RunnerResult<()> {
        let report = self.coverage.generate().await?;
        process_info!(
            ProcessId::current(),
            "Coverage report created. You can find it here: {}",
            report.display()
        );

        if no_browser {
            return Ok(());
        }
        if let Err(e) = self.coverage.open(&report).await {
            logging::log_error(ProcessId::current(), "Opening coverage report", &e);
        }
        tokio::time::sleep(BROWSER_GRACE).await;
        Ok(())
    }

    fn print(&self, message: &str) {
        let mut output = self.output.clone();
        if let Err(e) = writeln!(output, "{message}").and_then(|_| output.flush()) {
            process_warn!(ProcessId::current(), "⚠️ Could not write run summary: {}", e);
        }
    }
}
