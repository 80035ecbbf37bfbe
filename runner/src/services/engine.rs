//! External contract test engine
//!
//! Test files are staged under `.embark/contracts` and registered with the
//! toolchain, so the contracts they import compile alongside them. Each
//! file is then run through the external tool, whose `N passing` /
//! `N failing` summary is the file's result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;
use tokio::process::Command;

use shared::{ProcessId, process_debug, process_info};

use crate::core::SuiteRunResult;
use crate::error::{RunnerError, RunnerResult};
use crate::traits::{ContractTestEngine, ContractToolchain};

const STAGING_DIR: &str = ".embark/contracts";
const ASSERT_LIBRARY: &str = ".embark/remix_tests.sol";

/// Counts from an engine summary; `None` when the output has no summary
pub fn parse_summary(output: &str) -> RunnerResult<Option<SuiteRunResult>> {
    let passing = Regex::new(r"(?m)^\s*(\d+) passing").map_err(|e| RunnerError::execution(e.to_string()))?;
    let failing = Regex::new(r"(?m)^\s*(\d+) failing").map_err(|e| RunnerError::execution(e.to_string()))?;

    let count = |re: &Regex| -> Option<usize> { re.captures(output).and_then(|c| c[1].parse().ok()) };
    let (pass, fail) = (count(&passing), count(&failing));
    if pass.is_none() && fail.is_none() {
        return Ok(None);
    }
    Ok(Some(SuiteRunResult::new(pass.unwrap_or(0), fail.unwrap_or(0))))
}

pub struct CommandContractEngine {
    program: String,
    args: Vec<String>,
    base_dir: PathBuf,
    assert_library: Option<PathBuf>,
    toolchain: Arc<dyn ContractToolchain>,
}

impl CommandContractEngine {
    pub fn new(program: impl Into<String>, toolchain: Arc<dyn ContractToolchain>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            base_dir: PathBuf::from("."),
            assert_library: None,
            toolchain,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_base_dir(mut self, base_dir: PathBuf) -> Self {
        self.base_dir = base_dir;
        self
    }

    /// Assertion library copied next to the staged tests
    pub fn with_assert_library(mut self, library: PathBuf) -> Self {
        self.assert_library = Some(library);
        self
    }

    fn staged_path(&self, file: &Path) -> PathBuf {
        let name = file.file_name().map(PathBuf::from).unwrap_or_else(|| file.to_path_buf());
        self.base_dir.join(STAGING_DIR).join(name)
    }
}

#[async_trait]
impl ContractTestEngine for CommandContractEngine {
    async fn init(&self) -> RunnerResult<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RunnerError::execution(format!("{} is not available: {e}", self.program)))?;
        process_debug!(
            ProcessId::current(),
            "🧰 {} {}",
            self.program,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn setup_tests(&self, files: &[PathBuf]) -> RunnerResult<()> {
        fs::create_dir_all(self.base_dir.join(STAGING_DIR)).await?;

        let mut staged = Vec::with_capacity(files.len());
        for file in files {
            let target = self.staged_path(file);
            fs::copy(file, &target)
                .await
                .map_err(|_| RunnerError::InputError { path: file.clone() })?;
            staged.push(target);
        }

        if let Some(library) = &self.assert_library {
            let target = self.base_dir.join(ASSERT_LIBRARY);
            fs::copy(library, &target)
                .await
                .map_err(|_| RunnerError::InputError { path: library.clone() })?;
            staged.push(target);
        }

        self.toolchain.register_contract_files(&staged).await
    }

    async fn run_tests(&self, file: &Path) -> RunnerResult<Vec<SuiteRunResult>> {
        let staged = self.staged_path(file);
        process_info!(ProcessId::current(), "▶️ {}", file.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&staged)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RunnerError::execution(format!("failed to run {}: {e}", self.program)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        print!("{stdout}");

        match parse_summary(&stdout)? {
            Some(result) => Ok(vec![result]),
            None if output.status.success() => Ok(Vec::new()),
            None => Err(RunnerError::execution(format!(
                "{} failed on {}: {}",
                self.program,
                file.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}
