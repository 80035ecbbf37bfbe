//! Test helpers and builder patterns for runner tests

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use runner::config::TestRunRequestBuilder;
use runner::reporter::Output;
use runner::services::RealFileSystem;
use runner::{ContractPipeline, RunnerEvent, ScriptPipeline, TestRunRequest, TestRunner};
use shared::EventBus;

use super::fixtures::{FakeCoverage, FakeEngine, FakeProvider, FakeToolchain, ScriptedSuites, TestFixtures};

pub type ScriptMode = ScriptPipeline<FakeProvider, FakeToolchain, ScriptedSuites>;
pub type ContractMode = ContractPipeline<FakeEngine, FakeToolchain>;
pub type FakeRunner = TestRunner<RealFileSystem, FakeCoverage, ScriptMode, ContractMode>;

/// Everything a test needs to drive a run and inspect its effects
pub struct RunnerHarness {
    pub runner: FakeRunner,
    pub toolchain: Arc<FakeToolchain>,
    pub engine: Arc<FakeEngine>,
    pub suites: ScriptedSuites,
    pub coverage: FakeCoverage,
    pub output: Output,
    pub bus: EventBus,
    pub project: TempDir,
}

impl RunnerHarness {
    pub fn root(&self) -> &Path {
        self.project.path()
    }

    /// Request builder pointed at the project's `test` directory
    pub fn request(&self) -> TestRunRequestBuilder {
        TestRunRequest::builder().root_path(self.root().join("test"))
    }

    pub fn text(&self) -> String {
        self.output.contents()
    }
}

/// Builds a `TestRunner` over a temporary project and fake collaborators
pub struct RunnerBuilder {
    files: Vec<String>,
    suite_events: Vec<RunnerEvent>,
    engine: FakeEngine,
    fail_deploy: bool,
    fail_accounts: bool,
    bus: EventBus,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            suite_events: TestFixtures::pass("works"),
            engine: FakeEngine::new(),
            fail_deploy: false,
            fail_accounts: false,
            bus: EventBus::new(),
        }
    }

    /// Files created under the project directory
    pub fn with_files(mut self, files: &[&str]) -> Self {
        self.files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Events every script file reports
    pub fn with_suite_events(mut self, events: Vec<RunnerEvent>) -> Self {
        self.suite_events = events;
        self
    }

    pub fn with_engine(mut self, engine: FakeEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn failing_deploy(mut self) -> Self {
        self.fail_deploy = true;
        self
    }

    pub fn failing_accounts(mut self) -> Self {
        self.fail_accounts = true;
        self
    }

    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn build(self) -> RunnerHarness {
        let files: Vec<&str> = self.files.iter().map(String::as_str).collect();
        let project = TestFixtures::project(&files);
        let output = Output::buffer();

        let mut toolchain = FakeToolchain::new(self.bus.clone());
        if self.fail_deploy {
            toolchain = toolchain.failing_deploy();
        }
        let toolchain = Arc::new(toolchain);
        let engine = Arc::new(self.engine);
        let suites = ScriptedSuites::new(self.suite_events);
        let coverage = FakeCoverage::default();

        let script = ScriptPipeline::new(
            Arc::new(FakeProvider {
                fail_accounts: self.fail_accounts,
            }),
            toolchain.clone(),
            Arc::new(suites.clone()),
            self.bus.clone(),
        )
        .with_output(output.clone())
        .with_colors(false);
        let contract = ContractPipeline::new(engine.clone(), toolchain.clone());

        let runner = TestRunner::new(
            RealFileSystem::with_base_dir(project.path().to_path_buf()),
            coverage.clone(),
            script,
            contract,
        )
        .with_output(output.clone())
        .with_colors(false);

        RunnerHarness {
            runner,
            toolchain,
            engine,
            suites,
            coverage,
            output,
            bus: self.bus,
            project,
        }
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Lines of `text` that contain `needle`
    pub fn lines_with<'a>(text: &'a str, needle: &str) -> Vec<&'a str> {
        text.lines().filter(|line| line.contains(needle)).collect()
    }

    pub fn path(root: &Path, relative: &str) -> PathBuf {
        root.join(relative)
    }
}
