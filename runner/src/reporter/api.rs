//! Republishes finished tests on the event bus

use shared::{BusEvent, EventBus, TestReport, TestState};

use super::{RunnerEvent, SLOW_TEST_MS, Speed};

pub struct ApiReporter {
    bus: EventBus,
    suite_stack: Vec<String>,
    slow_ms: u64,
}

impl ApiReporter {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            suite_stack: Vec::new(),
            slow_ms: SLOW_TEST_MS,
        }
    }

    /// Current suite titles, outermost first
    pub fn suite_stack(&self) -> &[String] {
        &self.suite_stack
    }

    pub fn on_event(&mut self, event: &RunnerEvent) {
        match event {
            RunnerEvent::Start => {
                self.bus.publish(BusEvent::TestResultsReset);
            }
            RunnerEvent::Suite { title } if !title.is_empty() => self.suite_stack.push(title.clone()),
            RunnerEvent::SuiteEnd { title } if !title.is_empty() => {
                self.suite_stack.pop();
            }
            RunnerEvent::Pass {
                title,
                duration_ms,
                file,
            } => self.report(title, file, Some(*duration_ms), TestState::Passed),
            RunnerEvent::Fail {
                title,
                duration_ms,
                file,
                ..
            } => self.report(title, file, *duration_ms, TestState::Failed),
            _ => {}
        }
    }

    fn report(&self, title: &str, file: &Option<String>, duration_ms: Option<u64>, state: TestState) {
        let report = TestReport {
            suite: self.suite_stack.clone(),
            title: title.to_string(),
            file: file.clone(),
            duration_ms,
            state,
            speed: duration_ms.map(|d| Speed::for_duration(d, self.slow_ms).as_str().to_string()),
        };
        self.bus.publish(BusEvent::TestResult(report));
    }
}
