//! Test telemetry reporters
//!
//! `SpecReporter` prints the run to a terminal and accounts gas per test;
//! `ApiReporter` republishes each finished test on the event bus.

pub mod api;
pub mod decode;
pub mod gas;
pub mod registry;
pub mod spec;

pub use api::ApiReporter;
pub use gas::{SLOW_TEST_MS, Speed};
pub use registry::ContractRegistry;
pub use spec::{ReporterOptions, ReporterStats, SpecReporter, TOGGLE_GAS_LISTENER_TOPIC};

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crossterm::style::{Color, Stylize};
use serde::{Deserialize, Serialize};

/// Suite lifecycle events emitted by a suite runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunnerEvent {
    Start,
    Suite {
        title: String,
    },
    SuiteEnd {
        title: String,
    },
    Test {
        title: String,
    },
    Pass {
        title: String,
        duration_ms: u64,
        #[serde(default)]
        file: Option<String>,
    },
    Fail {
        title: String,
        error: String,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        file: Option<String>,
    },
    Pending {
        title: String,
    },
    End,
}

/// Where reporter and runner text goes
#[derive(Clone, Default)]
pub enum Output {
    #[default]
    Stdout,
    /// In-memory capture
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl Output {
    pub fn buffer() -> Self {
        Output::Buffer(Arc::new(Mutex::new(Vec::new())))
    }

    /// Captured text; empty for stdout
    pub fn contents(&self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buffer) => buffer
                .lock()
                .map(|data| String::from_utf8_lossy(&data).to_string())
                .unwrap_or_default(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout => io::stdout().write(buf),
            Output::Buffer(buffer) => buffer
                .lock()
                .map_err(|_| io::Error::other("output buffer poisoned"))?
                .write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout => io::stdout().flush(),
            Output::Buffer(_) => Ok(()),
        }
    }
}

/// Text roles in reporter output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Suite,
    Pass,
    Fail,
    Pending,
    Light,
    Checkmark,
    Success,
    Fast,
    Medium,
    Slow,
}

/// Style `text` for its role, or leave it plain
pub fn paint(text: &str, tone: Tone, colors: bool) -> String {
    if !colors {
        return text.to_string();
    }
    match tone {
        Tone::Suite => text.to_string(),
        Tone::Pass | Tone::Light | Tone::Fast => text.with(Color::DarkGrey).to_string(),
        Tone::Fail | Tone::Slow => text.with(Color::Red).to_string(),
        Tone::Pending => text.with(Color::Cyan).to_string(),
        Tone::Checkmark => text.with(Color::Green).to_string(),
        Tone::Success => text.with(Color::Green).bold().to_string(),
        Tone::Medium => text.with(Color::Yellow).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_event_json() {
        let event: RunnerEvent =
            serde_json::from_str(r#"{"event":"pass","title":"sets value","durationMs":12}"#).unwrap();
        assert_eq!(
            event,
            RunnerEvent::Pass {
                title: "sets value".to_string(),
                duration_ms: 12,
                file: None
            }
        );

        let event: RunnerEvent = serde_json::from_str(r#"{"event":"suiteEnd","title":"Token"}"#).unwrap();
        assert_eq!(event, RunnerEvent::SuiteEnd { title: "Token".to_string() });
    }

    #[test]
    fn test_plain_paint() {
        assert_eq!(paint("3 passing", Tone::Success, false), "3 passing");
        assert!(paint("3 passing", Tone::Success, true).contains("3 passing"));
    }

    #[test]
    fn test_buffer_output() {
        let mut output = Output::buffer();
        let mut clone = output.clone();
        write!(output, "a").unwrap();
        write!(clone, "b").unwrap();
        assert_eq!(output.contents(), "ab");
    }
}
