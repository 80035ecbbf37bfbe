//! Out-of-process script suite runner
//!
//! Each script file runs as a child process with the suite context in its
//! environment. The child reports lifecycle events as JSON lines on stdout;
//! anything else it prints is passed to the debug log. A test that stays
//! silent longer than the context timeout fails and its process is killed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use shared::{ProcessId, process_debug, process_warn};

use crate::core::{SuiteContext, SuiteRunResult};
use crate::error::{RunnerError, RunnerResult};
use crate::reporter::RunnerEvent;
use crate::traits::SuiteRunner;

/// Environment variable carrying the JSON suite context
pub const CONTEXT_ENV: &str = "EMBARK_SUITE_CONTEXT";

pub struct CommandSuiteRunner {
    program: String,
    args: Vec<String>,
}

impl CommandSuiteRunner {
    /// `program args.. <file>` is run for every file
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn run_file(
        &self,
        file: &Path,
        context: &SuiteContext,
        events: &mpsc::UnboundedSender<RunnerEvent>,
        result: &mut SuiteRunResult,
    ) -> RunnerResult<()> {
        let file_name = file.display().to_string();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .env(CONTEXT_ENV, context.snapshot().to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::execution(format!("failed to run {} {}: {e}", self.program, file_name)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::execution("suite stdout is not captured"))?;
        let mut lines = BufReader::new(stdout).lines();
        let failures_before = result.failure_count;
        let mut running: Option<String> = None;
        let mut timed_out = false;

        loop {
            let line = match tokio::time::timeout(context.timeout(), lines.next_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    timed_out = true;
                    let title = running.take().unwrap_or_else(|| format!("{file_name} (hook)"));
                    result.failure_count += 1;
                    let _ = events.send(RunnerEvent::Fail {
                        title,
                        error: format!("Timeout of {}ms exceeded", context.timeout().as_millis()),
                        duration_ms: Some(context.timeout().as_millis() as u64),
                        file: Some(file_name.clone()),
                    });
                    child.kill().await?;
                    break;
                }
            };

            let event = match serde_json::from_str::<RunnerEvent>(&line) {
                Ok(event) => event,
                Err(_) => {
                    process_debug!(ProcessId::current(), "[{}] {}", file_name, line);
                    continue;
                }
            };

            let event = match event {
                // One start and one end frame the whole run
                RunnerEvent::Start | RunnerEvent::End => continue,
                RunnerEvent::Test { title } => {
                    running = Some(title.clone());
                    RunnerEvent::Test { title }
                }
                RunnerEvent::Pass { title, duration_ms, file } => {
                    running = None;
                    result.pass_count += 1;
                    RunnerEvent::Pass {
                        title,
                        duration_ms,
                        file: file.or_else(|| Some(file_name.clone())),
                    }
                }
                RunnerEvent::Fail {
                    title,
                    error,
                    duration_ms,
                    file,
                } => {
                    running = None;
                    result.failure_count += 1;
                    RunnerEvent::Fail {
                        title,
                        error,
                        duration_ms,
                        file: file.or_else(|| Some(file_name.clone())),
                    }
                }
                other => other,
            };
            let _ = events.send(event);
        }

        let status = child.wait().await?;
        if !status.success() && !timed_out && result.failure_count == failures_before {
            process_warn!(ProcessId::current(), "⚠️ {} exited with {}", file_name, status);
            result.failure_count += 1;
            let _ = events.send(RunnerEvent::Fail {
                title: file_name.clone(),
                error: format!("suite process exited with {status}"),
                duration_ms: None,
                file: Some(file_name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SuiteRunner for CommandSuiteRunner {
    async fn run(
        &self,
        files: &[PathBuf],
        context: SuiteContext,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> RunnerResult<SuiteRunResult> {
        let _ = events.send(RunnerEvent::Start);
        context.run_before().await?;

        let mut result = SuiteRunResult::default();
        for file in files {
            self.run_file(file, &context, &events, &mut result).await?;
        }

        let _ = events.send(RunnerEvent::End);
        Ok(result)
    }
}
