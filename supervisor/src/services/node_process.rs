//! Child-process backed node
//!
//! Spawns the configured node command, watches its output for the ready
//! marker and reports lifecycle changes on the event bus. Output lines are
//! forwarded to the log only while node logging is enabled.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot, watch};

use shared::{BusEvent, EventBus, ProcessId, process_debug, process_info, process_warn};

use crate::config::NodeConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{ManagedProcess, ProcessFactory, ProcessState};

pub struct CommandNodeProcess {
    config: NodeConfig,
    bus: EventBus,
    state: Arc<watch::Sender<ProcessState>>,
    pid: Mutex<Option<u32>>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
    forward_logs: Arc<AtomicBool>,
}

impl CommandNodeProcess {
    pub fn new(config: NodeConfig, bus: EventBus) -> Self {
        let (state, _) = watch::channel(ProcessState::Idle);
        Self {
            config,
            bus,
            state: Arc::new(state),
            pid: Mutex::new(None),
            kill_tx: Mutex::new(None),
            forward_logs: Arc::new(AtomicBool::new(true)),
        }
    }

    fn spawn_output_watcher<R>(&self, stream: R, announced: Arc<AtomicBool>)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let bus = self.bus.clone();
        let state = self.state.clone();
        let forward = self.forward_logs.clone();
        let marker = self.config.ready_marker.clone();
        let name = self.config.client.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if forward.load(Ordering::SeqCst) {
                    process_info!(ProcessId::current(), "[{}] {}", name, line);
                }
                if !marker.is_empty() && line.contains(&marker) && !announced.swap(true, Ordering::SeqCst) {
                    state.send_replace(ProcessState::Running);
                    bus.publish(BusEvent::NodeReady);
                }
            }
        });
    }

    fn spawn_log_toggle_listener(&self) {
        let mut events = self.bus.subscribe();
        let forward = self.forward_logs.clone();
        let mut state = self.state.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(BusEvent::NodeLogs { enabled }) => forward.store(enabled, Ordering::SeqCst),
                        Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                        Err(_) => break,
                    },
                    _ = state.wait_for(ProcessState::is_terminal) => break,
                }
            }
        });
    }

    fn spawn_exit_watcher(&self, mut child: Child, kill_rx: oneshot::Receiver<()>) {
        let bus = self.bus.clone();
        let state = self.state.clone();
        let name = self.config.client.clone();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    let _ = child.kill().await;
                    child.wait().await
                }
            };

            let code = status.ok().and_then(|s| s.code());
            let stopping = *state.borrow() == ProcessState::Stopping;
            state.send_replace(if stopping {
                ProcessState::Stopped
            } else {
                ProcessState::Exited { code }
            });

            process_debug!(ProcessId::current(), "🛑 {} exited (code: {:?})", name, code);
            bus.publish(BusEvent::NodeExited { code });
        });
    }

    #[cfg(unix)]
    fn request_graceful_exit(pid: u32) -> bool {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
    }

    #[cfg(not(unix))]
    fn request_graceful_exit(_pid: u32) -> bool {
        false
    }
}

#[async_trait]
impl ManagedProcess for CommandNodeProcess {
    fn name(&self) -> String {
        self.config.client.clone()
    }

    fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    async fn start(&self) -> SupervisorResult<()> {
        if !matches!(self.state(), ProcessState::Idle) {
            return Err(SupervisorError::process(format!("{} was already started", self.name())));
        }
        self.state.send_replace(ProcessState::Starting);

        let mut cmd = Command::new(&self.config.client);
        cmd.args(&self.config.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            self.state.send_replace(ProcessState::Exited { code: None });
            SupervisorError::process(format!("Failed to spawn {}: {e}", self.config.client))
        })?;

        let pid = child.id();
        *self.pid.lock().await = pid;

        let announced = Arc::new(AtomicBool::new(false));
        if let Some(stdout) = child.stdout.take() {
            self.spawn_output_watcher(stdout, announced.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            self.spawn_output_watcher(stderr, announced);
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        *self.kill_tx.lock().await = Some(kill_tx);
        self.spawn_log_toggle_listener();
        self.spawn_exit_watcher(child, kill_rx);

        process_debug!(
            ProcessId::current(),
            "🚀 Spawned {} (PID: {})",
            self.config.client,
            pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        );
        Ok(())
    }

    async fn stop(&self) -> SupervisorResult<()> {
        let current = self.state();
        if current.is_terminal() || current == ProcessState::Idle {
            return Ok(());
        }
        self.state.send_replace(ProcessState::Stopping);

        let mut state = self.state.subscribe();
        let graceful = match *self.pid.lock().await {
            Some(pid) => Self::request_graceful_exit(pid),
            None => false,
        };

        if graceful {
            let grace = self.config.stop_grace();
            if tokio::time::timeout(grace, state.wait_for(ProcessState::is_terminal))
                .await
                .is_ok()
            {
                return Ok(());
            }
            process_warn!(
                ProcessId::current(),
                "⚠️ {} ignored SIGTERM for {:?}, killing it",
                self.config.client,
                grace
            );
        }

        if let Some(kill_tx) = self.kill_tx.lock().await.take() {
            let _ = kill_tx.send(());
        }
        state
            .wait_for(ProcessState::is_terminal)
            .await
            .map_err(|_| SupervisorError::process("exit watcher vanished before the node stopped"))?;
        Ok(())
    }
}

/// Creates `CommandNodeProcess` instances
#[derive(Debug, Clone, Default)]
pub struct CommandProcessFactory;

impl ProcessFactory for CommandProcessFactory {
    fn create(&self, config: &NodeConfig, bus: EventBus) -> Box<dyn ManagedProcess> {
        Box::new(CommandNodeProcess::new(config.clone(), bus))
    }
}
