//! Interactive console
//!
//! Maps typed command lines to bus requests or service lifecycle calls.
//! `service <name> on|off` is always available; other commands are
//! registered by the components that own them.

use tokio::sync::RwLock;

use shared::{EventBus, ProcessId, process_debug};

use crate::error::{SupervisorError, SupervisorResult};

/// What a console command does when matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    /// Invoke the bus command handler for a topic
    Request(String),
    StartService(String),
    StopService(String),
}

pub struct Console {
    bus: EventBus,
    entries: RwLock<Vec<(String, ConsoleAction)>>,
}

impl Console {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a command; registering the same command again replaces it
    pub async fn register(&self, command: &str, action: ConsoleAction) {
        let command = normalize(command);
        let mut entries = self.entries.write().await;
        entries.retain(|(existing, _)| *existing != command);
        entries.push((command, action));
    }

    /// Registered commands, in registration order
    pub async fn commands(&self) -> Vec<String> {
        self.entries.read().await.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Run one command line and return the text to show the user
    pub async fn execute(&self, input: &str) -> SupervisorResult<String> {
        let line = normalize(input);
        let action = match self.resolve(&line).await {
            Some(action) => action,
            None if line == "help" => return Ok(self.help().await),
            None => return Err(SupervisorError::UnknownCommand { input: line }),
        };

        process_debug!(ProcessId::current(), "⌨️ Console: {} -> {:?}", line, action);
        match action {
            ConsoleAction::Request(topic) => Ok(self.bus.request(&topic).await?),
            ConsoleAction::StartService(name) => {
                self.bus.start_service(&name).await?;
                Ok(format!("Service {name} started"))
            }
            ConsoleAction::StopService(name) => {
                self.bus.stop_service(&name).await?;
                Ok(format!("Service {name} stopped"))
            }
        }
    }

    async fn resolve(&self, line: &str) -> Option<ConsoleAction> {
        if let Some(action) = service_command(line) {
            return Some(action);
        }
        self.entries
            .read()
            .await
            .iter()
            .find(|(command, _)| command == line)
            .map(|(_, action)| action.clone())
    }

    async fn help(&self) -> String {
        let mut lines = vec!["service <name> on|off".to_string()];
        lines.extend(self.commands().await);
        lines.join("\n")
    }
}

fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn service_command(line: &str) -> Option<ConsoleAction> {
    match line.split(' ').collect::<Vec<_>>().as_slice() {
        ["service", name, "on"] => Some(ConsoleAction::StartService(name.to_string())),
        ["service", name, "off"] => Some(ConsoleAction::StopService(name.to_string())),
        _ => None,
    }
}
