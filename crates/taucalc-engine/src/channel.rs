//! Request/response exchange with the engine over its line protocol.

use crate::error::{EngineError, Result};
use crate::pending::{Observation, PendingCommand};
use crate::supervisor::{EngineEvent, ProcessState, ProcessSupervisor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Sends one command at a time and collects the output the engine prints
/// for it.
///
/// `execute` takes `&mut self`, so a channel can never have two commands in
/// flight. Wrap it in a `tokio::sync::Mutex` to share it between tasks.
pub struct CommandChannel {
    supervisor: Arc<ProcessSupervisor>,
}

impl CommandChannel {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }

    /// Executes `command` with the configured command timeout.
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        let timeout = self.supervisor.config().command_timeout;
        self.execute_with_timeout(command, timeout).await
    }

    /// Executes `command` and returns the lines printed between its echo and
    /// the next prompt, joined with newlines.
    ///
    /// # Process
    /// 1. Starts the engine if needed and waits for readiness
    /// 2. Writes the command, ignoring output until the engine echoes it
    /// 3. Answers every continuation marker with a blank line
    /// 4. Completes at the next prompt, or once the debounce delay passes
    ///    after a blank line
    ///
    /// # Errors
    /// - `EngineError::EngineReported` if the engine writes to stderr
    /// - `EngineError::ProcessExited` if the engine dies mid-command
    /// - `EngineError::CommandTimeout` if nothing arrived after the echo
    ///   within `timeout`; partial output is returned instead when present
    pub async fn execute_with_timeout(&mut self, command: &str, timeout: Duration) -> Result<String> {
        self.ensure_ready().await?;

        let config = self.supervisor.config();
        let debounce_delay = config.debounce;
        let mut pending =
            PendingCommand::new(command, &config.prompt, &config.continuation_marker);

        // Subscribe before writing so no reply line can be missed.
        let mut events = self.supervisor.subscribe();
        self.supervisor.write_line(command).await?;
        debug!("Sent command: {command}");

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let debounce = tokio::time::sleep(timeout);
        tokio::pin!(debounce);
        let mut debounce_armed = false;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(EngineEvent::Line(line)) => match pending.observe(&line) {
                        Observation::Complete => return Ok(pending.finish()),
                        Observation::Advance => {
                            debug!("Continuing execution of {command}");
                            self.supervisor.write_line("").await?;
                        }
                        Observation::Blank if !debounce_armed => {
                            debounce.as_mut().reset(Instant::now() + debounce_delay);
                            debounce_armed = true;
                        }
                        _ => {}
                    },
                    Ok(EngineEvent::Stderr(message)) => {
                        warn!("Engine rejected {command}: {message}");
                        return Err(EngineError::EngineReported(message));
                    }
                    Ok(EngineEvent::Exited) | Err(RecvError::Closed) => {
                        return Err(EngineError::ProcessExited);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Command channel fell behind, {missed} engine lines dropped");
                    }
                },
                _ = &mut debounce, if debounce_armed => return Ok(pending.finish()),
                _ = &mut deadline => {
                    warn!("Command timed out after {timeout:?}: {command}");
                    return pending.expire(timeout);
                }
            }
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        let readiness = self.supervisor.config().readiness_timeout;
        match self.supervisor.state() {
            ProcessState::Ready => Ok(()),
            ProcessState::NotStarted | ProcessState::Closed => {
                self.supervisor.start().await?;
                self.supervisor.wait_ready(readiness).await
            }
            ProcessState::Starting | ProcessState::Crashed => {
                self.supervisor.wait_ready(readiness).await
            }
        }
    }
}
