//! Engine process lifecycle: launch, readiness, graceful stop and respawn.
//!
//! Output of the running engine is broadcast as [`EngineEvent`]s. Each launch
//! gets a new generation number so reader tasks of a replaced process can
//! never touch the state of its successor.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::helpers::wait_for_condition;
use crate::readiness::ReadinessQueue;
use crate::spawner::{EngineProcess, EngineReader, EngineWriter, ProcessSpawner, RealProcessSpawner};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of the supervised engine.
///
/// `NotStarted -> Starting -> Ready -> Closed | Crashed`, and back to
/// `Starting` on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Starting,
    Ready,
    Closed,
    Crashed,
}

/// Something the engine emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// One stdout line, ANSI sequences intact
    Line(String),
    /// One stderr line
    Stderr(String),
    /// Stdout reached end of file
    Exited,
}

struct Lifecycle {
    state: ProcessState,
    generation: u64,
    failure: Option<EngineError>,
    waiters: ReadinessQueue,
}

struct Shared {
    lifecycle: Mutex<Lifecycle>,
    stdin: tokio::sync::Mutex<Option<EngineWriter>>,
    process: Mutex<Option<Box<dyn EngineProcess>>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<EngineEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn mark_ready(&self, generation: u64) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.generation != generation || lifecycle.state != ProcessState::Starting {
            return;
        }
        lifecycle.state = ProcessState::Ready;
        let released = lifecycle.waiters.release_all();
        info!("Engine ready, prompt detected ({released} waiting)");
    }

    /// Records a failure of `generation`. Returns false for a stale generation.
    fn crash(&self, generation: u64, failure: EngineError) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.generation != generation
            || !matches!(lifecycle.state, ProcessState::Starting | ProcessState::Ready)
        {
            return false;
        }
        lifecycle.state = ProcessState::Crashed;
        lifecycle.waiters.fail_all(&failure);
        lifecycle.failure = Some(failure);
        true
    }
}

/// Owns at most one engine process.
///
/// Background tasks read stdout and stderr and publish every line. Dropping
/// the supervisor kills the process.
pub struct ProcessSupervisor {
    config: EngineConfig,
    spawner: Arc<dyn ProcessSpawner>,
    shared: Arc<Shared>,
}

impl ProcessSupervisor {
    pub fn new(config: EngineConfig, spawner: Arc<dyn ProcessSpawner>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            spawner,
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle {
                    state: ProcessState::NotStarted,
                    generation: 0,
                    failure: None,
                    waiters: ReadinessQueue::new(),
                }),
                stdin: tokio::sync::Mutex::new(None),
                process: Mutex::new(None),
                readers: Mutex::new(Vec::new()),
                events,
            }),
        }
    }

    /// Supervisor for the real engine binary.
    pub fn with_real_spawner(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(RealProcessSpawner))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> ProcessState {
        lock(&self.shared.lifecycle).state
    }

    /// Receives engine output from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// Launches the engine unless one is already starting or ready.
    ///
    /// # Process
    /// 1. Bumps the generation and enters `Starting`
    /// 2. Spawns the process and its stdout/stderr readers
    /// 3. Writes the init command
    ///
    /// Readiness is signalled later by the stdout reader when the first prompt
    /// appears; see [`wait_ready`](Self::wait_ready).
    ///
    /// # Errors
    /// `EngineError::Launch` if the spawn fails. The state becomes `Crashed`
    /// and waiting requests are rejected with the same error.
    pub async fn start(&self) -> Result<()> {
        let generation = {
            let mut lifecycle = lock(&self.shared.lifecycle);
            if matches!(lifecycle.state, ProcessState::Starting | ProcessState::Ready) {
                return Ok(());
            }
            lifecycle.generation += 1;
            lifecycle.state = ProcessState::Starting;
            lifecycle.failure = None;
            lifecycle.generation
        };

        info!("Starting engine process");
        let handle = match self.spawner.spawn_engine(&self.config) {
            Ok(handle) => handle,
            Err(message) => {
                error!("Failed to start engine: {message}");
                let failure = EngineError::Launch(message);
                self.shared.crash(generation, failure.clone());
                return Err(failure);
            }
        };
        match handle.process.id() {
            Some(pid) => info!("Engine process started with PID {pid}"),
            None => info!("Engine process started"),
        }

        *lock(&self.shared.process) = Some(handle.process);
        *self.shared.stdin.lock().await = Some(handle.stdin);

        let stdout = tokio::spawn(read_stdout(
            Arc::clone(&self.shared),
            generation,
            handle.stdout,
            self.config.prompt.clone(),
        ));
        let stderr = tokio::spawn(read_stderr(Arc::clone(&self.shared), handle.stderr));
        lock(&self.shared.readers).extend([stdout, stderr]);

        self.write_line(&self.config.init_command).await
    }

    /// Waits until the engine has printed its first prompt.
    ///
    /// Concurrent callers are queued and released together, in arrival order.
    ///
    /// # Errors
    /// - `EngineError::ReadinessTimeout` if no prompt appears within `timeout`
    /// - the stored failure if the engine crashed or could not launch
    /// - `EngineError::Closed` if the engine is stopped while waiting
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let (id, receiver) = {
            let mut lifecycle = lock(&self.shared.lifecycle);
            match lifecycle.state {
                ProcessState::Ready => return Ok(()),
                ProcessState::Crashed => {
                    return Err(lifecycle.failure.clone().unwrap_or(EngineError::ProcessExited))
                }
                ProcessState::NotStarted | ProcessState::Starting | ProcessState::Closed => {
                    lifecycle.waiters.enqueue(timeout)
                }
            }
        };

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(EngineError::Closed),
            Err(_) => {
                let mut lifecycle = lock(&self.shared.lifecycle);
                if lifecycle.waiters.remove(id) || lifecycle.state != ProcessState::Ready {
                    warn!("Engine not ready after {timeout:?}");
                    Err(EngineError::ReadinessTimeout(timeout))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Writes one line to the engine's stdin.
    pub async fn write_line(&self, text: &str) -> Result<()> {
        let mut stdin = self.shared.stdin.lock().await;
        let writer = stdin
            .as_mut()
            .ok_or_else(|| EngineError::Channel("engine stdin is not open".to_string()))?;
        writer
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Channel(format!("Failed to write to engine: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| EngineError::Channel(format!("Failed to flush engine stdin: {e}")))
    }

    /// Stops the engine: quit command first, forced kill after the grace period.
    ///
    /// Always leaves the state `Closed`. Requests still waiting on readiness
    /// are rejected with `EngineError::Closed`.
    pub async fn stop(&self) {
        {
            let mut lifecycle = lock(&self.shared.lifecycle);
            lifecycle.state = ProcessState::Closed;
            lifecycle.generation += 1;
            lifecycle.waiters.fail_all(&EngineError::Closed);
        }

        let stdin = self.shared.stdin.lock().await.take();
        let process = lock(&self.shared.process).take();

        if let Some(mut process) = process {
            info!("Stopping engine process");
            // Stdin stays open until the grace period ends; closing it would end the engine too.
            let mut stdin = stdin;
            if let Some(writer) = stdin.as_mut() {
                let quit = format!("{}\n", self.config.quit_command);
                if let Err(e) = writer.write_all(quit.as_bytes()).await {
                    debug!("Quit command not delivered: {e}");
                }
                let _ = writer.flush().await;
            }

            let exited = wait_for_condition(
                || process.has_exited(),
                self.config.stop_grace,
                "engine ignored quit",
            )
            .await;
            if let Err(msg) = exited {
                warn!("Killing engine process: {msg}");
                if let Err(e) = process.start_kill() {
                    error!("Failed to kill engine process: {e}");
                }
            }
            drop(stdin);
        }

        for reader in lock(&self.shared.readers).drain(..) {
            reader.abort();
        }
        info!("Engine process stopped");
    }

    /// Stops the engine, waits the settle delay, then starts it again and
    /// waits for readiness.
    ///
    /// A respawn requested while a launch is already in progress just waits
    /// for that launch.
    pub async fn respawn(&self) -> Result<()> {
        if self.state() == ProcessState::Starting {
            return self.wait_ready(self.config.readiness_timeout).await;
        }

        info!("Respawning engine process");
        self.stop().await;
        tokio::time::sleep(self.config.respawn_settle).await;
        self.start().await?;
        self.wait_ready(self.config.readiness_timeout).await
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Some(mut process) = lock(&self.shared.process).take() {
            if let Err(e) = process.start_kill() {
                error!("Failed to kill engine process on drop: {e}");
            }
        }
        for reader in lock(&self.shared.readers).drain(..) {
            reader.abort();
        }
    }
}

async fn read_stdout(shared: Arc<Shared>, generation: u64, stdout: EngineReader, prompt: String) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.contains(&prompt) {
                    shared.mark_ready(generation);
                }
                let _ = shared.events.send(EngineEvent::Line(line));
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read engine stdout: {e}");
                break;
            }
        }
    }

    if shared.crash(generation, EngineError::ProcessExited) {
        warn!("Engine process exited unexpectedly");
        shared.stdin.lock().await.take();
    }
    let _ = shared.events.send(EngineEvent::Exited);
}

async fn read_stderr(shared: Arc<Shared>, stderr: EngineReader) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!("Engine stderr: {line}");
        let _ = shared.events.send(EngineEvent::Stderr(line));
    }
}
