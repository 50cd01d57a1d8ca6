//! In-memory engine for tests.
//!
//! Available for integration tests and external test crates. The fake engine
//! speaks the same line protocol as the real binary over `tokio::io::duplex`
//! pipes and evaluates programs with [`formula::Interpreter`].

pub mod formula;
mod repl;

use crate::config::EngineConfig;
use crate::spawner::{EngineHandle, EngineProcess, ProcessSpawner};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Behavior specification for mock engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Evaluates every command and prompts after each one
    Responsive,
    /// Launch fails immediately
    SpawnFails { error: String },
    /// Prints its banner but never a prompt (readiness timeout scenario)
    NeverReady,
    /// Echoes commands after initialization and prints nothing else
    EchoOnly,
    /// Prints display results but no prompt after them
    WithholdsPrompt,
    /// Ends display results with a blank line instead of a prompt
    BlankTerminated,
    /// Pauses at an execution step before each display result
    Stepping,
    /// Answers every command after initialization on stderr
    StderrOnCommand { message: String },
    /// Exits on the first command after initialization
    CrashOnCommand,
    /// Waits before printing each display result
    DelayedOutput { delay_ms: u64 },
    /// Never exits on the quit command (forced kill scenario)
    IgnoresQuit,
}

/// Spawner producing mock engines and recording what they were sent.
pub struct MockEngineSpawner {
    behavior: Arc<Mutex<MockBehavior>>,
    spawns: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockEngineSpawner {
    /// Creates a new mock spawner with the specified behavior.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            spawns: Arc::new(AtomicUsize::new(0)),
            kills: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn responsive() -> Self {
        Self::new(MockBehavior::Responsive)
    }

    /// Changes the behavior of engines spawned from now on.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().expect("MockEngineSpawner behavior mutex poisoned") = behavior;
    }

    /// Number of launch attempts, failed ones included.
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Number of forced kills requested.
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Every line written to any engine spawned by this spawner, in order.
    pub fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .expect("MockEngineSpawner received mutex poisoned")
            .clone()
    }
}

impl Default for MockEngineSpawner {
    fn default() -> Self {
        Self::responsive()
    }
}

impl ProcessSpawner for MockEngineSpawner {
    fn spawn_engine(&self, _config: &EngineConfig) -> Result<EngineHandle, String> {
        self.spawns.fetch_add(1, Ordering::SeqCst);

        let behavior = self
            .behavior
            .lock()
            .expect("MockEngineSpawner behavior mutex poisoned")
            .clone();
        if let MockBehavior::SpawnFails { error } = behavior {
            return Err(error);
        }

        let (stdin, engine_stdin) = tokio::io::duplex(PIPE_CAPACITY);
        let (engine_stdout, stdout) = tokio::io::duplex(PIPE_CAPACITY);
        let (engine_stderr, stderr) = tokio::io::duplex(PIPE_CAPACITY);

        let task = tokio::spawn(repl::run(
            behavior,
            Arc::clone(&self.received),
            engine_stdin,
            engine_stdout,
            engine_stderr,
        ));

        Ok(EngineHandle {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            process: Box::new(MockProcess {
                task,
                kills: Arc::clone(&self.kills),
            }),
        })
    }
}

struct MockProcess {
    task: JoinHandle<()>,
    kills: Arc<AtomicUsize>,
}

impl EngineProcess for MockProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn has_exited(&mut self) -> bool {
        self.task.is_finished()
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.task.abort();
        Ok(())
    }
}

impl Drop for MockProcess {
    fn drop(&mut self) {
        self.task.abort();
    }
}
