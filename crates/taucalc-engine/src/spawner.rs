//! Process spawning abstraction for testability.
//!
//! The supervisor only sees boxed byte streams and a small process handle, so
//! tests can substitute an in-memory engine for the real binary.

use crate::config::EngineConfig;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::debug;

pub type EngineWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type EngineReader = Box<dyn AsyncRead + Send + Unpin>;

/// Control over a running engine, independent of its streams.
pub trait EngineProcess: Send {
    /// OS process id, if the engine is a real process
    fn id(&self) -> Option<u32>;

    /// Whether the process has terminated.
    fn has_exited(&mut self) -> bool;

    /// Requests forced termination without waiting for it.
    fn start_kill(&mut self) -> std::io::Result<()>;
}

impl EngineProcess for Child {
    fn id(&self) -> Option<u32> {
        Child::id(self)
    }

    fn has_exited(&mut self) -> bool {
        // An unqueryable child is treated as gone.
        !matches!(self.try_wait(), Ok(None))
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        Child::start_kill(self)
    }
}

/// A launched engine with its standard streams detached.
pub struct EngineHandle {
    pub stdin: EngineWriter,
    pub stdout: EngineReader,
    pub stderr: EngineReader,
    pub process: Box<dyn EngineProcess>,
}

/// Trait for launching the engine.
///
/// Production code uses `RealProcessSpawner`, tests use `mock::MockEngineSpawner`.
pub trait ProcessSpawner: Send + Sync {
    /// Launches the engine described by `config`.
    ///
    /// # Returns
    /// - `Ok(EngineHandle)` with piped streams
    /// - `Err(String)` with error message if launch fails
    fn spawn_engine(&self, config: &EngineConfig) -> Result<EngineHandle, String>;
}

/// Launches the real engine binary with piped standard streams.
pub struct RealProcessSpawner;

impl ProcessSpawner for RealProcessSpawner {
    fn spawn_engine(&self, config: &EngineConfig) -> Result<EngineHandle, String> {
        let binary = config.locate_engine().map_err(|e| e.to_string())?;
        debug!("Launching {} {:?}", binary.display(), config.args);

        let mut child = Command::new(&binary)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to spawn {}: {e}", binary.display()))?;

        let stdin = child.stdin.take().ok_or("engine stdin was not piped")?;
        let stdout = child.stdout.take().ok_or("engine stdout was not piped")?;
        let stderr = child.stderr.take().ok_or("engine stderr was not piped")?;

        Ok(EngineHandle {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            process: Box::new(child),
        })
    }
}
