//! Engine errors

use std::time::Duration;
use thiserror::Error;

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures of the supervised process or of a single command.
///
/// Cloneable so that one process-level failure can be handed to every
/// request waiting on readiness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("failed to launch engine: {0}")]
    Launch(String),

    #[error("command channel error: {0}")]
    Channel(String),

    #[error("command {command:?} timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("engine not ready after {0:?}")]
    ReadinessTimeout(Duration),

    #[error("engine reported an error: {0}")]
    EngineReported(String),

    #[error("engine process exited unexpectedly")]
    ProcessExited,

    #[error("engine process was stopped")]
    Closed,
}
