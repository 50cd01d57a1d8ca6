//! Engine configuration and binary discovery.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Platform file name of the engine binary.
pub const DEFAULT_BINARY_NAME: &str = if cfg!(windows) { "tau.exe" } else { "tau" };

/// Directory holding a bundled engine binary, next to the executable or in the working directory.
pub const BUNDLED_BINARY_DIR: &str = "tau-binary";

/// How the engine is launched and how long the protocol waits on it.
///
/// Deserializes with defaults for every missing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit engine binary; `None` searches `PATH` and the bundled directory
    pub binary_path: Option<PathBuf>,
    pub binary_name: String,
    pub args: Vec<String>,
    /// Interactive prompt printed when the engine waits for input
    pub prompt: String,
    /// Sent once after launch, before any command
    pub init_command: String,
    pub quit_command: String,
    /// Output line that pauses execution until a blank line is written
    pub continuation_marker: String,
    pub readiness_timeout: Duration,
    pub command_timeout: Duration,
    /// Quiet period after a blank output line before the command completes
    pub debounce: Duration,
    /// Time allowed for a graceful quit before the process is killed
    pub stop_grace: Duration,
    pub respawn_settle: Duration,
    /// Capacity of the engine event channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            args: vec!["-S".to_string(), "info".to_string()],
            prompt: "tau>".to_string(),
            init_command: "set colors off".to_string(),
            quit_command: "quit".to_string(),
            continuation_marker: "Execution step:".to_string(),
            readiness_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            debounce: Duration::from_millis(2),
            stop_grace: Duration::from_secs(1),
            respawn_settle: Duration::from_millis(500),
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    /// Resolves the engine binary.
    ///
    /// An explicit path must exist. Otherwise `PATH` is searched, then
    /// `tau-binary/<name>` beside the current executable and in the working
    /// directory.
    pub fn locate_engine(&self) -> Result<PathBuf> {
        if let Some(path) = &self.binary_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(EngineError::Launch(format!(
                "engine binary not found at {}",
                path.display()
            )));
        }

        if let Ok(path) = which::which(&self.binary_name) {
            return Ok(path);
        }

        let mut roots = Vec::new();
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(PathBuf::from))
        {
            roots.push(dir);
        }
        if let Ok(dir) = std::env::current_dir() {
            roots.push(dir);
        }
        roots
            .into_iter()
            .map(|root| root.join(BUNDLED_BINARY_DIR).join(&self.binary_name))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                EngineError::Launch(format!(
                    "{} not found in PATH or {BUNDLED_BINARY_DIR}/",
                    self.binary_name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_protocol() {
        let config = EngineConfig::default();
        assert_eq!(config.prompt, "tau>");
        assert_eq!(config.init_command, "set colors off");
        assert_eq!(config.quit_command, "quit");
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.stop_grace, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"binary_path": "/opt/tau/bin/tau", "command_timeout": {"secs": 10, "nanos": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.binary_path, Some(PathBuf::from("/opt/tau/bin/tau")));
        assert_eq!(config.command_timeout, Duration::from_secs(10));
        assert_eq!(config.prompt, "tau>");
        assert_eq!(config.args, vec!["-S", "info"]);
    }

    #[test]
    fn test_missing_explicit_binary_is_launch_error() {
        let config = EngineConfig::default().with_binary("/definitely/not/here/tau");
        assert!(matches!(config.locate_engine(), Err(EngineError::Launch(_))));
    }

    #[test]
    fn test_explicit_binary_is_used_when_present() {
        let exe = std::env::current_exe().expect("test binary path");
        let config = EngineConfig::default().with_binary(&exe);
        assert_eq!(config.locate_engine().unwrap(), exe);
    }

    #[test]
    fn test_unknown_binary_name_is_launch_error() {
        let config = EngineConfig {
            binary_name: "taucalc-no-such-engine-binary".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(config.locate_engine(), Err(EngineError::Launch(_))));
    }
}
