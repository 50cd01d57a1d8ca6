//! Completion tracking for the command in flight.

use crate::error::{EngineError, Result};
use std::time::Duration;
use taucalc_circuit::decoder::strip_ansi;

/// What a stdout line meant for the pending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Arrived before the echo, belongs to an earlier command
    Ignored,
    Echo,
    Content,
    /// Blank line, completes the command after the debounce delay
    Blank,
    /// Continuation marker, the engine waits for a blank line
    Advance,
    /// Prompt after the echo
    Complete,
}

/// Output collected for one command.
///
/// Lines are attributed only after the engine echoes `<prompt> <command>`,
/// and the next line containing the prompt ends the command.
#[derive(Debug)]
pub struct PendingCommand {
    command: String,
    echo: String,
    prompt: String,
    marker: String,
    lines: Vec<String>,
    echoed: bool,
    completed: bool,
}

impl PendingCommand {
    pub fn new(command: &str, prompt: &str, continuation_marker: &str) -> Self {
        Self {
            command: command.to_string(),
            echo: format!("{prompt} {command}"),
            prompt: prompt.to_string(),
            marker: continuation_marker.to_string(),
            lines: Vec::new(),
            echoed: false,
            completed: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn echoed(&self) -> bool {
        self.echoed
    }

    pub fn observe(&mut self, raw: &str) -> Observation {
        if self.completed {
            return Observation::Ignored;
        }
        let line = strip_ansi(raw);

        if !self.echoed {
            if line.contains(&self.echo) {
                self.echoed = true;
                return Observation::Echo;
            }
            return Observation::Ignored;
        }

        if line.contains(&self.prompt) {
            self.completed = true;
            return Observation::Complete;
        }

        self.lines.push(raw.to_string());
        if line.contains(&self.marker) {
            Observation::Advance
        } else if line.trim().is_empty() {
            Observation::Blank
        } else {
            Observation::Content
        }
    }

    /// Collected output, newline-joined.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }

    /// Resolves a command whose deadline passed.
    ///
    /// Output gathered after the echo is returned as-is. With nothing
    /// gathered the command failed.
    pub fn expire(self, timeout: Duration) -> Result<String> {
        if self.echoed && !self.lines.is_empty() {
            Ok(self.finish())
        } else {
            Err(EngineError::CommandTimeout {
                command: self.command,
                timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(command: &str) -> PendingCommand {
        PendingCommand::new(command, "tau>", "Execution step:")
    }

    #[test]
    fn test_lines_before_echo_are_ignored() {
        let mut cmd = pending("n bit0(x)");
        assert_eq!(cmd.observe("%7: T"), Observation::Ignored);
        assert_eq!(cmd.observe("tau> "), Observation::Ignored);
        assert_eq!(cmd.observe("tau> n bit0(x)"), Observation::Echo);
        assert_eq!(cmd.observe("%8: F"), Observation::Content);
        assert_eq!(cmd.observe("tau> "), Observation::Complete);
        assert_eq!(cmd.observe("%9: T"), Observation::Ignored);
        assert_eq!(cmd.finish(), "%8: F");
    }

    #[test]
    fn test_colored_echo_is_recognized() {
        let mut cmd = pending("n bit1(x)");
        assert_eq!(cmd.observe("\x1b[1mtau>\x1b[0m n bit1(x)"), Observation::Echo);
    }

    #[test]
    fn test_marker_and_blank_lines() {
        let mut cmd = pending("n bit0(x)");
        cmd.observe("tau> n bit0(x)");
        assert_eq!(cmd.observe("Execution step: 1"), Observation::Advance);
        assert_eq!(cmd.observe("   "), Observation::Blank);
        assert_eq!(cmd.finish(), "Execution step: 1\n   ");
    }

    #[test]
    fn test_expire_with_partial_output() {
        let mut cmd = pending("n bit0(x)");
        cmd.observe("tau> n bit0(x)");
        cmd.observe("%1: T");
        assert_eq!(cmd.expire(Duration::from_secs(5)).unwrap(), "%1: T");
    }

    #[test]
    fn test_expire_without_output_fails() {
        let mut cmd = pending("n bit0(x)");
        cmd.observe("tau> n bit0(x)");
        let err = cmd.expire(Duration::from_millis(50)).unwrap_err();
        assert_eq!(
            err,
            EngineError::CommandTimeout {
                command: "n bit0(x)".to_string(),
                timeout: Duration::from_millis(50),
            }
        );

        let silent = pending("n bit0(x)");
        assert!(!silent.echoed());
        assert!(silent.expire(Duration::from_millis(50)).is_err());
    }
}
