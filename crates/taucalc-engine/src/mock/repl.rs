//! Interactive loop of the mock engine.

use super::formula::Interpreter;
use super::MockBehavior;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};

const BANNER: &str = "Welcome to the Tau Language Framework (mock engine)";
const PROMPT: &str = "tau> ";

// Gives the stderr reader time to deliver before the prompt follows.
const STDERR_SETTLE: Duration = Duration::from_millis(20);

enum Reply {
    Silent,
    Value(bool),
    Error(String),
}

struct Session {
    behavior: MockBehavior,
    interpreter: Interpreter,
    colors: bool,
    memory: usize,
    stdout: DuplexStream,
    stderr: DuplexStream,
}

pub(super) async fn run(
    behavior: MockBehavior,
    received: Arc<Mutex<Vec<String>>>,
    stdin: DuplexStream,
    stdout: DuplexStream,
    stderr: DuplexStream,
) {
    let mut session = Session {
        behavior,
        interpreter: Interpreter::new(),
        colors: true,
        memory: 0,
        stdout,
        stderr,
    };
    let mut lines = BufReader::new(stdin).lines();

    if session.startup().await.is_err() {
        return;
    }
    while let Ok(Some(line)) = lines.next_line().await {
        received
            .lock()
            .expect("mock engine received mutex poisoned")
            .push(line.clone());
        match session.handle(line.trim(), &mut lines).await {
            Ok(true) => {}
            Ok(false) | Err(_) => break,
        }
    }
}

impl Session {
    async fn out(&mut self, line: &str) -> io::Result<()> {
        self.stdout.write_all(format!("{line}\n").as_bytes()).await?;
        self.stdout.flush().await
    }

    async fn err(&mut self, line: &str) -> io::Result<()> {
        self.stderr.write_all(format!("{line}\n").as_bytes()).await?;
        self.stderr.flush().await?;
        tokio::time::sleep(STDERR_SETTLE).await;
        Ok(())
    }

    async fn startup(&mut self) -> io::Result<()> {
        self.out(BANNER).await?;
        if self.behavior != MockBehavior::NeverReady {
            self.out(PROMPT).await?;
        }
        Ok(())
    }

    /// Handles one input line, returning whether the engine keeps running.
    async fn handle(
        &mut self,
        command: &str,
        lines: &mut Lines<BufReader<DuplexStream>>,
    ) -> io::Result<bool> {
        if self.behavior == MockBehavior::NeverReady {
            return Ok(command != "quit");
        }

        self.out(&format!("{PROMPT}{command}")).await?;

        if command == "quit" {
            if self.behavior == MockBehavior::IgnoresQuit {
                self.out(PROMPT).await?;
                return Ok(true);
            }
            return Ok(false);
        }

        let initialization = command.starts_with("set ");
        if !initialization {
            match self.behavior.clone() {
                MockBehavior::CrashOnCommand => return Ok(false),
                MockBehavior::EchoOnly => return Ok(true),
                MockBehavior::StderrOnCommand { message } => {
                    self.err(&message).await?;
                    self.out(PROMPT).await?;
                    return Ok(true);
                }
                _ => {}
            }
        }

        match self.interpret(command) {
            Reply::Silent => self.out(PROMPT).await?,
            Reply::Error(message) => {
                self.err(&message).await?;
                self.out(PROMPT).await?;
            }
            Reply::Value(value) => {
                if self.behavior == MockBehavior::Stepping {
                    self.out("Execution step: 1").await?;
                    if lines.next_line().await?.is_none() {
                        return Ok(false);
                    }
                }
                if let MockBehavior::DelayedOutput { delay_ms } = self.behavior {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                let token = self.render(value);
                self.out(&token).await?;
                match self.behavior {
                    MockBehavior::WithholdsPrompt => {}
                    MockBehavior::BlankTerminated => self.out("").await?,
                    _ => self.out(PROMPT).await?,
                }
            }
        }
        Ok(true)
    }

    fn interpret(&mut self, command: &str) -> Reply {
        if command.is_empty() {
            return Reply::Silent;
        }
        if let Some(setting) = command.strip_prefix("set ") {
            match setting.trim() {
                "colors off" => self.colors = false,
                "colors on" => self.colors = true,
                _ => {}
            }
            return Reply::Silent;
        }
        if command.contains(":=") {
            return match self.interpreter.define(command) {
                Ok(_) => Reply::Silent,
                Err(e) => Reply::Error(format!("(Error) {e}")),
            };
        }
        if let Some(expr) = command.strip_prefix("n ") {
            return match self.interpreter.evaluate(expr) {
                Ok(value) => Reply::Value(value),
                Err(e) => Reply::Error(format!("(Error) {e}")),
            };
        }
        Reply::Error(format!("(Error) unknown command: {command}"))
    }

    fn render(&mut self, value: bool) -> String {
        self.memory += 1;
        let symbol = if value { "T" } else { "F" };
        if self.colors {
            format!("\x1b[1m%{}\x1b[0m: \x1b[1;32m{symbol}\x1b[0m", self.memory)
        } else {
            format!("%{}: {symbol}", self.memory)
        }
    }
}
