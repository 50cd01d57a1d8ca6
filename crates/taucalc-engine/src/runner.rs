//! Whole-program execution.

use crate::channel::CommandChannel;
use crate::error::Result;
use std::time::{Duration, Instant};
use taucalc_circuit::decoder::{parse_bit_token, BitOutput};
use taucalc_circuit::program::{EngineProgram, Statement};
use tracing::{debug, info, warn};

/// Display results of one program run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRun {
    /// One entry per display statement, in program order
    pub outputs: Vec<BitOutput>,
    pub elapsed: Duration,
}

impl CommandChannel {
    /// Runs every setup statement, then every display statement, one command
    /// at a time.
    ///
    /// A display whose response holds no result token yields empty content.
    /// The first failing command aborts the run.
    pub async fn run_program(&mut self, program: &EngineProgram) -> Result<ProgramRun> {
        let started = Instant::now();
        let (displays, setup): (Vec<_>, Vec<_>) = program
            .statements()
            .partition(|statement| matches!(statement, Statement::Display { .. }));
        info!(
            "Running program: {} setup statements, {} displays",
            setup.len(),
            displays.len()
        );

        for statement in &setup {
            self.execute(statement.text()).await?;
        }

        let mut outputs = Vec::with_capacity(displays.len());
        for statement in &displays {
            let Statement::Display { name, text } = statement else {
                continue;
            };
            let response = self.execute(text).await?;
            let content = parse_bit_token(&response).unwrap_or_default();
            if content.is_empty() {
                warn!("No result token for {name} in {response:?}");
            } else {
                debug!("{name} = {content}");
            }
            outputs.push(BitOutput::new(*name, content));
        }

        let elapsed = started.elapsed();
        info!("Program finished in {elapsed:?}");
        Ok(ProgramRun { outputs, elapsed })
    }
}
