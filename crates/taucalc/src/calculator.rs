//! Calculations run as boolean circuits on the engine.

use crate::error::Result;
use crate::settings::{CalculatorSettings, DecimalMode};
use crate::validate;
use std::sync::Arc;
use std::time::Duration;
use taucalc_circuit::{decode, CircuitSynthesizer, EngineProgram, NumberMode, Operation};
use taucalc_engine::{CommandChannel, ProcessSupervisor};
use tracing::{error, info};

/// Outcome of one calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    pub value: f64,
    pub execution_time: Duration,
    /// Bits that were missing from the engine output and read as 0
    pub defaulted_bits: Vec<u32>,
    pub program: EngineProgram,
}

/// Validates operands, synthesizes a program, runs it and decodes the result.
///
/// Calculations are strictly sequential. After each successful one the engine
/// is respawned (unless disabled in the settings) so the next calculation
/// starts without the previous definitions.
pub struct Calculator {
    channel: CommandChannel,
    settings: CalculatorSettings,
    synthesizer: CircuitSynthesizer,
}

impl Calculator {
    pub fn new(supervisor: Arc<ProcessSupervisor>, settings: CalculatorSettings) -> Result<Self> {
        let synthesizer = CircuitSynthesizer::new(settings.bit_width)?;
        Ok(Self {
            channel: CommandChannel::new(supervisor),
            settings,
            synthesizer,
        })
    }

    pub fn settings(&self) -> &CalculatorSettings {
        &self.settings
    }

    /// Changes the bit width. An explicit float format is kept only if it
    /// still fills the new width.
    pub fn set_bit_width(&mut self, width: u32) -> Result<()> {
        self.synthesizer = CircuitSynthesizer::new(width)?;
        self.settings.bit_width = width;
        if let Some(format) = self.settings.float_format {
            if format.validate(width).is_err() {
                self.settings.float_format = None;
            }
        }
        info!(
            "Bit width set to {width}, max value: {}",
            self.settings.max_value()
        );
        Ok(())
    }

    pub fn set_decimal_mode(&mut self, mode: DecimalMode) {
        self.settings.decimal_mode = mode;
        info!("Decimal mode set to {mode:?}");
    }

    pub fn set_decimal_places(&mut self, places: u32) {
        self.settings.decimal_places = places;
    }

    pub fn channel(&mut self) -> &mut CommandChannel {
        &mut self.channel
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        self.channel.supervisor()
    }

    /// Program for an integer calculation, after validation.
    pub fn integer_program(&self, a: i64, b: i64, operation: Operation) -> Result<EngineProgram> {
        validate::check_integer(a, b, operation, self.settings.bit_width)?;
        let program = match operation {
            Operation::Add => self.synthesizer.addition(a, b),
            Operation::Subtract => self.synthesizer.subtraction(a, b),
            Operation::Multiply => self.synthesizer.multiplication(a, b),
            Operation::Divide => self.synthesizer.division(a, b),
        }?;
        Ok(program)
    }

    /// Program for a decimal calculation in the configured decimal mode, after validation.
    pub fn decimal_program(&self, a: f64, b: f64, operation: Operation) -> Result<EngineProgram> {
        validate::check_decimal(a, b, operation, &self.settings)?;
        let program = self.synthesizer.synthesize(
            a,
            b,
            operation,
            self.settings.decimal_number_mode(),
        )?;
        Ok(program)
    }

    pub async fn calculate(&mut self, a: i64, b: i64, operation: Operation) -> Result<CalculationResult> {
        info!("Calculating {a} {operation} {b} ({}-bit integer)", self.settings.bit_width);
        let program = self.integer_program(a, b, operation)?;
        self.evaluate(program, NumberMode::Integer).await
    }

    pub async fn calculate_decimal(
        &mut self,
        a: f64,
        b: f64,
        operation: Operation,
    ) -> Result<CalculationResult> {
        let mode = self.settings.decimal_number_mode();
        info!(
            "Calculating {a} {operation} {b} ({}-bit {})",
            self.settings.bit_width,
            mode.name()
        );
        let program = self.decimal_program(a, b, operation)?;
        self.evaluate(program, mode).await
    }

    async fn evaluate(&mut self, program: EngineProgram, mode: NumberMode) -> Result<CalculationResult> {
        let run = self.channel.run_program(&program).await?;
        let decoded = decode(&run.outputs, self.settings.bit_width, mode)?;
        info!("Result: {} in {:?}", decoded.value, run.elapsed);

        if self.settings.respawn_after_calculation {
            if let Err(e) = self.channel.supervisor().respawn().await {
                error!("Failed to respawn engine after calculation: {e}");
            }
        }

        Ok(CalculationResult {
            value: decoded.value,
            execution_time: run.elapsed,
            defaulted_bits: decoded.defaulted,
            program,
        })
    }
}
