//! Circuit synthesis: turns `(a, b, operation)` into an engine program whose
//! display directives print the result bits `bit0, bit1, ...`.
//!
//! Input operands are declared most-significant first as `a1..a{w}` /
//! `b1..b{w}`, so `a{w}` holds the least-significant bit and feeds `bit0`.
//!
//! | operation | integer | fixed point | floating point |
//! |---|---|---|---|
//! | add / subtract | ripple-carry, `bit0..=bit{w}` | scaled ripple-carry | result constants, `bit0..bit{w-1}` |
//! | multiply | array multiplier at width 8, result constants otherwise | - | - |
//! | divide | result constants (floor) | - | - |

mod adder;
mod constant;
mod multiplier;

use crate::codec::{self, FloatFormat, MAX_WIDTH};
use crate::error::{CircuitError, Result};
use crate::program::{EngineProgram, ProgramBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Width at which multiplication is synthesized as a gate-level array multiplier.
pub const GATE_LEVEL_MULTIPLIER_WIDTH: u32 = 8;

/// The fixed set of calculator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn symbol(&self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '×',
            Operation::Divide => '÷',
        }
    }

    /// Integer result; division floors. `None` on division by zero or overflow.
    pub fn apply_int(&self, a: i64, b: i64) -> Option<i64> {
        match self {
            Operation::Add => a.checked_add(b),
            Operation::Subtract => a.checked_sub(b),
            Operation::Multiply => a.checked_mul(b),
            Operation::Divide => {
                if b == 0 {
                    return None;
                }
                let quotient = a.checked_div(b)?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    Some(quotient - 1)
                } else {
                    Some(quotient)
                }
            }
        }
    }

    /// Floating-point result.
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => a / b,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Operation {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "+" => Ok(Operation::Add),
            "-" | "−" => Ok(Operation::Subtract),
            "*" | "×" | "x" => Ok(Operation::Multiply),
            "/" | "÷" => Ok(Operation::Divide),
            other => Err(CircuitError::UnknownOperator(other.to_string())),
        }
    }
}

/// How operands are represented in bits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumberMode {
    Integer,
    FixedPoint { places: u32 },
    FloatingPoint(FloatFormat),
}

impl NumberMode {
    pub fn name(&self) -> &'static str {
        match self {
            NumberMode::Integer => "integer",
            NumberMode::FixedPoint { .. } => "fixed-point",
            NumberMode::FloatingPoint(_) => "floating-point",
        }
    }
}

/// Generates engine programs for one bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSynthesizer {
    width: u32,
}

impl CircuitSynthesizer {
    pub fn new(width: u32) -> Result<Self> {
        if !(2..=MAX_WIDTH).contains(&width) {
            return Err(CircuitError::Configuration(format!(
                "bit width must be between 2 and {MAX_WIDTH}, got {width}"
            )));
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Dispatches on mode and operation.
    pub fn synthesize(
        &self,
        a: f64,
        b: f64,
        operation: Operation,
        mode: NumberMode,
    ) -> Result<EngineProgram> {
        debug!(
            "synthesizing {a} {operation} {b} as {} over {} bits",
            mode.name(),
            self.width
        );
        match mode {
            NumberMode::Integer => {
                let (a, b) = (integer_operand(a)?, integer_operand(b)?);
                match operation {
                    Operation::Add => self.addition(a, b),
                    Operation::Subtract => self.subtraction(a, b),
                    Operation::Multiply => self.multiplication(a, b),
                    Operation::Divide => self.division(a, b),
                }
            }
            NumberMode::FixedPoint { places } => self.fixed_point(a, b, operation, places),
            NumberMode::FloatingPoint(format) => self.floating_point(a, b, operation, format),
        }
    }

    /// Ripple-carry addition with the overflow bit at `bit{w}`.
    pub fn addition(&self, a: i64, b: i64) -> Result<EngineProgram> {
        let a_bits = codec::to_twos_complement(a, self.width)?;
        let b_bits = codec::to_twos_complement(b, self.width)?;

        let mut builder = ProgramBuilder::new();
        builder
            .blank()
            .comment(format!("Binary addition ({}-bit)", self.width))
            .comment(format!("A: {a} ({})", codec::to_binary_string(&a_bits)))
            .comment(format!("B: {b} ({})", codec::to_binary_string(&b_bits)))
            .blank();
        adder::write_addition(&mut builder, self.width, &a_bits, &b_bits);
        Ok(builder.build())
    }

    /// `A + twos_complement(B)`; `bit{w}` is the sign.
    pub fn subtraction(&self, a: i64, b: i64) -> Result<EngineProgram> {
        let a_bits = codec::to_twos_complement(a, self.width)?;
        let b_bits = codec::to_twos_complement(b, self.width)?;

        let mut builder = ProgramBuilder::new();
        builder
            .blank()
            .comment(format!("Binary subtraction ({}-bit)", self.width))
            .comment(format!("A: {a} ({})", codec::to_binary_string(&a_bits)))
            .comment(format!("B: {b} ({})", codec::to_binary_string(&b_bits)))
            .blank();
        adder::write_subtraction(&mut builder, self.width, &a_bits, &b_bits);
        Ok(builder.build())
    }

    /// Gate-level at [`GATE_LEVEL_MULTIPLIER_WIDTH`], precomputed constants at any other width.
    pub fn multiplication(&self, a: i64, b: i64) -> Result<EngineProgram> {
        if self.width == GATE_LEVEL_MULTIPLIER_WIDTH {
            multiplier::array_multiplication(self.width, a, b)
        } else {
            let product = a.saturating_mul(b);
            constant::direct_program(
                &format!("Direct multiplication ({}-bit)", self.width),
                &format!("A: {a}, B: {b}, Result: {product}"),
                self.width,
                product,
            )
        }
    }

    /// Floor division as precomputed constants.
    pub fn division(&self, a: i64, b: i64) -> Result<EngineProgram> {
        let quotient = Operation::Divide
            .apply_int(a, b)
            .ok_or(CircuitError::DivisionByZero)?;
        constant::direct_program(
            &format!("Division ({}-bit)", self.width),
            &format!("A: {a}, B: {b}, Result: {quotient}"),
            self.width,
            quotient,
        )
    }

    /// Operands scaled by `10^places` and run through the integer adder.
    pub fn fixed_point(
        &self,
        a: f64,
        b: f64,
        operation: Operation,
        places: u32,
    ) -> Result<EngineProgram> {
        let scaled_a = codec::encode_fixed_point(a, places);
        let scaled_b = codec::encode_fixed_point(b, places);
        let a_bits = codec::to_twos_complement(scaled_a, self.width)?;
        let b_bits = codec::to_twos_complement(scaled_b, self.width)?;

        let title = match operation {
            Operation::Add => "addition",
            Operation::Subtract => "subtraction",
            _ => {
                return Err(CircuitError::UnsupportedOperation {
                    operation: operation.to_string(),
                    mode: NumberMode::FixedPoint { places }.name().to_string(),
                })
            }
        };

        let mut builder = ProgramBuilder::new();
        builder
            .blank()
            .comment(format!("Fixed-point binary {title} ({}-bit)", self.width))
            .comment(format!("Scale factor: 10^{places}"))
            .comment(format!(
                "A: {a} (scaled to {scaled_a}, binary: {})",
                codec::to_binary_string(&a_bits)
            ))
            .comment(format!(
                "B: {b} (scaled to {scaled_b}, binary: {})",
                codec::to_binary_string(&b_bits)
            ))
            .blank();
        if operation == Operation::Add {
            adder::write_addition(&mut builder, self.width, &a_bits, &b_bits);
        } else {
            adder::write_subtraction(&mut builder, self.width, &a_bits, &b_bits);
        }
        builder.blank().comment(format!(
            "Result should be divided by {} to get decimal value",
            codec::fixed_point_scale(places)
        ));
        Ok(builder.build())
    }

    /// The result is computed numerically and its encoding emitted as constants.
    pub fn floating_point(
        &self,
        a: f64,
        b: f64,
        operation: Operation,
        format: FloatFormat,
    ) -> Result<EngineProgram> {
        format.validate(self.width)?;
        let title = match operation {
            Operation::Add => "addition",
            Operation::Subtract => "subtraction",
            _ => {
                return Err(CircuitError::UnsupportedOperation {
                    operation: operation.to_string(),
                    mode: NumberMode::FloatingPoint(format).name().to_string(),
                })
            }
        };

        let result = operation.apply(a, b);
        let encoded = codec::encode_float(result, format)?;

        let mut builder = ProgramBuilder::new();
        builder
            .blank()
            .comment(format!("Floating-point binary {title} ({}-bit)", self.width))
            .comment(format!(
                "Format: Sign(1) + Exponent({}) + Mantissa({})",
                format.exponent_bits, format.mantissa_bits
            ))
            .comment(format!("A: {a} (encoded: {})", describe_float(a, format)))
            .comment(format!("B: {b} (encoded: {})", describe_float(b, format)))
            .comment(format!("Result: {result} (encoded: {})", field_order(&encoded)))
            .blank()
            .comment("Result bit definitions (direct encoding of the result)");
        for (i, bit) in encoded.iter().enumerate() {
            builder.bit(format!("bit{i}"), u8::from(*bit).to_string());
        }
        builder
            .blank()
            .comment("Display results")
            .display_bits(self.width - 1);
        Ok(builder.build())
    }
}

fn integer_operand(value: f64) -> Result<i64> {
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(CircuitError::NonIntegerOperand(value));
    }
    Ok(value as i64)
}

/// Bits in their stored order, without reversing.
fn field_order(bits: &[bool]) -> String {
    bits.iter().map(|b| if *b { '1' } else { '0' }).collect()
}

fn describe_float(value: f64, format: FloatFormat) -> String {
    codec::encode_float(value, format)
        .map(|bits| field_order(&bits))
        .unwrap_or_else(|_| "unrepresentable".to_string())
}

/// Name of input bit `position` (0 = least significant) for an operand prefix.
pub(crate) fn input_name(prefix: &str, width: u32, position: u32) -> String {
    format!("{prefix}{}", width - position)
}

/// Emits `{prefix}{w}(x) := lsb` down to `{prefix}1(x) := msb`.
pub(crate) fn write_inputs(builder: &mut ProgramBuilder, prefix: &str, bits: &[bool]) {
    let width = bits.len() as u32;
    for (position, bit) in bits.iter().enumerate() {
        builder.bit(
            input_name(prefix, width, position as u32),
            u8::from(*bit).to_string(),
        );
    }
}
