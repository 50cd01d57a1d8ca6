//! Calculator service over the Tau engine.
//!
//! [`Calculator`] turns `a <op> b` into a boolean circuit program, runs it on
//! a supervised engine process and decodes the displayed bits. Operands are
//! validated first, so rejected calculations never reach the engine.

pub mod calculator;
pub mod error;
pub mod settings;
pub mod validate;

pub use calculator::{CalculationResult, Calculator};
pub use error::{CalcError, Result};
pub use settings::{CalculatorSettings, DecimalMode};
pub use taucalc_circuit::Operation;
