//! Calculator errors

use taucalc_circuit::{CircuitError, Operation};
use taucalc_engine::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcError>;

/// Validation failures are raised before the engine is involved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("operand {value} outside the representable range 0..={max}")]
    OperandOutOfRange { value: i64, max: i64 },

    #[error("result {result} exceeds maximum value {max}")]
    Overflow { result: i128, max: i64 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("only addition and subtraction are supported for decimal calculations, got {0}")]
    UnsupportedOperation(Operation),

    #[error("operand {0} is not a finite number")]
    NonFinite(f64),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
