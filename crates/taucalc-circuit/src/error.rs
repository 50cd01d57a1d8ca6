//! Circuit construction and decoding errors

use thiserror::Error;

/// Circuit result type
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Errors raised while encoding operands, synthesizing programs or decoding results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CircuitError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unsupported operation {operation} in {mode} mode")]
    UnsupportedOperation { operation: String, mode: String },

    #[error("unknown operator {0:?}")]
    UnknownOperator(String),

    #[error("operand {0} is not an integer")]
    NonIntegerOperand(f64),
}
