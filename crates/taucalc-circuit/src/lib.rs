//! Tau calculator circuits
//!
//! Bit-level arithmetic for an external boolean-algebra engine:
//!
//! - [`codec`]: numbers to and from two's-complement, fixed-point and
//!   custom floating-point bit sequences
//! - [`synth`]: ripple-carry, subtractor, array multiplier and constant
//!   programs in the engine's formula language
//! - [`decoder`]: engine response tokens back into numbers
//!
//! Nothing here performs I/O; see `taucalc-engine` for running programs.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod program;
pub mod synth;

pub use codec::FloatFormat;
pub use decoder::{decode, BitOutput, Decoded};
pub use error::{CircuitError, Result};
pub use program::{EngineProgram, ProgramBuilder, Statement};
pub use synth::{CircuitSynthesizer, NumberMode, Operation};
