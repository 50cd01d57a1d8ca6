//! Supervision of the external Tau engine and its interactive line protocol.
//!
//! [`ProcessSupervisor`] owns the engine process and publishes its output.
//! [`CommandChannel`] sends commands through it one at a time and attributes
//! output to the command that produced it. [`CommandChannel::run_program`]
//! executes an [`EngineProgram`](taucalc_circuit::EngineProgram) and returns
//! the per-bit display results.
//!
//! The engine is launched through the [`ProcessSpawner`] seam; tests use the
//! in-memory engine from [`mock`].

pub mod channel;
pub mod config;
pub mod error;
pub mod helpers;
pub mod mock;
pub mod pending;
pub mod readiness;
pub mod runner;
pub mod spawner;
pub mod supervisor;

pub use channel::CommandChannel;
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use runner::ProgramRun;
pub use spawner::{EngineHandle, EngineProcess, ProcessSpawner, RealProcessSpawner};
pub use supervisor::{EngineEvent, ProcessState, ProcessSupervisor};
