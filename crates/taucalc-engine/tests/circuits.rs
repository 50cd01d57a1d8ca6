//! Synthesized circuits evaluated by the mock engine and decoded back.

use std::sync::Arc;
use taucalc_circuit::{decode, CircuitSynthesizer, FloatFormat, NumberMode, Operation};
use taucalc_engine::mock::MockEngineSpawner;
use taucalc_engine::{CommandChannel, EngineConfig, ProcessSupervisor};

async fn evaluate(width: u32, a: f64, b: f64, operation: Operation, mode: NumberMode) -> f64 {
    let synthesizer = CircuitSynthesizer::new(width).expect("valid width");
    let program = synthesizer
        .synthesize(a, b, operation, mode)
        .expect("program should synthesize");

    let spawner = Arc::new(MockEngineSpawner::responsive());
    let supervisor = Arc::new(ProcessSupervisor::new(EngineConfig::default(), spawner));
    let mut channel = CommandChannel::new(supervisor);

    let run = channel.run_program(&program).await.expect("program should run");
    assert!(run.outputs.iter().all(|output| !output.content.is_empty()));

    let decoded = decode(&run.outputs, width, mode).expect("outputs should decode");
    assert!(decoded.defaulted.is_empty(), "missing bits: {:?}", decoded.defaulted);
    decoded.value
}

#[tokio::test]
async fn test_integer_addition() {
    assert_eq!(evaluate(8, 5.0, 3.0, Operation::Add, NumberMode::Integer).await, 8.0);
    assert_eq!(evaluate(8, 200.0, 55.0, Operation::Add, NumberMode::Integer).await, 255.0);
    assert_eq!(evaluate(4, 9.0, 6.0, Operation::Add, NumberMode::Integer).await, 15.0);
}

#[tokio::test]
async fn test_integer_subtraction() {
    assert_eq!(evaluate(8, 5.0, 3.0, Operation::Subtract, NumberMode::Integer).await, 2.0);
    assert_eq!(evaluate(8, 3.0, 5.0, Operation::Subtract, NumberMode::Integer).await, -2.0);
    assert_eq!(evaluate(8, 7.0, 7.0, Operation::Subtract, NumberMode::Integer).await, 0.0);
}

#[tokio::test]
async fn test_subtracting_zero_keeps_sign_positive() {
    assert_eq!(evaluate(8, 5.0, 0.0, Operation::Subtract, NumberMode::Integer).await, 5.0);
    assert_eq!(evaluate(8, 0.0, 0.0, Operation::Subtract, NumberMode::Integer).await, 0.0);
}

#[tokio::test]
async fn test_gate_level_multiplication() {
    assert_eq!(evaluate(8, 12.0, 11.0, Operation::Multiply, NumberMode::Integer).await, 132.0);
    assert_eq!(evaluate(8, 15.0, 17.0, Operation::Multiply, NumberMode::Integer).await, 255.0);
    assert_eq!(evaluate(8, 0.0, 99.0, Operation::Multiply, NumberMode::Integer).await, 0.0);
}

#[tokio::test]
async fn test_constant_multiplication_and_division() {
    assert_eq!(evaluate(6, 7.0, 9.0, Operation::Multiply, NumberMode::Integer).await, 63.0);
    assert_eq!(evaluate(8, 7.0, 2.0, Operation::Divide, NumberMode::Integer).await, 3.0);
    assert_eq!(evaluate(8, 200.0, 10.0, Operation::Divide, NumberMode::Integer).await, 20.0);
}

#[tokio::test]
async fn test_fixed_point() {
    let mode = NumberMode::FixedPoint { places: 2 };
    assert_eq!(evaluate(8, 0.5, 0.75, Operation::Add, mode).await, 1.25);
    assert_eq!(evaluate(8, 0.5, 0.75, Operation::Subtract, mode).await, -0.25);
}

#[tokio::test]
async fn test_floating_point() {
    let mode = NumberMode::FloatingPoint(FloatFormat::new(4, 3, 8).unwrap());
    assert_eq!(evaluate(8, 1.5, 2.25, Operation::Add, mode).await, 3.75);
    assert_eq!(evaluate(8, 1.0, 4.0, Operation::Subtract, mode).await, -3.0);
}
