//! Operand checks run before a program is synthesized.
//!
//! Results must fit in the width: the adder's extra bit doubles as the sign
//! of a difference, so an addition carrying into it would decode as negative.

use crate::error::{CalcError, Result};
use crate::settings::{CalculatorSettings, DecimalMode};
use taucalc_circuit::codec::{encode_fixed_point, max_magnitude};
use taucalc_circuit::Operation;

fn check_range(value: i64, max: i64) -> Result<()> {
    if (0..=max).contains(&value) {
        Ok(())
    } else {
        Err(CalcError::OperandOutOfRange { value, max })
    }
}

fn check_fits(result: i128, max: i64) -> Result<()> {
    if result > i128::from(max) {
        Err(CalcError::Overflow { result, max })
    } else {
        Ok(())
    }
}

pub fn check_integer(a: i64, b: i64, operation: Operation, width: u32) -> Result<()> {
    let max = max_magnitude(width);
    check_range(a, max)?;
    check_range(b, max)?;

    let (a, b) = (i128::from(a), i128::from(b));
    match operation {
        Operation::Add => check_fits(a + b, max),
        Operation::Multiply => check_fits(a * b, max),
        Operation::Divide if b == 0 => Err(CalcError::DivisionByZero),
        Operation::Subtract | Operation::Divide => Ok(()),
    }
}

pub fn check_decimal(a: f64, b: f64, operation: Operation, settings: &CalculatorSettings) -> Result<()> {
    if !matches!(operation, Operation::Add | Operation::Subtract) {
        return Err(CalcError::UnsupportedOperation(operation));
    }
    for operand in [a, b] {
        if !operand.is_finite() {
            return Err(CalcError::NonFinite(operand));
        }
    }

    if settings.decimal_mode == DecimalMode::FixedPoint {
        let places = settings.decimal_places;
        let max = settings.max_value();
        let (scaled_a, scaled_b) = (encode_fixed_point(a, places), encode_fixed_point(b, places));
        check_range(scaled_a, max)?;
        check_range(scaled_b, max)?;
        if operation == Operation::Add {
            check_fits(i128::from(scaled_a) + i128::from(scaled_b), max)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range() {
        assert!(check_integer(255, 0, Operation::Add, 8).is_ok());
        assert_eq!(
            check_integer(256, 1, Operation::Subtract, 8),
            Err(CalcError::OperandOutOfRange { value: 256, max: 255 })
        );
        assert_eq!(
            check_integer(-1, 1, Operation::Add, 8),
            Err(CalcError::OperandOutOfRange { value: -1, max: 255 })
        );
    }

    #[test]
    fn test_integer_results_must_fit() {
        assert_eq!(
            check_integer(200, 100, Operation::Add, 8),
            Err(CalcError::Overflow { result: 300, max: 255 })
        );
        assert_eq!(
            check_integer(16, 16, Operation::Multiply, 8),
            Err(CalcError::Overflow { result: 256, max: 255 })
        );
        assert!(check_integer(15, 17, Operation::Multiply, 8).is_ok());
        assert!(check_integer(0, 255, Operation::Subtract, 8).is_ok());
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(check_integer(7, 0, Operation::Divide, 8), Err(CalcError::DivisionByZero));
        assert!(check_integer(0, 7, Operation::Divide, 8).is_ok());
    }

    #[test]
    fn test_decimal_operations() {
        let settings = CalculatorSettings::default();
        assert_eq!(
            check_decimal(1.0, 2.0, Operation::Multiply, &settings),
            Err(CalcError::UnsupportedOperation(Operation::Multiply))
        );
        assert!(matches!(
            check_decimal(f64::NAN, 2.0, Operation::Add, &settings),
            Err(CalcError::NonFinite(_))
        ));
        assert!(check_decimal(0.5, 0.75, Operation::Add, &settings).is_ok());
    }

    #[test]
    fn test_fixed_point_scaled_operands_must_fit() {
        let settings = CalculatorSettings::default();
        // 2.56 scales to 256 at two places.
        assert_eq!(
            check_decimal(2.56, 0.0, Operation::Subtract, &settings),
            Err(CalcError::OperandOutOfRange { value: 256, max: 255 })
        );
        assert_eq!(
            check_decimal(1.5, 1.25, Operation::Add, &settings),
            Err(CalcError::Overflow { result: 275, max: 255 })
        );
    }

    #[test]
    fn test_floating_point_skips_fixed_point_limits() {
        let settings = CalculatorSettings {
            decimal_mode: DecimalMode::FloatingPoint,
            ..CalculatorSettings::default()
        };
        assert!(check_decimal(-3.5, 100.25, Operation::Add, &settings).is_ok());
    }
}
