//! Calculator settings.

use serde::{Deserialize, Serialize};
use taucalc_circuit::codec::max_magnitude;
use taucalc_circuit::{FloatFormat, NumberMode};

/// Representation used for non-integer operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecimalMode {
    #[default]
    FixedPoint,
    FloatingPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorSettings {
    pub bit_width: u32,
    pub decimal_mode: DecimalMode,
    /// Fixed-point scale is `10^decimal_places`
    pub decimal_places: u32,
    /// Explicit floating-point split; derived from the width when unset
    pub float_format: Option<FloatFormat>,
    /// Replace the engine after every successful calculation so no
    /// definitions leak into the next one
    pub respawn_after_calculation: bool,
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            bit_width: 8,
            decimal_mode: DecimalMode::FixedPoint,
            decimal_places: 2,
            float_format: None,
            respawn_after_calculation: true,
        }
    }
}

impl CalculatorSettings {
    /// Largest operand or result value for the current width.
    pub fn max_value(&self) -> i64 {
        max_magnitude(self.bit_width)
    }

    pub fn float_format(&self) -> FloatFormat {
        self.float_format
            .unwrap_or_else(|| FloatFormat::for_width(self.bit_width))
    }

    /// Number mode used for decimal calculations.
    pub fn decimal_number_mode(&self) -> NumberMode {
        match self.decimal_mode {
            DecimalMode::FixedPoint => NumberMode::FixedPoint {
                places: self.decimal_places,
            },
            DecimalMode::FloatingPoint => NumberMode::FloatingPoint(self.float_format()),
        }
    }
}
