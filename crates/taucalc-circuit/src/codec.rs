//! Conversions between numbers and the bit sequences the engine computes over.
//!
//! Integer sequences are least-significant bit first: index `i` carries weight
//! `2^i`. Floating-point sequences follow the encoding's field order instead:
//! index 0 is the sign, then the exponent most-significant bit first, then the
//! mantissa.

use crate::error::{CircuitError, Result};
use serde::{Deserialize, Serialize};

/// Widest integer sequence the codec accepts.
pub const MAX_WIDTH: u32 = 62;

/// Largest magnitude representable in `width` bits.
pub fn max_magnitude(width: u32) -> i64 {
    if width >= 63 {
        i64::MAX
    } else {
        (1i64 << width) - 1
    }
}

fn check_width(width: u32) -> Result<()> {
    if width < 1 {
        return Err(CircuitError::Encoding(format!(
            "bit width must be at least 1, got {width}"
        )));
    }
    if width > MAX_WIDTH {
        return Err(CircuitError::Encoding(format!(
            "bit width must be at most {MAX_WIDTH}, got {width}"
        )));
    }
    Ok(())
}

/// Unsigned binary of `value` in `width` bits, clamped into `[0, 2^width - 1]`.
pub fn to_unsigned_bits(value: i64, width: u32) -> Result<Vec<bool>> {
    check_width(width)?;
    let clamped = value.clamp(0, max_magnitude(width));
    Ok((0..width).map(|i| (clamped >> i) & 1 == 1).collect())
}

/// Two's-complement encoding of `value` in `width` bits.
///
/// The magnitude is clamped to `2^width - 1` before conversion. Negative values
/// have every bit inverted and then one added with carry propagation, so the
/// result wraps within `width` bits.
pub fn to_twos_complement(value: i64, width: u32) -> Result<Vec<bool>> {
    check_width(width)?;
    let magnitude = value.unsigned_abs().min(max_magnitude(width) as u64);
    let mut bits: Vec<bool> = (0..width).map(|i| (magnitude >> i) & 1 == 1).collect();

    if value < 0 {
        for bit in bits.iter_mut() {
            *bit = !*bit;
        }
        for bit in bits.iter_mut() {
            if *bit {
                *bit = false;
            } else {
                *bit = true;
                break;
            }
        }
    }

    Ok(bits)
}

/// Inverse of [`to_twos_complement`] with an explicit sign position.
///
/// When `bits[sign_bit_index]` is set, the bits below it are inverted, one is
/// added and the result negated. A sign index outside the sequence, or a clear
/// sign bit, reads the whole sequence as unsigned binary.
pub fn from_twos_complement(bits: &[bool], sign_bit_index: usize) -> i64 {
    match bits.get(sign_bit_index) {
        Some(true) => {
            let low = &bits[..sign_bit_index];
            let mut magnitude: i64 = 0;
            let mut carry = 1i64;
            for (i, bit) in low.iter().enumerate() {
                let sum = i64::from(!*bit) + carry;
                magnitude |= (sum & 1) << i;
                carry = sum >> 1;
            }
            magnitude |= carry << low.len();
            -magnitude
        }
        _ => unsigned_value(bits),
    }
}

/// Unsigned value of a least-significant-first sequence.
pub fn unsigned_value(bits: &[bool]) -> i64 {
    bits.iter()
        .enumerate()
        .filter(|(_, bit)| **bit)
        .fold(0i64, |acc, (i, _)| acc | (1i64 << i))
}

/// Renders a least-significant-first sequence as a conventional binary string.
pub fn to_binary_string(bits: &[bool]) -> String {
    bits.iter().rev().map(|b| if *b { '1' } else { '0' }).collect()
}

/// Scales a decimal to an integer by `10^places`, rounding to nearest.
pub fn encode_fixed_point(value: f64, places: u32) -> i64 {
    (value * fixed_point_scale(places)).round() as i64
}

/// Reverses [`encode_fixed_point`].
pub fn decode_fixed_point(scaled: i64, places: u32) -> f64 {
    scaled as f64 / fixed_point_scale(places)
}

/// `10^places` as a float.
pub fn fixed_point_scale(places: u32) -> f64 {
    10f64.powi(places as i32)
}

/// Field widths of the custom floating-point encoding.
///
/// The total width is `1 + exponent_bits + mantissa_bits`; the leading one of
/// a normalized mantissa is implied and not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatFormat {
    pub exponent_bits: u32,
    pub mantissa_bits: u32,
}

impl FloatFormat {
    /// Checks the format against the total bit width it must fill.
    pub fn new(exponent_bits: u32, mantissa_bits: u32, width: u32) -> Result<Self> {
        let format = Self {
            exponent_bits,
            mantissa_bits,
        };
        format.validate(width)?;
        Ok(format)
    }

    /// Default split for a width: one sign bit, up to four exponent bits, the rest mantissa.
    pub fn for_width(width: u32) -> Self {
        let available = width.saturating_sub(1);
        let exponent_bits = (available / 4).min(4);
        Self {
            exponent_bits,
            mantissa_bits: available - exponent_bits,
        }
    }

    pub fn width(&self) -> u32 {
        1 + self.exponent_bits + self.mantissa_bits
    }

    pub fn bias(&self) -> i64 {
        if self.exponent_bits == 0 {
            0
        } else {
            (1i64 << (self.exponent_bits - 1)) - 1
        }
    }

    pub fn validate(&self, width: u32) -> Result<()> {
        if self.exponent_bits < 1 {
            return Err(CircuitError::Configuration(
                "floating-point format needs at least one exponent bit".to_string(),
            ));
        }
        if self.exponent_bits > 16 {
            return Err(CircuitError::Configuration(format!(
                "exponent field of {} bits is too wide",
                self.exponent_bits
            )));
        }
        if self.width() != width {
            return Err(CircuitError::Configuration(format!(
                "exponent ({}) and mantissa ({}) bits must sum to width - 1 = {}",
                self.exponent_bits,
                self.mantissa_bits,
                width.saturating_sub(1)
            )));
        }
        Ok(())
    }
}

/// Encodes `value` into sign, biased exponent and mantissa fields.
///
/// Zero maps to all-zero bits, so a positive value whose fields would also be
/// all zero (`2^-bias` exactly) is rejected. Values whose biased exponent does
/// not fit the exponent field, and non-finite values, are rejected too.
pub fn encode_float(value: f64, format: FloatFormat) -> Result<Vec<bool>> {
    let width = format.width() as usize;
    if !value.is_finite() {
        return Err(CircuitError::Encoding(format!(
            "cannot encode non-finite value {value}"
        )));
    }
    if value == 0.0 {
        return Ok(vec![false; width]);
    }

    let magnitude = value.abs();
    let mut exponent = magnitude.log2().floor() as i64;
    // log2 rounding can land one off near powers of two
    let mut normalized = magnitude / 2f64.powi(exponent as i32);
    if normalized >= 2.0 {
        exponent += 1;
        normalized /= 2.0;
    } else if normalized < 1.0 {
        exponent -= 1;
        normalized *= 2.0;
    }

    let biased = exponent + format.bias();
    let max_biased = (1i64 << format.exponent_bits) - 1;
    if biased < 0 || biased > max_biased {
        return Err(CircuitError::Encoding(format!(
            "{value} needs exponent {exponent}, outside the {}-bit exponent range",
            format.exponent_bits
        )));
    }

    let mut bits = Vec::with_capacity(width);
    bits.push(value < 0.0);
    for i in (0..format.exponent_bits).rev() {
        bits.push((biased >> i) & 1 == 1);
    }

    let mut fraction = normalized - 1.0;
    for _ in 0..format.mantissa_bits {
        fraction *= 2.0;
        if fraction >= 1.0 {
            bits.push(true);
            fraction -= 1.0;
        } else {
            bits.push(false);
        }
    }

    if bits.iter().all(|b| !*b) {
        return Err(CircuitError::Encoding(format!(
            "{value} encodes to the all-zero pattern reserved for zero"
        )));
    }

    Ok(bits)
}

/// Inverse of [`encode_float`]; all-zero bits decode to exactly zero.
pub fn decode_float(bits: &[bool], format: FloatFormat) -> Result<f64> {
    if bits.len() != format.width() as usize {
        return Err(CircuitError::Encoding(format!(
            "expected {} floating-point bits, got {}",
            format.width(),
            bits.len()
        )));
    }
    if bits.iter().all(|b| !*b) {
        return Ok(0.0);
    }

    let sign = if bits[0] { -1.0 } else { 1.0 };
    let exponent_end = 1 + format.exponent_bits as usize;
    let biased = bits[1..exponent_end]
        .iter()
        .fold(0i64, |acc, bit| (acc << 1) | i64::from(*bit));
    let exponent = biased - format.bias();

    let mantissa = bits[exponent_end..]
        .iter()
        .enumerate()
        .filter(|(_, bit)| **bit)
        .fold(1.0, |acc, (i, _)| acc + 2f64.powi(-(i as i32 + 1)));

    Ok(sign * mantissa * 2f64.powi(exponent as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twos_complement_roundtrip_all_widths() {
        for width in 2..=12u32 {
            let limit = 1i64 << (width - 1);
            for value in (-limit + 1)..limit {
                let bits = to_twos_complement(value, width).unwrap();
                assert_eq!(bits.len(), width as usize);
                assert_eq!(
                    from_twos_complement(&bits, width as usize - 1),
                    value,
                    "width {width} value {value}"
                );
            }
        }
    }

    #[test]
    fn test_twos_complement_negative_pattern() {
        let bits = to_twos_complement(-2, 8).unwrap();
        assert_eq!(to_binary_string(&bits), "11111110");
    }

    #[test]
    fn test_twos_complement_clamps_magnitude() {
        let bits = to_twos_complement(1000, 8).unwrap();
        assert_eq!(unsigned_value(&bits), 255);
    }

    #[test]
    fn test_twos_complement_rejects_zero_width() {
        assert!(matches!(
            to_twos_complement(1, 0),
            Err(CircuitError::Encoding(_))
        ));
    }

    #[test]
    fn test_sign_bit_outside_sequence_reads_unsigned() {
        let bits = to_unsigned_bits(200, 8).unwrap();
        assert_eq!(from_twos_complement(&bits, 8), 200);
    }

    #[test]
    fn test_sign_bit_with_zero_low_bits_keeps_carry() {
        let mut bits = vec![false; 8];
        bits.push(true);
        assert_eq!(from_twos_complement(&bits, 8), -256);
    }

    #[test]
    fn test_unsigned_bits_clamp_negative() {
        let bits = to_unsigned_bits(-5, 4).unwrap();
        assert_eq!(unsigned_value(&bits), 0);
    }

    #[test]
    fn test_fixed_point_roundtrip() {
        for places in 1..=4u32 {
            for value in [0.0, 1.25, -3.5, 12.345, 0.07, -0.99] {
                let decoded = decode_fixed_point(encode_fixed_point(value, places), places);
                assert!(
                    (decoded - value).abs() <= 10f64.powi(-(places as i32)),
                    "{value} at {places} places decoded to {decoded}"
                );
            }
        }
    }

    #[test]
    fn test_float_format_for_width() {
        assert_eq!(
            FloatFormat::for_width(8),
            FloatFormat {
                exponent_bits: 1,
                mantissa_bits: 6
            }
        );
        assert_eq!(
            FloatFormat::for_width(16),
            FloatFormat {
                exponent_bits: 3,
                mantissa_bits: 12
            }
        );
        assert_eq!(FloatFormat::for_width(32).exponent_bits, 4);
    }

    #[test]
    fn test_float_format_rejects_mismatched_width() {
        assert!(FloatFormat::new(4, 10, 16).is_err());
        assert!(FloatFormat::new(4, 11, 16).is_ok());
    }

    #[test]
    fn test_float_zero_is_all_zero_bits() {
        let format = FloatFormat::for_width(16);
        let bits = encode_float(0.0, format).unwrap();
        assert!(bits.iter().all(|b| !*b));
        assert_eq!(decode_float(&bits, format).unwrap(), 0.0);
    }

    #[test]
    fn test_float_roundtrip_within_mantissa_precision() {
        let format = FloatFormat::new(4, 11, 16).unwrap();
        for value in [1.0, -1.0, 3.75, -2.5, 0.15625, 100.0, -0.4, 7.1] {
            let bits = encode_float(value, format).unwrap();
            let decoded = decode_float(&bits, format).unwrap();
            let tolerance = value.abs() * 2f64.powi(-(format.mantissa_bits as i32));
            assert!(
                (decoded - value).abs() <= tolerance,
                "{value} decoded to {decoded}"
            );
        }
    }

    #[test]
    fn test_float_field_layout() {
        let format = FloatFormat::new(4, 3, 8).unwrap();
        // -3.0 = -1.5 * 2^1, bias 7 -> biased exponent 8
        let bits = encode_float(-3.0, format).unwrap();
        let rendered: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
        assert_eq!(rendered, "11000100");
    }

    #[test]
    fn test_float_exponent_out_of_range() {
        let format = FloatFormat::for_width(8);
        assert!(encode_float(0.25, format).is_err());
        assert!(encode_float(f64::NAN, format).is_err());
    }

    #[test]
    fn test_float_zero_pattern_reserved() {
        // bias 0: 1.0 has biased exponent 0 and an empty fraction
        assert!(matches!(
            encode_float(1.0, FloatFormat::for_width(8)),
            Err(CircuitError::Encoding(_))
        ));
        let format = FloatFormat::new(4, 11, 16).unwrap();
        assert!(matches!(
            encode_float(2f64.powi(-7), format),
            Err(CircuitError::Encoding(_))
        ));
        // the negative counterpart keeps its sign bit
        let bits = encode_float(-(2f64.powi(-7)), format).unwrap();
        assert_eq!(decode_float(&bits, format).unwrap(), -(2f64.powi(-7)));
        let bits = encode_float(1.5, FloatFormat::for_width(8)).unwrap();
        assert_eq!(decode_float(&bits, FloatFormat::for_width(8)).unwrap(), 1.5);
    }
}
