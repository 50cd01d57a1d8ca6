//! Decoding engine responses back into numbers.
//!
//! The engine answers a display directive with a line such as `%3: T`. Tokens
//! are collected per bit name, reassembled by the numeric suffix of the name
//! and passed through the inverse of the encoding the program used. A bit
//! that is missing or carries an unrecognised token reads as 0 and is
//! reported in [`Decoded::defaulted`] rather than failing the decode.

use crate::codec::{self, MAX_WIDTH};
use crate::error::Result;
use crate::synth::NumberMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::warn;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI pattern is valid"));

static BIT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)%\d+:\s*(\d+|T|F)").expect("bit token pattern is valid"));

static BIT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bit(\d+)$").expect("bit name pattern is valid"));

/// A displayed definition and the token the engine printed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitOutput {
    pub name: String,
    pub content: String,
}

impl BitOutput {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A decoded value and the bit positions that had to default to 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    pub value: f64,
    pub defaulted: Vec<u32>,
}

/// Removes terminal control sequences (colours, cursor and erase codes).
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// First `%<index>: <digit|T|F>` token in an engine response, upper-cased.
pub fn parse_bit_token(output: &str) -> Option<String> {
    let clean = strip_ansi(output);
    BIT_TOKEN
        .captures(&clean)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Bit position named by `bit<index>`.
pub fn bit_index(name: &str) -> Option<u32> {
    BIT_NAME
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn token_value(content: &str) -> Option<bool> {
    match strip_ansi(content).trim().to_ascii_uppercase().as_str() {
        "1" | "T" => Some(true),
        "0" | "F" => Some(false),
        _ => None,
    }
}

/// See the module documentation for the rules applied to each output.
pub fn decode(outputs: &[BitOutput], width: u32, mode: NumberMode) -> Result<Decoded> {
    let mut indexed: Vec<(u32, &BitOutput)> = outputs
        .iter()
        .filter_map(|output| bit_index(&output.name).map(|index| (index, output)))
        .filter(|(index, output)| {
            if *index > MAX_WIDTH {
                warn!("ignoring {}: index beyond the {MAX_WIDTH}-bit limit", output.name);
                return false;
            }
            true
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    let expected = match mode {
        NumberMode::FloatingPoint(format) => format.width(),
        _ => indexed
            .last()
            .map(|(index, _)| index + 1)
            .unwrap_or(0),
    };

    let mut bits = vec![false; expected as usize];
    let mut seen = vec![false; expected as usize];
    let mut defaulted = Vec::new();
    for (index, output) in &indexed {
        let Some(slot) = bits.get_mut(*index as usize) else {
            continue;
        };
        match token_value(&output.content) {
            Some(bit) => {
                *slot = bit;
                seen[*index as usize] = true;
            }
            None => {
                warn!(
                    "unparsable token {:?} for {}, reading as 0",
                    output.content, output.name
                );
            }
        }
    }
    for (index, was_seen) in seen.iter().enumerate() {
        if !was_seen {
            defaulted.push(index as u32);
        }
    }
    if !defaulted.is_empty() {
        warn!("bits {defaulted:?} missing or unparsable, defaulted to 0");
    }

    let value = match mode {
        NumberMode::Integer => codec::from_twos_complement(&bits, width as usize) as f64,
        NumberMode::FixedPoint { places } => {
            codec::decode_fixed_point(codec::from_twos_complement(&bits, width as usize), places)
        }
        NumberMode::FloatingPoint(format) => codec::decode_float(&bits, format)?,
    };

    Ok(Decoded { value, defaulted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FloatFormat;

    fn outputs_for(bits: &[bool]) -> Vec<BitOutput> {
        bits.iter()
            .enumerate()
            .map(|(i, b)| BitOutput::new(format!("bit{i}"), if *b { "T" } else { "F" }))
            .collect()
    }

    #[test]
    fn test_parse_bit_token_variants() {
        assert_eq!(parse_bit_token("%1: T").as_deref(), Some("T"));
        assert_eq!(parse_bit_token("%12:f").as_deref(), Some("F"));
        assert_eq!(parse_bit_token("%3: 1").as_deref(), Some("1"));
        assert_eq!(
            parse_bit_token("\x1b[1;32m%4\x1b[0m: \x1b[33mT\x1b[0m").as_deref(),
            Some("T")
        );
        assert_eq!(parse_bit_token("Execution step: 2"), None);
    }

    #[test]
    fn test_unsigned_integer() {
        // 8 = 0b1000 plus a clear overflow bit
        let mut bits = vec![false; 9];
        bits[3] = true;
        let decoded = decode(&outputs_for(&bits), 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, 8.0);
        assert!(decoded.defaulted.is_empty());
    }

    #[test]
    fn test_sign_bit_decodes_negative() {
        let mut bits = codec::to_twos_complement(-2, 8).unwrap();
        bits.push(true);
        let decoded = decode(&outputs_for(&bits), 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, -2.0);
    }

    #[test]
    fn test_without_sign_bit_reads_unsigned() {
        let bits = codec::to_unsigned_bits(132, 8).unwrap();
        let decoded = decode(&outputs_for(&bits), 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, 132.0);
    }

    #[test]
    fn test_orders_by_suffix_and_ignores_other_names() {
        let outputs = vec![
            BitOutput::new("bit2", "1"),
            BitOutput::new("carry1", "1"),
            BitOutput::new("bit0", "0"),
            BitOutput::new("bit1", "1"),
        ];
        let decoded = decode(&outputs, 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, 6.0);
    }

    #[test]
    fn test_missing_and_garbage_bits_default_to_zero() {
        let outputs = vec![
            BitOutput::new("bit0", "T"),
            BitOutput::new("bit1", "?"),
            BitOutput::new("bit3", "T"),
        ];
        let decoded = decode(&outputs, 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, 9.0);
        assert_eq!(decoded.defaulted, vec![1, 2]);
    }

    #[test]
    fn test_fixed_point_divides_by_scale() {
        let bits = codec::to_unsigned_bits(175, 10).unwrap();
        let decoded = decode(
            &outputs_for(&bits),
            10,
            NumberMode::FixedPoint { places: 2 },
        )
        .unwrap();
        assert!((decoded.value - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_floating_point_uses_field_order() {
        let format = FloatFormat::new(4, 3, 8).unwrap();
        let bits = codec::encode_float(-3.0, format).unwrap();
        let decoded = decode(&outputs_for(&bits), 8, NumberMode::FloatingPoint(format)).unwrap();
        assert_eq!(decoded.value, -3.0);
    }

    #[test]
    fn test_no_outputs_decodes_zero() {
        let decoded = decode(&[], 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, 0.0);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mtau>\x1b[0m n bit0(x)"), "tau> n bit0(x)");
    }

    #[test]
    fn test_strip_ansi_control_sequences() {
        assert_eq!(strip_ansi("\x1b[m%1: T"), "%1: T");
        assert_eq!(strip_ansi("\x1b[2J\x1b[K%2: F\x1b[?25h"), "%2: F");
        assert_eq!(parse_bit_token("\x1b[K%5:\x1b[m T").as_deref(), Some("T"));
    }

    #[test]
    fn test_indices_beyond_max_width_are_ignored() {
        let outputs = vec![
            BitOutput::new("bit0", "T"),
            BitOutput::new("bit1", "T"),
            BitOutput::new("bit4294967295", "T"),
            BitOutput::new("bit999999999", "T"),
        ];
        let decoded = decode(&outputs, 8, NumberMode::Integer).unwrap();
        assert_eq!(decoded.value, 3.0);
        assert!(decoded.defaulted.is_empty());
    }
}
