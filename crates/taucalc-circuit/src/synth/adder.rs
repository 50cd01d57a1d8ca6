//! Ripple-carry adder and two's-complement subtractor.

use super::{input_name, write_inputs};
use crate::program::ProgramBuilder;

pub(super) fn write_addition(
    builder: &mut ProgramBuilder,
    width: u32,
    a_bits: &[bool],
    b_bits: &[bool],
) {
    write_operands(builder, a_bits, b_bits);

    builder.comment("Bit operations");
    write_ripple(builder, width, "b");
    builder.bit(format!("bit{width}"), format!("c{}(x)", width - 1));

    builder.blank().comment("Display results").display_bits(width);
}

pub(super) fn write_subtraction(
    builder: &mut ProgramBuilder,
    width: u32,
    a_bits: &[bool],
    b_bits: &[bool],
) {
    write_operands(builder, a_bits, b_bits);

    builder.comment("NOT B definitions");
    for i in 1..=width {
        builder.bit(format!("nb{i}"), format!("b{i}(x)'"));
    }

    builder.blank().comment("Two's complement formation");
    builder.bit(format!("tc{width}"), format!("nb{width}(x) + 1"));
    builder.bit("tcc0", format!("nb{width}(x) & 1"));
    builder.blank();
    for i in 1..width {
        let nb = input_name("nb", width, i);
        let tc = input_name("tc", width, i);
        let prev = i - 1;
        builder.bit(&tc, format!("{nb}(x) + tcc{prev}(x)"));
        builder.bit(format!("tcc{i}"), format!("{nb}(x) & tcc{prev}(x)"));
        builder.blank();
    }

    builder.comment("Addition of A and two's complement");
    write_ripple(builder, width, "tc");
    // B = 0 carries out of the increment instead of the adder
    let last = width - 1;
    builder.bit(format!("bit{width}"), format!("(c{last}(x) | tcc{last}(x))'"));

    builder.blank().comment("Display results").display_bits(width);
}

fn write_operands(builder: &mut ProgramBuilder, a_bits: &[bool], b_bits: &[bool]) {
    builder.comment("Input definitions");
    write_inputs(builder, "a", a_bits);
    builder.blank();
    write_inputs(builder, "b", b_bits);
    builder.blank();
}

/// `bit0..bit{w-1}` and carries `c0..c{w-1}` of `a + rhs`.
fn write_ripple(builder: &mut ProgramBuilder, width: u32, rhs: &str) {
    let a = input_name("a", width, 0);
    let b = input_name(rhs, width, 0);
    builder.bit("bit0", format!("{a}(x) + {b}(x)"));
    builder.bit("c0", format!("{a}(x) & {b}(x)"));
    builder.blank();

    for i in 1..width {
        let a = input_name("a", width, i);
        let b = input_name(rhs, width, i);
        let carry = format!("c{}(x)", i - 1);
        builder.bit(format!("bit{i}"), format!("{a}(x) + {b}(x) + {carry}"));
        builder.bit(
            format!("c{i}"),
            format!("({a}(x) & {b}(x)) | ({a}(x) & {carry}) | ({b}(x) & {carry})"),
        );
        builder.blank();
    }
}
