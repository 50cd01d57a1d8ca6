//! Gate-level array multiplier.
//!
//! Row `j` holds the partial products `a_i & b_j` shifted left by `j`. Each row
//! is added into the running column sums with a ripple of adders: a half adder
//! where the row starts (no carry in yet), full adders after it. Only columns
//! below the width are built, so overflow is discarded; callers reject products
//! that do not fit.

use super::{input_name, write_inputs};
use crate::codec;
use crate::error::Result;
use crate::program::{EngineProgram, ProgramBuilder};

pub(super) fn array_multiplication(width: u32, a: i64, b: i64) -> Result<EngineProgram> {
    let a_bits = codec::to_unsigned_bits(a, width)?;
    let b_bits = codec::to_unsigned_bits(b, width)?;

    let mut builder = ProgramBuilder::new();
    builder
        .blank()
        .comment(format!("{width}-bit Binary multiplication"))
        .comment(format!("A: {a} ({})", codec::to_binary_string(&a_bits)))
        .comment(format!("B: {b} ({})", codec::to_binary_string(&b_bits)))
        .blank()
        .comment("Input definitions");
    write_inputs(&mut builder, "a", &a_bits);
    builder.blank();
    write_inputs(&mut builder, "b", &b_bits);

    builder
        .blank()
        .comment("Core functions")
        .define("halfAdderSum", "a, b", "a + b")
        .define("halfAdderCarry", "a, b", "a & b")
        .define("fullAdderSum", "a, b, c", "a + b + c")
        .define("fullAdderCarry", "a, b, c", "(a & b) | (a & c) | (b & c)");

    builder.blank().comment("Partial products");
    for row in 0..width {
        let b_name = input_name("b", width, row);
        if row == 0 {
            builder.comment(format!("{} row (LSB)", b_name.to_uppercase()));
        } else {
            builder.comment(format!("{} row", b_name.to_uppercase()));
        }
        for column in 0..(width - row) {
            let a_name = input_name("a", width, column);
            builder.bit(
                partial_product(width, row, column),
                format!("{a_name}(x) & {b_name}(x)"),
            );
        }
        builder.blank();
    }

    builder.comment("Result bits calculation");
    let mut sums: Vec<String> = (0..width)
        .map(|column| partial_product(width, 0, column))
        .collect();
    builder.bit("bit0", format!("{}(x)", sums[0]));

    for row in 1..width {
        builder.blank().comment(format!("Row {row} accumulation"));
        let mut carry: Option<String> = None;
        for position in row..width {
            let pp = partial_product(width, row, position - row);
            let sum = format!("sum{position}r{row}");
            let acc = &sums[position as usize];
            let last_column = position == width - 1;

            match &carry {
                None => {
                    builder.bit(&sum, format!("halfAdderSum({acc}(x), {pp}(x))"));
                    if !last_column {
                        let next = format!("carry{position}r{row}");
                        builder.bit(&next, format!("halfAdderCarry({acc}(x), {pp}(x))"));
                        carry = Some(next);
                    }
                }
                Some(carry_in) => {
                    builder.bit(
                        &sum,
                        format!("fullAdderSum({acc}(x), {pp}(x), {carry_in}(x))"),
                    );
                    if !last_column {
                        let next = format!("carry{position}r{row}");
                        builder.bit(
                            &next,
                            format!("fullAdderCarry({acc}(x), {pp}(x), {carry_in}(x))"),
                        );
                        carry = Some(next);
                    }
                }
            }
            sums[position as usize] = sum;
        }
        builder.bit(format!("bit{row}"), format!("{}(x)", sums[row as usize]));
    }

    builder
        .blank()
        .comment("Display results")
        .display_bits(width - 1);
    Ok(builder.build())
}

/// `ppB{j}A{i}`: operand bit indices as declared, most-significant first.
fn partial_product(width: u32, row: u32, column: u32) -> String {
    format!(
        "pp{}{}",
        input_name("B", width, row),
        input_name("A", width, column)
    )
}
