//! Programs that define the result bits directly as constants.

use crate::codec;
use crate::error::Result;
use crate::program::{EngineProgram, ProgramBuilder};

/// `bit0..bit{w-1}` set to the unsigned binary of `result`, clamped to the width.
pub(super) fn direct_program(
    title: &str,
    summary: &str,
    width: u32,
    result: i64,
) -> Result<EngineProgram> {
    let bits = codec::to_unsigned_bits(result, width)?;

    let mut builder = ProgramBuilder::new();
    builder
        .blank()
        .comment(title)
        .comment(summary)
        .blank()
        .comment("Pre-calculated result bits");
    for (i, bit) in bits.iter().enumerate() {
        builder.bit(format!("bit{i}"), u8::from(*bit).to_string());
    }
    builder
        .blank()
        .comment("Display results")
        .display_bits(width - 1);
    Ok(builder.build())
}
