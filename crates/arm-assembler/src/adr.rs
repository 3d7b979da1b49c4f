//! The `ADR`/`ADRL`/`ADRE` pseudo-op (§4.L): a PC-relative address load
//! expanded into one to three `ADD`/`SUB Rd, PC/Rd, #imm` instructions,
//! the same greedy rotated-immediate split a compiler uses to materialise
//! an arbitrary 32-bit constant.

use arm_cpu::{AluOp, Condition, Instruction, ShifterOperand};

/// How many words the user declared: bare `ADR` promises exactly one,
/// `ADRL` up to two, `ADRE` up to three. The declared form dominates — if
/// fewer words are needed the rest are padded with `MOV R0, R0`, matching
/// the example where `ADRL` always emits two words even when one would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdrForm {
    Short,
    Long,
    ExtraLong,
}

impl AdrForm {
    #[must_use]
    pub const fn max_words(self) -> usize {
        match self {
            Self::Short => 1,
            Self::Long => 2,
            Self::ExtraLong => 3,
        }
    }
}

/// Isolates the top 8 set bits of `value`, aligned to an even bit
/// position, so the chunk is always representable as a rotated 8-bit
/// immediate.
fn largest_rotated_chunk(value: u32) -> u32 {
    let hi = 31 - value.leading_zeros();
    let mut pos = hi.saturating_sub(7);
    pos -= pos % 2;
    let mask = 0xFFu32 << pos;
    value & mask
}

/// Splits `value` into a minimal sequence of rotated-immediate chunks that
/// sum to it, highest bits first.
fn split_into_rotated_immediates(value: u32) -> Vec<u32> {
    let mut remaining = value;
    let mut parts = Vec::new();
    while remaining != 0 {
        let chunk = largest_rotated_chunk(remaining);
        parts.push(chunk);
        remaining &= !chunk;
    }
    if parts.is_empty() {
        parts.push(0);
    }
    parts
}

/// Builds the `ADR` instruction sequence for `rd := target`, assuming the
/// first instruction sits at `instruction_address` (so the PC it reads is
/// `instruction_address + 8`, per the pipeline-ahead convention every other
/// branch/PC-relative calculation in this assembler uses).
///
/// Returns `Err` with a human-readable reason when the displacement needs
/// more chunks than `form` allows.
pub fn build_adr(rd: u8, cond: Condition, form: AdrForm, instruction_address: u32, target: u32) -> Result<Vec<Instruction>, String> {
    let pc = instruction_address.wrapping_add(8);
    let displacement = i64::from(target) - i64::from(pc);
    let negative = displacement < 0;
    let magnitude = displacement.unsigned_abs();
    let magnitude = u32::try_from(magnitude).map_err(|_| "address is too far from the current instruction".to_string())?;

    let parts = split_into_rotated_immediates(magnitude);
    let max_words = form.max_words();
    if parts.len() > max_words {
        return Err(format!(
            "address needs {} instruction{} but this form allows at most {max_words}",
            parts.len(),
            if parts.len() == 1 { "" } else { "s" }
        ));
    }

    let op = if negative { AluOp::Sub } else { AluOp::Add };
    let mut instructions = Vec::with_capacity(max_words);
    for (i, &chunk) in parts.iter().enumerate() {
        let rn = if i == 0 { 15 } else { rd };
        instructions.push(Instruction::CoreAlu {
            cond,
            op,
            set_flags: false,
            rn,
            rd,
            operand2: ShifterOperand::Immediate(chunk),
        });
    }
    for _ in parts.len()..max_words {
        instructions.push(Instruction::CoreAlu {
            cond: Condition::Al,
            op: AluOp::Mov,
            set_flags: false,
            rn: 0,
            rd: 0,
            operand2: ShifterOperand::Register { rm: 0 },
        });
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_short_displacement_is_one_add() {
        let words = build_adr(1, Condition::Al, AdrForm::Short, 0x1_0000, 0x1_0010).unwrap();
        assert_eq!(words.len(), 1);
        match words[0] {
            Instruction::CoreAlu { op: AluOp::Add, rn: 15, rd: 1, operand2: ShifterOperand::Immediate(8), .. } => {}
            other => panic!("unexpected encoding: {other:?}"),
        }
    }

    #[test]
    fn backward_displacement_is_one_sub() {
        let words = build_adr(4, Condition::Al, AdrForm::Short, 0x1_0000, 0xFFF0).unwrap();
        assert_eq!(words.len(), 1);
        match words[0] {
            Instruction::CoreAlu { op: AluOp::Sub, rn: 15, rd: 4, operand2: ShifterOperand::Immediate(0x18), .. } => {}
            other => panic!("unexpected encoding: {other:?}"),
        }
    }

    #[test]
    fn long_form_pads_with_mov_r0_r0_when_one_word_would_do() {
        let target = 0x1_0000u32.wrapping_sub(99);
        let words = build_adr(8, Condition::Al, AdrForm::Long, 0x1_0000, target).unwrap();
        assert_eq!(words.len(), 2);
        match words[0] {
            Instruction::CoreAlu { op: AluOp::Sub, rn: 15, rd: 8, operand2: ShifterOperand::Immediate(0x6B), .. } => {}
            other => panic!("unexpected first word: {other:?}"),
        }
        assert_eq!(
            words[1],
            Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Mov, set_flags: false, rn: 0, rd: 0, operand2: ShifterOperand::Register { rm: 0 } }
        );
    }

    #[test]
    fn short_form_rejects_a_displacement_needing_two_words() {
        let result = build_adr(0, Condition::Al, AdrForm::Short, 0, 0x1234);
        assert!(result.is_err());
    }
}
