//! Recognises the `ADR`/`ADRL`/`ADRE` idiom (§4.M) by peeking ahead up to
//! two words past the one the caller is currently formatting: one or two
//! `ADD`/`SUB Rd, PC-or-Rd, #imm` accumulation steps, padded out with
//! `MOV R0, R0` when the declared form is longer than the displacement
//! strictly needs (mirrors `arm_assembler::adr::build_adr`'s emission
//! shape exactly, run in reverse).

use arm_cpu::{AluOp, Condition, Instruction, ShifterOperand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdrIdiom {
    pub rd: u8,
    pub cond: Condition,
    pub words: usize,
    pub target: u32,
}

fn is_pad(instr: &Instruction) -> bool {
    matches!(
        instr,
        Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Mov, set_flags: false, rn: 0, rd: 0, operand2: ShifterOperand::Register { rm: 0 } }
    )
}

/// `word_pc` is the address of `words[0]`. Returns the idiom and how many
/// words it consumed (1 to 3) if `words` opens with a PC-relative
/// `ADD`/`SUB Rd, PC, #imm`.
#[must_use]
pub fn recognize(words: &[u32], word_pc: u32) -> Option<AdrIdiom> {
    let first = arm_cpu::decode(*words.first()?);
    let Instruction::CoreAlu { cond, op: op @ (AluOp::Add | AluOp::Sub), set_flags: false, rn: 15, rd, operand2: ShifterOperand::Immediate(imm) } = first
    else {
        return None;
    };

    let pc = word_pc.wrapping_add(8);
    let mut target = if op == AluOp::Add { pc.wrapping_add(imm) } else { pc.wrapping_sub(imm) };
    let mut consumed = 1;

    for &raw in words.iter().skip(1).take(2) {
        let next = arm_cpu::decode(raw);
        if is_pad(&next) {
            consumed += 1;
            continue;
        }
        let Instruction::CoreAlu { cond: next_cond, op: next_op @ (AluOp::Add | AluOp::Sub), set_flags: false, rn: next_rn, rd: next_rd, operand2: ShifterOperand::Immediate(next_imm) } =
            next
        else {
            break;
        };
        if next_cond != cond || next_rn != rd || next_rd != rd {
            break;
        }
        target = if next_op == AluOp::Add { target.wrapping_add(next_imm) } else { target.wrapping_sub(next_imm) };
        consumed += 1;
    }

    Some(AdrIdiom { rd, cond, words: consumed, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_cpu::encode;

    fn word_for(instr: Instruction) -> u32 {
        encode(instr).unwrap()
    }

    #[test]
    fn single_add_from_pc_is_a_one_word_idiom() {
        let words = [word_for(Instruction::CoreAlu {
            cond: Condition::Al,
            op: AluOp::Add,
            set_flags: false,
            rn: 15,
            rd: 1,
            operand2: ShifterOperand::Immediate(8),
        })];
        let idiom = recognize(&words, 0x1_0000).unwrap();
        assert_eq!(idiom.words, 1);
        assert_eq!(idiom.rd, 1);
        assert_eq!(idiom.target, 0x1_0010);
    }

    #[test]
    fn sub_then_pad_is_a_two_word_idiom() {
        let words = [
            word_for(Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Sub, set_flags: false, rn: 15, rd: 8, operand2: ShifterOperand::Immediate(0x6B) }),
            word_for(Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Mov, set_flags: false, rn: 0, rd: 0, operand2: ShifterOperand::Register { rm: 0 } }),
        ];
        let idiom = recognize(&words, 0x1_0000).unwrap();
        assert_eq!(idiom.words, 2);
        assert_eq!(idiom.target, 0x1_0000u32.wrapping_sub(99));
    }

    #[test]
    fn unrelated_second_instruction_stops_the_idiom_at_one_word() {
        let words = [
            word_for(Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Add, set_flags: false, rn: 15, rd: 1, operand2: ShifterOperand::Immediate(8) }),
            word_for(Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Add, set_flags: false, rn: 2, rd: 3, operand2: ShifterOperand::Immediate(1) }),
        ];
        let idiom = recognize(&words, 0x1_0000).unwrap();
        assert_eq!(idiom.words, 1);
    }
}
