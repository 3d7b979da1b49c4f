//! Disassembler & Formatter (§4.M): decodes ARM words with `arm_cpu::decode`
//! and renders them back to assembler-compatible text, folding the
//! multi-word `ADR`/`ADRL`/`ADRE` idiom and reporting words outside the
//! selected model as [`DisassembleMiss`] rather than guessing.

mod error;
mod format;
mod multiword;
mod options;

pub use error::DisassembleMiss;
pub use options::{ArchVariant, Options};

use arm_cpu::Instruction;

/// ARM2/ARM3's undefined-instruction space (bits\[27:25\] = 0b011, bit\[4\]
/// set): `arm_cpu::decode` still returns *some* `Instruction` for these
/// (it's total), but no real encoder produces them and no mnemonic exists
/// for them, so the disassembler reports a miss instead of a guess.
fn is_reserved_undefined(word: u32) -> bool {
    let op1 = (word >> 25) & 0x7;
    let bit4 = (word >> 4) & 1;
    op1 == 0b011 && bit4 == 1
}

fn cp_num_of(instr: &Instruction) -> Option<u8> {
    match *instr {
        Instruction::CoProcDataTransfer { cp_num, .. }
        | Instruction::CoProcRegisterTransfer { cp_num, .. }
        | Instruction::CoProcDataProcessing { cp_num, .. } => Some(cp_num),
        _ => None,
    }
}

fn is_fpa(instr: &Instruction) -> bool {
    matches!(
        instr,
        Instruction::FpaDataTransfer { .. } | Instruction::FpaDyadic { .. } | Instruction::FpaMonadic { .. } | Instruction::FpaRegisterTransfer { .. } | Instruction::FpaComparison { .. }
    )
}

/// Decodes one word, rejecting it as a [`DisassembleMiss`] if it falls in
/// the reserved-undefined space, names a coprocessor `model_mask` excludes,
/// or is an FPA op while `allow_fpa` is off.
pub fn decode(word: u32, options: &Options) -> Result<Instruction, DisassembleMiss> {
    if is_reserved_undefined(word) {
        return Err(DisassembleMiss { word });
    }
    let instr = arm_cpu::decode(word);
    if is_fpa(&instr) && !options.allow_fpa {
        return Err(DisassembleMiss { word });
    }
    if let Some(cp_num) = cp_num_of(&instr) {
        if options.model_mask != 0 && options.model_mask & (1 << cp_num) == 0 {
            return Err(DisassembleMiss { word });
        }
    }
    Ok(instr)
}

/// One line of disassembly output: either a formatted instruction, folding
/// however many words an `ADR` idiom consumed, or raw bytes for a word this
/// model can't decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction { address: u32, words: usize, text: String },
    Miss { address: u32, word: u32 },
}

/// Disassembles a whole buffer of little-endian ARM words starting at
/// `base`, one [`Line`] per instruction (or per skipped word on a miss),
/// recognising the `ADR`/`ADRL`/`ADRE` idiom across word boundaries.
#[must_use]
pub fn disassemble_stream(code: &[u8], base: u32, options: &Options) -> Vec<Line> {
    let words: Vec<u32> = code.chunks_exact(4).map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap())).collect();
    let mut lines = Vec::with_capacity(words.len());
    let mut index = 0usize;

    while index < words.len() {
        let address = base.wrapping_add((index * 4) as u32);
        let word = words[index];

        if is_reserved_undefined(word) {
            lines.push(Line::Miss { address, word });
            index += 1;
            continue;
        }

        if let Some(idiom) = multiword::recognize(&words[index..], address) {
            let cond = format::cond_suffix(idiom.cond);
            let mnemonic = match idiom.words {
                1 => "ADR",
                2 => "ADRL",
                _ => "ADRE",
            };
            let text = format!("{mnemonic}{cond} R{}, {}", idiom.rd, format::hex(idiom.target, options));
            lines.push(Line::Instruction { address, words: idiom.words, text });
            index += idiom.words;
            continue;
        }

        match decode(word, options) {
            Ok(instr) => {
                lines.push(Line::Instruction { address, words: 1, text: format::format(instr, address, options) });
                index += 1;
            }
            Err(miss) => {
                lines.push(Line::Miss { address, word: miss.word });
                index += 1;
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_cpu::{AluOp, Condition, ShifterOperand};

    #[test]
    fn swi_disassembles_with_condition_and_comment() {
        let options = Options::default();
        let lines = disassemble_stream(&0xEF00_DEADu32.to_le_bytes(), 0x10000, &options);
        assert_eq!(lines.len(), 1);
        let Line::Instruction { text, words, .. } = &lines[0] else { panic!("expected instruction") };
        assert_eq!(*words, 1);
        assert!(text.starts_with("SWI "), "{text}");
        assert!(text.contains("DEAD"), "{text}");
    }

    #[test]
    fn stmfd_renders_as_stmdb_without_stack_modes() {
        let word = arm_cpu::encode(Instruction::CoreMultiTransfer {
            cond: Condition::Al,
            load: false,
            direction: arm_cpu::BlockDirection::Db,
            user_bank: false,
            writeback: true,
            rn: 13,
            register_list: 0x001F,
        })
        .unwrap();
        let mut options = Options::default();
        options.use_stack_modes_on_r13 = false;
        let lines = disassemble_stream(&word.to_le_bytes(), 0x10000, &options);
        let Line::Instruction { text, .. } = &lines[0] else { panic!("expected instruction") };
        assert_eq!(text, "STMDB R13!, {R0-R4}");

        options.use_stack_modes_on_r13 = true;
        let lines = disassemble_stream(&word.to_le_bytes(), 0x10000, &options);
        let Line::Instruction { text, .. } = &lines[0] else { panic!("expected instruction") };
        assert_eq!(text, "STMFD R13!, {R0-R4}");
    }

    #[test]
    fn reserved_undefined_word_is_a_miss() {
        let word = 0xE7F0_00F0u32;
        let options = Options::default();
        let lines = disassemble_stream(&word.to_le_bytes(), 0x10000, &options);
        assert_eq!(lines, vec![Line::Miss { address: 0x10000, word }]);
    }

    #[test]
    fn adrl_idiom_folds_two_words_into_one_line() {
        let words = [
            arm_cpu::encode(Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Sub, set_flags: false, rn: 15, rd: 8, operand2: ShifterOperand::Immediate(0x6B) }).unwrap(),
            arm_cpu::encode(Instruction::CoreAlu { cond: Condition::Al, op: AluOp::Mov, set_flags: false, rn: 0, rd: 0, operand2: ShifterOperand::Register { rm: 0 } }).unwrap(),
        ];
        let mut code = Vec::new();
        for word in words {
            code.extend_from_slice(&word.to_le_bytes());
        }
        let lines = disassemble_stream(&code, 0x10000, &Options::default());
        assert_eq!(lines.len(), 1);
        let Line::Instruction { words, text, .. } = &lines[0] else { panic!("expected instruction") };
        assert_eq!(*words, 2);
        assert!(text.starts_with("ADRL R8,"), "{text}");
    }
}
