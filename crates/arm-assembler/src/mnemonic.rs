//! Mnemonic grammar: `stem{condition}{flag}`, resolved by trying the
//! longest matching stem first and backtracking to a shorter one whenever
//! the remaining text isn't a flag that stem accepts — the textbook fix for
//! `BLE` (`B` + condition `LE`) vs `BL` + a bogus flag `E`.

use arm_cpu::{AluOp, Condition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stem {
    Alu(AluOp),
    /// `TST`/`TEQ`/`CMP`/`CMN`.
    Cmp(AluOp),
    Mul,
    Mla,
    Umull,
    Umlal,
    Smull,
    Smlal,
    Ldr,
    Str,
    Ldm,
    Stm,
    B,
    Bl,
    Bx,
    Swi,
    Bkpt,
    Swp,
    Mrs,
    Msr,
    Adr,
    Cdp,
    Mcr,
    Mrc,
    Ldc,
    Stc,
}

/// `stem` text, in an order where a longer entry always precedes any entry
/// that is one of its prefixes (`UMULL` before nothing shorter collides;
/// `BL`/`BX` before `B`).
const STEMS: &[(&str, Stem)] = &[
    ("UMULL", Stem::Umull),
    ("UMLAL", Stem::Umlal),
    ("SMULL", Stem::Smull),
    ("SMLAL", Stem::Smlal),
    ("BKPT", Stem::Bkpt),
    ("ADR", Stem::Adr),
    ("MUL", Stem::Mul),
    ("MLA", Stem::Mla),
    ("LDR", Stem::Ldr),
    ("STR", Stem::Str),
    ("LDM", Stem::Ldm),
    ("STM", Stem::Stm),
    ("SWI", Stem::Swi),
    ("SVC", Stem::Swi),
    ("SWP", Stem::Swp),
    ("MRS", Stem::Mrs),
    ("MSR", Stem::Msr),
    ("CDP", Stem::Cdp),
    ("MCR", Stem::Mcr),
    ("MRC", Stem::Mrc),
    ("LDC", Stem::Ldc),
    ("STC", Stem::Stc),
    ("BL", Stem::Bl),
    ("BX", Stem::Bx),
    ("AND", Stem::Alu(AluOp::And)),
    ("EOR", Stem::Alu(AluOp::Eor)),
    ("SUB", Stem::Alu(AluOp::Sub)),
    ("RSB", Stem::Alu(AluOp::Rsb)),
    ("ADD", Stem::Alu(AluOp::Add)),
    ("ADC", Stem::Alu(AluOp::Adc)),
    ("SBC", Stem::Alu(AluOp::Sbc)),
    ("RSC", Stem::Alu(AluOp::Rsc)),
    ("ORR", Stem::Alu(AluOp::Orr)),
    ("MOV", Stem::Alu(AluOp::Mov)),
    ("BIC", Stem::Alu(AluOp::Bic)),
    ("MVN", Stem::Alu(AluOp::Mvn)),
    ("TST", Stem::Cmp(AluOp::Tst)),
    ("TEQ", Stem::Cmp(AluOp::Teq)),
    ("CMP", Stem::Cmp(AluOp::Cmp)),
    ("CMN", Stem::Cmp(AluOp::Cmn)),
    ("B", Stem::B),
];

/// Whether `flag` (the text left over once a stem and an optional
/// condition have been stripped) is one this stem accepts. Empty is always
/// accepted (unconditional flag-less form).
fn accepts_flag(stem: Stem, flag: &str) -> bool {
    if flag.is_empty() {
        return true;
    }
    match stem {
        Stem::Alu(_) | Stem::Mul | Stem::Mla | Stem::Umull | Stem::Umlal | Stem::Smull | Stem::Smlal => flag == "S",
        Stem::Cmp(_) => flag == "P",
        Stem::Ldr => matches!(flag, "B" | "H" | "SB" | "SH"),
        Stem::Str => matches!(flag, "B" | "H"),
        Stem::Swp => flag == "B",
        Stem::Ldm | Stem::Stm => matches!(flag, "IA" | "IB" | "DA" | "DB" | "FD" | "FA" | "ED" | "EA"),
        Stem::Adr => matches!(flag, "L" | "E"),
        Stem::Ldc | Stem::Stc => flag == "L",
        Stem::B | Stem::Bl | Stem::Bx | Stem::Swi | Stem::Bkpt | Stem::Mrs | Stem::Msr | Stem::Cdp | Stem::Mcr | Stem::Mrc => false,
    }
}

/// A mnemonic split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMnemonic {
    pub stem: Stem,
    pub condition: Condition,
    pub flag: String,
}

/// Splits `word` (already the whole mnemonic token text) into stem,
/// condition and flag, trying the longest stem whose leftover text parses
/// as a valid `(condition, flag)` pair for that stem.
#[must_use]
pub fn classify(word: &str) -> Option<ParsedMnemonic> {
    let upper = word.to_ascii_uppercase();
    let mut candidates: Vec<&(&str, Stem)> = STEMS.iter().filter(|(text, _)| upper.starts_with(text)).collect();
    candidates.sort_by_key(|(text, _)| std::cmp::Reverse(text.len()));

    for (text, stem) in candidates {
        let remainder = &upper[text.len()..];
        if remainder.len() >= 2 {
            if let Some(condition) = Condition::from_mnemonic(&remainder[..2]) {
                let flag = &remainder[2..];
                if accepts_flag(*stem, flag) {
                    return Some(ParsedMnemonic { stem: *stem, condition, flag: flag.to_string() });
                }
            }
        }
        if accepts_flag(*stem, remainder) {
            return Some(ParsedMnemonic { stem: *stem, condition: Condition::Al, flag: remainder.to_string() });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ble_is_branch_with_condition_not_bl_plus_e() {
        let parsed = classify("BLE").unwrap();
        assert_eq!(parsed.stem, Stem::B);
        assert_eq!(parsed.condition, Condition::Le);
        assert!(parsed.flag.is_empty());
    }

    #[test]
    fn bleq_is_branch_link_with_condition() {
        let parsed = classify("BLEQ").unwrap();
        assert_eq!(parsed.stem, Stem::Bl);
        assert_eq!(parsed.condition, Condition::Eq);
    }

    #[test]
    fn movs_sets_flags_unconditionally() {
        let parsed = classify("MOVS").unwrap();
        assert_eq!(parsed.stem, Stem::Alu(AluOp::Mov));
        assert_eq!(parsed.condition, Condition::Al);
        assert_eq!(parsed.flag, "S");
    }

    #[test]
    fn addeqs_is_add_eq_with_flags_set() {
        let parsed = classify("ADDEQS").unwrap();
        assert_eq!(parsed.stem, Stem::Alu(AluOp::Add));
        assert_eq!(parsed.condition, Condition::Eq);
        assert_eq!(parsed.flag, "S");
    }

    #[test]
    fn stmfd_takes_the_full_stack_mode_flag() {
        let parsed = classify("STMFD").unwrap();
        assert_eq!(parsed.stem, Stem::Stm);
        assert_eq!(parsed.flag, "FD");
    }

    #[test]
    fn ldmeqfd_splits_condition_before_stack_mode() {
        let parsed = classify("LDMEQFD").unwrap();
        assert_eq!(parsed.stem, Stem::Ldm);
        assert_eq!(parsed.condition, Condition::Eq);
        assert_eq!(parsed.flag, "FD");
    }

    #[test]
    fn adreql_is_adr_condition_eq_long_form() {
        let parsed = classify("ADREQL").unwrap();
        assert_eq!(parsed.stem, Stem::Adr);
        assert_eq!(parsed.condition, Condition::Eq);
        assert_eq!(parsed.flag, "L");
    }

    #[test]
    fn unknown_word_classifies_to_none() {
        assert_eq!(classify("FROB"), None);
    }

    #[test]
    fn ldrsh_is_signed_halfword_load() {
        let parsed = classify("LDRSH").unwrap();
        assert_eq!(parsed.stem, Stem::Ldr);
        assert_eq!(parsed.flag, "SH");
    }
}
