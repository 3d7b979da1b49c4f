//! End-to-end disassembly scenarios, several of them round-tripped through
//! `arm_assembler` to check the formatter's text re-encodes identically.

use arm_disasm::{Line, Options, disassemble_stream};

fn assemble(source: &str, load_address: u32) -> Vec<u8> {
    let object_code = arm_assembler::assemble(source, &arm_assembler::Options { load_address: Some(load_address) }).unwrap_or_else(|diagnostics| panic!("{diagnostics}"));
    object_code.code().to_vec()
}

fn only_line(code: &[u8], base: u32, options: &Options) -> Line {
    let mut lines = disassemble_stream(code, base, options);
    assert_eq!(lines.len(), 1);
    lines.remove(0)
}

#[test]
fn swi_disassembly_shows_mnemonic_condition_and_comment() {
    let code = assemble("SWI &DEAD\n", 0x10000);
    let Line::Instruction { text, .. } = only_line(&code, 0x10000, &Options::default()) else { panic!("expected instruction") };
    assert_eq!(text, "SWI &DEAD");

    let code = assemble("SWIVS &CAFEEE\n", 0x10000);
    let Line::Instruction { text, .. } = only_line(&code, 0x10000, &Options::default()) else { panic!("expected instruction") };
    assert_eq!(text, "SWIVS &CAFEEE");
}

#[test]
fn ldm_stm_stack_synonym_round_trips_through_both_renderings() {
    let code = assemble("STMFD R13!, {R0-R4}\n", 0x10000);

    let mut options = Options::default();
    options.use_stack_modes_on_r13 = true;
    let Line::Instruction { text, .. } = only_line(&code, 0x10000, &options) else { panic!("expected instruction") };
    assert_eq!(text, "STMFD R13!, {R0-R4}");

    options.use_stack_modes_on_r13 = false;
    let Line::Instruction { text, .. } = only_line(&code, 0x10000, &options) else { panic!("expected instruction") };
    assert_eq!(text, "STMDB R13!, {R0-R4}");

    let reassembled = assemble(&format!("{text}\n"), 0x10000);
    assert_eq!(reassembled, code);
}

#[test]
fn adr_idiom_round_trips_to_the_same_words() {
    let code = assemble("ADR R1, &10010\n", 0x10000);
    let Line::Instruction { text, words, .. } = only_line(&code, 0x10000, &Options::default()) else { panic!("expected instruction") };
    assert_eq!(words, 1);
    assert_eq!(text, "ADR R1, &10010");

    let reassembled = assemble(&format!("{text}\n"), 0x10000);
    assert_eq!(reassembled, code);
}

#[test]
fn adrl_idiom_folds_both_words_and_round_trips() {
    let code = assemble("ADRL R8, $-99\n", 0x10000);
    assert_eq!(code.len(), 8);
    let Line::Instruction { text, words, .. } = only_line(&code, 0x10000, &Options::default()) else { panic!("expected instruction") };
    assert_eq!(words, 2);
    assert!(text.starts_with("ADRL R8, "), "{text}");

    let reassembled = assemble(&format!("{text}\n"), 0x10000);
    assert_eq!(reassembled, code);
}

#[test]
fn arithmetic_and_branch_program_round_trips() {
    let source = "MOV R0, #1\nMOV R1, #2\nADD R2, R0, R1\nCMP R0, R0\nADDNE R1, R1, #1\nSWI &11\n";
    let code = assemble(source, 0x8000);
    let lines = disassemble_stream(&code, 0x8000, &Options::default());
    assert_eq!(lines.len(), 6);

    let mut reassembly = String::new();
    for line in &lines {
        let Line::Instruction { text, .. } = line else { panic!("expected instruction, got {line:?}") };
        reassembly.push_str(text);
        reassembly.push('\n');
    }
    let reassembled = assemble(&reassembly, 0x8000);
    assert_eq!(reassembled, code);
}

#[test]
fn reserved_undefined_word_reports_a_miss_not_a_guess() {
    let word = 0xE7F0_00F0u32;
    let lines = disassemble_stream(&word.to_le_bytes(), 0x10000, &Options::default());
    assert_eq!(lines, vec![Line::Miss { address: 0x10000, word }]);
}

#[test]
fn coprocessor_outside_model_mask_is_a_miss() {
    let code = assemble("CDP 4, 0, 0, 1, 2, 0\n", 0x10000);
    let mut options = Options::default();
    options.model_mask = 1 << 2;
    let line = only_line(&code, 0x10000, &options);
    assert!(matches!(line, Line::Miss { .. }), "{line:?}");

    options.model_mask = 1 << 4;
    let Line::Instruction { text, .. } = only_line(&code, 0x10000, &options) else { panic!("expected instruction") };
    assert!(text.starts_with("CDP "), "{text}");
}
