//! End-to-end assembly scenarios driven entirely through the public API.

use arm_assembler::{Options, assemble};

fn assemble_at(source: &str, load_address: u32) -> arm_assembler::ObjectCode {
    assemble(source, &Options { load_address: Some(load_address) }).unwrap_or_else(|diagnostics| panic!("{diagnostics}"))
}

fn word_at(code: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(code[offset..offset + 4].try_into().unwrap())
}

#[test]
fn swi_encoding() {
    let code = assemble_at("SWI &DEAD\n", 0x10000);
    assert_eq!(word_at(code.code(), 0), 0xEF00_DEAD);

    let code = assemble_at("SWIVS &CAFEEE\n", 0x10000);
    assert_eq!(word_at(code.code(), 0), 0x6FCA_FEEE);
}

#[test]
fn adr_forward_and_backward() {
    let code = assemble_at("ADR R1, &10010\n", 0x10000);
    assert_eq!(word_at(code.code(), 0), 0xE28F_1008);

    let code = assemble_at("ADR R4, &FFF0\n", 0x10000);
    assert_eq!(word_at(code.code(), 0), 0xE24F_4018);
}

#[test]
fn adrl_pads_to_two_words() {
    let code = assemble_at("ADRL R8, $-99\n", 0x10000);
    assert_eq!(code.len(), 8);
    assert_eq!(word_at(code.code(), 0), 0xE24F_806B);
    assert_eq!(word_at(code.code(), 4), 0xE1A0_0000);
}

#[test]
fn ldm_stm_stack_synonyms() {
    let code = assemble_at("STMFD R13!, {R0-R4}\n", 0x10000);
    assert_eq!(word_at(code.code(), 0), 0xE92D_001F);
}

#[test]
fn multi_pass_label_resolves_forward_reference() {
    let source = "EQUD 0xCAFEBABE\nEQUD myLabel\nEQUS 'Hello World!',13,10\nALIGN\n.myLabel\n";
    let code = assemble_at(source, 0x8000);
    assert_eq!(code.len(), 24);
    assert_eq!(word_at(code.code(), 4), 0x0000_8018);

    let label = code.symbols().iter().find(|s| s.name == "myLabel").expect("myLabel defined");
    assert_eq!(label.value, arm_value::Value::U32(0x8018));
}

#[test]
fn undefined_symbol_is_reported_not_panicked() {
    let err = assemble("EQUD neverDefined\n", &Options::default()).unwrap_err();
    assert_eq!(err.len(), 1);
}

#[test]
fn duplicate_label_is_a_driver_diagnostic() {
    let source = ".here\nMOV R0, R0\n.here\nMOV R0, R0\n";
    let err = assemble(source, &Options::default()).unwrap_err();
    assert_eq!(err.len(), 1);
}
