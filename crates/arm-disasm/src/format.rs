//! Renders a decoded [`Instruction`] back to text in the assembler's own
//! grammar (§4.M): `format(desc, options)` such that re-assembly is byte-
//! exact, modulo condition-code synonyms (`HS`/`LO`, canonicalised to
//! `CS`/`CC` in output — already the only spelling `Condition::mnemonic`
//! produces).

use arm_cpu::{
    AddressOperand, AluOp, BlockDirection, Condition, FpaPrecision, Instruction, PsrFieldMask, PsrSource, ShiftType, ShifterOperand, TransferWidth,
};

use crate::options::Options;

fn reg(n: u8) -> String {
    format!("R{n}")
}

pub(crate) fn hex(value: u32, options: &Options) -> String {
    if options.use_basic_style_hex { format!("&{value:X}") } else { format!("0x{value:X}") }
}

fn signed_hex(value: i64, options: &Options) -> String {
    if value < 0 { format!("-{}", hex(value.unsigned_abs() as u32, options)) } else { hex(value as u32, options) }
}

fn shift_mnemonic(shift: ShiftType) -> &'static str {
    match shift {
        ShiftType::Lsl => "LSL",
        ShiftType::Lsr => "LSR",
        ShiftType::Asr => "ASR",
        ShiftType::Ror => "ROR",
        ShiftType::Rrx => "RRX",
    }
}

fn format_shifter_operand(operand: ShifterOperand, options: &Options) -> String {
    match operand {
        ShifterOperand::Immediate(value) => format!("#{}", hex(value, options)),
        ShifterOperand::Register { rm } => reg(rm),
        ShifterOperand::ShiftByConstant { rm, shift, amount } => format!("{}, {} #{amount}", reg(rm), shift_mnemonic(shift)),
        ShifterOperand::ShiftByRegister { rm, shift, rs } => format!("{}, {} {}", reg(rm), shift_mnemonic(shift), reg(rs)),
        ShifterOperand::RotateWithExtend { rm } => format!("{}, RRX", reg(rm)),
    }
}

/// An address operand used as a plain offset magnitude: the payload is
/// never an 8-bit rotated immediate here (§4.L's operand2-vs-address-
/// offset encoding split), so it's rendered as a raw number, not run
/// through `encode_rotated_immediate`'s inverse.
fn format_address(address: AddressOperand, options: &Options) -> String {
    let rn = reg(address.rn);
    let sign = if address.negative_offset { "-" } else { "" };

    let offset_text = match address.offset {
        ShifterOperand::Immediate(0) if address.pre_indexed && !address.writeback => return format!("[{rn}]"),
        ShifterOperand::Immediate(value) => format!("#{sign}{}", hex(value, options)),
        ShifterOperand::Register { rm } => format!("{sign}{}", reg(rm)),
        ShifterOperand::ShiftByConstant { rm, shift, amount } => format!("{sign}{}, {} #{amount}", reg(rm), shift_mnemonic(shift)),
        other => format!("{sign}{}", format_shifter_operand(other, options)),
    };

    if address.pre_indexed {
        let bang = if address.writeback { "!" } else { "" };
        format!("[{rn}, {offset_text}]{bang}")
    } else {
        format!("[{rn}], {offset_text}")
    }
}

/// `{R0, R4-R9}` with contiguous runs compressed to a range, the inverse
/// of `arm_assembler`'s register-list mask builder.
fn format_register_list(mask: u16, user_bank: bool) -> String {
    let mut parts = Vec::new();
    let mut i = 0u8;
    while i < 16 {
        if mask & (1 << i) == 0 {
            i += 1;
            continue;
        }
        let start = i;
        while i < 16 && mask & (1 << i) != 0 {
            i += 1;
        }
        let end = i - 1;
        if end == start {
            parts.push(reg(start));
        } else {
            parts.push(format!("{}-{}", reg(start), reg(end)));
        }
    }
    let caret = if user_bank { "^" } else { "" };
    format!("{{{}}}{caret}", parts.join(", "))
}

fn format_psr(source: PsrSource, mask: Option<PsrFieldMask>) -> String {
    let base = if source == PsrSource::Spsr { "SPSR" } else { "CPSR" };
    let Some(mask) = mask else { return base.to_string() };
    let mut suffix = String::new();
    if mask.control {
        suffix.push('c');
    }
    if mask.extension {
        suffix.push('x');
    }
    if mask.status {
        suffix.push('s');
    }
    if mask.flags {
        suffix.push('f');
    }
    if suffix.is_empty() { base.to_string() } else { format!("{base}_{suffix}") }
}

fn block_direction_suffix(direction: BlockDirection, load: bool, on_stack: bool) -> &'static str {
    if !on_stack {
        return match direction {
            BlockDirection::Ia => "IA",
            BlockDirection::Ib => "IB",
            BlockDirection::Da => "DA",
            BlockDirection::Db => "DB",
        };
    }
    match (direction, load) {
        (BlockDirection::Ia, true) | (BlockDirection::Db, false) => "FD",
        (BlockDirection::Ib, true) | (BlockDirection::Da, false) => "ED",
        (BlockDirection::Da, true) | (BlockDirection::Ib, false) => "FA",
        (BlockDirection::Db, true) | (BlockDirection::Ia, false) => "EA",
    }
}

pub(crate) fn cond_suffix(cond: Condition) -> &'static str {
    if cond == Condition::Al { "" } else { cond.mnemonic() }
}

fn transfer_width_suffix(width: TransferWidth) -> &'static str {
    match width {
        TransferWidth::Word => "",
        TransferWidth::Byte => "B",
        TransferWidth::Halfword => "H",
        TransferWidth::SignedByte => "SB",
        TransferWidth::SignedHalfword => "SH",
    }
}

fn fpa_precision_suffix(precision: FpaPrecision) -> &'static str {
    match precision {
        FpaPrecision::Single => "S",
        FpaPrecision::Double => "D",
        FpaPrecision::Extended => "E",
        FpaPrecision::PackedDecimal => "P",
    }
}

/// One formatted instruction line, without any multi-word `ADR` idiom
/// folding — that happens one layer up in [`crate::disassemble_stream`],
/// which has the word-ahead context this function doesn't. `pc` is the
/// address of `instr` itself, needed to turn a `Branch`'s PC-relative
/// `offset` into an absolute target comment.
#[must_use]
pub fn format(instr: Instruction, pc: u32, options: &Options) -> String {
    let cond = cond_suffix(instr.condition());
    match instr {
        Instruction::CoreAlu { op, set_flags, rn, rd, operand2, .. } => {
            let flag = if set_flags { "S" } else { "" };
            let op2 = format_shifter_operand(operand2, options);
            if matches!(op, AluOp::Mov | AluOp::Mvn) {
                format!("{}{cond}{flag} {}, {op2}", op.mnemonic(), reg(rd))
            } else {
                format!("{}{cond}{flag} {}, {}, {op2}", op.mnemonic(), reg(rd), reg(rn))
            }
        }
        Instruction::CoreCompare { op, rn, operand2, result_to_psr, .. } => {
            let flag = if result_to_psr { "P" } else { "" };
            format!("{}{cond}{flag} {}, {}", op.mnemonic(), reg(rn), format_shifter_operand(operand2, options))
        }
        Instruction::CoreMultiply { set_flags, accumulate, rd, rn, rs, rm, .. } => {
            let flag = if set_flags { "S" } else { "" };
            if accumulate {
                format!("MLA{cond}{flag} {}, {}, {}, {}", reg(rd), reg(rm), reg(rs), reg(rn))
            } else {
                format!("MUL{cond}{flag} {}, {}, {}", reg(rd), reg(rm), reg(rs))
            }
        }
        Instruction::LongMultiply { set_flags, signed, accumulate, rdhi, rdlo, rs, rm, .. } => {
            let flag = if set_flags { "S" } else { "" };
            let mnemonic = match (signed, accumulate) {
                (true, true) => "SMLAL",
                (true, false) => "SMULL",
                (false, true) => "UMLAL",
                (false, false) => "UMULL",
            };
            format!("{mnemonic}{cond}{flag} {}, {}, {}, {}", reg(rdlo), reg(rdhi), reg(rm), reg(rs))
        }
        Instruction::CoreDataTransfer { load, width, rd, address, .. } => {
            let mnemonic = if load { "LDR" } else { "STR" };
            format!("{mnemonic}{cond}{} {}, {}", transfer_width_suffix(width), reg(rd), format_address(address, options))
        }
        Instruction::CoreMultiTransfer { load, direction, user_bank, writeback, rn, register_list } => {
            let mnemonic = if load { "LDM" } else { "STM" };
            let on_stack = options.use_stack_modes_on_r13 && rn == 13;
            let suffix = block_direction_suffix(direction, load, on_stack);
            let bang = if writeback { "!" } else { "" };
            format!("{mnemonic}{cond}{suffix} {}{bang}, {}", reg(rn), format_register_list(register_list, user_bank))
        }
        Instruction::Branch { link, offset, .. } => {
            let mnemonic = if link { "BL" } else { "B" };
            let target = pc.wrapping_add(8).wrapping_add_signed(offset);
            if options.show_offsets {
                format!("{mnemonic}{cond} {}  ; {}{}", hex(target, options), if offset >= 0 { "+" } else { "" }, signed_hex(i64::from(offset), options))
            } else {
                format!("{mnemonic}{cond} {}", hex(target, options))
            }
        }
        Instruction::BranchExchange { rm, .. } => format!("BX{cond} {}", reg(rm)),
        Instruction::SoftwareIrq { comment, .. } => format!("SWI{cond} {}", hex(comment, options)),
        Instruction::Breakpoint { immediate } => format!("BKPT {}", hex(u32::from(immediate), options)),
        Instruction::AtomicSwap { byte, rn, rd, rm, .. } => {
            let flag = if byte { "B" } else { "" };
            format!("SWP{cond}{flag} {}, {}, [{}]", reg(rd), reg(rm), reg(rn))
        }
        Instruction::MoveFromPsr { source, rd, .. } => format!("MRS{cond} {}, {}", reg(rd), format_psr(source, None)),
        Instruction::MoveToPsr { source, mask, operand, .. } => format!("MSR{cond} {}, {}", format_psr(source, Some(mask)), format_shifter_operand(operand, options)),
        Instruction::CoProcDataTransfer { load, long, cp_num, crd, address, .. } => {
            let mnemonic = if load { "LDC" } else { "STC" };
            let flag = if long { "L" } else { "" };
            format!("{mnemonic}{cond}{flag} {cp_num}, {crd}, {}", format_address(address, options))
        }
        Instruction::CoProcRegisterTransfer { to_coprocessor, cp_num, cp_opcode, rd, crn, crm, cp_info, .. } => {
            let mnemonic = if to_coprocessor { "MCR" } else { "MRC" };
            format!("{mnemonic}{cond} {cp_num}, {cp_opcode}, {}, {crn}, {crm}, {cp_info}", reg(rd))
        }
        Instruction::CoProcDataProcessing { cp_num, cp_opcode, crd, crn, crm, cp_info, .. } => {
            format!("CDP{cond} {cp_num}, {cp_opcode}, {crd}, {crn}, {crm}, {cp_info}")
        }
        Instruction::FpaDataTransfer { load, precision, fd, address, .. } => {
            let mnemonic = if load { "LDF" } else { "STF" };
            format!("{mnemonic}{cond}{} F{fd}, {}", fpa_precision_suffix(precision), format_address(address, options))
        }
        Instruction::FpaDyadic { opcode, precision, fd, fn_, fm, .. } => {
            format!("FPA{cond}{} {opcode} F{fd}, F{fn_}, F{fm}", fpa_precision_suffix(precision))
        }
        Instruction::FpaMonadic { opcode, precision, fd, fm, .. } => {
            format!("FPA{cond}{} {opcode} F{fd}, F{fm}", fpa_precision_suffix(precision))
        }
        Instruction::FpaRegisterTransfer { to_fpa, rd, fn_, .. } => {
            let mnemonic = if to_fpa { "FLT" } else { "FIX" };
            format!("{mnemonic}{cond} F{fn_}, {}", reg(rd))
        }
        Instruction::FpaComparison { negate, fn_, fm, .. } => {
            let mnemonic = if negate { "CMFE" } else { "CMF" };
            format!("{mnemonic}{cond} F{fn_}, F{fm}")
        }
    }
}
