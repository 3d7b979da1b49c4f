//! Pass 2 (§4.L): turns a [`StatementBody::Instruction`] plus a resolved
//! [`ConstantSet`] into the `arm_cpu::Instruction` that `arm_cpu::encode`
//! turns into bytes. One function per mnemonic family; the operand shapes
//! were already checked in `parser.rs`, so a mismatch here is an internal
//! bug, not a diagnosable user error.

use arm_asm_syntax::{ConstantSet, Offset, Operand, ShiftOperand};
use arm_cpu::{AddressOperand, BlockDirection, Condition, Instruction, PsrFieldMask, PsrSource, ShifterOperand, TransferWidth};

use crate::diagnostic::Diagnostic;
use crate::eval_helpers::{eval_bits32, eval_signed_magnitude, eval_unsigned};
use crate::mnemonic::{ParsedMnemonic, Stem};
use crate::parser::RawOperand;

fn driver_error(location: arm_asm_lexer::Location, message: impl Into<String>) -> Diagnostic {
    Diagnostic::Driver { location, message: message.into() }
}

fn expect_register(op: &RawOperand, location: arm_asm_lexer::Location) -> Result<u8, Diagnostic> {
    match op {
        RawOperand::Syntax(Operand::Register(r)) => Ok(*r),
        _ => Err(driver_error(location, "expected a register operand")),
    }
}

fn expect_expr<'a>(op: &'a RawOperand, location: arm_asm_lexer::Location) -> Result<&'a arm_asm_syntax::ExprNode, Diagnostic> {
    match op {
        RawOperand::Expr(node) => Ok(node),
        _ => Err(driver_error(location, "expected an expression operand")),
    }
}

fn build_shift_operand(shift: &ShiftOperand, constants: &ConstantSet<'_>) -> Result<ShifterOperand, Diagnostic> {
    match shift {
        ShiftOperand::Rrx => Ok(ShifterOperand::RotateWithExtend { rm: 0 }),
        ShiftOperand::ByRegister { shift, rs } => Ok(ShifterOperand::ShiftByRegister { rm: 0, shift: *shift, rs: *rs }),
        ShiftOperand::ByConstant { shift, amount } => {
            let value = eval_unsigned(amount, constants, 5, "a shift amount")?;
            Ok(ShifterOperand::ShiftByConstant { rm: 0, shift: *shift, amount: value })
        }
    }
}

/// Merges the `rm` a shift carries no register of its own for (`Rrx`,
/// `ByConstant`) back in — `build_shift_operand` builds the shift alone so
/// it can be reused for both operand2 and address-offset shapes, which
/// disagree on where the base register comes from.
fn with_rm(mut shifter: ShifterOperand, rm: u8) -> ShifterOperand {
    match &mut shifter {
        ShifterOperand::RotateWithExtend { rm: r } | ShifterOperand::ShiftByConstant { rm: r, .. } | ShifterOperand::ShiftByRegister { rm: r, .. } => {
            *r = rm;
        }
        ShifterOperand::Immediate(_) | ShifterOperand::Register { .. } => {}
    }
    shifter
}

/// Operand2 of a data-processing instruction (`#expr` / `Rm` / `Rm, shift`).
fn build_operand2(op: &Operand, constants: &ConstantSet<'_>, location: arm_asm_lexer::Location) -> Result<ShifterOperand, Diagnostic> {
    match op {
        Operand::Immediate(expr) => {
            let value = eval_bits32(expr, constants)?;
            arm_cpu::encode_rotated_immediate(value)
                .map(ShifterOperand::Immediate)
                .ok_or_else(|| driver_error(location, format!("{value:#x} has no 8-bit rotated-immediate encoding")))
        }
        Operand::Register(rm) => Ok(ShifterOperand::Register { rm: *rm }),
        Operand::ShiftedRegister { rm, shift } => {
            let base = build_shift_operand(shift, constants)?;
            Ok(with_rm(base, *rm))
        }
        _ => Err(driver_error(location, "expected a data-processing operand2")),
    }
}

fn build_address(op: &Operand, constants: &ConstantSet<'_>, location: arm_asm_lexer::Location) -> Result<AddressOperand, Diagnostic> {
    let Operand::Address(mem) = op else {
        return Err(driver_error(location, "expected an address operand"));
    };
    let (offset, negative, pre_indexed, writeback) = match &mem.offset {
        None => (ShifterOperand::Immediate(0), false, mem.pre_indexed, mem.writeback),
        Some(Offset::Immediate { negative, value }) => {
            let (value_negative, magnitude) = eval_signed_magnitude(value, constants)?;
            (ShifterOperand::Immediate(magnitude), *negative ^ value_negative, mem.pre_indexed, mem.writeback)
        }
        Some(Offset::Register { negative, rm, shift: None }) => (ShifterOperand::Register { rm: *rm }, *negative, mem.pre_indexed, mem.writeback),
        Some(Offset::Register { negative, rm, shift: Some((shift, amount)) }) => {
            let value = eval_unsigned(amount, constants, 5, "a shift amount")?;
            (ShifterOperand::ShiftByConstant { rm: *rm, shift: *shift, amount: value }, *negative, mem.pre_indexed, mem.writeback)
        }
    };
    Ok(AddressOperand { rn: mem.rn, offset, pre_indexed, negative_offset: negative, writeback })
}

/// `STMFD`/`LDMEA`/... §4.L stack-mode synonyms, remapped onto the four
/// physical addressing modes. The direction a given suffix names differs
/// between load and store, since "full descending" describes the stack's
/// growth direction, not the transfer's.
fn block_direction(stem: Stem, flag: &str) -> BlockDirection {
    match (stem, flag) {
        (_, "IA") => BlockDirection::Ia,
        (_, "IB") => BlockDirection::Ib,
        (_, "DA") => BlockDirection::Da,
        (_, "DB") => BlockDirection::Db,
        (Stem::Ldm, "FD") | (Stem::Stm, "EA") => BlockDirection::Ia,
        (Stem::Ldm, "ED") | (Stem::Stm, "FA") => BlockDirection::Ib,
        (Stem::Ldm, "FA") | (Stem::Stm, "ED") => BlockDirection::Da,
        (Stem::Ldm, "EA") | (Stem::Stm, "FD") => BlockDirection::Db,
        _ => BlockDirection::Ia,
    }
}

/// Builds the `arm_cpu::Instruction` for one parsed mnemonic and its
/// operands, evaluating every expression field against `constants`
/// (whose `current_address` pass 2 has already set to this statement's
/// address).
pub fn build_instruction(
    mnemonic: &ParsedMnemonic,
    operands: &[RawOperand],
    constants: &ConstantSet<'_>,
    location: arm_asm_lexer::Location,
) -> Result<Instruction, Diagnostic> {
    let cond = mnemonic.condition;
    let flag = mnemonic.flag.as_str();
    let op_syntax = |i: usize| -> Result<&Operand, Diagnostic> {
        match operands.get(i) {
            Some(RawOperand::Syntax(op)) => Ok(op),
            _ => Err(driver_error(location, "internal: expected a syntax operand")),
        }
    };
    let op_register = |i: usize| expect_register(operands.get(i).ok_or_else(|| driver_error(location, "missing operand"))?, location);
    let op_expr = |i: usize| expect_expr(operands.get(i).ok_or_else(|| driver_error(location, "missing operand"))?, location);

    match mnemonic.stem {
        Stem::Alu(op) if matches!(op, arm_cpu::AluOp::Mov | arm_cpu::AluOp::Mvn) => {
            let rd = op_register(0)?;
            let operand2 = build_operand2(op_syntax(1)?, constants, location)?;
            Ok(Instruction::CoreAlu { cond, op, set_flags: flag == "S", rn: 0, rd, operand2 })
        }
        Stem::Alu(op) => {
            let rd = op_register(0)?;
            let rn = op_register(1)?;
            let operand2 = build_operand2(op_syntax(2)?, constants, location)?;
            Ok(Instruction::CoreAlu { cond, op, set_flags: flag == "S", rn, rd, operand2 })
        }
        Stem::Cmp(op) => {
            let rn = op_register(0)?;
            let operand2 = build_operand2(op_syntax(1)?, constants, location)?;
            Ok(Instruction::CoreCompare { cond, op, rn, operand2, result_to_psr: flag == "P" })
        }
        Stem::Mul => {
            let rd = op_register(0)?;
            let rm = op_register(1)?;
            let rs = op_register(2)?;
            Ok(Instruction::CoreMultiply { cond, set_flags: flag == "S", accumulate: false, rd, rn: 0, rs, rm })
        }
        Stem::Mla => {
            let rd = op_register(0)?;
            let rm = op_register(1)?;
            let rs = op_register(2)?;
            let rn = op_register(3)?;
            Ok(Instruction::CoreMultiply { cond, set_flags: flag == "S", accumulate: true, rd, rn, rs, rm })
        }
        Stem::Umull | Stem::Umlal | Stem::Smull | Stem::Smlal => {
            let rdlo = op_register(0)?;
            let rdhi = op_register(1)?;
            let rm = op_register(2)?;
            let rs = op_register(3)?;
            let signed = matches!(mnemonic.stem, Stem::Smull | Stem::Smlal);
            let accumulate = matches!(mnemonic.stem, Stem::Umlal | Stem::Smlal);
            Ok(Instruction::LongMultiply { cond, set_flags: flag == "S", signed, accumulate, rdhi, rdlo, rs, rm })
        }
        Stem::Ldr | Stem::Str => {
            let rd = op_register(0)?;
            let width = match flag {
                "B" => TransferWidth::Byte,
                "H" => TransferWidth::Halfword,
                "SB" => TransferWidth::SignedByte,
                "SH" => TransferWidth::SignedHalfword,
                _ => TransferWidth::Word,
            };
            let address = build_address(op_syntax(1)?, constants, location)?;
            Ok(Instruction::CoreDataTransfer { cond, load: matches!(mnemonic.stem, Stem::Ldr), width, rd, address })
        }
        Stem::Ldm | Stem::Stm => {
            let RawOperand::RegisterBang { reg: rn, writeback } = &operands[0] else {
                return Err(driver_error(location, "internal: expected Rn! operand"));
            };
            let (rn, writeback) = (*rn, *writeback);
            let Operand::RegisterList { mask, user_bank } = op_syntax(1)? else {
                return Err(driver_error(location, "expected a register list"));
            };
            Ok(Instruction::CoreMultiTransfer {
                cond,
                load: matches!(mnemonic.stem, Stem::Ldm),
                direction: block_direction(mnemonic.stem, flag),
                user_bank: *user_bank,
                writeback,
                rn,
                register_list: *mask,
            })
        }
        Stem::B | Stem::Bl => {
            let target = eval_bits32(op_expr(0)?, constants)?;
            let pc = constants.current_address.wrapping_add(8);
            let offset = (target as i64) - (pc as i64);
            let offset = i32::try_from(offset).map_err(|_| driver_error(location, "branch target is out of range"))?;
            if offset % 4 != 0 {
                return Err(driver_error(location, "branch target is not word-aligned"));
            }
            Ok(Instruction::Branch { cond, link: matches!(mnemonic.stem, Stem::Bl), offset })
        }
        Stem::Bx => Ok(Instruction::BranchExchange { cond, rm: op_register(0)? }),
        Stem::Swi => Ok(Instruction::SoftwareIrq { cond, comment: eval_bits32(op_expr(0)?, constants)? }),
        Stem::Bkpt => {
            if cond != Condition::Al {
                return Err(driver_error(location, "BKPT does not accept a condition code"));
            }
            let immediate = eval_unsigned(op_expr(0)?, constants, 16, "a BKPT immediate")?;
            Ok(Instruction::Breakpoint { immediate: immediate as u16 })
        }
        Stem::Swp => {
            let rd = op_register(0)?;
            let rm = op_register(1)?;
            let Operand::Address(mem) = op_syntax(2)? else {
                return Err(driver_error(location, "expected [Rn]"));
            };
            if mem.offset.is_some() {
                return Err(driver_error(location, "SWP takes no address offset"));
            }
            Ok(Instruction::AtomicSwap { cond, byte: flag == "B", rn: mem.rn, rd, rm })
        }
        Stem::Mrs => {
            let rd = op_register(0)?;
            let Operand::Psr { is_spsr, .. } = op_syntax(1)? else {
                return Err(driver_error(location, "expected a PSR operand"));
            };
            Ok(Instruction::MoveFromPsr { cond, source: if *is_spsr { PsrSource::Spsr } else { PsrSource::Cpsr }, rd })
        }
        Stem::Msr => {
            let Operand::Psr { is_spsr, mask } = op_syntax(0)? else {
                return Err(driver_error(location, "expected a PSR operand"));
            };
            let mask = mask.unwrap_or(PsrFieldMask { flags: true, status: true, extension: true, control: true });
            let operand = build_operand2(op_syntax(1)?, constants, location)?;
            Ok(Instruction::MoveToPsr { cond, source: if *is_spsr { PsrSource::Spsr } else { PsrSource::Cpsr }, mask, operand })
        }
        Stem::Cdp => {
            let cp_num = eval_unsigned(op_expr(0)?, constants, 4, "a coprocessor number")? as u8;
            let cp_opcode = eval_unsigned(op_expr(1)?, constants, 4, "a coprocessor opcode")? as u8;
            let crd = eval_unsigned(op_expr(2)?, constants, 4, "a coprocessor register")? as u8;
            let crn = eval_unsigned(op_expr(3)?, constants, 4, "a coprocessor register")? as u8;
            let crm = eval_unsigned(op_expr(4)?, constants, 4, "a coprocessor register")? as u8;
            let cp_info = eval_unsigned(op_expr(5)?, constants, 3, "a coprocessor info field")? as u8;
            Ok(Instruction::CoProcDataProcessing { cond, cp_num, cp_opcode, crd, crn, crm, cp_info })
        }
        Stem::Mcr | Stem::Mrc => {
            let cp_num = eval_unsigned(op_expr(0)?, constants, 4, "a coprocessor number")? as u8;
            let cp_opcode = eval_unsigned(op_expr(1)?, constants, 3, "a coprocessor opcode")? as u8;
            let rd = op_register(2)?;
            let crn = eval_unsigned(op_expr(3)?, constants, 4, "a coprocessor register")? as u8;
            let crm = eval_unsigned(op_expr(4)?, constants, 4, "a coprocessor register")? as u8;
            let cp_info = eval_unsigned(op_expr(5)?, constants, 3, "a coprocessor info field")? as u8;
            Ok(Instruction::CoProcRegisterTransfer { cond, to_coprocessor: matches!(mnemonic.stem, Stem::Mcr), cp_num, cp_opcode, rd, crn, crm, cp_info })
        }
        Stem::Ldc | Stem::Stc => {
            let cp_num = eval_unsigned(op_expr(0)?, constants, 4, "a coprocessor number")? as u8;
            let crd = eval_unsigned(op_expr(1)?, constants, 4, "a coprocessor register")? as u8;
            let address = build_address(op_syntax(2)?, constants, location)?;
            Ok(Instruction::CoProcDataTransfer { cond, load: matches!(mnemonic.stem, Stem::Ldc), long: flag == "L", writeback: address.writeback, cp_num, crd, address })
        }
        Stem::Adr => unreachable!("ADR is built by adr::build_adr, not build_instruction"),
    }
}
