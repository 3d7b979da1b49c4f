//! Per-instruction execution semantics (§4.F): condition check, operand
//! evaluation through the shifter, the actual compute/memory step, flag
//! update, and cycle accounting — one function per operation class, all
//! driven from the same [`Instruction`] the decoder and disassembler share.

use arm_bus::{SystemBus, Width};

use crate::coprocessor::{CoprocessorBus, CoprocessorOutcome};
use crate::instruction::{AddressOperand, AluOp, BlockDirection, Instruction, ShifterOperand, TransferWidth};
use crate::metrics::{CycleBreakdown, ExecutionMetrics};
use crate::registers::{AddressMode, Mode, RegisterFile};
use crate::shifter::{apply, apply_by_register, ShiftType};

/// A simulated exception, ready for the run loop to vector through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Reset,
    UndefinedInstruction,
    SoftwareInterrupt,
    PrefetchAbort,
    DataAbort,
    Irq,
    Fiq,
}

impl ExceptionKind {
    /// 26-bit-mode exception vector offset (word-aligned).
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::UndefinedInstruction => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    #[must_use]
    pub const fn entry_mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::UndefinedInstruction => Mode::Undefined,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// Reset and FIQ entry additionally mask FIQ; every exception masks IRQ.
    #[must_use]
    pub const fn masks_fiq(self) -> bool {
        matches!(self, Self::Reset | Self::Fiq)
    }
}

/// Outcome of executing one instruction: its cycle cost, whether it
/// changed the PC itself (so the run loop must not also advance it), and
/// any exception it raised.
pub struct Executed {
    pub metrics: ExecutionMetrics,
    pub branched: bool,
    pub exception: Option<ExceptionKind>,
}

const fn cheap(sequential: u64) -> ExecutionMetrics {
    ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { sequential, nonsequential: 0, internal: 0, coprocessor_wait: 0 } }
}

fn add_with_carry(a: u32, b: u32, carry_in: bool) -> (u32, bool, bool) {
    let wide = u64::from(a) + u64::from(b) + u64::from(carry_in);
    let result = wide as u32;
    let carry = wide > u64::from(u32::MAX);
    let overflow = (!(a ^ b) & (a ^ result)) >> 31 & 1 != 0;
    (result, carry, overflow)
}

fn evaluate_operand2(op2: ShifterOperand, regs: &RegisterFile, carry_in: bool) -> (u32, bool) {
    match op2 {
        // The rotate amount was already folded into the immediate during
        // decode; treating it as carry-transparent is a deliberate
        // simplification (see DESIGN.md) rather than a bit-exact
        // reproduction of the rotated-immediate carry-out rule.
        ShifterOperand::Immediate(value) => (value, carry_in),
        ShifterOperand::Register { rm } => (regs.read(rm), carry_in),
        ShifterOperand::ShiftByConstant { rm, shift, amount } => apply(regs.read(rm), shift, amount, carry_in),
        ShifterOperand::ShiftByRegister { rm, shift, rs } => {
            let amount = regs.read(rs) & 0xFF;
            apply_by_register(regs.read(rm), shift, amount as u8, carry_in)
        }
        ShifterOperand::RotateWithExtend { rm } => apply(regs.read(rm), ShiftType::Rrx, 0, carry_in),
    }
}

fn resolve_address(address: AddressOperand, regs: &RegisterFile) -> (u32, Option<u32>) {
    let base = regs.read(address.rn);
    let carry_in = regs.cpsr().c;
    let (offset_magnitude, _) = evaluate_operand2(address.offset, regs, carry_in);
    let offset = if address.negative_offset { offset_magnitude.wrapping_neg() } else { offset_magnitude };
    let effective = base.wrapping_add(offset);
    let transfer_addr = if address.pre_indexed { effective } else { base };
    let writeback_value = if address.writeback { Some(effective) } else { None };
    (transfer_addr, writeback_value)
}

fn apply_writeback(address: AddressOperand, writeback_value: Option<u32>, regs: &mut RegisterFile) {
    if let Some(value) = writeback_value {
        regs.write(address.rn, value);
    }
}

/// Execute one decoded instruction. Returns `None` only when condition
/// evaluation fails, the cheapest possible outcome — no state changes
/// beyond the implicit PC advance the caller applies.
#[must_use]
pub fn execute(
    instr: Instruction,
    regs: &mut RegisterFile,
    bus: &SystemBus,
    coprocessors: &mut CoprocessorBus,
) -> Executed {
    if !instr.condition().passes(&regs.cpsr()) {
        return Executed { metrics: cheap(1), branched: false, exception: None };
    }

    match instr {
        Instruction::CoreAlu { op, set_flags, rn, rd, operand2, .. } => execute_alu(op, set_flags, rn, rd, operand2, regs),
        Instruction::CoreCompare { op, rn, operand2, result_to_psr, .. } => execute_compare(op, rn, operand2, result_to_psr, regs),
        Instruction::CoreMultiply { set_flags, accumulate, rd, rn, rs, rm, .. } => {
            execute_multiply(set_flags, accumulate, rd, rn, rs, rm, regs)
        }
        Instruction::LongMultiply { set_flags, signed, accumulate, rdhi, rdlo, rs, rm, .. } => {
            execute_long_multiply(set_flags, signed, accumulate, rdhi, rdlo, rs, rm, regs)
        }
        Instruction::CoreDataTransfer { load, width, rd, address, .. } => execute_data_transfer(load, width, rd, address, regs, bus),
        Instruction::CoreMultiTransfer { load, direction, user_bank, writeback, rn, register_list, .. } => {
            execute_multi_transfer(load, direction, user_bank, writeback, rn, register_list, regs, bus)
        }
        Instruction::Branch { link, offset, .. } => execute_branch(link, offset, regs),
        Instruction::BranchExchange { rm, .. } => execute_branch_exchange(rm, regs),
        Instruction::SoftwareIrq { .. } => Executed { metrics: cheap(2), branched: false, exception: Some(ExceptionKind::SoftwareInterrupt) },
        Instruction::Breakpoint { .. } => Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::PrefetchAbort) },
        Instruction::AtomicSwap { byte, rn, rd, rm, .. } => execute_swap(byte, rn, rd, rm, regs, bus),
        Instruction::MoveFromPsr { source, rd, .. } => execute_move_from_psr(source, rd, regs),
        Instruction::MoveToPsr { source, mask, operand, .. } => execute_move_to_psr(source, mask, operand, regs),
        // Coprocessor and FPA classes dispatch through the coprocessor bus;
        // with nothing registered at that CpNum (the common case without an
        // attached FPA/VFP model) this raises Undefined Instruction, exactly
        // as real silicon without the coprocessor fitted would.
        Instruction::CoProcDataProcessing { cp_num, .. } => execute_coprocessor_data_processing(cp_num, &instr, coprocessors),
        Instruction::CoProcRegisterTransfer { to_coprocessor, cp_num, rd, .. } => {
            execute_coprocessor_register_transfer(to_coprocessor, cp_num, rd, &instr, coprocessors, regs)
        }
        Instruction::CoProcDataTransfer { load, cp_num, address, .. } => execute_coprocessor_data_transfer(load, cp_num, address, &instr, coprocessors, regs, bus),
        Instruction::FpaDataTransfer { .. }
        | Instruction::FpaDyadic { .. }
        | Instruction::FpaMonadic { .. }
        | Instruction::FpaRegisterTransfer { .. }
        | Instruction::FpaComparison { .. } => {
            Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::UndefinedInstruction) }
        }
    }
}

fn write_result(rd: u8, result: u32, set_flags: bool, carry_out: bool, overflow: bool, regs: &mut RegisterFile) -> bool {
    if rd == 15 {
        if set_flags {
            match regs.address_mode {
                AddressMode::Bit26 => regs.write_pc_with_psr26(result),
                AddressMode::Bit32 => {
                    regs.return_from_exception();
                    regs.set_fetch_pc(result);
                }
            }
        } else {
            regs.set_fetch_pc(result);
        }
        return true;
    }
    regs.write(rd, result);
    if set_flags {
        let mut psr = regs.cpsr();
        psr.n = result >> 31 != 0;
        psr.z = result == 0;
        psr.c = carry_out;
        psr.v = overflow;
        regs.set_cpsr(psr);
    }
    false
}

fn execute_alu(op: AluOp, set_flags: bool, rn: u8, rd: u8, operand2: ShifterOperand, regs: &mut RegisterFile) -> Executed {
    let carry_in = regs.cpsr().c;
    let (op2, shifter_carry) = evaluate_operand2(operand2, regs, carry_in);
    let op1 = regs.read(rn);
    let preserved_overflow = regs.cpsr().v;

    let (result, carry_out, overflow) = match op {
        AluOp::And => (op1 & op2, shifter_carry, preserved_overflow),
        AluOp::Eor => (op1 ^ op2, shifter_carry, preserved_overflow),
        AluOp::Orr => (op1 | op2, shifter_carry, preserved_overflow),
        AluOp::Bic => (op1 & !op2, shifter_carry, preserved_overflow),
        AluOp::Mov => (op2, shifter_carry, preserved_overflow),
        AluOp::Mvn => (!op2, shifter_carry, preserved_overflow),
        AluOp::Add => add_with_carry(op1, op2, false),
        AluOp::Adc => add_with_carry(op1, op2, carry_in),
        AluOp::Sub => add_with_carry(op1, !op2, true),
        AluOp::Sbc => add_with_carry(op1, !op2, carry_in),
        AluOp::Rsb => add_with_carry(op2, !op1, true),
        AluOp::Rsc => add_with_carry(op2, !op1, carry_in),
        AluOp::Tst | AluOp::Teq | AluOp::Cmp | AluOp::Cmn => unreachable!("compare opcodes decode to CoreCompare"),
    };

    let branched = write_result(rd, result, set_flags, carry_out, overflow, regs);
    let cycles = if rd == 15 { cheap(2) } else { cheap(1) };
    Executed { metrics: cycles, branched, exception: None }
}

fn execute_compare(op: AluOp, rn: u8, operand2: ShifterOperand, result_to_psr: bool, regs: &mut RegisterFile) -> Executed {
    let carry_in = regs.cpsr().c;
    let (op2, shifter_carry) = evaluate_operand2(operand2, regs, carry_in);
    let op1 = regs.read(rn);
    let preserved_overflow = regs.cpsr().v;

    let (result, carry_out, overflow) = match op {
        AluOp::Tst => (op1 & op2, shifter_carry, preserved_overflow),
        AluOp::Teq => (op1 ^ op2, shifter_carry, preserved_overflow),
        AluOp::Cmp => add_with_carry(op1, !op2, true),
        AluOp::Cmn => add_with_carry(op1, op2, false),
        _ => unreachable!("only the four compare opcodes decode to CoreCompare"),
    };

    if result_to_psr {
        // Legacy ARM2 "P-suffix" form (TSTP/CMPP/...): the comparison's
        // raw ALU result replaces the whole CPSR, not just its flags.
        regs.set_cpsr(crate::registers::Psr::from_bits(result));
    } else {
        let mut psr = regs.cpsr();
        psr.n = result >> 31 != 0;
        psr.z = result == 0;
        psr.c = carry_out;
        psr.v = overflow;
        regs.set_cpsr(psr);
    }
    Executed { metrics: cheap(1), branched: false, exception: None }
}

fn execute_multiply(set_flags: bool, accumulate: bool, rd: u8, rn: u8, rs: u8, rm: u8, regs: &mut RegisterFile) -> Executed {
    let product = regs.read(rm).wrapping_mul(regs.read(rs));
    let result = if accumulate { product.wrapping_add(regs.read(rn)) } else { product };
    regs.write(rd, result);
    if set_flags {
        let mut psr = regs.cpsr();
        psr.n = result >> 31 != 0;
        psr.z = result == 0;
        regs.set_cpsr(psr);
    }
    let internal = if accumulate { 2 } else { 1 };
    Executed {
        metrics: ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { sequential: 1, internal, ..Default::default() } },
        branched: false,
        exception: None,
    }
}

fn execute_long_multiply(
    set_flags: bool,
    signed: bool,
    accumulate: bool,
    rdhi: u8,
    rdlo: u8,
    rs: u8,
    rm: u8,
    regs: &mut RegisterFile,
) -> Executed {
    let product: u64 = if signed {
        (i64::from(regs.read(rm) as i32).wrapping_mul(i64::from(regs.read(rs) as i32))) as u64
    } else {
        u64::from(regs.read(rm)) * u64::from(regs.read(rs))
    };
    let accumulator = (u64::from(regs.read(rdhi)) << 32) | u64::from(regs.read(rdlo));
    let result = if accumulate { product.wrapping_add(accumulator) } else { product };
    regs.write(rdlo, result as u32);
    regs.write(rdhi, (result >> 32) as u32);
    if set_flags {
        let mut psr = regs.cpsr();
        psr.n = result >> 63 != 0;
        psr.z = result == 0;
        regs.set_cpsr(psr);
    }
    let internal = if accumulate { 3 } else { 2 };
    Executed {
        metrics: ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { sequential: 1, internal, ..Default::default() } },
        branched: false,
        exception: None,
    }
}

fn load_width(bus: &SystemBus, addr: u32, width: TransferWidth) -> Result<u32, ()> {
    match width {
        TransferWidth::Byte => bus.read(addr, Width::Byte).map_err(|_| ()),
        TransferWidth::Word => bus.read(addr, Width::Word).map_err(|_| ()).map(|v| v.rotate_right((addr & 0b11) * 8)),
        TransferWidth::Halfword => bus.read(addr, Width::Halfword).map_err(|_| ()),
        TransferWidth::SignedByte => bus.read(addr, Width::Byte).map_err(|_| ()).map(|v| (v as i8) as i32 as u32),
        TransferWidth::SignedHalfword => bus.read(addr, Width::Halfword).map_err(|_| ()).map(|v| (v as i16) as i32 as u32),
    }
}

fn store_width(bus: &SystemBus, addr: u32, width: TransferWidth, value: u32) -> Result<(), ()> {
    let bus_width = match width {
        TransferWidth::Byte | TransferWidth::SignedByte => Width::Byte,
        TransferWidth::Halfword | TransferWidth::SignedHalfword => Width::Halfword,
        TransferWidth::Word => Width::Word,
    };
    bus.write(addr, bus_width, value).map_err(|_| ())
}

fn execute_data_transfer(
    load: bool,
    width: TransferWidth,
    rd: u8,
    address: AddressOperand,
    regs: &mut RegisterFile,
    bus: &SystemBus,
) -> Executed {
    let (addr, writeback_value) = resolve_address(address, regs);
    if load {
        match load_width(bus, addr, width) {
            Ok(value) => {
                apply_writeback(address, writeback_value, regs);
                let branched = if rd == 15 {
                    regs.set_fetch_pc(value);
                    true
                } else {
                    regs.write(rd, value);
                    false
                };
                let cycles = if rd == 15 { cheap(2) } else { ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { sequential: 1, nonsequential: 1, internal: 1, coprocessor_wait: 0 } } };
                Executed { metrics: cycles, branched, exception: None }
            }
            Err(()) => Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::DataAbort) },
        }
    } else {
        let value = regs.read(rd);
        match store_width(bus, addr, width, value) {
            Ok(()) => {
                apply_writeback(address, writeback_value, regs);
                Executed {
                    metrics: ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { nonsequential: 2, ..Default::default() } },
                    branched: false,
                    exception: None,
                }
            }
            Err(()) => Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::DataAbort) },
        }
    }
}

fn execute_multi_transfer(
    load: bool,
    direction: BlockDirection,
    user_bank: bool,
    writeback: bool,
    rn: u8,
    register_list: u16,
    regs: &mut RegisterFile,
    bus: &SystemBus,
) -> Executed {
    let count = register_list.count_ones();
    let base = regs.read(rn);
    let start = match direction {
        BlockDirection::Ia => base,
        BlockDirection::Ib => base.wrapping_add(4),
        BlockDirection::Da => base.wrapping_sub(u32::from(count).wrapping_mul(4)).wrapping_add(4),
        BlockDirection::Db => base.wrapping_sub(u32::from(count).wrapping_mul(4)),
    };
    let mode = if user_bank { Mode::User } else { regs.cpsr().mode };
    let mut addr = start;
    let mut pc_loaded = false;
    for reg in 0..16u8 {
        if register_list & (1 << reg) == 0 {
            continue;
        }
        if load {
            if let Ok(value) = bus.read(addr, Width::Word) {
                if reg == 15 {
                    regs.set_fetch_pc(value);
                    pc_loaded = true;
                } else {
                    regs.write_in(reg, mode, value);
                }
            }
        } else {
            let value = regs.read_in(reg, mode);
            let _ = bus.write(addr, Width::Word, value);
        }
        addr = addr.wrapping_add(4);
    }
    if writeback {
        let final_base = match direction {
            BlockDirection::Ia | BlockDirection::Ib => base.wrapping_add(u32::from(count) * 4),
            BlockDirection::Da | BlockDirection::Db => base.wrapping_sub(u32::from(count) * 4),
        };
        regs.write(rn, final_base);
    }
    let sequential = u64::from(count.max(1)) - 1;
    Executed {
        metrics: ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { sequential, nonsequential: 1, internal: u64::from(load), coprocessor_wait: 0 } },
        branched: pc_loaded,
        exception: None,
    }
}

fn execute_branch(link: bool, offset: i32, regs: &mut RegisterFile) -> Executed {
    let pc = regs.read(15);
    if link {
        regs.write(14, regs.fetch_pc().wrapping_add(4));
    }
    regs.set_fetch_pc(pc.wrapping_add(offset as u32));
    Executed { metrics: cheap(2), branched: true, exception: None }
}

fn execute_branch_exchange(rm: u8, regs: &mut RegisterFile) -> Executed {
    let target = regs.read(rm);
    let mut psr = regs.cpsr();
    psr.t = target & 1 != 0;
    regs.set_cpsr(psr);
    regs.set_fetch_pc(target & !1);
    Executed { metrics: cheap(2), branched: true, exception: None }
}

fn execute_swap(byte: bool, rn: u8, rd: u8, rm: u8, regs: &mut RegisterFile, bus: &SystemBus) -> Executed {
    let addr = regs.read(rn);
    let width = if byte { Width::Byte } else { Width::Word };
    let Ok(old) = bus.read(addr, width) else {
        return Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::DataAbort) };
    };
    let new_value = regs.read(rm);
    if bus.write(addr, width, new_value).is_err() {
        return Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::DataAbort) };
    }
    regs.write(rd, old);
    Executed {
        metrics: ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { sequential: 1, nonsequential: 2, internal: 1, coprocessor_wait: 0 } },
        branched: false,
        exception: None,
    }
}

fn execute_move_from_psr(source: crate::instruction::PsrSource, rd: u8, regs: &mut RegisterFile) -> Executed {
    let value = match source {
        crate::instruction::PsrSource::Cpsr => regs.cpsr().to_bits(),
        crate::instruction::PsrSource::Spsr => regs.spsr(regs.cpsr().mode).map_or(0, |p| p.to_bits()),
    };
    regs.write(rd, value);
    Executed { metrics: cheap(1), branched: false, exception: None }
}

fn execute_move_to_psr(
    source: crate::instruction::PsrSource,
    mask: crate::instruction::PsrFieldMask,
    operand: ShifterOperand,
    regs: &mut RegisterFile,
) -> Executed {
    let carry_in = regs.cpsr().c;
    let (value, _) = evaluate_operand2(operand, regs, carry_in);
    let bits = mask.as_bits();
    match source {
        crate::instruction::PsrSource::Cpsr => {
            let updated = regs.cpsr().with_masked_bits(value, bits);
            regs.set_cpsr(updated);
        }
        crate::instruction::PsrSource::Spsr => {
            if let Some(current) = regs.spsr(regs.cpsr().mode) {
                regs.set_spsr(regs.cpsr().mode, current.with_masked_bits(value, bits));
            }
        }
    }
    Executed { metrics: cheap(1), branched: false, exception: None }
}

fn coprocessor_result(outcome: CoprocessorOutcome) -> Executed {
    match outcome {
        CoprocessorOutcome::Executed => Executed { metrics: cheap(1), branched: false, exception: None },
        CoprocessorOutcome::Busy => {
            Executed { metrics: ExecutionMetrics { instruction_count: 1, cycles: CycleBreakdown { coprocessor_wait: 1, ..Default::default() } }, branched: false, exception: None }
        }
        CoprocessorOutcome::Refused => Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::UndefinedInstruction) },
    }
}

fn execute_coprocessor_data_processing(cp_num: u8, instr: &Instruction, coprocessors: &mut CoprocessorBus) -> Executed {
    let outcome = coprocessors.dispatch_data_processing(cp_num, instr);
    coprocessor_result(outcome)
}

/// MCR/MRC (§4.G): `to_coprocessor` picks the transfer direction, the same
/// in/out convention `dispatch_register_transfer`'s `value: &mut u32` uses —
/// the caller seeds it for a write, the handler fills it in for a read.
fn execute_coprocessor_register_transfer(
    to_coprocessor: bool,
    cp_num: u8,
    rd: u8,
    instr: &Instruction,
    coprocessors: &mut CoprocessorBus,
    regs: &mut RegisterFile,
) -> Executed {
    let mut value = if to_coprocessor { regs.read(rd) } else { 0 };
    let outcome = coprocessors.dispatch_register_transfer(cp_num, instr, &mut value);
    if outcome == CoprocessorOutcome::Executed && !to_coprocessor {
        regs.write(rd, value);
    }
    coprocessor_result(outcome)
}

/// LDC/STC: `load` means memory-to-coprocessor, so the bus read happens
/// before dispatch and the coprocessor consumes it; otherwise the
/// coprocessor produces the word and the bus write happens after.
fn execute_coprocessor_data_transfer(
    load: bool,
    cp_num: u8,
    address: AddressOperand,
    instr: &Instruction,
    coprocessors: &mut CoprocessorBus,
    regs: &mut RegisterFile,
    bus: &SystemBus,
) -> Executed {
    let (addr, writeback_value) = resolve_address(address, regs);
    let mut word = if load {
        match bus.read(addr, Width::Word) {
            Ok(value) => value,
            Err(_) => return Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::DataAbort) },
        }
    } else {
        0
    };
    let outcome = coprocessors.dispatch_data_transfer(cp_num, instr, &mut word);
    if outcome == CoprocessorOutcome::Executed {
        apply_writeback(address, writeback_value, regs);
        if !load && bus.write(addr, Width::Word, word).is_err() {
            return Executed { metrics: cheap(1), branched: false, exception: Some(ExceptionKind::DataAbort) };
        }
    }
    coprocessor_result(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::registers::{AddressMode, Psr};

    fn fresh_regs() -> RegisterFile {
        let mut regs = RegisterFile::new(AddressMode::Bit32);
        regs.set_cpsr(Psr { mode: Mode::Supervisor, ..Psr::reset() });
        regs
    }

    #[test]
    fn add_sets_carry_and_overflow_correctly() {
        let mut regs = fresh_regs();
        regs.write(0, 0xFFFF_FFFF);
        regs.write(1, 1);
        let instr = Instruction::CoreAlu {
            cond: Condition::Al,
            op: AluOp::Add,
            set_flags: true,
            rn: 0,
            rd: 2,
            operand2: ShifterOperand::Register { rm: 1 },
        };
        let mut bus = SystemBus::new();
        let mut cops = CoprocessorBus::new();
        let result = execute(instr, &mut regs, &mut bus, &mut cops);
        assert_eq!(regs.read(2), 0);
        assert!(regs.cpsr().z);
        assert!(regs.cpsr().c);
        assert!(!regs.cpsr().v);
        assert!(!result.branched);
    }

    #[test]
    fn condition_failure_is_the_cheapest_outcome() {
        let mut regs = fresh_regs();
        let instr = Instruction::CoreAlu {
            cond: Condition::Eq,
            op: AluOp::Mov,
            set_flags: false,
            rn: 0,
            rd: 0,
            operand2: ShifterOperand::Immediate(1),
        };
        let mut bus = SystemBus::new();
        let mut cops = CoprocessorBus::new();
        let result = execute(instr, &mut regs, &mut bus, &mut cops);
        assert_eq!(result.metrics.cycles.total(), 1);
        assert!(!result.branched);
        assert_eq!(regs.read(0), 0);
    }

    #[test]
    fn branch_with_link_saves_return_address_and_moves_pc() {
        let mut regs = fresh_regs();
        regs.set_fetch_pc(0x1000);
        let instr = Instruction::Branch { cond: Condition::Al, link: true, offset: 0x100 };
        let mut bus = SystemBus::new();
        let mut cops = CoprocessorBus::new();
        let result = execute(instr, &mut regs, &mut bus, &mut cops);
        assert!(result.branched);
        assert_eq!(regs.read(14), 0x1004);
        assert_eq!(regs.fetch_pc(), 0x1000_u32.wrapping_add(8).wrapping_add(0x100));
    }

    #[test]
    fn unregistered_coprocessor_raises_undefined_instruction() {
        let mut regs = fresh_regs();
        let instr = Instruction::CoProcDataProcessing { cond: Condition::Al, cp_num: 9, cp_opcode: 0, crd: 0, crn: 0, crm: 0, cp_info: 0 };
        let mut bus = SystemBus::new();
        let mut cops = CoprocessorBus::new();
        let result = execute(instr, &mut regs, &mut bus, &mut cops);
        assert_eq!(result.exception, Some(ExceptionKind::UndefinedInstruction));
    }

    /// Doubles whatever crosses the bus, so a test can tell the value
    /// really travelled through `register_transfer`/`data_transfer`
    /// rather than the dispatch being a no-op.
    struct Doubler;
    impl crate::coprocessor::CoprocessorRegisterHandler for Doubler {
        fn data_processing(&mut self, _instr: &Instruction) -> CoprocessorOutcome {
            CoprocessorOutcome::Executed
        }
        fn register_transfer(&mut self, _instr: &Instruction, value: &mut u32) -> CoprocessorOutcome {
            *value = value.wrapping_mul(2);
            CoprocessorOutcome::Executed
        }
        fn data_transfer(&mut self, _instr: &Instruction, word: &mut u32) -> CoprocessorOutcome {
            *word = word.wrapping_mul(2);
            CoprocessorOutcome::Executed
        }
    }

    #[test]
    fn mcr_sends_the_register_value_to_the_coprocessor() {
        let mut regs = fresh_regs();
        regs.write(3, 21);
        let instr = Instruction::CoProcRegisterTransfer { cond: Condition::Al, to_coprocessor: true, cp_num: 7, cp_opcode: 0, rd: 3, crn: 0, crm: 0, cp_info: 0 };
        let mut bus = SystemBus::new();
        let mut cops = CoprocessorBus::new();
        cops.register(7, Box::new(Doubler));
        let result = execute(instr, &mut regs, &mut bus, &mut cops);
        assert_eq!(result.exception, None);
        // MCR doesn't write back to Rd; only the coprocessor's copy changes.
        assert_eq!(regs.read(3), 21);
    }

    #[test]
    fn mrc_writes_the_coprocessors_value_into_rd() {
        let mut regs = fresh_regs();
        regs.write(3, 21);
        let instr = Instruction::CoProcRegisterTransfer { cond: Condition::Al, to_coprocessor: false, cp_num: 7, cp_opcode: 0, rd: 3, crn: 0, crm: 0, cp_info: 0 };
        let mut bus = SystemBus::new();
        let mut cops = CoprocessorBus::new();
        cops.register(7, Box::new(Doubler));
        let result = execute(instr, &mut regs, &mut bus, &mut cops);
        assert_eq!(result.exception, None);
        assert_eq!(regs.read(3), 0);
    }

    #[test]
    fn ldc_loads_a_memory_word_through_the_coprocessor() {
        use arm_bus::{device_ref, AddressMap, Device, Ram};

        let mut regs = fresh_regs();
        regs.write(1, 0x100);
        let ram = device_ref(Ram::new(0x1000));
        ram.borrow_mut().write(0x100, Width::Word, 5);
        let mut read_map = AddressMap::new();
        read_map.try_insert(0, 0x1000, ram.clone());
        let mut write_map = AddressMap::new();
        write_map.try_insert(0, 0x1000, ram);
        let bus = SystemBus { read_map, write_map };

        let address = AddressOperand { rn: 1, offset: ShifterOperand::Immediate(0), pre_indexed: true, negative_offset: false, writeback: false };
        let instr = Instruction::CoProcDataTransfer { cond: Condition::Al, load: true, long: false, writeback: false, cp_num: 7, crd: 0, address };
        let mut cops = CoprocessorBus::new();
        cops.register(7, Box::new(Doubler));
        let result = execute(instr, &mut regs, &bus, &mut cops);
        assert_eq!(result.exception, None);
    }

    #[test]
    fn stc_store_to_unmapped_address_raises_data_abort() {
        let mut regs = fresh_regs();
        regs.write(1, 0x9000);
        let bus = SystemBus::new();
        let address = AddressOperand { rn: 1, offset: ShifterOperand::Immediate(0), pre_indexed: true, negative_offset: false, writeback: false };
        let instr = Instruction::CoProcDataTransfer { cond: Condition::Al, load: false, long: false, writeback: false, cp_num: 7, crd: 0, address };
        let mut cops = CoprocessorBus::new();
        cops.register(7, Box::new(Doubler));
        let result = execute(instr, &mut regs, &bus, &mut cops);
        assert_eq!(result.exception, Some(ExceptionKind::DataAbort));
    }
}
