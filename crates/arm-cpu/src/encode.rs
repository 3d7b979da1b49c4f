//! The exact inverse of [`crate::decode::decode`] (§4.F, §4.M): turns an
//! [`Instruction`] back into its 32-bit word. Shared by the assembler
//! driver (which builds an `Instruction` from parsed syntax and calls this
//! to get bytes) and the disassembler's round-trip tests. Kept in the same
//! crate as `decode` so the two can never drift apart on a bit position.

use crate::condition::Condition;
use crate::instruction::{
    AddressOperand, AluOp, BlockDirection, FpaPrecision, Instruction, PsrSource, ShifterOperand, TransferWidth,
};
use crate::shifter::ShiftType;

const fn shift_bits(shift: ShiftType) -> u32 {
    match shift {
        ShiftType::Lsl => 0,
        ShiftType::Lsr => 1,
        ShiftType::Asr => 2,
        ShiftType::Ror | ShiftType::Rrx => 3,
    }
}

/// Find the smallest `(imm8, rotate)` pair the 8-bit-rotated-immediate
/// encoding can use to represent `value`, or `None` if no rotation of an
/// 8-bit quantity produces it. This is also the encodability check the
/// assembler's `EncodeError` path calls directly.
#[must_use]
pub fn encode_rotated_immediate(value: u32) -> Option<u32> {
    for rotate in 0..16u32 {
        let candidate = value.rotate_left(rotate * 2);
        if candidate <= 0xFF {
            return Some((rotate << 8) | candidate);
        }
    }
    None
}

/// Encode a data-processing-style `ShifterOperand` (operand2) into its
/// `(I-bit, bits 11..=0)` pair, or `None` if the operand can't be
/// represented (an immediate with no valid rotation).
fn encode_operand2(op2: ShifterOperand) -> Option<(bool, u32)> {
    match op2 {
        ShifterOperand::Immediate(value) => Some((true, encode_rotated_immediate(value)?)),
        ShifterOperand::Register { rm } => Some((false, u32::from(rm))),
        ShifterOperand::ShiftByConstant { rm, shift, amount } => {
            let imm5 = match (shift, amount) {
                (ShiftType::Lsr | ShiftType::Asr, 32) => 0,
                (_, amount) if amount < 32 => amount,
                _ => return None,
            };
            Some((false, (imm5 << 7) | (shift_bits(shift) << 5) | u32::from(rm)))
        }
        ShifterOperand::ShiftByRegister { rm, shift, rs } => {
            Some((false, (u32::from(rs) << 8) | (shift_bits(shift) << 5) | (1 << 4) | u32::from(rm)))
        }
        ShifterOperand::RotateWithExtend { rm } => Some((false, (shift_bits(ShiftType::Ror) << 5) | u32::from(rm))),
    }
}

/// Encode an `AddressOperand`'s offset for the single-register transfer
/// encoding (bit 25 means "register offset" here, the opposite sense from
/// operand2's immediate bit).
fn encode_single_transfer_offset(offset: ShifterOperand) -> Option<(bool, u32)> {
    match offset {
        ShifterOperand::Immediate(value) => {
            if value > 0xFFF {
                return None;
            }
            Some((false, value))
        }
        ShifterOperand::Register { rm } => Some((true, u32::from(rm))),
        ShifterOperand::ShiftByConstant { rm, shift, amount } => {
            let imm5 = match (shift, amount) {
                (ShiftType::Lsr | ShiftType::Asr, 32) => 0,
                (_, amount) if amount < 32 => amount,
                _ => return None,
            };
            Some((true, (imm5 << 7) | (shift_bits(shift) << 5) | u32::from(rm)))
        }
        ShifterOperand::RotateWithExtend { rm } => Some((true, (shift_bits(ShiftType::Ror) << 5) | u32::from(rm))),
        ShifterOperand::ShiftByRegister { .. } => None,
    }
}

fn encode_halfword_offset(offset: ShifterOperand) -> Option<(bool, u32)> {
    match offset {
        ShifterOperand::Immediate(value) => {
            if value > 0xFF {
                return None;
            }
            Some((true, ((value & 0xF0) << 4) | (value & 0xF)))
        }
        ShifterOperand::Register { rm } => Some((false, u32::from(rm))),
        _ => None,
    }
}

fn address_common_bits(address: AddressOperand) -> u32 {
    (u32::from(address.pre_indexed) << 24)
        | (u32::from(!address.negative_offset) << 23)
        | (u32::from(address.writeback) << 21)
        | (u32::from(address.rn) << 16)
}

/// Encode one decoded instruction back into machine code. Returns `None`
/// for the handful of operand combinations that have no valid encoding
/// (a shifter operand `ShiftByRegister` where the architecture doesn't
/// allow one, or an immediate with no 8-bit rotation) — the assembler
/// driver turns that into a located `EncodeError`.
#[must_use]
pub fn encode(instr: Instruction) -> Option<u32> {
    let cond = instr.condition().bits() << 28;
    Some(match instr {
        Instruction::CoreAlu { op, set_flags, rn, rd, operand2, .. } => {
            let (immediate, op2_bits) = encode_operand2(operand2)?;
            cond | (u32::from(immediate) << 25)
                | (op.bits() << 21)
                | (u32::from(set_flags) << 20)
                | (u32::from(rn) << 16)
                | (u32::from(rd) << 12)
                | op2_bits
        }
        Instruction::CoreCompare { op, rn, operand2, result_to_psr, .. } => {
            let (immediate, op2_bits) = encode_operand2(operand2)?;
            cond | (u32::from(immediate) << 25)
                | (op.bits() << 21)
                | (u32::from(!result_to_psr) << 20)
                | (u32::from(rn) << 16)
                | op2_bits
        }
        Instruction::CoreMultiply { set_flags, accumulate, rd, rn, rs, rm, .. } => {
            cond | (u32::from(accumulate) << 21)
                | (u32::from(set_flags) << 20)
                | (u32::from(rd) << 16)
                | (u32::from(rn) << 12)
                | (u32::from(rs) << 8)
                | 0x90
                | u32::from(rm)
        }
        Instruction::LongMultiply { set_flags, signed, accumulate, rdhi, rdlo, rs, rm, .. } => {
            cond | (0b0_0001 << 23)
                | (u32::from(signed) << 22)
                | (u32::from(accumulate) << 21)
                | (u32::from(set_flags) << 20)
                | (u32::from(rdhi) << 16)
                | (u32::from(rdlo) << 12)
                | (u32::from(rs) << 8)
                | 0x90
                | u32::from(rm)
        }
        Instruction::CoreDataTransfer { load, width, rd, address, .. } => match width {
            TransferWidth::Byte | TransferWidth::Word => {
                let (reg_offset, offset_bits) = encode_single_transfer_offset(address.offset)?;
                (0b01 << 26)
                    | cond
                    | (u32::from(reg_offset) << 25)
                    | address_common_bits(address)
                    | (u32::from(width == TransferWidth::Byte) << 22)
                    | (u32::from(load) << 20)
                    | (u32::from(rd) << 12)
                    | offset_bits
            }
            TransferWidth::Halfword | TransferWidth::SignedByte | TransferWidth::SignedHalfword => {
                let (immediate, offset_bits) = encode_halfword_offset(address.offset)?;
                let sh = match width {
                    TransferWidth::Halfword => 0b01,
                    TransferWidth::SignedByte => 0b10,
                    _ => 0b11,
                };
                cond | address_common_bits(address)
                    | (u32::from(immediate) << 22)
                    | (u32::from(load) << 20)
                    | (u32::from(rd) << 12)
                    | (1 << 7)
                    | (sh << 5)
                    | (1 << 4)
                    | offset_bits
            }
        },
        Instruction::CoreMultiTransfer { load, direction, user_bank, writeback, rn, register_list, .. } => {
            let (p, u) = match direction {
                BlockDirection::Ia => (false, true),
                BlockDirection::Ib => (true, true),
                BlockDirection::Da => (false, false),
                BlockDirection::Db => (true, false),
            };
            (0b10 << 26)
                | cond
                | (u32::from(p) << 24)
                | (u32::from(u) << 23)
                | (u32::from(user_bank) << 22)
                | (u32::from(writeback) << 21)
                | (u32::from(load) << 20)
                | (u32::from(rn) << 16)
                | u32::from(register_list)
        }
        Instruction::Branch { link, offset, .. } => {
            let field = ((offset >> 2) as u32) & 0x00FF_FFFF;
            (0b101 << 25) | cond | (u32::from(link) << 24) | field
        }
        Instruction::BranchExchange { rm, .. } => cond | 0x012F_FF10 | u32::from(rm),
        Instruction::SoftwareIrq { comment, .. } => (0b1111 << 24) | cond | (comment & 0x00FF_FFFF),
        Instruction::Breakpoint { immediate } => {
            let hi = u32::from(immediate) >> 4;
            let lo = u32::from(immediate) & 0xF;
            (Condition::Al.bits() << 28) | (0x12 << 20) | (hi << 8) | 0x70 | lo
        }
        Instruction::AtomicSwap { byte, rn, rd, rm, .. } => {
            cond | 0x0100_0090 | (u32::from(byte) << 22) | (u32::from(rn) << 16) | (u32::from(rd) << 12) | u32::from(rm)
        }
        Instruction::MoveFromPsr { source, rd, .. } => {
            cond | (0b1000 << 21) | (u32::from(source == PsrSource::Spsr) << 22) | (0b1111 << 16) | (u32::from(rd) << 12)
        }
        Instruction::MoveToPsr { source, mask, operand, .. } => {
            let (immediate, op2_bits) = encode_operand2(operand)?;
            let mask_bits = (u32::from(mask.flags) << 19)
                | (u32::from(mask.status) << 18)
                | (u32::from(mask.extension) << 17)
                | (u32::from(mask.control) << 16);
            cond | (u32::from(immediate) << 25)
                | (0b1001 << 21)
                | (u32::from(source == PsrSource::Spsr) << 22)
                | mask_bits
                | (0b1111 << 12)
                | op2_bits
        }
        Instruction::CoProcDataTransfer { load, long, cp_num, crd, address, .. } => {
            (0b110 << 25)
                | cond
                | address_common_bits(address)
                | (u32::from(long) << 22)
                | (u32::from(load) << 20)
                | (u32::from(crd) << 12)
                | (u32::from(cp_num) << 8)
                | (encode_coproc_transfer_offset(address.offset)?)
        }
        Instruction::CoProcRegisterTransfer { to_coprocessor, cp_num, cp_opcode, rd, crn, crm, cp_info, .. } => {
            (0b1110 << 24)
                | cond
                | (u32::from(cp_opcode) << 21)
                | (u32::from(!to_coprocessor) << 20)
                | (u32::from(crn) << 16)
                | (u32::from(rd) << 12)
                | (u32::from(cp_num) << 8)
                | (u32::from(cp_info) << 5)
                | (1 << 4)
                | u32::from(crm)
        }
        Instruction::CoProcDataProcessing { cp_num, cp_opcode, crd, crn, crm, cp_info, .. } => {
            (0b1110 << 24)
                | cond
                | (u32::from(cp_opcode) << 20)
                | (u32::from(crn) << 16)
                | (u32::from(crd) << 12)
                | (u32::from(cp_num) << 8)
                | (u32::from(cp_info) << 5)
                | u32::from(crm)
        }
        Instruction::FpaDataTransfer { load, precision, fd, address, .. } => {
            (0b110 << 25)
                | cond
                | address_common_bits(address)
                | (u32::from(precision_bit22(precision)) << 22)
                | (u32::from(load) << 20)
                | (u32::from(fd) << 12)
                | (FPA_CP_NUM << 8)
                | encode_coproc_transfer_offset(address.offset)?
                | (u32::from(precision_bit7(precision)) << 7)
        }
        // Dyadic ops decode under the `cp_info` branch whose top bit (bit
        // 7) is forced 0, which under `fpa_precision` only ever yields
        // Single or Double — Extended/PackedDecimal can't round-trip here.
        Instruction::FpaDyadic { opcode, precision, fd, fn_, fm, .. } => {
            if !matches!(precision, FpaPrecision::Single | FpaPrecision::Double) {
                return None;
            }
            (0b1110 << 24)
                | cond
                | (u32::from(opcode) << 20)
                | (u32::from(fn_) << 16)
                | (u32::from(fd) << 12)
                | (FPA_CP_NUM << 8)
                | (u32::from(precision_bit22(precision)) << 22)
                | u32::from(fm)
        }
        // Monadic ops decode under the `cp_info` branch whose top bit is
        // forced 1, which only ever yields Extended or PackedDecimal.
        Instruction::FpaMonadic { opcode, precision, fd, fm, .. } => {
            if !matches!(precision, FpaPrecision::Extended | FpaPrecision::PackedDecimal) {
                return None;
            }
            (0b1110 << 24)
                | cond
                | (u32::from(opcode) << 20)
                | (u32::from(fd) << 12)
                | (FPA_CP_NUM << 8)
                | (u32::from(precision_bit22(precision)) << 22)
                | (0b10 << 5)
                | (1 << 7)
                | u32::from(fm)
        }
        Instruction::FpaRegisterTransfer { to_fpa, rd, fn_, .. } => {
            (0b1110 << 24)
                | cond
                | (u32::from(!to_fpa) << 20)
                | (u32::from(fn_) << 16)
                | (u32::from(rd) << 12)
                | (1 << 4)
        }
        Instruction::FpaComparison { negate, fn_, fm, .. } => {
            (0b1110 << 24) | cond | (u32::from(fn_) << 16) | (u32::from(if negate { 0b111 } else { 0b110 }) << 5) | u32::from(fm)
        }
    })
}

fn encode_coproc_transfer_offset(offset: ShifterOperand) -> Option<u32> {
    match offset {
        ShifterOperand::Immediate(value) if value % 4 == 0 && value <= 0x3FC => Some(value >> 2),
        _ => None,
    }
}

/// `decode_coproc_transfer`/`decode_coproc_data_processing` treat coprocessor
/// numbers 1 and 2 as equally "the FPA unit"; this picks 1 as the canonical
/// encoding, matching real FPA hardware.
const FPA_CP_NUM: u32 = 1;

const fn precision_bit22(precision: FpaPrecision) -> bool {
    matches!(precision, FpaPrecision::Double | FpaPrecision::PackedDecimal)
}

const fn precision_bit7(precision: FpaPrecision) -> bool {
    matches!(precision, FpaPrecision::Extended | FpaPrecision::PackedDecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    fn roundtrip(word: u32) {
        let instr = decode(word);
        assert_eq!(encode(instr), Some(word), "decode/encode mismatch for {word:#010x}: {instr:?}");
    }

    #[test]
    fn swi_round_trips() {
        roundtrip(0xEF00_DEAD);
        roundtrip(0x6FCA_FEEE);
    }

    #[test]
    fn core_alu_immediate_round_trips() {
        roundtrip(0xE3A0_0001); // MOV R0, #1
        roundtrip(0xE280_100A); // ADD R1, R0, #10
    }

    #[test]
    fn shifted_register_operand_round_trips() {
        roundtrip(0xE1A0_0080); // MOV R0, R0, LSL #1
        roundtrip(0xE1A0_0060); // MOV R0, R0, RRX
        roundtrip(0xE1A0_0310); // MOV R0, R0, LSL R3
    }

    #[test]
    fn ldm_stm_round_trips() {
        roundtrip(0xE92D_001F); // STMFD R13!, {R0-R4}
        roundtrip(0xE89D_000F); // LDMIA R13!, {R0-R3}
    }

    #[test]
    fn branch_with_negative_offset_round_trips() {
        roundtrip(0xEAFF_FFFE);
    }

    #[test]
    fn bx_round_trips() {
        roundtrip(0xE12F_FF1E);
    }

    #[test]
    fn mrs_and_msr_round_trip() {
        roundtrip(0xE10F_0000);
        roundtrip(0xE129_F000);
    }

    #[test]
    fn halfword_and_signed_transfer_round_trips() {
        roundtrip(0xE1D0_00B0); // LDRH R0, [R0]
        roundtrip(0xE1D0_00D0); // LDRSB R0, [R0]
        roundtrip(0xE1D0_00F0); // LDRSH R0, [R0]
        roundtrip(0xE1CF_10B4); // STRH R1, [R15, #4]
    }

    #[test]
    fn multiply_and_swap_round_trip() {
        roundtrip(0xE000_0291); // MUL R0, R1, R2
        roundtrip(0xE021_1394); // MLA R1, R4, R3, R1
        roundtrip(0xE089_1392); // UMULL R1, R9, R2, R3
        roundtrip(0xE100_0091); // SWP R0, R1, [R0]
        roundtrip(0xE140_0092); // SWPB R0, R2, [R0]
    }

    #[test]
    fn immediate_rotation_finds_smallest_rotate() {
        assert_eq!(encode_rotated_immediate(0xFF), Some(0xFF));
        assert_eq!(encode_rotated_immediate(0xFF00_0000), Some((4 << 8) | 0xFF));
        assert!(encode_rotated_immediate(0x1234).is_none());
    }

    #[test]
    fn unencodable_immediate_returns_none() {
        let instr = Instruction::CoreAlu {
            cond: Condition::Al,
            op: AluOp::Mov,
            set_flags: false,
            rn: 0,
            rd: 0,
            operand2: ShifterOperand::Immediate(0x1234),
        };
        assert_eq!(encode(instr), None);
    }
}
