//! The barrel shifter (§4.E): every shift mode, with carry-out, shared by
//! the immediate-shift and register-shift encodings of the shifter operand.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftType {
    Lsl,
    Lsr,
    Asr,
    Ror,
    /// Rotate right one bit through carry. Only ever reached via the
    /// `ROR #0` immediate-encoding special case, never directly encoded.
    Rrx,
}

/// Apply `shift_type` to `value` by `amount` bits (already resolved to its
/// real magnitude — callers translate the `#0` immediate-encoding quirks
/// before calling this). `amount` may exceed 32; register-specified shifts
/// use the full low byte of Rs.
#[must_use]
pub fn apply(value: u32, shift_type: ShiftType, amount: u32, carry_in: bool) -> (u32, bool) {
    if shift_type == ShiftType::Rrx {
        let carry_out = value & 1 != 0;
        let result = (value >> 1) | u32::from(carry_in) << 31;
        return (result, carry_out);
    }
    if amount == 0 {
        return (value, carry_in);
    }
    match shift_type {
        ShiftType::Lsl => match amount {
            1..=31 => (value << amount, (value >> (32 - amount)) & 1 != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        ShiftType::Lsr => match amount {
            1..=31 => (value >> amount, (value >> (amount - 1)) & 1 != 0),
            32 => (0, (value >> 31) & 1 != 0),
            _ => (0, false),
        },
        ShiftType::Asr => {
            if amount >= 32 {
                let sign = (value as i32) < 0;
                (if sign { 0xFFFF_FFFF } else { 0 }, sign)
            } else {
                let carry = ((value as i32) >> (amount - 1)) & 1 != 0;
                (((value as i32) >> amount) as u32, carry)
            }
        }
        ShiftType::Ror => {
            let amt = amount % 32;
            if amt == 0 {
                // A multiple of 32: value unchanged, carry is the top bit.
                (value, (value >> 31) & 1 != 0)
            } else {
                let carry = (value >> (amt - 1)) & 1 != 0;
                (value.rotate_right(amt), carry)
            }
        }
        ShiftType::Rrx => unreachable!("handled above"),
    }
}

/// Resolve the `#imm5` immediate-shift encoding's special cases before
/// applying the shift: `LSL #0` is a no-op, `LSR #0`/`ASR #0` mean shift by
/// 32, and `ROR #0` means RRX.
#[must_use]
pub fn apply_immediate(value: u32, shift_type: ShiftType, imm5: u32, carry_in: bool) -> (u32, bool) {
    match shift_type {
        ShiftType::Lsl => apply(value, ShiftType::Lsl, imm5, carry_in),
        ShiftType::Lsr => apply(value, ShiftType::Lsr, if imm5 == 0 { 32 } else { imm5 }, carry_in),
        ShiftType::Asr => apply(value, ShiftType::Asr, if imm5 == 0 { 32 } else { imm5 }, carry_in),
        ShiftType::Ror => {
            if imm5 == 0 {
                apply(value, ShiftType::Rrx, 0, carry_in)
            } else {
                apply(value, ShiftType::Ror, imm5, carry_in)
            }
        }
        ShiftType::Rrx => apply(value, ShiftType::Rrx, 0, carry_in),
    }
}

/// Resolve a register-specified shift: `amount` is the low byte of Rs,
/// with no special-casing beyond the universal "shift by 0 is a no-op".
#[must_use]
pub fn apply_by_register(value: u32, shift_type: ShiftType, rs_low_byte: u8, carry_in: bool) -> (u32, bool) {
    apply(value, shift_type, u32::from(rs_low_byte), carry_in)
}
