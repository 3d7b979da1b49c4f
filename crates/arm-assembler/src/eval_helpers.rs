//! Thin wrappers over `arm_asm_syntax::eval` for pulling a concrete integer
//! out of a folded [`Value`] during pass 2 (§4.L).

use arm_asm_lexer::Location;
use arm_asm_syntax::{ConstantSet, ExprNode, eval};
use arm_value::Value;

use crate::diagnostic::Diagnostic;

fn driver_error(location: Location, message: impl Into<String>) -> Diagnostic {
    Diagnostic::Driver { location, message: message.into() }
}

/// Resolves `expr` and returns its raw 32-bit pattern, ignoring sign —
/// `EQUD -1` means "store the bytes `FF FF FF FF`", not "reject a negative
/// value", and the same holds for every immediate/offset field below.
pub fn eval_bits32(expr: &ExprNode, constants: &ConstantSet<'_>) -> Result<u32, Diagnostic> {
    let location = expr.location();
    let value = eval(expr, constants).map_err(Diagnostic::from)?;
    bits32_of(&value, location)
}

fn bits32_of(value: &Value, location: Location) -> Result<u32, Diagnostic> {
    match value {
        Value::I32(n) => Ok(*n as u32),
        Value::U32(n) => Ok(*n),
        Value::I64(n) => i32::try_from(*n).map(|v| v as u32).or_else(|_| u32::try_from(*n)).map_err(|_| too_wide(location)),
        Value::U64(n) => u32::try_from(*n).map_err(|_| too_wide(location)),
        Value::Char32(c) => Ok(*c as u32),
        other => Err(driver_error(location, format!("expected an integer value, found {}", other.data_type().name()))),
    }
}

fn too_wide(location: Location) -> Diagnostic {
    driver_error(location, "value does not fit in 32 bits")
}

/// Resolves `expr` to a `(negative, magnitude)` pair — used for address
/// offsets, where the sign lives in the evaluated value (`#-4` folds to a
/// negative `I32`) rather than in a separate token, unlike a leading `-`
/// before a register offset.
pub fn eval_signed_magnitude(expr: &ExprNode, constants: &ConstantSet<'_>) -> Result<(bool, u32), Diagnostic> {
    let location = expr.location();
    let value = eval(expr, constants).map_err(Diagnostic::from)?;
    match value {
        Value::I32(n) => Ok((n < 0, n.unsigned_abs())),
        Value::U32(n) => Ok((false, n)),
        Value::I64(n) => {
            let magnitude = u32::try_from(n.unsigned_abs()).map_err(|_| too_wide(location))?;
            Ok((n < 0, magnitude))
        }
        Value::U64(n) => Ok((false, u32::try_from(n).map_err(|_| too_wide(location))?)),
        Value::Char32(c) => Ok((false, c as u32)),
        other => Err(driver_error(location, format!("expected an integer value, found {}", other.data_type().name()))),
    }
}

/// Resolves `expr` and checks its magnitude fits in `bits` bits (an
/// unsigned field width — shift amount, coprocessor number, register
/// count), independent of whether the folded value happened to be typed
/// signed or unsigned.
pub fn eval_unsigned(expr: &ExprNode, constants: &ConstantSet<'_>, bits: u32, what: &str) -> Result<u32, Diagnostic> {
    let location = expr.location();
    let raw = eval_bits32(expr, constants)?;
    let limit = if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 };
    if raw > limit {
        return Err(driver_error(location, format!("{what} must fit in {bits} bits, found {raw:#x}")));
    }
    Ok(raw)
}
