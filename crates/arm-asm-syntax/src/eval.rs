//! Constant-folding evaluation of an [`ExprNode`] tree (§4.K).
//!
//! Typing follows the original evaluator rather than Rust's usual numeric
//! rules: integer literals default to the narrowest of `u32`/`u64` that
//! fits, arithmetic promotes to the wider/float operand and to a signed
//! result whenever either side is signed, and a lone character or string
//! operand only ever participates in `+` (concatenation) — every other
//! operator on text is a type error.

use crate::error::SemanticError;
use crate::expr::{BinaryOp, ExprNode, UnaryOp};
use crate::symbol::ConstantSet;
use arm_asm_lexer::Location;
use arm_value::{ExtendedReal, Value};

/// Evaluate `node` to a constant [`Value`], resolving symbols through
/// `constants`. Fails if a symbol is undefined or an operator is applied
/// to operand types it doesn't support (division/modulus by zero included).
pub fn eval(node: &ExprNode, constants: &ConstantSet<'_>) -> Result<Value, SemanticError> {
    match node {
        ExprNode::IntegerLiteral { digits, radix, location } => eval_integer_literal(digits, *radix, *location),
        ExprNode::RealLiteral { digits, location } => eval_real_literal(digits, *location),
        ExprNode::StringLiteral { text, .. } => Ok(eval_string_literal(text)),
        ExprNode::Symbol { id, location } => constants
            .lookup(id)
            .map(|symbol| symbol.value.clone())
            .ok_or_else(|| SemanticError::new(*location, format!("undefined symbol '{id}'"))),
        ExprNode::CurrentOffset { .. } => Ok(Value::U32(constants.current_address)),
        ExprNode::Parenthesis(inner) => eval(inner, constants),
        ExprNode::Unary { op, child, location } => eval_unary(*op, eval(child, constants)?, *location),
        ExprNode::Binary { op, lhs, rhs, location } => {
            let lhs = eval(lhs, constants)?;
            let rhs = eval(rhs, constants)?;
            eval_binary(*op, lhs, rhs, *location)
        }
    }
}

fn eval_integer_literal(digits: &str, radix: u32, location: Location) -> Result<Value, SemanticError> {
    let value = u64::from_str_radix(digits, radix)
        .map_err(|_| SemanticError::new(location, format!("'{digits}' is not a valid base-{radix} integer literal")))?;
    Ok(u32::try_from(value).map_or(Value::U64(value), Value::U32))
}

/// `1.125` parses as `f32` (exactly representable), `3.14159` as `f64`
/// (would lose precision) — mirroring the original literal-folding
/// behaviour rather than always widening to `f64`.
fn eval_real_literal(digits: &str, location: Location) -> Result<Value, SemanticError> {
    let as_f64: f64 =
        digits.parse().map_err(|_| SemanticError::new(location, format!("'{digits}' is not a valid real literal")))?;
    if let Ok(as_f32) = digits.parse::<f32>() {
        if f64::from(as_f32) == as_f64 {
            return Ok(Value::F32(as_f32));
        }
    }
    Ok(Value::F64(as_f64))
}

/// A single-character quoted literal is a `Char32`; anything else
/// (including the empty string) is a `String`.
fn eval_string_literal(text: &str) -> Value {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Value::Char32(c),
        _ => Value::string(text),
    }
}

fn eval_unary(op: UnaryOp, value: Value, location: Location) -> Result<Value, SemanticError> {
    match op {
        UnaryOp::Negate => eval_negate(value, location),
        UnaryOp::Absolute => eval_absolute(value, location),
        UnaryOp::BitNot => eval_bitnot(value, location),
    }
}

fn eval_negate(value: Value, location: Location) -> Result<Value, SemanticError> {
    match value {
        Value::I32(n) => Ok(Value::I32(n.wrapping_neg())),
        Value::U32(n) => Ok(Value::I32(i64::from(n).wrapping_neg() as i32)),
        Value::I64(n) => Ok(Value::I64(n.wrapping_neg())),
        Value::U64(n) => Ok(Value::I64(i128::from(n).wrapping_neg() as i64)),
        Value::F32(f) => Ok(Value::F32(-f)),
        Value::F64(f) => Ok(Value::F64(-f)),
        Value::ExtendedReal(ExtendedReal(f)) => Ok(Value::ExtendedReal(ExtendedReal(-f))),
        other => Err(type_error(location, &other)),
    }
}

/// Unary `+` is absolute value, not a no-op.
fn eval_absolute(value: Value, location: Location) -> Result<Value, SemanticError> {
    match value {
        Value::I32(n) => Ok(Value::I32(n.wrapping_abs())),
        Value::U32(n) => Ok(Value::U32(n)),
        Value::I64(n) => Ok(Value::I64(n.wrapping_abs())),
        Value::U64(n) => Ok(Value::U64(n)),
        Value::F32(f) => Ok(Value::F32(f.abs())),
        Value::F64(f) => Ok(Value::F64(f.abs())),
        Value::ExtendedReal(ExtendedReal(f)) => Ok(Value::ExtendedReal(ExtendedReal(f.abs()))),
        other => Err(type_error(location, &other)),
    }
}

fn eval_bitnot(value: Value, location: Location) -> Result<Value, SemanticError> {
    let (n, width64, signed) = classify_int(&value).ok_or_else(|| type_error(location, &value))?;
    let mask = mask_for(width64);
    Ok(finish((!to_bits(n, width64)) & mask, width64, signed))
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value, location: Location) -> Result<Value, SemanticError> {
    if op == BinaryOp::Add {
        if let Some(joined) = try_concat(&lhs, &rhs) {
            return Ok(joined);
        }
    }
    if is_text(&lhs) {
        return Err(type_error(location, &lhs));
    }
    if is_text(&rhs) {
        return Err(type_error(location, &rhs));
    }
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arithmetic(op, lhs, rhs, location)
        }
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::ArithmeticShiftRight => {
            eval_shift(op, lhs, rhs, location)
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => eval_bitwise(op, lhs, rhs, location),
    }
}

fn is_text(value: &Value) -> bool {
    matches!(value, Value::Char32(_) | Value::String(_))
}

fn try_concat(lhs: &Value, rhs: &Value) -> Option<Value> {
    let left = as_text(lhs)?;
    let right = as_text(rhs)?;
    Some(Value::string(format!("{left}{right}")))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Char32(c) => Some(c.to_string()),
        Value::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn eval_arithmetic(op: BinaryOp, lhs: Value, rhs: Value, location: Location) -> Result<Value, SemanticError> {
    let lf = classify_float(&lhs);
    let rf = classify_float(&rhs);
    if lf.is_some() || rf.is_some() {
        let lv = lf.map(|(v, _)| v).or_else(|| classify_int(&lhs).map(|(v, ..)| v as f64)).ok_or_else(|| type_error(location, &lhs))?;
        let rv = rf.map(|(v, _)| v).or_else(|| classify_int(&rhs).map(|(v, ..)| v as f64)).ok_or_else(|| type_error(location, &rhs))?;
        let rank = lf.map_or(0, |(_, r)| r).max(rf.map_or(0, |(_, r)| r));
        let result = match op {
            BinaryOp::Add => lv + rv,
            BinaryOp::Sub => lv - rv,
            BinaryOp::Mul => lv * rv,
            BinaryOp::Div => {
                if rv == 0.0 {
                    return Err(SemanticError::new(location, "division by zero".to_string()));
                }
                lv / rv
            }
            BinaryOp::Mod => return Err(SemanticError::new(location, "MOD requires integer operands".to_string())),
            _ => unreachable!("eval_arithmetic called with a non-arithmetic operator"),
        };
        return Ok(pack_float(result, rank));
    }

    let (lv, lw, ls) = classify_int(&lhs).ok_or_else(|| type_error(location, &lhs))?;
    let (rv, rw, rs) = classify_int(&rhs).ok_or_else(|| type_error(location, &rhs))?;
    let width64 = lw || rw;
    let signed = ls || rs;
    let result = match op {
        BinaryOp::Add => lv + rv,
        BinaryOp::Sub => lv - rv,
        BinaryOp::Mul => lv * rv,
        BinaryOp::Div => {
            if rv == 0 {
                return Err(SemanticError::new(location, "division by zero".to_string()));
            }
            lv / rv
        }
        BinaryOp::Mod => {
            if rv == 0 {
                return Err(SemanticError::new(location, "division by zero".to_string()));
            }
            lv % rv
        }
        _ => unreachable!("eval_arithmetic called with a non-arithmetic operator"),
    };
    Ok(finish(to_bits(result, width64) & mask_for(width64), width64, signed))
}

/// `LSL`/`LSR` always produce an unsigned result, `ASR` always a signed
/// one — regardless of the operand's own signedness. A negative shift
/// count inverts the direction (and, for `ASR`, becomes a left shift)
/// but never changes that result signedness (§8 `ConstantAsr`).
fn eval_shift(op: BinaryOp, lhs: Value, rhs: Value, location: Location) -> Result<Value, SemanticError> {
    let (lv, width64, _) = classify_int(&lhs).ok_or_else(|| type_error(location, &lhs))?;
    let (rv, ..) = classify_int(&rhs).ok_or_else(|| type_error(location, &rhs))?;

    let (mut left, arithmetic, result_signed) = match op {
        BinaryOp::ShiftLeft => (true, false, false),
        BinaryOp::ShiftRight => (false, false, false),
        BinaryOp::ArithmeticShiftRight => (false, true, true),
        _ => unreachable!("eval_shift called with a non-shift operator"),
    };
    if rv < 0 {
        left = !left;
    }
    let amount = u32::try_from(rv.unsigned_abs()).unwrap_or(u32::MAX);
    let limit = if width64 { 63 } else { 31 };
    let mask = mask_for(width64);
    let bits = to_bits(lv, width64);

    let shifted = if left {
        bits.wrapping_shl(amount.min(limit)) & mask
    } else if arithmetic {
        let signed_bits = if width64 { bits as i64 } else { i64::from(bits as u32 as i32) };
        ((signed_bits >> amount.min(limit)) as u64) & mask
    } else {
        bits.wrapping_shr(amount.min(limit)) & mask
    };
    Ok(finish(shifted, width64, result_signed))
}

fn eval_bitwise(op: BinaryOp, lhs: Value, rhs: Value, location: Location) -> Result<Value, SemanticError> {
    let (lv, lw, ls) = classify_int(&lhs).ok_or_else(|| type_error(location, &lhs))?;
    let (rv, rw, rs) = classify_int(&rhs).ok_or_else(|| type_error(location, &rhs))?;
    let width64 = lw || rw;
    let signed = ls || rs;
    let mask = mask_for(width64);
    let lbits = to_bits(lv, width64);
    let rbits = to_bits(rv, width64);
    let result = match op {
        BinaryOp::BitAnd => lbits & rbits,
        BinaryOp::BitOr => lbits | rbits,
        BinaryOp::BitXor => lbits ^ rbits,
        _ => unreachable!("eval_bitwise called with a non-bitwise operator"),
    };
    Ok(finish(result & mask, width64, signed))
}

/// `(magnitude, is-64-bit, is-signed)` for the four integer [`Value`]
/// variants; `None` for anything else (float, char, string, unknown) so
/// callers can reject them uniformly.
fn classify_int(value: &Value) -> Option<(i128, bool, bool)> {
    match *value {
        Value::I32(n) => Some((i128::from(n), false, true)),
        Value::U32(n) => Some((i128::from(n), false, false)),
        Value::I64(n) => Some((i128::from(n), true, true)),
        Value::U64(n) => Some((i128::from(n), true, false)),
        _ => None,
    }
}

/// `(value, precision rank)` for the three float [`Value`] variants, rank
/// `0` (`f32`) lowest, `2` (`ExtendedReal`) highest.
fn classify_float(value: &Value) -> Option<(f64, u8)> {
    match *value {
        Value::F32(f) => Some((f64::from(f), 0)),
        Value::F64(f) => Some((f, 1)),
        Value::ExtendedReal(ExtendedReal(f)) => Some((f, 2)),
        _ => None,
    }
}

fn pack_float(value: f64, rank: u8) -> Value {
    match rank {
        0 => Value::F32(value as f32),
        1 => Value::F64(value),
        _ => Value::ExtendedReal(ExtendedReal(value)),
    }
}

fn mask_for(width64: bool) -> u64 {
    if width64 { u64::MAX } else { 0xFFFF_FFFF }
}

fn to_bits(n: i128, width64: bool) -> u64 {
    if width64 { n as i64 as u64 } else { u64::from(n as i32 as u32) }
}

fn finish(bits: u64, width64: bool, signed: bool) -> Value {
    if width64 {
        if signed { Value::I64(bits as i64) } else { Value::U64(bits) }
    } else {
        let narrow = bits as u32;
        if signed { Value::I32(narrow as i32) } else { Value::U32(narrow) }
    }
}

fn type_error(location: Location, value: &Value) -> SemanticError {
    SemanticError::new(location, format!("operator does not support a {} operand", value.data_type().name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;
    use crate::symbol::SymbolTable;
    use arm_asm_lexer::{Cursor, ExpressionContext, LexicalContext, TokenKind};

    fn eval_str(text: &str) -> Result<Value, SemanticError> {
        let mut cursor = Cursor::new(text);
        let ctx = ExpressionContext;
        let mut tokens = Vec::new();
        while let Some(tok) = ctx.try_next_token(&mut cursor) {
            if tok.kind == TokenKind::StatementTerminator {
                break;
            }
            tokens.push(tok);
        }
        let (node, _) = parse_expression(&tokens).unwrap();
        let symbols = SymbolTable::new();
        let constants = ConstantSet::new(&symbols, 0);
        eval(&node, &constants)
    }

    #[test]
    fn integer_literal_picks_narrowest_fit() {
        assert_eq!(eval_str("42\n").unwrap(), Value::U32(42));
        assert_eq!(eval_str("0xF00000000\n").unwrap(), Value::U64(0xF00000000));
    }

    #[test]
    fn real_literal_prefers_f32_when_exact() {
        assert_eq!(eval_str("1.125\n").unwrap(), Value::F32(1.125));
        assert_eq!(eval_str("3.14159\n").unwrap(), Value::F64(3.14159));
    }

    #[test]
    fn absolute_value_is_not_a_no_op() {
        assert_eq!(eval_str("+(-42)\n").unwrap(), Value::I32(42));
    }

    #[test]
    fn negation_of_unsigned_becomes_signed() {
        assert_eq!(eval_str("-42\n").unwrap(), Value::I32(-42));
    }

    #[test]
    fn bitwise_not_widens_to_the_operand_width() {
        assert_eq!(eval_str("NOT 0xFF\n").unwrap(), Value::U32(0xFFFF_FF00));
        assert_eq!(eval_str("NOT 0xF00000000\n").unwrap(), Value::U64(0xFFFF_FFF0_FFFF_FFFF));
    }

    #[test]
    fn character_addition_concatenates_to_a_string() {
        let v = eval_str("'H' + 'i'\n").unwrap();
        assert_eq!(v, Value::string("Hi"));
    }

    #[test]
    fn character_subtraction_is_a_type_error() {
        assert!(eval_str("'H' - 'i'\n").is_err());
    }

    #[test]
    fn mixed_sign_multiplication_promotes_to_signed() {
        assert_eq!(eval_str("5 * -11\n").unwrap(), Value::I32(-55));
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(eval_str("5 / -11\n").unwrap(), Value::I32(0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(eval_str("5 / 0\n").is_err());
        assert!(eval_str("422.1253 / 0.0\n").is_err());
    }

    #[test]
    fn modulus_follows_dividend_sign() {
        assert_eq!(eval_str("5 MOD 2\n").unwrap(), Value::U32(1));
        assert_eq!(eval_str("5 MOD -2\n").unwrap(), Value::I32(1));
    }

    #[test]
    fn negative_shift_count_inverts_direction() {
        assert_eq!(eval_str("5 << 2\n").unwrap(), Value::U32(20));
        assert_eq!(eval_str("5 << -2\n").unwrap(), Value::U32(1));
        assert_eq!(eval_str("5 >> -2\n").unwrap(), Value::U32(20));
    }

    #[test]
    fn arithmetic_shift_keeps_a_signed_result_even_when_flipped() {
        assert_eq!(eval_str("5 >>> -2\n").unwrap(), Value::I32(20));
        assert_eq!(eval_str("-5 >>> -2\n").unwrap(), Value::I32(-20));
        assert_eq!(eval_str("-5 >>> 2\n").unwrap(), Value::I32(-2));
    }

    #[test]
    fn bitwise_ops_promote_to_signed_when_either_operand_is() {
        assert_eq!(eval_str("5 AND 2\n").unwrap(), Value::U32(0));
        assert_eq!(eval_str("+-5 AND 4\n").unwrap(), Value::I32(4));
        assert_eq!(eval_str("5 or 2\n").unwrap(), Value::U32(7));
        assert_eq!(eval_str("5 XOR 3\n").unwrap(), Value::U32(6));
    }

    #[test]
    fn current_offset_reads_the_constant_set_address() {
        let mut cursor = Cursor::new("$ + 4\n");
        let ctx = ExpressionContext;
        let mut tokens = Vec::new();
        while let Some(tok) = ctx.try_next_token(&mut cursor) {
            if tok.kind == TokenKind::StatementTerminator {
                break;
            }
            tokens.push(tok);
        }
        let (node, _) = parse_expression(&tokens).unwrap();
        let symbols = SymbolTable::new();
        let constants = ConstantSet::new(&symbols, 0x8000);
        assert_eq!(eval(&node, &constants).unwrap(), Value::U32(0x8004));
    }
}
