//! The static `(source, target)` conversion lattice backing
//! [`Value::try_convert`](crate::Value::try_convert).
//!
//! Rules, per spec:
//! - integer widenings always succeed; narrowings only when in range.
//! - integer <-> float succeeds only when the value is exactly representable.
//! - any scalar -> string goes through the target descriptor's formatter.
//! - string -> any scalar goes through the target descriptor's parser.
//! - `Unknown` never participates in a numeric conversion.

use std::fmt;

use crate::{DataType, ExtendedReal, Value, registry};

#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// The value does not fit in the target's range.
    OutOfRange { from: DataType, to: DataType },
    /// The value has no exact representation in the target (e.g. a
    /// fractional float converted to an integer type).
    NotRepresentable { from: DataType, to: DataType },
    /// A string failed to parse as the target type.
    ParseFailed { target: DataType, text: String },
    /// There is no conversion path between these two types at all.
    Unsupported { from: DataType, to: DataType },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { from, to } => {
                write!(f, "value of type {} does not fit in {}", from.name(), to.name())
            }
            Self::NotRepresentable { from, to } => {
                write!(f, "value of type {} has no exact representation in {}", from.name(), to.name())
            }
            Self::ParseFailed { target, text } => {
                write!(f, "\"{text}\" could not be parsed as {}", target.name())
            }
            Self::Unsupported { from, to } => {
                write!(f, "no conversion from {} to {}", from.name(), to.name())
            }
        }
    }
}

impl std::error::Error for ConvertError {}

enum Canonical {
    Int(i128),
    Float(f64),
}

fn to_canonical(value: &Value) -> Option<Canonical> {
    match *value {
        Value::I32(n) => Some(Canonical::Int(i128::from(n))),
        Value::U32(n) => Some(Canonical::Int(i128::from(n))),
        Value::I64(n) => Some(Canonical::Int(i128::from(n))),
        Value::U64(n) => Some(Canonical::Int(i128::from(n))),
        Value::Char32(c) => Some(Canonical::Int(i128::from(c as u32))),
        Value::F32(v) => Some(Canonical::Float(f64::from(v))),
        Value::F64(v) => Some(Canonical::Float(v)),
        Value::ExtendedReal(ExtendedReal(v)) => Some(Canonical::Float(v)),
        Value::Unknown | Value::String(_) => None,
    }
}

fn out_of_range(from: DataType, to: DataType) -> ConvertError {
    ConvertError::OutOfRange { from, to }
}

fn not_representable(from: DataType, to: DataType) -> ConvertError {
    ConvertError::NotRepresentable { from, to }
}

fn int_to_target(n: i128, from: DataType, target: DataType) -> Result<Value, ConvertError> {
    match target {
        DataType::I32 => i32::try_from(n).map(Value::I32).map_err(|_| out_of_range(from, target)),
        DataType::U32 => u32::try_from(n).map(Value::U32).map_err(|_| out_of_range(from, target)),
        DataType::I64 => i64::try_from(n).map(Value::I64).map_err(|_| out_of_range(from, target)),
        DataType::U64 => u64::try_from(n).map(Value::U64).map_err(|_| out_of_range(from, target)),
        DataType::Char32 => {
            let code = u32::try_from(n).map_err(|_| out_of_range(from, target))?;
            char::from_u32(code).map(Value::Char32).ok_or_else(|| not_representable(from, target))
        }
        DataType::F32 => {
            let widened = n as f64;
            if widened.abs() <= f64::from(f32::MAX) {
                Ok(Value::F32(widened as f32))
            } else {
                Err(out_of_range(from, target))
            }
        }
        DataType::F64 => Ok(Value::F64(n as f64)),
        DataType::ExtendedReal => Ok(Value::ExtendedReal(ExtendedReal(n as f64))),
        DataType::Unknown | DataType::String => unreachable!("handled by caller"),
    }
}

fn float_to_target(v: f64, from: DataType, target: DataType) -> Result<Value, ConvertError> {
    match target {
        DataType::F32 => {
            if !v.is_finite() || v.abs() <= f64::from(f32::MAX) {
                Ok(Value::F32(v as f32))
            } else {
                Err(out_of_range(from, target))
            }
        }
        DataType::F64 => Ok(Value::F64(v)),
        DataType::ExtendedReal => Ok(Value::ExtendedReal(ExtendedReal(v))),
        DataType::I32 | DataType::U32 | DataType::I64 | DataType::U64 | DataType::Char32 => {
            if !v.is_finite() || v.fract() != 0.0 {
                return Err(not_representable(from, target));
            }
            // i128 cast saturates on out-of-range floats; the subsequent
            // int_to_target range check still rejects values that don't
            // fit the narrower target, so saturation never masks an error.
            int_to_target(v.trunc() as i128, from, target)
        }
        DataType::Unknown | DataType::String => unreachable!("handled by caller"),
    }
}

pub fn try_convert(value: &Value, target: DataType) -> Result<Value, ConvertError> {
    let source = value.data_type();
    if source == target {
        return Ok(value.clone());
    }
    if target == DataType::String {
        return Ok(Value::string((registry::descriptor_for(source).format)(value)));
    }
    if source == DataType::String {
        return (registry::descriptor_for(target).parse)(value.as_str());
    }
    if source == DataType::Unknown || target == DataType::Unknown {
        return Err(ConvertError::Unsupported { from: source, to: target });
    }
    match to_canonical(value) {
        Some(Canonical::Int(n)) => int_to_target(n, source, target),
        Some(Canonical::Float(f)) => float_to_target(f, source, target),
        None => Err(ConvertError::Unsupported { from: source, to: target }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widening_always_succeeds() {
        let v = Value::I32(-1);
        assert_eq!(v.try_convert(DataType::I64), Ok(Value::I64(-1)));
    }

    #[test]
    fn narrowing_out_of_range_fails() {
        let v = Value::I64(1 << 40);
        assert_eq!(
            v.try_convert(DataType::I32),
            Err(ConvertError::OutOfRange { from: DataType::I64, to: DataType::I32 })
        );
    }

    #[test]
    fn narrowing_in_range_succeeds() {
        let v = Value::I64(42);
        assert_eq!(v.try_convert(DataType::I32), Ok(Value::I32(42)));
    }

    #[test]
    fn float_with_fraction_does_not_convert_to_integer() {
        let v = Value::F64(1.5);
        assert_eq!(
            v.try_convert(DataType::I32),
            Err(ConvertError::NotRepresentable { from: DataType::F64, to: DataType::I32 })
        );
    }

    #[test]
    fn whole_float_converts_to_integer() {
        let v = Value::F64(7.0);
        assert_eq!(v.try_convert(DataType::U32), Ok(Value::U32(7)));
    }

    #[test]
    fn scalar_to_string_round_trips_through_parser() {
        let v = Value::I32(-99);
        let as_string = v.try_convert(DataType::String).unwrap();
        assert_eq!(as_string, Value::string("-99"));
        let back = as_string.try_convert(DataType::I32).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn unknown_never_converts() {
        assert!(Value::Unknown.try_convert(DataType::I32).is_err());
    }

    #[test]
    fn conversion_monotonicity_when_lossless() {
        let v = Value::I32(12345);
        let widened = v.try_convert(DataType::I64).unwrap();
        let back = widened.try_convert(DataType::I32).unwrap();
        assert_eq!(v, back);
    }
}
