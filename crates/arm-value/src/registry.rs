//! The `VariantType` registry: one descriptor per concrete [`DataType`],
//! exposing the name/format/parse operations §4.A calls for. Rather than a
//! heap-allocated table of trait objects, the "process-wide set of
//! singletons" is a `const fn` dispatch over the `DataType` enum — every
//! descriptor is a compile-time constant, so there is no global mutable
//! state to initialise or race on.

use crate::{ConvertError, DataType, Value};

/// Format and parse operations for one concrete type.
pub struct TypeDescriptor {
    pub name: &'static str,
    pub format: fn(&Value) -> String,
    pub parse: fn(&str) -> Result<Value, ConvertError>,
}

#[must_use]
pub fn descriptor_for(ty: DataType) -> TypeDescriptor {
    match ty {
        DataType::Unknown => TypeDescriptor {
            name: "unknown",
            format: |_| String::new(),
            parse: |_| Err(ConvertError::Unsupported {
                from: DataType::String,
                to: DataType::Unknown,
            }),
        },
        DataType::I32 => TypeDescriptor {
            name: "i32",
            format: |v| v.as_i32().to_string(),
            parse: |s| {
                s.trim()
                    .parse::<i32>()
                    .map(Value::I32)
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::I32,
                        text: s.to_string(),
                    })
            },
        },
        DataType::U32 => TypeDescriptor {
            name: "u32",
            format: |v| v.as_u32().to_string(),
            parse: |s| {
                s.trim()
                    .parse::<u32>()
                    .map(Value::U32)
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::U32,
                        text: s.to_string(),
                    })
            },
        },
        DataType::I64 => TypeDescriptor {
            name: "i64",
            format: |v| match v {
                Value::I64(n) => n.to_string(),
                _ => unreachable!(),
            },
            parse: |s| {
                s.trim()
                    .parse::<i64>()
                    .map(Value::I64)
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::I64,
                        text: s.to_string(),
                    })
            },
        },
        DataType::U64 => TypeDescriptor {
            name: "u64",
            format: |v| match v {
                Value::U64(n) => n.to_string(),
                _ => unreachable!(),
            },
            parse: |s| {
                s.trim()
                    .parse::<u64>()
                    .map(Value::U64)
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::U64,
                        text: s.to_string(),
                    })
            },
        },
        DataType::F32 => TypeDescriptor {
            name: "f32",
            format: |v| match v {
                Value::F32(n) => n.to_string(),
                _ => unreachable!(),
            },
            parse: |s| {
                s.trim()
                    .parse::<f32>()
                    .map(Value::F32)
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::F32,
                        text: s.to_string(),
                    })
            },
        },
        DataType::F64 => TypeDescriptor {
            name: "f64",
            format: |v| match v {
                Value::F64(n) => n.to_string(),
                _ => unreachable!(),
            },
            parse: |s| {
                s.trim()
                    .parse::<f64>()
                    .map(Value::F64)
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::F64,
                        text: s.to_string(),
                    })
            },
        },
        DataType::ExtendedReal => TypeDescriptor {
            name: "extended-real",
            format: |v| match v {
                Value::ExtendedReal(e) => format!("{:e}", e.0),
                _ => unreachable!(),
            },
            parse: |s| {
                s.trim()
                    .parse::<f64>()
                    .map(|f| Value::ExtendedReal(crate::ExtendedReal(f)))
                    .map_err(|_| ConvertError::ParseFailed {
                        target: DataType::ExtendedReal,
                        text: s.to_string(),
                    })
            },
        },
        DataType::Char32 => TypeDescriptor {
            name: "char32",
            format: |v| match v {
                Value::Char32(c) => c.to_string(),
                _ => unreachable!(),
            },
            parse: |s| {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char32(c)),
                    _ => Err(ConvertError::ParseFailed {
                        target: DataType::Char32,
                        text: s.to_string(),
                    }),
                }
            },
        },
        DataType::String => TypeDescriptor {
            name: "string",
            format: |v| match v {
                Value::String(s) => s.to_string(),
                _ => unreachable!(),
            },
            parse: |s| Ok(Value::string(s)),
        },
    }
}
