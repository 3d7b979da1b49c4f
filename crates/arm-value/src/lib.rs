//! A tagged variant value and its static conversion lattice.
//!
//! `Value` is used both by the assembler's expression evaluator (a constant
//! folded at compile time has one of these types) and by the system host's
//! register/memory introspection (a debugger query returns one of these).
//! At most one payload is ever live; construction preserves the source type
//! exactly — there is no implicit promotion on construction, only on an
//! explicit [`Value::try_convert`].

mod convert;
mod registry;

pub use convert::ConvertError;
pub use registry::{TypeDescriptor, descriptor_for};

use std::rc::Rc;

/// The data type of a [`Value`], mirroring the original `DataType` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Unknown,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    ExtendedReal,
    Char32,
    String,
}

impl DataType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::ExtendedReal => "extended-real",
            Self::Char32 => "char32",
            Self::String => "string",
        }
    }

    /// Is this one of the integer scalar types (signed or unsigned)?
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I32 | Self::U32 | Self::I64 | Self::U64)
    }

    /// Is this one of the floating-point scalar types?
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::ExtendedReal)
    }
}

/// An 80-bit extended-precision real, represented as an `f64` mantissa plus
/// the extra exponent range bits the original x87-derived type carried.
/// Arithmetic widens to `f64`; only the type tag and round-trip-through-string
/// behaviour of the original `ExtendedReal` case are preserved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedReal(pub f64);

/// A tagged variant: at most one payload is valid at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value constructed; the default state before assignment.
    Unknown,
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    ExtendedReal(ExtendedReal),
    Char32(char),
    /// Immutable, shared UTF-8 text. Cloning a `Value::String` is a refcount
    /// bump, never a copy of the bytes.
    String(Rc<str>),
}

impl Default for Value {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Value {
    #[must_use]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Unknown => DataType::Unknown,
            Self::I32(_) => DataType::I32,
            Self::U32(_) => DataType::U32,
            Self::I64(_) => DataType::I64,
            Self::U64(_) => DataType::U64,
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::ExtendedReal(_) => DataType::ExtendedReal,
            Self::Char32(_) => DataType::Char32,
            Self::String(_) => DataType::String,
        }
    }

    /// Attempt a typed conversion, per the static `(source, target)`
    /// conversion table in `convert`. Integer widenings always succeed;
    /// narrowings only when the value is in range; any scalar can be
    /// formatted to a string; a string can be parsed back to any scalar.
    pub fn try_convert(&self, target: DataType) -> Result<Self, ConvertError> {
        convert::try_convert(self, target)
    }

    /// Direct accessor: returns the `i32` payload or a `TypeMismatch`-style
    /// panic, matching the original `Value::asInt32()` contract (accessing
    /// the wrong variant is a programming bug, not a recoverable error).
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::I32(v) => *v,
            other => panic!("Value::as_i32 called on a {:?} payload", other.data_type()),
        }
    }

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        match self {
            Self::U32(v) => *v,
            other => panic!("Value::as_u32 called on a {:?} payload", other.data_type()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String(s) => s,
            other => panic!("Value::as_str called on a {:?} payload", other.data_type()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}
impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}
impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char32(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Rc::from(v))
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(Rc::from(v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_preserves_source_type_exactly() {
        let v = Value::from(5_i32);
        assert_eq!(v.data_type(), DataType::I32);
    }

    #[test]
    fn string_clone_is_cheap_and_shares_storage() {
        let v = Value::string("hello");
        let w = v.clone();
        if let (Value::String(a), Value::String(b)) = (&v, &w) {
            assert!(Rc::ptr_eq(a, b));
        } else {
            panic!("expected string payloads");
        }
    }

    #[test]
    fn unknown_has_no_payload() {
        assert!(Value::Unknown.is_unknown());
        assert_eq!(Value::Unknown.data_type(), DataType::Unknown);
    }

    #[test]
    #[should_panic(expected = "as_i32 called on a u32")]
    fn wrong_variant_access_panics() {
        let _ = Value::from(1_u32).as_i32();
    }
}
