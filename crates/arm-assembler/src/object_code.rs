//! The assembler's output (§3 ObjectCode): a flat byte image plus the
//! symbol table it was built with. No headers — a caller that wants a
//! loadable file format wraps this itself.

use std::collections::HashMap;

use arm_value::Value;

/// One resolved symbol, exposed read-only to a caller that wants to map
/// labels back onto addresses (a debugger, a linker script).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSymbol {
    pub name: String,
    pub value: Value,
}

/// A flat binary image produced by [`crate::assemble`], with the load
/// address it was assembled for and the symbols visible at the end of
/// assembly. There is no on-disk header; writing this to a file is just
/// writing `code()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCode {
    load_address: u32,
    bytes: Vec<u8>,
    symbols: Vec<ResolvedSymbol>,
}

impl ObjectCode {
    #[must_use]
    pub const fn new(load_address: u32, bytes: Vec<u8>, symbols: Vec<ResolvedSymbol>) -> Self {
        Self { load_address, bytes, symbols }
    }

    #[must_use]
    pub const fn load_address(&self) -> u32 {
        self.load_address
    }

    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn symbols(&self) -> &[ResolvedSymbol] {
        &self.symbols
    }

    #[must_use]
    pub fn symbol_table(&self) -> HashMap<&str, &Value> {
        self.symbols.iter().map(|s| (s.name.as_str(), &s.value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_image_reports_empty() {
        let object = ObjectCode::new(0x8000, Vec::new(), Vec::new());
        assert!(object.is_empty());
        assert_eq!(object.len(), 0);
    }

    #[test]
    fn exposes_load_address_and_bytes() {
        let object = ObjectCode::new(0x8000, vec![0xDE, 0xAD], Vec::new());
        assert_eq!(object.load_address(), 0x8000);
        assert_eq!(object.code(), &[0xDE, 0xAD]);
    }

    #[test]
    fn symbol_table_looks_up_by_name() {
        let object = ObjectCode::new(0, Vec::new(), vec![ResolvedSymbol { name: "loop".to_string(), value: Value::U32(4) }]);
        assert_eq!(object.symbol_table().get("loop"), Some(&&Value::U32(4)));
    }
}
