//! The global symbol table (§3 Symbol table) and the `ConstantSet` the
//! evaluator consults (§4.K): a first-class wrapper rather than an
//! anonymous map, so built-ins and the label table share one lookup path.

use std::collections::HashMap;

use arm_asm_lexer::Location;
use arm_value::Value;

#[derive(Debug, Clone)]
pub struct Symbol {
    pub value: Value,
    pub defined_at: Location,
    pub is_resolved: bool,
}

/// Global symbol table. Scoped to globals only — there are no nested
/// lexical scopes in this assembler.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name` at `location` with `value`. Returns the previous
    /// definition, if any — the caller (assembler driver pass 1) decides
    /// whether a redefinition is an error.
    pub fn define(&mut self, name: impl Into<String>, value: Value, location: Location) -> Option<Symbol> {
        self.entries.insert(name.into(), Symbol { value, defined_at: location, is_resolved: true })
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.entries.iter()
    }
}

/// The set of symbols visible to an expression evaluation, plus the
/// location context (`$`) that evaluation happens at. Wraps the global
/// [`SymbolTable`] rather than exposing it directly so that future
/// built-in pseudo-symbols (CPU variant flags, etc.) have one seam.
pub struct ConstantSet<'a> {
    symbols: &'a SymbolTable,
    pub current_address: u32,
}

impl<'a> ConstantSet<'a> {
    #[must_use]
    pub const fn new(symbols: &'a SymbolTable, current_address: u32) -> Self {
        Self { symbols, current_address }
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_lookup() {
        let mut table = SymbolTable::new();
        table.define("myLabel", Value::U32(0x8000), Location::new(5, 1));
        let sym = table.lookup("myLabel").unwrap();
        assert_eq!(sym.value, Value::U32(0x8000));
        assert!(sym.is_resolved);
    }

    #[test]
    fn redefinition_returns_previous() {
        let mut table = SymbolTable::new();
        table.define("x", Value::U32(1), Location::new(1, 1));
        let prev = table.define("x", Value::U32(2), Location::new(2, 1));
        assert_eq!(prev.unwrap().value, Value::U32(1));
        assert_eq!(table.lookup("x").unwrap().value, Value::U32(2));
    }
}
