//! Located diagnostics shared by the syntax tree and its evaluator (§7).

use arm_asm_lexer::Location;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub const fn new(location: Location, message: String) -> Self {
        Self { location, message }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub location: Location,
    pub message: String,
}

impl SemanticError {
    #[must_use]
    pub const fn new(location: Location, message: String) -> Self {
        Self { location, message }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.message)
    }
}

impl std::error::Error for SemanticError {}
