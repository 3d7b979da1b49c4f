//! Located diagnostics and the error taxonomy for the assembler driver (§7):
//! lexical/parse errors, semantic errors from expression evaluation, and
//! encode errors from the instruction builder, plus the messages log pass 2
//! accumulates rather than aborting on the first failure.

use std::fmt;

use arm_asm_lexer::Location;
use arm_asm_syntax::{ParseError, SemanticError};

/// An operand or pseudo-op resolved fine but couldn't be turned into a bit
/// pattern — out-of-range immediate, unencodable `ADR` displacement, PC-
/// relative branch too far, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeError {
    pub location: Location,
    pub message: String,
}

impl EncodeError {
    #[must_use]
    pub const fn new(location: Location, message: String) -> Self {
        Self { location, message }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.message)
    }
}

impl std::error::Error for EncodeError {}

/// One diagnostic raised anywhere in the two passes.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Parse(ParseError),
    Semantic(SemanticError),
    Encode(EncodeError),
    /// `%INCLUDE` failures, duplicate labels, unknown directives/mnemonics —
    /// things that are neither a grammar nor a value-evaluation problem.
    Driver { location: Location, message: String },
}

impl Diagnostic {
    #[must_use]
    pub const fn location(&self) -> Location {
        match self {
            Self::Parse(e) => e.location,
            Self::Semantic(e) => e.location,
            Self::Encode(e) => e.location,
            Self::Driver { location, .. } => *location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Semantic(e) => write!(f, "{e}"),
            Self::Encode(e) => write!(f, "{e}"),
            Self::Driver { location, message } => write!(f, "{location}: error: {message}"),
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<SemanticError> for Diagnostic {
    fn from(e: SemanticError) -> Self {
        Self::Semantic(e)
    }
}

impl From<EncodeError> for Diagnostic {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

/// The accumulated messages log (§7): assembly keeps going after a single
/// statement fails so a user sees every error in one run, not one per
/// invocation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.items.push(diagnostic.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}
