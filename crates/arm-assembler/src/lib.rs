//! Two-pass ARM assembler (§4.L): source text to [`ObjectCode`].
//!
//! Pass 1 walks the statement stream once, assigning each statement a
//! tentative address and splicing in any `%INCLUDE`d files; pass 2 resolves
//! every expression against the now-complete symbol table and emits bytes.
//! Failures at any stage accumulate into a [`Diagnostics`] log rather than
//! aborting assembly early.

mod adr;
mod builder;
mod diagnostic;
mod directive;
mod driver;
mod eval_helpers;
mod mnemonic;
mod object_code;
mod parser;

pub use adr::AdrForm;
pub use diagnostic::{Diagnostic, Diagnostics, EncodeError};
pub use driver::{FsIncludeLoader, IncludeLoader, NullIncludeLoader, Options, assemble, assemble_with_loader};
pub use mnemonic::{ParsedMnemonic, Stem, classify};
pub use object_code::{ObjectCode, ResolvedSymbol};
