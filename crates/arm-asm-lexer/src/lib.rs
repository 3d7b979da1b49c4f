//! Pluggable lexical contexts for the assembler source grammar (§4.I): a
//! character-level cursor shared by every context, the token alphabet, and
//! four concrete contexts (statement, expression, core register list, PSR
//! name) the parser pushes onto a stack as it descends into each kind of
//! operand.

mod context;
mod cursor;
mod expression;
mod psr;
mod register_list;
pub mod scan;
mod statement;
mod token;

pub use context::{LexerStack, LexicalContext, leading_trivia};
pub use cursor::{Cursor, TriviaResult};
pub use expression::ExpressionContext;
pub use psr::parse_psr_name;
pub use register_list::{RegisterListContext, parse_register_list};
pub use statement::{StatementContext, lex_statement, location_of};
pub use token::{Location, PsrSuffix, Token, TokenKind};
