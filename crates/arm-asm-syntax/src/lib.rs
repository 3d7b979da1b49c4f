//! Partial AST nodes with token-by-token acceptance (§4.J/§4.K): the
//! expression tree and its precedence-climbing parser, the operand shapes
//! built on top of it, the constant-folding evaluator, and the global
//! symbol table the evaluator consults.

mod error;
mod eval;
mod expr;
mod statement;
mod symbol;

pub use error::{ParseError, SemanticError};
pub use eval::eval;
pub use expr::{BinaryOp, ExprNode, UnaryOp, parse_expression};
pub use statement::{
    MemoryOperand, Offset, Operand, ShiftOperand, parse_address_operand, parse_psr_operand, parse_register_list_operand,
    parse_shifter_operand,
};
pub use symbol::{ConstantSet, Symbol, SymbolTable};
