//! The expression tree (§3 Expression node, §4.K) and its recursive-descent
//! parser. Each node is a variant the parser matches on rather than a
//! trait object, per the Design Notes' "AST incremental protocol" guidance
//! — `parse_expression` is itself the `applyToken` loop, expressed as
//! ordinary precedence-climbing recursion instead of virtual dispatch, so
//! every case is exhaustively checked at compile time.

use crate::error::ParseError;
use arm_asm_lexer::{Location, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    /// Unary `+` — absolute value, not a no-op (§8 `AbsoluteConstants`:
    /// `+(-42)` evaluates to `42`).
    Absolute,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    ShiftLeft,
    ShiftRight,
    ArithmeticShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    /// `MOD` — integer remainder, rejects float/string operands.
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    IntegerLiteral { digits: String, radix: u32, location: Location },
    RealLiteral { digits: String, location: Location },
    StringLiteral { text: String, location: Location },
    Symbol { id: String, location: Location },
    /// `$` — the address of the current statement.
    CurrentOffset { location: Location },
    Parenthesis(Box<ExprNode>),
    Unary { op: UnaryOp, child: Box<ExprNode>, location: Location },
    Binary { op: BinaryOp, lhs: Box<ExprNode>, rhs: Box<ExprNode>, location: Location },
}

impl ExprNode {
    #[must_use]
    pub fn location(&self) -> Location {
        match self {
            Self::IntegerLiteral { location, .. }
            | Self::RealLiteral { location, .. }
            | Self::StringLiteral { location, .. }
            | Self::Symbol { location, .. }
            | Self::CurrentOffset { location }
            | Self::Unary { location, .. }
            | Self::Binary { location, .. } => *location,
            Self::Parenthesis(inner) => inner.location(),
        }
    }
}

/// A cursor over one statement's tokens (terminator excluded by the
/// caller), consumed left to right by the precedence-climbing parser.
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

/// Parse a full expression from the front of `tokens`, returning the tree
/// and how many tokens it consumed. Stops at the first token that isn't
/// part of the expression (a `,`, a statement terminator, an unmatched
/// `)`, end of input) rather than erroring — the caller decides whether
/// that's expected.
pub fn parse_expression(tokens: &[Token]) -> Result<(ExprNode, usize), ParseError> {
    let mut cursor = Cursor { tokens, pos: 0 };
    let node = parse_binary(&mut cursor, 0)?;
    Ok((node, cursor.pos))
}

/// Precedence, low to high: `AND`/`OR`/`EOR` bind loosest, then the
/// shifts, then `+`/`-`, then `*`/`/`/`MOD` tightest — matching the original
/// parser's left-to-right grouping at equal precedence (§8 `BinaryOpLToR`).
fn binary_op_and_precedence(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::KeywordAnd => (BinaryOp::BitAnd, 1),
        TokenKind::KeywordOr => (BinaryOp::BitOr, 1),
        TokenKind::KeywordXor => (BinaryOp::BitXor, 1),
        TokenKind::ShiftLeft => (BinaryOp::ShiftLeft, 2),
        TokenKind::ShiftRight => (BinaryOp::ShiftRight, 2),
        TokenKind::ArithmeticShiftRight => (BinaryOp::ArithmeticShiftRight, 2),
        TokenKind::Plus => (BinaryOp::Add, 3),
        TokenKind::Minus => (BinaryOp::Sub, 3),
        TokenKind::Asterisk => (BinaryOp::Mul, 4),
        TokenKind::Slash => (BinaryOp::Div, 4),
        TokenKind::KeywordMod => (BinaryOp::Mod, 4),
        _ => return None,
    })
}

fn parse_binary(cursor: &mut Cursor<'_>, min_prec: u8) -> Result<ExprNode, ParseError> {
    let mut lhs = parse_unary(cursor)?;
    while let Some(tok) = cursor.peek() {
        let Some((op, prec)) = binary_op_and_precedence(&tok.kind) else { break };
        if prec < min_prec {
            break;
        }
        let location = tok.location;
        cursor.bump();
        let rhs = parse_binary(cursor, prec + 1)?;
        lhs = ExprNode::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), location };
    }
    Ok(lhs)
}

fn parse_unary(cursor: &mut Cursor<'_>) -> Result<ExprNode, ParseError> {
    if let Some(tok) = cursor.peek() {
        let op = match tok.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Absolute,
            TokenKind::KeywordNot => UnaryOp::BitNot,
            _ => return parse_primary(cursor),
        };
        let location = tok.location;
        cursor.bump();
        let child = parse_unary(cursor)?;
        return Ok(ExprNode::Unary { op, child: Box::new(child), location });
    }
    Err(ParseError::new(Location::default(), "expected an expression, found end of input".to_string()))
}

fn parse_primary(cursor: &mut Cursor<'_>) -> Result<ExprNode, ParseError> {
    let Some(tok) = cursor.bump() else {
        return Err(ParseError::new(Location::default(), "expected an expression, found end of input".to_string()));
    };
    let location = tok.location;
    match &tok.kind {
        TokenKind::IntegerLiteral { digits, radix } => {
            Ok(ExprNode::IntegerLiteral { digits: digits.clone(), radix: *radix, location })
        }
        TokenKind::RealLiteral(digits) => Ok(ExprNode::RealLiteral { digits: digits.clone(), location }),
        TokenKind::StringLiteral(text) => Ok(ExprNode::StringLiteral { text: text.clone(), location }),
        TokenKind::Identifier(id) => Ok(ExprNode::Symbol { id: id.clone(), location }),
        TokenKind::Register(r) => Ok(ExprNode::Symbol { id: format!("R{r}"), location }),
        TokenKind::Dollar => Ok(ExprNode::CurrentOffset { location }),
        TokenKind::OpenParenthesis => {
            let inner = parse_binary(cursor, 0)?;
            match cursor.bump() {
                Some(Token { kind: TokenKind::CloseParenthesis, .. }) => Ok(ExprNode::Parenthesis(Box::new(inner))),
                _ => Err(ParseError::new(location, "expected a closing ')'".to_string())),
            }
        }
        other => Err(ParseError::new(location, format!("expected an expression, found {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_asm_lexer::{Cursor as LexCursor, ExpressionContext, LexicalContext};

    fn lex(text: &str) -> Vec<Token> {
        let mut cursor = LexCursor::new(text);
        let ctx = ExpressionContext;
        let mut out = Vec::new();
        while let Some(tok) = ctx.try_next_token(&mut cursor) {
            if tok.kind == TokenKind::StatementTerminator {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn precedence_multiplies_before_adds() {
        let tokens = lex("42 + 9 * 11\n");
        let (node, consumed) = parse_expression(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match node {
            ExprNode::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, ExprNode::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn precedence_inversion_still_adds_at_top() {
        let tokens = lex("42 * 9 + 11\n");
        let (node, _) = parse_expression(&tokens).unwrap();
        match node {
            ExprNode::Binary { op: BinaryOp::Add, lhs, .. } => {
                assert!(matches!(*lhs, ExprNode::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_addition() {
        let tokens = lex("-5 + 11\n");
        let (node, _) = parse_expression(&tokens).unwrap();
        match node {
            ExprNode::Binary { op: BinaryOp::Add, lhs, .. } => {
                assert!(matches!(*lhs, ExprNode::Unary { op: UnaryOp::Negate, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parenthesis_overrides_precedence() {
        let tokens = lex("(1 + 2) * 3\n");
        let (node, _) = parse_expression(&tokens).unwrap();
        match node {
            ExprNode::Binary { op: BinaryOp::Mul, lhs, .. } => {
                assert!(matches!(*lhs, ExprNode::Parenthesis(_)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn stops_before_comma() {
        let tokens = lex("1 + 2, 3\n");
        let (_, consumed) = parse_expression(&tokens).unwrap();
        assert_eq!(tokens[consumed].kind, TokenKind::Comma);
    }

    #[test]
    fn current_offset_and_symbol() {
        let tokens = lex("$ - myLabel\n");
        let (node, _) = parse_expression(&tokens).unwrap();
        match node {
            ExprNode::Binary { op: BinaryOp::Sub, lhs, rhs, .. } => {
                assert!(matches!(*lhs, ExprNode::CurrentOffset { .. }));
                assert!(matches!(*rhs, ExprNode::Symbol { .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn keyword_and_or_xor() {
        let tokens = lex("1 AND 2 OR 3 EOR 4\n");
        let (node, consumed) = parse_expression(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        assert!(matches!(node, ExprNode::Binary { .. }));
    }

    #[test]
    fn modulus_binds_like_multiplication() {
        let tokens = lex("12.5 MOD 3\n");
        let (node, consumed) = parse_expression(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match node {
            ExprNode::Binary { op: BinaryOp::Mod, lhs, rhs, .. } => {
                assert!(matches!(*lhs, ExprNode::RealLiteral { .. }));
                assert!(matches!(*rhs, ExprNode::IntegerLiteral { .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
