//! The *expression* lexical context (§4.I): literals, symbols, unary/binary
//! operators, parentheses and `$` (current address). Pushed by the parser
//! whenever it descends into an operand that is a general expression
//! (most instruction operands, `EQU*` arguments, `%ALIGN`'s argument).
//!
//! Bitwise/logical operators are the keywords `AND`/`OR`/`EOR`(a synonym for
//! `XOR`)/`NOT`/`MOD` rather than `&`/`|`/`^`/`~`/`%` symbols, since `&` is
//! already the hexadecimal literal prefix and `%` the binary one — this
//! context never sees a leading `%` as a directive marker the way the
//! statement context does.

use crate::context::{LexicalContext, leading_trivia};
use crate::cursor::Cursor;
use crate::scan;
use crate::token::{Token, TokenKind};

pub struct ExpressionContext;

impl LexicalContext for ExpressionContext {
    fn try_next_token(&self, cursor: &mut Cursor<'_>) -> Option<Token> {
        if let Some(token) = leading_trivia(cursor) {
            return Some(token);
        }
        let location = cursor.location();
        let ch = cursor.peek()?;

        let kind = match ch {
            '+' => consume(cursor, TokenKind::Plus),
            '-' => consume(cursor, TokenKind::Minus),
            '*' => consume(cursor, TokenKind::Asterisk),
            '/' => consume(cursor, TokenKind::Slash),
            '!' => consume(cursor, TokenKind::Bang),
            '(' => consume(cursor, TokenKind::OpenParenthesis),
            ')' => consume(cursor, TokenKind::CloseParenthesis),
            '[' => consume(cursor, TokenKind::OpenBracket),
            ']' => consume(cursor, TokenKind::CloseBracket),
            '{' => consume(cursor, TokenKind::OpenBrace),
            '}' => consume(cursor, TokenKind::CloseBrace),
            '#' => consume(cursor, TokenKind::Hash),
            '$' => consume(cursor, TokenKind::Dollar),
            ',' => consume(cursor, TokenKind::Comma),
            '&' => scan::scan_number(cursor),
            '%' if matches!(cursor.peek2(), Some('0' | '1')) => scan_binary(cursor),
            '<' => {
                cursor.bump();
                if cursor.peek() == Some('<') {
                    cursor.bump();
                    TokenKind::ShiftLeft
                } else {
                    TokenKind::Error("expected '<<'".to_string())
                }
            }
            '>' => {
                cursor.bump();
                if cursor.peek() == Some('>') {
                    cursor.bump();
                    if cursor.peek() == Some('>') {
                        cursor.bump();
                        TokenKind::ArithmeticShiftRight
                    } else {
                        TokenKind::ShiftRight
                    }
                } else {
                    TokenKind::Error("expected '>>'".to_string())
                }
            }
            '.' if !cursor.peek2().is_some_and(|c| c.is_ascii_digit()) => {
                cursor.bump();
                let name = scan::scan_identifier(cursor);
                TokenKind::Identifier(format!(".{name}"))
            }
            '\'' | '"' => {
                cursor.bump();
                scan::scan_string(cursor, ch)
            }
            c if c.is_ascii_digit() => scan::scan_number(cursor),
            c if scan::is_identifier_start(c) => {
                let word = scan::scan_identifier(cursor);
                match word.to_ascii_uppercase().as_str() {
                    "AND" => TokenKind::KeywordAnd,
                    "OR" => TokenKind::KeywordOr,
                    "EOR" | "XOR" => TokenKind::KeywordXor,
                    "NOT" => TokenKind::KeywordNot,
                    "MOD" => TokenKind::KeywordMod,
                    _ => {
                        if let Some(index) = scan::register_from_name(&word) {
                            TokenKind::Register(index)
                        } else {
                            TokenKind::Identifier(word)
                        }
                    }
                }
            }
            other => {
                cursor.bump();
                TokenKind::Error(format!("unexpected character '{other}' in expression"))
            }
        };
        Some(Token::new(location, kind))
    }
}

fn consume(cursor: &mut Cursor<'_>, kind: TokenKind) -> TokenKind {
    cursor.bump();
    kind
}

fn scan_binary(cursor: &mut Cursor<'_>) -> TokenKind {
    cursor.bump(); // '%'
    let mut digits = String::new();
    while matches!(cursor.peek(), Some('0' | '1')) {
        digits.push(cursor.bump().unwrap());
    }
    TokenKind::IntegerLiteral { digits, radix: 2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<TokenKind> {
        let mut cursor = Cursor::new(text);
        let ctx = ExpressionContext;
        let mut out = Vec::new();
        while let Some(t) = ctx.try_next_token(&mut cursor) {
            if t.kind == TokenKind::StatementTerminator {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn arithmetic_expression() {
        let kinds = tokens("1 + 2 * (3 - $)\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntegerLiteral { digits: "1".to_string(), radix: 10 },
                TokenKind::Plus,
                TokenKind::IntegerLiteral { digits: "2".to_string(), radix: 10 },
                TokenKind::Asterisk,
                TokenKind::OpenParenthesis,
                TokenKind::IntegerLiteral { digits: "3".to_string(), radix: 10 },
                TokenKind::Minus,
                TokenKind::Dollar,
                TokenKind::CloseParenthesis,
            ]
        );
    }

    #[test]
    fn symbol_reference() {
        let kinds = tokens("myLabel\n");
        assert_eq!(kinds, vec![TokenKind::Identifier("myLabel".to_string())]);
    }

    #[test]
    fn shift_operators() {
        assert_eq!(tokens("1 << 2\n")[1], TokenKind::ShiftLeft);
        assert_eq!(tokens("1 >> 2\n")[1], TokenKind::ShiftRight);
        assert_eq!(tokens("1 >>> 2\n")[1], TokenKind::ArithmeticShiftRight);
    }

    #[test]
    fn keyword_operators_are_case_insensitive() {
        assert_eq!(tokens("a and b")[1], TokenKind::KeywordAnd);
        assert_eq!(tokens("a OR b")[1], TokenKind::KeywordOr);
        assert_eq!(tokens("a EOR b")[1], TokenKind::KeywordXor);
        assert_eq!(tokens("NOT a")[0], TokenKind::KeywordNot);
        assert_eq!(tokens("5 mod 2")[1], TokenKind::KeywordMod);
    }

    #[test]
    fn binary_literal_prefix() {
        let kinds = tokens("%01001\n");
        assert_eq!(kinds[0], TokenKind::IntegerLiteral { digits: "01001".to_string(), radix: 2 });
    }
}
