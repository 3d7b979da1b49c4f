//! The *statement* lexical context (§4.I): the outermost context, active
//! at the start of every line. Recognises labels, directives, mnemonics,
//! operators and punctuation; falls through to [`crate::scan`] for
//! identifiers, numbers and strings.

use crate::context::{LexicalContext, leading_trivia};
use crate::cursor::Cursor;
use crate::scan;
use crate::token::{Location, Token, TokenKind};

pub struct StatementContext;

impl LexicalContext for StatementContext {
    fn try_next_token(&self, cursor: &mut Cursor<'_>) -> Option<Token> {
        if let Some(token) = leading_trivia(cursor) {
            return Some(token);
        }
        let location = cursor.location();
        let ch = cursor.peek()?;

        let kind = match ch {
            '.' => {
                cursor.bump();
                let name = scan::scan_identifier(cursor);
                if name.is_empty() {
                    TokenKind::Error("expected a label name after '.'".to_string())
                } else {
                    TokenKind::Label(name)
                }
            }
            '%' => {
                cursor.bump();
                let name = scan::scan_identifier(cursor);
                if name.is_empty() {
                    TokenKind::Error("expected a directive name after '%'".to_string())
                } else {
                    TokenKind::Directive(name)
                }
            }
            ':' => {
                cursor.bump();
                TokenKind::StatementTerminator
            }
            '+' => {
                cursor.bump();
                TokenKind::Plus
            }
            '-' => {
                cursor.bump();
                TokenKind::Minus
            }
            '*' => {
                cursor.bump();
                TokenKind::Asterisk
            }
            '/' => {
                cursor.bump();
                TokenKind::Slash
            }
            '&' => scan_number_or(cursor),
            '$' => {
                cursor.bump();
                TokenKind::Dollar
            }
            '(' => {
                cursor.bump();
                TokenKind::OpenParenthesis
            }
            ')' => {
                cursor.bump();
                TokenKind::CloseParenthesis
            }
            '{' => {
                cursor.bump();
                TokenKind::OpenBrace
            }
            '}' => {
                cursor.bump();
                TokenKind::CloseBrace
            }
            ',' => {
                cursor.bump();
                TokenKind::Comma
            }
            '#' => {
                cursor.bump();
                TokenKind::Hash
            }
            '!' => {
                cursor.bump();
                TokenKind::Bang
            }
            '^' => {
                cursor.bump();
                TokenKind::Caret
            }
            '\'' | '"' => {
                cursor.bump();
                scan::scan_string(cursor, ch)
            }
            c if c.is_ascii_digit() => scan::scan_number(cursor),
            c if scan::is_identifier_start(c) => scan_word(cursor),
            other => {
                cursor.bump();
                TokenKind::Error(format!("unexpected character '{other}'"))
            }
        };
        Some(Token::new(location, kind))
    }
}

fn scan_number_or(cursor: &mut Cursor<'_>) -> TokenKind {
    scan::scan_number(cursor)
}

/// A bare word at statement level is, in order of preference: a register
/// name, then an identifier (mnemonic or label reference) — the syntax
/// layer decides which once it knows the grammatical position.
fn scan_word(cursor: &mut Cursor<'_>) -> TokenKind {
    let word = scan::scan_identifier(cursor);
    if let Some(index) = scan::register_from_name(&word) {
        return TokenKind::Register(index);
    }
    TokenKind::Identifier(word)
}

/// Convenience entry point: lex a whole statement's worth of tokens (up to
/// and including the terminator) from the cursor, for callers that don't
/// need to interleave a nested context.
#[must_use]
pub fn lex_statement(cursor: &mut Cursor<'_>) -> Vec<Token> {
    let ctx = StatementContext;
    let mut tokens = Vec::new();
    loop {
        match ctx.try_next_token(cursor) {
            None => break,
            Some(tok) => {
                let is_terminator = tok.kind == TokenKind::StatementTerminator;
                tokens.push(tok);
                if is_terminator {
                    break;
                }
            }
        }
    }
    tokens
}

#[must_use]
pub fn location_of(tokens: &[Token]) -> Location {
    tokens.first().map_or(Location::new(1, 1), |t| t.location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<TokenKind> {
        let mut cursor = Cursor::new(text);
        lex_statement(&mut cursor).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn label_and_mnemonic() {
        let kinds = tokens(".loop MOV R0, R1\n");
        assert_eq!(kinds[0], TokenKind::Label("loop".to_string()));
        assert_eq!(kinds[1], TokenKind::Identifier("MOV".to_string()));
        assert_eq!(kinds[2], TokenKind::Register(0));
        assert_eq!(kinds[3], TokenKind::Comma);
        assert_eq!(kinds[4], TokenKind::Register(1));
        assert_eq!(kinds[5], TokenKind::StatementTerminator);
    }

    #[test]
    fn directive_keyword() {
        let kinds = tokens("%ARMv4\n");
        assert_eq!(kinds[0], TokenKind::Directive("ARMv4".to_string()));
    }

    #[test]
    fn hex_literal_with_ampersand_prefix() {
        let kinds = tokens("&DEAD\n");
        assert_eq!(kinds[0], TokenKind::IntegerLiteral { digits: "DEAD".to_string(), radix: 16 });
    }

    #[test]
    fn colon_terminates_a_statement_like_newline() {
        let kinds = tokens("NOP:NOP\n");
        assert_eq!(kinds[0], TokenKind::Identifier("NOP".to_string()));
        assert_eq!(kinds[1], TokenKind::StatementTerminator);
    }

    #[test]
    fn caret_after_register_list_is_its_own_token() {
        let kinds = tokens("LDMFD R13!, {R0-R4}^\n");
        assert_eq!(kinds.last().cloned(), Some(TokenKind::StatementTerminator));
        assert!(kinds.contains(&TokenKind::Caret));
    }
}
