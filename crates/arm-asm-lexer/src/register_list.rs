//! The *core register list* lexical context (§4.I): active inside a
//! `{...}` operand of `LDM`/`STM`. Recognises only register names, `-`
//! (range), `,` (separator) and the closing `}`; anything else is an error
//! token rather than falling back to the general expression grammar.

use crate::context::{LexicalContext, leading_trivia};
use crate::cursor::Cursor;
use crate::scan;
use crate::token::{Token, TokenKind};

pub struct RegisterListContext;

impl LexicalContext for RegisterListContext {
    fn try_next_token(&self, cursor: &mut Cursor<'_>) -> Option<Token> {
        if let Some(token) = leading_trivia(cursor) {
            return Some(token);
        }
        let location = cursor.location();
        let ch = cursor.peek()?;

        let kind = match ch {
            '}' => {
                cursor.bump();
                TokenKind::CloseBrace
            }
            ',' => {
                cursor.bump();
                TokenKind::Comma
            }
            '-' => {
                cursor.bump();
                TokenKind::Minus
            }
            '^' => {
                cursor.bump();
                TokenKind::Caret
            }
            c if scan::is_identifier_start(c) => {
                let word = scan::scan_identifier(cursor);
                match scan::register_from_name(&word) {
                    Some(index) => TokenKind::Register(index),
                    None => TokenKind::Error(format!("'{word}' is not a register name")),
                }
            }
            other => {
                cursor.bump();
                TokenKind::Error(format!("unexpected character '{other}' in register list"))
            }
        };
        Some(Token::new(location, kind))
    }
}

/// Parses `{R0-R4, R7, LR}`-style text (braces already consumed by the
/// caller, or present in `text` — both are tolerated) into a 16-bit
/// register mask (bit `n` set means `Rn` is in the list), plus whether a
/// trailing `^` (user-bank transfer marker) was present.
pub fn parse_register_list(text: &str) -> Result<(u16, bool), String> {
    let trimmed = text.trim().strip_prefix('{').unwrap_or(text.trim());
    let mut cursor = Cursor::new(trimmed);
    let ctx = RegisterListContext;
    let mut mask: u16 = 0;
    let mut pending: Option<u8> = None;
    let mut in_range = false;
    let mut caret = false;

    loop {
        let Some(tok) = ctx.try_next_token(&mut cursor) else { break };
        match tok.kind {
            TokenKind::OpenBrace | TokenKind::CloseBrace | TokenKind::StatementTerminator | TokenKind::Warning(_) => {}
            TokenKind::Register(r) => {
                if in_range {
                    let start = pending.ok_or("dangling '-' in register list")?;
                    let (lo, hi) = if start <= r { (start, r) } else { (r, start) };
                    for i in lo..=hi {
                        mask |= 1 << i;
                    }
                    in_range = false;
                    pending = None;
                } else {
                    if let Some(prev) = pending.take() {
                        mask |= 1 << prev;
                    }
                    pending = Some(r);
                }
            }
            TokenKind::Minus => in_range = true,
            TokenKind::Comma => {
                if let Some(prev) = pending.take() {
                    mask |= 1 << prev;
                }
            }
            TokenKind::Caret => caret = true,
            TokenKind::Error(message) => return Err(message),
            other => return Err(format!("unexpected token {other:?} in register list")),
        }
    }
    if let Some(prev) = pending.take() {
        mask |= 1 << prev;
    }
    Ok((mask, caret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_registers_and_commas() {
        let (mask, caret) = parse_register_list("{R0, R7, LR}").unwrap();
        assert_eq!(mask, (1 << 0) | (1 << 7) | (1 << 14));
        assert!(!caret);
    }

    #[test]
    fn ranges_expand_low_to_high() {
        let (mask, _) = parse_register_list("{R0-R4}").unwrap();
        assert_eq!(mask, 0b1_1111);
    }

    #[test]
    fn caret_marks_user_bank_transfer() {
        let (_, caret) = parse_register_list("{R0-R14}^").unwrap();
        assert!(caret);
    }

    #[test]
    fn backwards_range_is_normalised() {
        let (mask, _) = parse_register_list("{R4-R0}").unwrap();
        assert_eq!(mask, 0b1_1111);
    }
}
