//! Character-class scanners shared by the statement and expression lexers:
//! identifiers, numeric literals (decimal, `0x`/`&`-prefixed hex, `0b`
//! binary, real) and quoted strings with the escape grammar from §6.

use crate::cursor::Cursor;
use crate::token::TokenKind;

#[must_use]
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

#[must_use]
pub fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub fn scan_identifier(cursor: &mut Cursor<'_>) -> String {
    let mut text = String::new();
    while let Some(ch) = cursor.peek() {
        if is_identifier_continue(ch) {
            text.push(ch);
            cursor.bump();
        } else {
            break;
        }
    }
    text
}

/// Scans a numeric literal starting at the cursor's current position.
/// Accepts `&HEX`, `0xHEX`/`0XHEX`, `0bBINARY`, and decimal integers which
/// may continue into a real literal (`123.456`, `1e10`).
pub fn scan_number(cursor: &mut Cursor<'_>) -> TokenKind {
    if cursor.peek() == Some('&') {
        cursor.bump();
        let digits = take_while_hex(cursor);
        return TokenKind::IntegerLiteral { digits, radix: 16 };
    }
    if cursor.peek() == Some('0') && matches!(cursor.peek2(), Some('x' | 'X')) {
        cursor.bump();
        cursor.bump();
        let digits = take_while_hex(cursor);
        return TokenKind::IntegerLiteral { digits, radix: 16 };
    }
    if cursor.peek() == Some('0') && matches!(cursor.peek2(), Some('b' | 'B')) {
        cursor.bump();
        cursor.bump();
        let digits = take_while(cursor, |c| c == '0' || c == '1');
        return TokenKind::IntegerLiteral { digits, radix: 2 };
    }

    let mut text = take_while(cursor, |c| c.is_ascii_digit());
    let mut is_real = false;
    if cursor.peek() == Some('.') && cursor.peek2().is_some_and(|c| c.is_ascii_digit()) {
        is_real = true;
        text.push(cursor.bump().unwrap());
        text.push_str(&take_while(cursor, |c| c.is_ascii_digit()));
    }
    if matches!(cursor.peek(), Some('e' | 'E'))
        && (cursor.peek2().is_some_and(|c| c.is_ascii_digit()) || cursor.peek2() == Some('-'))
    {
        is_real = true;
        text.push(cursor.bump().unwrap());
        if cursor.peek() == Some('-') {
            text.push(cursor.bump().unwrap());
        }
        text.push_str(&take_while(cursor, |c| c.is_ascii_digit()));
    }

    if is_real {
        TokenKind::RealLiteral(text)
    } else {
        TokenKind::IntegerLiteral { digits: text, radix: 10 }
    }
}

fn take_while(cursor: &mut Cursor<'_>, pred: impl Fn(char) -> bool) -> String {
    let mut text = String::new();
    while let Some(ch) = cursor.peek() {
        if pred(ch) {
            text.push(ch);
            cursor.bump();
        } else {
            break;
        }
    }
    text
}

fn take_while_hex(cursor: &mut Cursor<'_>) -> String {
    take_while(cursor, |c| c.is_ascii_hexdigit())
}

/// Scans a single-quoted or double-quoted string literal, the opening
/// quote already consumed by the caller. Supports `\xHH`, `\uHHHH`,
/// `\UHHHHHHHH` and the conventional C-style single-character escapes.
pub fn scan_string(cursor: &mut Cursor<'_>, quote: char) -> TokenKind {
    let mut text = String::new();
    loop {
        match cursor.peek() {
            None | Some('\n') => return TokenKind::Error("unterminated string literal".to_string()),
            Some(ch) if ch == quote => {
                cursor.bump();
                return TokenKind::StringLiteral(text);
            }
            Some('\\') => {
                cursor.bump();
                match scan_escape(cursor) {
                    Some(ch) => text.push(ch),
                    None => return TokenKind::Error("invalid escape sequence in string literal".to_string()),
                }
            }
            Some(ch) => {
                text.push(ch);
                cursor.bump();
            }
        }
    }
}

fn scan_escape(cursor: &mut Cursor<'_>) -> Option<char> {
    let ch = cursor.bump()?;
    match ch {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '0' => Some('\0'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        'x' => scan_hex_escape(cursor, 1, 2),
        'u' => scan_hex_escape(cursor, 4, 4),
        'U' => scan_hex_escape(cursor, 8, 8),
        _ => None,
    }
}

/// Recognises a core register name: `R0`..`R15`, or the aliases `PC`,
/// `LR`, `SP`. Case-insensitive, as the whole assembly grammar is.
#[must_use]
pub fn register_from_name(word: &str) -> Option<u8> {
    let upper = word.to_ascii_uppercase();
    match upper.as_str() {
        "PC" => return Some(15),
        "LR" => return Some(14),
        "SP" => return Some(13),
        _ => {}
    }
    let digits = upper.strip_prefix('R')?;
    let index: u8 = digits.parse().ok()?;
    (index < 16).then_some(index)
}

fn scan_hex_escape(cursor: &mut Cursor<'_>, min_digits: usize, max_digits: usize) -> Option<char> {
    let mut digits = String::new();
    while digits.len() < max_digits && cursor.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
        digits.push(cursor.bump().unwrap());
    }
    if digits.len() < min_digits {
        return None;
    }
    let value = u32::from_str_radix(&digits, 16).ok()?;
    char::from_u32(value)
}
