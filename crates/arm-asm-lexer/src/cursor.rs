//! Character-level plumbing shared by every lexical context: line/column
//! tracking, line continuation (`\`) and line comments (`;`).

use crate::token::Location;

/// A forward-only cursor over a whole translation unit's text, already
/// joined from whatever include chain produced it. Contexts consume
/// characters through this rather than owning their own scanning state,
/// so pushing and popping a context stack never loses position.
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

/// What happened while skipping whitespace/comments/continuations.
pub enum TriviaResult {
    /// Trivia exhausted; a real token (or end of input) follows.
    Continue,
    /// An unescaped newline ended the statement.
    Terminator,
    /// A line continuation had trailing, non-comment text before its
    /// newline — recognised and skipped, but reported.
    Warning(String),
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 1, column: 1 }
    }

    #[must_use]
    pub const fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    #[must_use]
    pub fn peek2(&self) -> Option<char> {
        let mut chars = self.text[self.pos..].chars();
        chars.next();
        chars.next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_line_comment(&mut self) {
        while !matches!(self.peek(), None | Some('\n')) {
            self.bump();
        }
    }

    /// Skips spaces/tabs/CRs, `;`-comments and `\`-continuations, leaving
    /// the cursor positioned at the start of the next real token, at an
    /// unescaped newline, or at end of input.
    pub fn skip_trivia(&mut self) -> TriviaResult {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some(';') => self.skip_line_comment(),
                Some('\n') => {
                    self.bump();
                    return TriviaResult::Terminator;
                }
                Some('\\') => {
                    self.bump();
                    while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                        self.bump();
                    }
                    if self.peek() == Some(';') {
                        self.skip_line_comment();
                    }
                    if self.peek() == Some('\n') || self.is_at_end() {
                        self.bump();
                        continue;
                    }
                    let mut trailing = String::new();
                    while !matches!(self.peek(), None | Some('\n')) {
                        trailing.push(self.bump().unwrap());
                    }
                    self.bump(); // the newline that ends the continued line
                    return TriviaResult::Warning(format!(
                        "unexpected characters after line continuation: {}",
                        trailing.trim()
                    ));
                }
                _ => return TriviaResult::Continue,
            }
        }
    }
}
