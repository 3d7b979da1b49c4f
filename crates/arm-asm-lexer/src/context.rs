//! The lexical-context contract (§4.I) and the stack the parser pushes
//! onto before consuming operands of a given kind.

use crate::cursor::{Cursor, TriviaResult};
use crate::token::{Token, TokenKind};

/// An object which turns characters into tokens for one syntactic region
/// (a statement, an expression, a register list, a PSR name). Mirrors
/// `ILexicalContext::tryGetNextToken` — the AST-construction half of the
/// original interface (`tryCreateNodeFromStartToken`) lives in
/// `arm-asm-syntax` instead, expressed as ordinary parser functions rather
/// than virtual dispatch per node.
pub trait LexicalContext {
    /// Attempts to recognise the next token. Returns `None` only when no
    /// characters remain (not even enough for an error token).
    fn try_next_token(&self, cursor: &mut Cursor<'_>) -> Option<Token>;
}

/// Skips whitespace/comments/continuations common to every context.
/// Returns `Some` if that trivia itself produced a token (a statement
/// terminator or a continuation warning); `None` means the cursor now
/// sits at the start of a real token, or at end of input.
pub fn leading_trivia(cursor: &mut Cursor<'_>) -> Option<Token> {
    loop {
        let location = cursor.location();
        match cursor.skip_trivia() {
            TriviaResult::Continue => return None,
            TriviaResult::Terminator => return Some(Token::new(location, TokenKind::StatementTerminator)),
            TriviaResult::Warning(message) => return Some(Token::new(location, TokenKind::Warning(message))),
        }
    }
}

/// A stack of lexical contexts; the parser pushes one before descending
/// into a sub-grammar (a `{register list}`, a PSR operand) and pops it on
/// the closing token.
pub struct LexerStack<'a> {
    cursor: Cursor<'a>,
    contexts: Vec<Box<dyn LexicalContext>>,
}

impl<'a> LexerStack<'a> {
    #[must_use]
    pub fn new(text: &'a str, base: Box<dyn LexicalContext>) -> Self {
        Self { cursor: Cursor::new(text), contexts: vec![base] }
    }

    pub fn push(&mut self, context: Box<dyn LexicalContext>) {
        self.contexts.push(context);
    }

    /// Pops the innermost context. Never pops the base context.
    pub fn pop(&mut self) {
        if self.contexts.len() > 1 {
            self.contexts.pop();
        }
    }

    #[must_use]
    pub fn next_token(&mut self) -> Option<Token> {
        let context = self.contexts.last().expect("base context always present");
        context.try_next_token(&mut self.cursor)
    }

    #[must_use]
    pub fn location(&self) -> crate::token::Location {
        self.cursor.location()
    }
}
