//! Parser Cursor
//!
//! A speculative window over the token buffer. Every grammar rule works on a
//! child cursor opened with [`Cursor::goal`] at its parent's position; when
//! the rule succeeds the parent calls [`Cursor::score`] to take over the
//! child's progress, and when it fails the child is simply dropped.

use crate::parser::lexer::{Token, TokenType};
use crate::parser::token_buffer::{TokenBuffer, TokenIndex, TokenSpan};
use crate::parser::types::{ErrorKind, ParseError, ParserOptions};

/// Token at which an inner grammar reports the end of its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub token_type: TokenType,
    /// Empty matches any value
    pub value: &'static str,
}

impl Stop {
    fn matches(&self, token: &Token) -> bool {
        token.token_type == self.token_type && (self.value.is_empty() || token.value == self.value)
    }
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buffer: &'a TokenBuffer,
    start: TokenIndex,
    pos: TokenIndex,
    limit: TokenIndex,
    stop: Option<Stop>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a TokenBuffer, options: &ParserOptions) -> Self {
        Self {
            buffer,
            start: 0,
            pos: 0,
            limit: buffer.len(),
            stop: None,
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    pub fn buffer(&self) -> &'a TokenBuffer {
        self.buffer
    }

    /// Open a child window at the current position
    pub fn goal(&self) -> Cursor<'a> {
        Cursor {
            start: self.pos,
            ..self.clone()
        }
    }

    /// Open a child window one nesting level deeper
    pub fn nested(&self, production: &'static str) -> Result<Cursor<'a>, ParseError> {
        if self.depth >= self.max_depth {
            return Err(self.error(ErrorKind::LimitExceeded("nesting depth"), production));
        }
        let mut child = self.goal();
        child.depth += 1;
        Ok(child)
    }

    /// Child window that ends at `stop`
    pub fn with_stop(mut self, token_type: TokenType, value: &'static str) -> Self {
        self.stop = Some(Stop { token_type, value });
        self
    }

    /// Child window over `start..end` only
    pub fn bounded(&self, start: TokenIndex, end: TokenIndex) -> Cursor<'a> {
        Cursor {
            start,
            pos: start,
            limit: end.min(self.buffer.len()),
            stop: None,
            ..self.clone()
        }
    }

    /// Commit a child's consumption into this cursor
    pub fn score(&mut self, child: &Cursor<'a>) {
        self.pos = child.pos;
    }

    /// Tokens consumed since this window was opened
    pub fn span(&self) -> TokenSpan {
        TokenSpan::new(self.start, self.pos)
    }

    pub fn position(&self) -> TokenIndex {
        self.pos
    }

    pub fn consumed(&self) -> bool {
        self.pos > self.start
    }

    pub fn peek(&self) -> Option<&'a Token> {
        let token = self.peek_raw()?;
        match self.stop {
            Some(stop) if stop.matches(token) => None,
            _ => Some(token),
        }
    }

    /// Next token ignoring the stop token
    fn peek_raw(&self) -> Option<&'a Token> {
        if self.pos < self.limit {
            self.buffer.get(self.pos)
        } else {
            None
        }
    }

    /// Token `n` places ahead, ignoring the stop token
    pub fn peek_at(&self, n: usize) -> Option<&'a Token> {
        let index = self.pos + n;
        if index < self.limit {
            self.buffer.get(index)
        } else {
            None
        }
    }

    /// Token `n` places ahead when only whitespace separates it from here
    pub fn peek_past_whitespace(&self, mut n: usize) -> Option<&'a Token> {
        while let Some(token) = self.peek_at(n) {
            if token.token_type != TokenType::Whitespace {
                return Some(token);
            }
            n += 1;
        }
        None
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Consume the next token and return its index
    pub fn take(&mut self) -> Option<TokenIndex> {
        self.next()?;
        Some(self.pos - 1)
    }

    pub fn backup(&mut self) {
        if self.pos > self.start {
            self.pos -= 1;
        }
    }

    pub fn accept(&mut self, types: &[TokenType]) -> Option<&'a Token> {
        let token = self.peek()?;
        if types.contains(&token.token_type) {
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    pub fn accept_run(&mut self, types: &[TokenType]) -> usize {
        let mut count = 0;
        while self.accept(types).is_some() {
            count += 1;
        }
        count
    }

    pub fn accept_value(&mut self, token_type: TokenType, value: &str) -> Option<&'a Token> {
        let token = self.peek()?;
        if token.is(token_type, value) {
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    pub fn accept_punct(&mut self, value: &str) -> Option<&'a Token> {
        self.accept_value(TokenType::Punctuator, value)
    }

    pub fn accept_keyword(&mut self, value: &str) -> Option<&'a Token> {
        self.accept_value(TokenType::Keyword, value)
    }

    /// Accept a closing token even when it is this window's stop token
    pub fn accept_closer(&mut self, token_type: TokenType, value: &str) -> Option<&'a Token> {
        let token = self.peek_raw()?;
        if token.token_type == token_type && (value.is_empty() || token.value == value) {
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    pub fn skip_whitespace(&mut self) -> usize {
        self.accept_run(&[TokenType::Whitespace])
    }

    /// Accept a line terminator together with the heredoc bodies queued
    /// behind it
    pub fn accept_line_terminator(&mut self) -> bool {
        if self.accept(&[TokenType::LineTerminator]).is_none() {
            return false;
        }
        let mut pending = self.heredocs_before(self.pos - 1);
        while pending > 0 {
            let Some(token) = self.peek_raw() else {
                break;
            };
            self.pos += 1;
            if token.token_type == TokenType::HeredocEnd {
                pending -= 1;
            }
        }
        true
    }

    /// Heredoc operators between the previous line boundary and `index`
    fn heredocs_before(&self, index: TokenIndex) -> usize {
        let tokens = self.buffer.tokens();
        let mut count = 0;
        for (i, token) in tokens[..index.min(tokens.len())].iter().enumerate().rev() {
            match token.token_type {
                TokenType::LineTerminator | TokenType::HeredocEnd => break,
                TokenType::Punctuator if is_heredoc_operator(tokens, i) => count += 1,
                _ => {}
            }
        }
        count
    }

    /// Range of the heredoc body introduced by the operator at `op`, ending
    /// with the index of its `HeredocEnd` token
    pub fn heredoc_body(&self, op: TokenIndex) -> Option<(TokenIndex, TokenIndex)> {
        let tokens = self.buffer.tokens();
        let skip = self.heredocs_before(op);
        let newline = (op..tokens.len()).find(|&i| tokens[i].token_type == TokenType::LineTerminator)?;
        let mut start = newline + 1;
        let mut seen = 0;
        for (i, token) in tokens.iter().enumerate().skip(start) {
            if token.token_type == TokenType::HeredocEnd {
                if seen == skip {
                    return Some((start, i));
                }
                seen += 1;
                start = i + 1;
            }
        }
        None
    }

    /// Token to blame for a failure at the current position
    pub fn error_token(&self) -> Token {
        self.peek_raw()
            .unwrap_or_else(|| self.buffer.token(self.pos.max(self.limit)))
            .clone()
    }

    pub fn error(&self, kind: ErrorKind, production: &'static str) -> ParseError {
        ParseError::leaf(kind, production, self.error_token())
    }

    /// Failure for a token no rule accepts at this position
    pub fn unexpected(&self, production: &'static str) -> ParseError {
        match self.peek_raw() {
            Some(token) => self.error(ErrorKind::UnexpectedToken(token.value.clone()), production),
            None => self.error(ErrorKind::UnexpectedEof, production),
        }
    }

    /// Whether the window starts right after a line boundary
    pub fn at_line_start(&self) -> bool {
        self.start == 0
            || self.buffer.get(self.start - 1).map_or(true, |t| {
                matches!(t.token_type, TokenType::LineTerminator | TokenType::HeredocEnd)
            })
    }
}

/// `<<` or `<<-` followed by a delimiter word, as opposed to a shift
pub fn is_heredoc_operator(tokens: &[Token], index: TokenIndex) -> bool {
    let token = &tokens[index];
    if !(token.is_punct("<<") || token.is_punct("<<-")) {
        return false;
    }
    tokens[index + 1..]
        .iter()
        .find(|t| t.token_type != TokenType::Whitespace)
        .is_some_and(|t| t.token_type == TokenType::Word)
}
