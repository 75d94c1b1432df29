//! Parser Types and Constants
//!
//! Error model, limits and options shared across parser modules.

use std::fmt;

use thiserror::Error;

use crate::parser::lexer::Token;

// Parser limits to prevent hangs and resource exhaustion
pub const MAX_INPUT_SIZE: usize = 10_000_000; // 10MB max input
pub const MAX_TOKENS: usize = 1_000_000; // Max tokens in one buffer
pub const MAX_PARSER_DEPTH: usize = 200; // Max recursion depth for nested constructs

/// Options controlling parser limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub max_input_size: usize,
    pub max_tokens: usize,
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_input_size: MAX_INPUT_SIZE,
            max_tokens: MAX_TOKENS,
            max_depth: MAX_PARSER_DEPTH,
        }
    }
}

/// Leaf causes of lexer and parser failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid numeric literal {0:?}")]
    InvalidNumber(String),
    #[error("invalid assignment")]
    InvalidAssignment,
    #[error("mismatched closing bracket {0:?}")]
    MismatchedBracket(char),
    #[error("incorrect backtick nesting")]
    BacktickNesting,
    #[error("unterminated heredoc, expected {0:?}")]
    UnterminatedHeredoc(String),
    #[error("missing word")]
    MissingWord,
    #[error("missing closing {0:?}")]
    MissingClose(&'static str),
    #[error("invalid end of statement")]
    InvalidEndOfStatement,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    #[error("{0} limit exceeded")]
    LimitExceeded(&'static str),
}

/// What a [`ParseError`] wraps: a deeper error or a leaf cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    Error(Box<ParseError>),
    Leaf(ErrorKind),
}

/// One frame of a parse trace.
///
/// Every production that fails wraps its child's error with its own name,
/// keeping the token at which the innermost production failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub cause: Cause,
    pub production: &'static str,
    pub token: Token,
}

impl ParseError {
    pub fn leaf(kind: ErrorKind, production: &'static str, token: Token) -> Self {
        Self {
            cause: Cause::Leaf(kind),
            production,
            token,
        }
    }

    /// Wrap this error with the name of the enclosing production
    pub fn wrap(self, production: &'static str) -> Self {
        let token = self.token.clone();
        Self {
            cause: Cause::Error(Box::new(self)),
            production,
            token,
        }
    }

    /// The leaf cause at the bottom of the trace
    pub fn root_cause(&self) -> &ErrorKind {
        match &self.cause {
            Cause::Error(inner) => inner.root_cause(),
            Cause::Leaf(kind) => kind,
        }
    }

    /// Production names from the outermost to the innermost frame
    pub fn trace(&self) -> Vec<&'static str> {
        let mut names = vec![self.production];
        let mut cause = &self.cause;
        while let Cause::Error(inner) = cause {
            names.push(inner.production);
            cause = &inner.cause;
        }
        names
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Error(inner) => inner.fmt(f),
            Cause::Leaf(kind) => kind.fmt(f),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: error at position {} ({}:{}):\n{}",
            self.production, self.token.start, self.token.line, self.token.column, self.cause
        )
    }
}

impl std::error::Error for ParseError {}

/// Errors surfaced by the crate's entry points
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::TokenType;

    fn token() -> Token {
        Token::new(TokenType::Punctuator, "||", 3, 5, 1, 4)
    }

    #[test]
    fn test_wrap_keeps_token() {
        let err = ParseError::leaf(ErrorKind::MissingWord, "Command", token())
            .wrap("Pipeline")
            .wrap("Statement");
        assert_eq!(err.token.start, 3);
        assert_eq!(err.trace(), vec!["Statement", "Pipeline", "Command"]);
        assert_eq!(err.root_cause(), &ErrorKind::MissingWord);
    }

    #[test]
    fn test_display() {
        let err = ParseError::leaf(ErrorKind::MissingWord, "Command", token()).wrap("Pipeline");
        assert_eq!(
            err.to_string(),
            "Pipeline: error at position 3 (1:4):\nCommand: error at position 3 (1:4):\nmissing word"
        );
    }

    #[test]
    fn test_default_options() {
        let options = ParserOptions::default();
        assert_eq!(options.max_depth, MAX_PARSER_DEPTH);
        assert_eq!(options.max_input_size, MAX_INPUT_SIZE);
    }
}
