//! Token Buffer
//!
//! Drains the lexer into one append-only vector and attaches byte offsets,
//! lines and columns. Every AST node refers to a span of this buffer.

use tracing::debug;

use crate::parser::lexer::{Lexer, LexerError, Token, TokenType};
use crate::parser::types::{ErrorKind, ParseError, ParserOptions};

/// Index of a token in the buffer
pub type TokenIndex = usize;

/// Half-open range of token indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenSpan {
    pub start: TokenIndex,
    pub end: TokenIndex,
}

impl TokenSpan {
    pub fn new(start: TokenIndex, end: TokenIndex) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: &TokenSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Tracks line and column while walking text
#[derive(Debug, Clone, Copy)]
struct Position {
    offset: usize,
    line: usize,
    column: usize,
}

impl Position {
    fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset += text.len();
    }
}

/// All tokens of one input, with positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
    end: Token,
}

impl TokenBuffer {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        Self::with_options(input, &ParserOptions::default())
    }

    pub fn with_options(input: &str, options: &ParserOptions) -> Result<Self, ParseError> {
        if input.len() > options.max_input_size {
            let token = Token::new(TokenType::Word, "", 0, 0, 1, 1);
            return Err(ParseError::leaf(ErrorKind::LimitExceeded("input size"), "Tokens", token));
        }

        let mut lexer = Lexer::new(input);
        let mut position = Position::start();
        let mut tokens = Vec::new();
        loop {
            let (token_type, value) = match lexer.next_token() {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(err) => return Err(lexer_error(input, err)),
            };
            if tokens.len() >= options.max_tokens {
                let token = token_at(position, TokenType::Word, value);
                return Err(ParseError::leaf(ErrorKind::LimitExceeded("token"), "Tokens", token));
            }
            let mut next = position;
            next.advance(&value);
            tokens.push(Token::new(
                token_type,
                value,
                position.offset,
                next.offset,
                position.line,
                position.column,
            ));
            position = next;
        }

        debug!(tokens = tokens.len(), bytes = input.len(), "tokenized input");
        Ok(Self {
            tokens,
            end: token_at(position, TokenType::Whitespace, String::new()),
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: TokenIndex) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Token at `index`, or the empty end-of-input token past the last one
    pub fn token(&self, index: TokenIndex) -> &Token {
        self.tokens.get(index).unwrap_or(&self.end)
    }

    /// Zero-width token positioned at the end of the input
    pub fn end_token(&self) -> &Token {
        &self.end
    }

    pub fn slice(&self, span: TokenSpan) -> &[Token] {
        let end = span.end.min(self.tokens.len());
        &self.tokens[span.start.min(end)..end]
    }

    /// Source text covered by a span
    pub fn text(&self, span: TokenSpan) -> String {
        self.slice(span).iter().map(|t| t.value.as_str()).collect()
    }
}

fn token_at(position: Position, token_type: TokenType, value: String) -> Token {
    Token::new(
        token_type,
        value,
        position.offset,
        position.offset,
        position.line,
        position.column,
    )
}

/// Wrap a lexer failure as a parse error of the "Tokens" production
fn lexer_error(input: &str, err: LexerError) -> ParseError {
    let offset = err.offset.min(input.len());
    let mut position = Position::start();
    position.advance(&input[..floor_char_boundary(input, offset)]);
    let token = token_at(position, TokenType::Word, String::new());
    ParseError::leaf(err.kind, "Tokens", token)
}

fn floor_char_boundary(input: &str, mut offset: usize) -> usize {
    while !input.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions() {
        let buffer = TokenBuffer::new("a b\n  c").unwrap();
        let tokens = buffer.tokens();
        assert_eq!(tokens.len(), 6);
        assert_eq!((tokens[2].start, tokens[2].line, tokens[2].column), (2, 1, 3));
        assert_eq!(tokens[3].token_type, TokenType::LineTerminator);
        assert_eq!((tokens[5].start, tokens[5].line, tokens[5].column), (6, 2, 3));
        assert_eq!(buffer.end_token().start, 7);
    }

    #[test]
    fn test_multiline_tokens() {
        let buffer = TokenBuffer::new("cat <<E\nx\ny\nE\nz").unwrap();
        let last = buffer.tokens().last().unwrap();
        assert_eq!(last.value, "z");
        assert_eq!((last.line, last.column), (5, 1));
    }

    #[test]
    fn test_text_of_span() {
        let buffer = TokenBuffer::new("echo  \"a $b\"").unwrap();
        assert_eq!(buffer.text(TokenSpan::new(0, buffer.len())), "echo  \"a $b\"");
        assert_eq!(buffer.text(TokenSpan::new(2, 3)), "\"a ");
    }

    #[test]
    fn test_lexer_error_is_wrapped() {
        let err = TokenBuffer::new("echo\n'abc").unwrap_err();
        assert_eq!(err.production, "Tokens");
        assert_eq!(err.root_cause(), &ErrorKind::UnexpectedEof);
        assert_eq!((err.token.start, err.token.line, err.token.column), (5, 2, 1));
    }

    #[test]
    fn test_limits() {
        let options = ParserOptions {
            max_tokens: 2,
            ..ParserOptions::default()
        };
        let err = TokenBuffer::with_options("a b c", &options).unwrap_err();
        assert_eq!(err.root_cause(), &ErrorKind::LimitExceeded("token"));

        let options = ParserOptions {
            max_input_size: 3,
            ..ParserOptions::default()
        };
        let err = TokenBuffer::with_options("abcd", &options).unwrap_err();
        assert_eq!(err.root_cause(), &ErrorKind::LimitExceeded("input size"));
    }
}
