//! Parser module for bash scripts
//!
//! The lexer turns source text into a token buffer; the parsers build the
//! syntax tree over it through a [`cursor::Cursor`].

pub mod types;
pub mod lexer;
pub mod token_buffer;
pub mod cursor;
pub mod arithmetic_parser;
pub mod word_parser;
pub mod expansion_parser;
pub mod conditional_parser;
pub mod compound_parser;
pub mod command_parser;
pub mod parser;

// Re-exports
pub use types::{Error, ErrorKind, ParseError, ParserOptions};
pub use lexer::{Lexer, LexerError, Token, TokenType};
pub use token_buffer::{TokenBuffer, TokenIndex, TokenSpan};
pub use parser::{parse, parse_reader, parse_with_options};
