//! bash-cst - A lossless parser and formatter for bash scripts
//!
//! This library tokenizes bash source, builds a concrete syntax tree that
//! keeps every comment, and prints the tree back in a compact or an indented
//! layout.

pub mod ast;
pub mod format;
pub mod parser;

pub use ast::types::*;
pub use ast::Script;
pub use format::{render, FormatMode, Render};
pub use parser::{
    parse, parse_reader, parse_with_options, Error, ErrorKind, ParseError, ParserOptions, Token,
    TokenBuffer, TokenSpan, TokenType,
};
