//! Concrete syntax tree for bash scripts
//!
//! Nodes refer to tokens by index; a [`Script`] keeps the token buffer and
//! the tree together so both can be handed around as one value.

use std::sync::Arc;

use crate::parser::token_buffer::{TokenBuffer, TokenSpan};

pub mod types;

use types::File;

/// A parsed script: its tokens and the tree built over them
#[derive(Debug, Clone)]
pub struct Script {
    buffer: Arc<TokenBuffer>,
    file: File,
}

impl Script {
    pub fn new(buffer: Arc<TokenBuffer>, file: File) -> Self {
        Self { buffer, file }
    }

    pub fn buffer(&self) -> &TokenBuffer {
        &self.buffer
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Source text of a node's span
    pub fn text(&self, span: TokenSpan) -> String {
        self.buffer.text(span)
    }
}
