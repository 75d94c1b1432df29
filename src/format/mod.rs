//! Formatter for parsed scripts
//!
//! Two modes: simple output packs each construct into as few characters as
//! will still parse back to the same tree, verbose output indents compound
//! bodies with tabs and spaces out operators.

pub mod printer;
pub mod render;

use std::fmt;

use crate::ast::Script;
use crate::parser::token_buffer::TokenBuffer;

// Re-exports
pub use printer::{FormatMode, Printer};
pub use render::Render;

/// Render any node of a tree built over `buffer`
pub fn render<N: Render + ?Sized>(buffer: &TokenBuffer, node: &N, mode: FormatMode) -> String {
    let mut printer = Printer::new(buffer, mode);
    node.render(&mut printer);
    printer.finish()
}

/// A node paired with its tokens. `{}` prints it in simple mode, `{:#}` in
/// verbose mode.
pub struct Displayed<'a, N: ?Sized> {
    buffer: &'a TokenBuffer,
    node: &'a N,
}

impl<N: Render + ?Sized> fmt::Display for Displayed<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if f.alternate() {
            FormatMode::Verbose
        } else {
            FormatMode::Simple
        };
        f.write_str(&render(self.buffer, self.node, mode))
    }
}

impl Script {
    /// Display adapter for a node of this script
    pub fn display<'a, N: Render + ?Sized>(&'a self, node: &'a N) -> Displayed<'a, N> {
        Displayed {
            buffer: self.buffer(),
            node,
        }
    }

    pub fn format(&self, mode: FormatMode) -> String {
        render(self.buffer(), self.file(), mode)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display(self.file()), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::CommandOrCompound;
    use crate::parser::parse;

    #[test]
    fn test_display_modes() {
        let script = parse("a&&b").unwrap();
        assert_eq!(script.to_string(), "a&&b;\n");
        assert_eq!(format!("{:#}", script), "a && b;\n");
    }

    #[test]
    fn test_display_single_node() {
        let script = parse("echo  $x | cat").unwrap();
        let pipeline = &script.file().lines[0].statements[0].pipeline;
        let CommandOrCompound::Command(command) = &pipeline.command else {
            panic!("expected a command");
        };
        assert_eq!(script.display(command).to_string(), "echo $x");
        assert_eq!(format!("{:#}", script.display(pipeline)), "echo $x | cat");
    }
}
