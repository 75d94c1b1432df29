//! Output buffer for the formatter
//!
//! Renderers write pieces of text and request gaps between them. Whether a
//! gap becomes a space depends on the mode: verbose output always spaces,
//! simple output only where the two pieces would otherwise lex differently.
//! Heredoc bodies queue up until the end of the current line, and trailing
//! comments of consecutive lines are aligned once the run of lines is known.

use crate::parser::token_buffer::{TokenBuffer, TokenIndex, TokenSpan};

/// Rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// Compact, normalized output
    #[default]
    Simple,
    /// Indented, one construct per line
    Verbose,
}

/// Separator requested between two pieces of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gap {
    None,
    /// Space in verbose mode, in simple mode only where required
    Soft,
    /// Always a space
    Hard,
    /// Space in verbose mode only
    Verbose,
    /// Inside arithmetic: spaced in verbose mode, packed in simple mode
    Arithmetic,
    /// Packed in both modes
    Tight,
    /// In both modes only where the shell would read the pieces as one
    Needed,
}

/// Operators of arithmetic contexts
const ARITHMETIC_OPERATORS: &str = "+-*/%<>=!&|^~?:,";

/// Characters that end a shell word
const SHELL_OPERATORS: &str = ";|&()<>";

/// A trailing comment waiting for its column
#[derive(Debug)]
struct Marker {
    offset: usize,
    column: usize,
    comment: TokenIndex,
}

pub struct Printer<'a> {
    buffer: &'a TokenBuffer,
    mode: FormatMode,
    out: String,
    indent: usize,
    gap: Gap,
    heredocs: Vec<TokenSpan>,
    alignment: Vec<Vec<Marker>>,
    /// Backtick substitutions currently open
    backticks: usize,
}

impl<'a> Printer<'a> {
    pub fn new(buffer: &'a TokenBuffer, mode: FormatMode) -> Self {
        Self {
            buffer,
            mode,
            out: String::new(),
            indent: 0,
            gap: Gap::None,
            heredocs: Vec::new(),
            alignment: Vec::new(),
            backticks: 0,
        }
    }

    pub fn buffer(&self) -> &'a TokenBuffer {
        self.buffer
    }

    pub fn verbose(&self) -> bool {
        self.mode == FormatMode::Verbose
    }

    /// Flush what is still queued and return the output
    pub fn finish(mut self) -> String {
        while !self.alignment.is_empty() {
            self.end_alignment();
        }
        if !self.heredocs.is_empty() {
            self.newline();
        }
        self.out
    }

    pub fn text(&self, index: TokenIndex) -> &'a str {
        self.buffer.token(index).value.as_str()
    }

    pub fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    /// Inside the body of a compound or substitution
    pub fn nested(&self) -> bool {
        self.indent > 0
    }

    pub fn has_heredocs(&self) -> bool {
        !self.heredocs.is_empty()
    }

    pub fn gap(&mut self, gap: Gap) {
        if self.gap != Gap::Hard {
            self.gap = gap;
        }
    }

    pub fn space(&mut self) {
        self.gap(Gap::Soft);
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn write(&mut self, text: &str) {
        let Some(first) = text.chars().next() else {
            return;
        };
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        if self.at_line_start() {
            if self.verbose() {
                self.out.extend(std::iter::repeat('\t').take(self.indent));
            }
        } else if let Some(last) = self.out.chars().last() {
            if self.spaced(gap, last, first) {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
    }

    pub fn token(&mut self, index: TokenIndex) {
        self.write(self.text(index));
    }

    fn spaced(&self, gap: Gap, last: char, first: char) -> bool {
        if last == ' ' {
            return false;
        }
        match gap {
            Gap::None => false,
            Gap::Hard => true,
            Gap::Verbose => self.verbose(),
            Gap::Soft => self.verbose() || shell_space_needed(last, first),
            Gap::Arithmetic => self.verbose() || arithmetic_space_needed(last, first),
            Gap::Tight => arithmetic_space_needed(last, first),
            Gap::Needed => shell_space_needed(last, first),
        }
    }

    /// Backtick at nesting depth `depth`, escaped with `2^(depth-1)-1` backslashes
    fn backtick(&mut self, depth: usize) {
        let escapes = (1usize << depth.saturating_sub(1).min(usize::BITS as usize - 2)) - 1;
        let mut text = "\\".repeat(escapes);
        text.push('`');
        self.write(&text);
    }

    pub fn open_backtick(&mut self) {
        self.backticks += 1;
        self.backtick(self.backticks);
    }

    pub fn close_backtick(&mut self) {
        self.backtick(self.backticks);
        self.backticks = self.backticks.saturating_sub(1);
    }

    /// End the current line and emit the heredoc bodies it introduced
    pub fn newline(&mut self) {
        self.gap = Gap::None;
        self.out.push('\n');
        for span in std::mem::take(&mut self.heredocs) {
            self.out.push_str(&self.buffer.text(span));
            if !self.out.ends_with('\n') {
                self.out.push('\n');
            }
        }
    }

    /// Queue a heredoc body for the end of the current line
    pub fn heredoc(&mut self, span: TokenSpan) {
        self.heredocs.push(span);
    }

    /// A comment; the line has to end right after it
    pub fn comment(&mut self, index: TokenIndex) {
        self.gap(Gap::Hard);
        self.token(index);
    }

    /// A comment on a line of its own
    pub fn comment_line(&mut self, index: TokenIndex) {
        self.comment(index);
        self.newline();
    }

    pub fn begin_alignment(&mut self) {
        self.alignment.push(Vec::new());
    }

    /// Trailing comment lined up with those of the neighbouring lines
    pub fn aligned_comment(&mut self, index: TokenIndex) {
        if !self.verbose() || self.alignment.is_empty() {
            self.comment(index);
            return;
        }
        self.gap = Gap::None;
        let line_start = self.out.rfind('\n').map_or(0, |i| i + 1);
        let marker = Marker {
            offset: self.out.len(),
            column: self.out[line_start..].chars().count(),
            comment: index,
        };
        if let Some(group) = self.alignment.last_mut() {
            group.push(marker);
        }
    }

    /// Write out the comments of the innermost alignment run
    pub fn end_alignment(&mut self) {
        let Some(group) = self.alignment.pop() else {
            return;
        };
        let width = group.iter().map(|m| m.column).max().unwrap_or(0);
        for marker in group.iter().rev() {
            let padding = " ".repeat(width - marker.column + 1);
            let text = format!("{}{}", padding, self.text(marker.comment));
            self.out.insert_str(marker.offset, &text);
        }
    }

    /// Close the current alignment run and open a new one
    pub fn break_alignment(&mut self) {
        self.end_alignment();
        self.begin_alignment();
    }
}

/// Whether two shell pieces would run together without a space
fn shell_space_needed(last: char, first: char) -> bool {
    if (last.is_ascii_digit() || last == '}') && (first == '<' || first == '>') {
        return true;
    }
    if first == '(' {
        return !matches!(last, ';' | '|' | '&');
    }
    // a closing paren followed by text would extend the word it closes
    if last == ')' && !SHELL_OPERATORS.contains(first) {
        return true;
    }
    if !SHELL_OPERATORS.contains(last) && !SHELL_OPERATORS.contains(first) {
        return true;
    }
    matches!(
        (last, first),
        (';', ';' | '&') | ('&', '&' | '>') | ('|', '|' | '&') | (')', ')') | ('<' | '>', '<' | '>' | '&' | '|')
    )
}

/// Whether two arithmetic pieces would run together without a space
fn arithmetic_space_needed(last: char, first: char) -> bool {
    let operator = |c: char| ARITHMETIC_OPERATORS.contains(c);
    let word = |c: char| !operator(c) && !"()[]".contains(c) && !c.is_whitespace();
    (word(last) && word(first)) || (operator(last) && operator(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_spacing() {
        assert!(shell_space_needed('a', 'b'));
        assert!(shell_space_needed('a', '"'));
        assert!(!shell_space_needed(';', 't'));
        assert!(!shell_space_needed('a', '|'));
        assert!(shell_space_needed(';', ';'));
        assert!(shell_space_needed('&', '>'));
        assert!(shell_space_needed('2', '>'));
        assert!(shell_space_needed('!', '('));
        assert!(shell_space_needed('(', '('));
        assert!(!shell_space_needed(';', '('));
        assert!(shell_space_needed(')', 'b'));
        assert!(shell_space_needed(')', '2'));
        assert!(!shell_space_needed(')', ';'));
    }

    #[test]
    fn test_arithmetic_spacing() {
        assert!(!arithmetic_space_needed('i', '+'));
        assert!(arithmetic_space_needed('-', '-'));
        assert!(arithmetic_space_needed('a', '1'));
        assert!(!arithmetic_space_needed('(', 'a'));
    }

    #[test]
    fn test_gaps_by_mode() {
        let buffer = TokenBuffer::new("").unwrap();
        let mut simple = Printer::new(&buffer, FormatMode::Simple);
        let mut verbose = Printer::new(&buffer, FormatMode::Verbose);
        for p in [&mut simple, &mut verbose] {
            p.write("a");
            p.space();
            p.write("|");
            p.space();
            p.write("b");
            p.gap(Gap::Arithmetic);
            p.write("c");
        }
        assert_eq!(simple.finish(), "a|b c");
        assert_eq!(verbose.finish(), "a | b c");
    }

    #[test]
    fn test_needed_gap_keeps_redirection_targets_tight() {
        let buffer = TokenBuffer::new("").unwrap();
        for mode in [FormatMode::Simple, FormatMode::Verbose] {
            let mut p = Printer::new(&buffer, mode);
            p.write(">");
            p.gap(Gap::Needed);
            p.write("/dev/null");
            p.write(" >");
            p.gap(Gap::Needed);
            p.write(">(a)");
            assert_eq!(p.finish(), ">/dev/null > >(a)");
        }
    }

    #[test]
    fn test_backticks_escaped_by_depth() {
        let buffer = TokenBuffer::new("").unwrap();
        let mut p = Printer::new(&buffer, FormatMode::Simple);
        p.open_backtick();
        p.open_backtick();
        p.open_backtick();
        p.write("a");
        p.close_backtick();
        p.close_backtick();
        p.close_backtick();
        assert_eq!(p.finish(), "`\\`\\\\\\`a\\\\\\`\\``");
    }

    #[test]
    fn test_indent_only_in_verbose() {
        let buffer = TokenBuffer::new("").unwrap();
        let mut p = Printer::new(&buffer, FormatMode::Verbose);
        p.indent();
        p.write("a");
        p.newline();
        p.dedent();
        p.write("b");
        assert_eq!(p.finish(), "\ta\nb");
    }

    #[test]
    fn test_heredoc_after_newline() {
        let buffer = TokenBuffer::new("cat <<E\nbody\nE\n").unwrap();
        let mut p = Printer::new(&buffer, FormatMode::Simple);
        p.write("cat <<E;");
        p.heredoc(TokenSpan::new(buffer.len() - 2, buffer.len()));
        p.write(" more");
        p.newline();
        assert_eq!(p.finish(), "cat <<E; more\nbody\nE\n");
    }

    #[test]
    fn test_comment_alignment() {
        let buffer = TokenBuffer::new("# one\n# two").unwrap();
        let mut p = Printer::new(&buffer, FormatMode::Verbose);
        p.begin_alignment();
        p.write("a;");
        p.aligned_comment(0);
        p.newline();
        p.write("long;");
        p.aligned_comment(2);
        p.newline();
        p.end_alignment();
        assert_eq!(p.finish(), "a;    # one\nlong; # two\n");
    }
}
