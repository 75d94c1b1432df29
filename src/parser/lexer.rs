//! Lexer for Bash Scripts
//!
//! The lexer turns source text into a stream of `(TokenType, text)` pairs.
//! Positions are attached afterwards by the token buffer.
//!
//! Lexing is driven by the next character and the top of a stack of
//! single-byte context markers:
//! - `)` command substitution, subshell, process substitution, array literal
//! - `}` parameter expansion before its operator
//! - `w` parameter expansion operand word
//! - `/` parameter expansion replacement pattern
//! - `:` substring offset and length
//! - `]` array subscript
//! - `"` double-quoted string body
//! - `` ` `` backtick command substitution
//! - `>` arithmetic context, `(` parenthesis nested inside one
//! - `[` `[[ ]]` test expression, `~` regular expression after `=~`
//! - `c` case statement, `h` heredoc body
//! - `l` operand of a `let` assignment, up to the next metacharacter

use std::collections::{HashSet, VecDeque};

use lazy_static::lazy_static;
use regex_lite::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::parser::types::ErrorKind;

/// Token types for bash lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    Whitespace,
    LineTerminator,
    Comment,
    Identifier,
    /// Name at the start of `name=`, `name+=` or `name[...]=`
    IdentifierAssign,
    Keyword,
    Word,
    NumberLiteral,
    /// Opening quote of a double-quoted string plus its leading text
    StringStart,
    /// Text between two expansions inside a double-quoted string
    StringMid,
    /// Trailing text plus the closing quote
    StringEnd,
    BraceExpansion,
    BraceWord,
    Punctuator,
    HeredocBody,
    HeredocEnd,
    OpenBacktick,
    CloseBacktick,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whitespace => "WHITESPACE",
            Self::LineTerminator => "LINE_TERMINATOR",
            Self::Comment => "COMMENT",
            Self::Identifier => "IDENTIFIER",
            Self::IdentifierAssign => "IDENTIFIER_ASSIGN",
            Self::Keyword => "KEYWORD",
            Self::Word => "WORD",
            Self::NumberLiteral => "NUMBER_LITERAL",
            Self::StringStart => "STRING_START",
            Self::StringMid => "STRING_MID",
            Self::StringEnd => "STRING_END",
            Self::BraceExpansion => "BRACE_EXPANSION",
            Self::BraceWord => "BRACE_WORD",
            Self::Punctuator => "PUNCTUATOR",
            Self::HeredocBody => "HEREDOC_BODY",
            Self::HeredocEnd => "HEREDOC_END",
            Self::OpenBacktick => "OPEN_BACKTICK",
            Self::CloseBacktick => "CLOSE_BACKTICK",
        }
    }
}

/// A token with its position in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    /// Byte offsets into the input
    pub start: usize,
    pub end: usize,
    /// 1-based line and column (in characters)
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            line,
            column,
        }
    }

    pub fn is(&self, token_type: TokenType, value: &str) -> bool {
        self.token_type == token_type && self.value == value
    }

    pub fn is_punct(&self, value: &str) -> bool {
        self.is(TokenType::Punctuator, value)
    }

    pub fn is_keyword(&self, value: &str) -> bool {
        self.is(TokenType::Keyword, value)
    }
}

/// Error raised when the lexer encounters invalid input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct LexerError {
    pub kind: ErrorKind,
    /// Byte offset of the failure
    pub offset: usize,
}

/// A lexed token before positions are attached
pub type RawToken = (TokenType, String);

/// Heredoc announced by `<<` whose body starts after the next line terminator
#[derive(Debug, Clone)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
    quoted: bool,
}

enum Backtick {
    Open,
    Close,
    Literal,
}

lazy_static! {
    /// Reserved words, emitted as keywords when they form a whole word
    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "then", "else", "elif", "fi", "case", "esac", "while", "for", "in", "do",
        "done", "time", "until", "coproc", "select", "function", "{", "}", "[[", "]]", "!",
    ]
    .into_iter()
    .collect();

    /// Keywords after which a new command begins
    static ref COMMAND_KEYWORDS: HashSet<&'static str> = [
        "if", "then", "else", "elif", "do", "while", "until", "!", "time", "{", "coproc",
    ]
    .into_iter()
    .collect();

    /// Decimal, octal, hexadecimal and `base#digits` literals
    static ref NUMBER_RE: Regex =
        Regex::new(r"^(0[xX][0-9a-fA-F]+|0[0-7]*|[1-9][0-9]*|[1-9][0-9]?#[0-9a-zA-Z@_]+)$")
            .expect("valid number pattern");
}

/// Shell operators, longest first
const SHELL_OPERATORS: &[&str] = &[
    ";;&", "<<<", "<<-", "&>>", ";;", ";&", "&&", "||", "|&", "<<", ">>", "<&", ">&", "<>",
    ">|", "&>", "<(", ">(", ";", "&", "|", "<", ">", "(", ")",
];

/// Operators inside `[[ ]]`
const TEST_OPERATORS: &[&str] = &["&&", "||", "(", ")", "<", ">"];

/// Arithmetic operators, longest first
const ARITHMETIC_OPERATORS: &[&str] = &[
    "<<=", ">>=", "**", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=",
    "*=", "/=", "%=", "&=", "^=", "|=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "~", "&",
    "^", "|", "?", ":", ",", ";",
];

/// Parameter expansion operators, longest first
const PARAMETER_OPERATORS: &[&str] = &[
    ":-", ":=", ":?", ":+", "//", "/#", "/%", "##", "%%", "^^", ",,", "-", "=", "?", "+", "#",
    "%", "/", "^", ",", ":", "@", "*",
];

/// Special parameters usable after `$`
const SPECIAL_PARAMETERS: &str = "@*#?-$!0";

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Characters that end an unquoted word
fn is_metachar(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>')
}

/// Bash lexer
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    stack: Vec<u8>,
    queue: VecDeque<RawToken>,
    pending_heredocs: VecDeque<PendingHeredoc>,
    /// Set after `<<` until the delimiter word is scanned
    heredoc_delimiter: Option<bool>,
    heredoc_line_start: bool,
    command_start: bool,
    /// The last token named a function declared with `function`
    function_name: bool,
    /// The current command is `let`
    let_command: bool,
    /// Last token that was not whitespace or a comment
    last: Option<RawToken>,
    string_fresh: bool,
    param_name_expected: bool,
    regex_started: bool,
    regex_depth: usize,
    /// `name[...]` was seen and its `=` is still to come
    assign_pending: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            stack: Vec::new(),
            queue: VecDeque::new(),
            pending_heredocs: VecDeque::new(),
            heredoc_delimiter: None,
            heredoc_line_start: false,
            command_start: true,
            function_name: false,
            let_command: false,
            last: None,
            string_fresh: false,
            param_name_expected: false,
            regex_started: false,
            regex_depth: 0,
            assign_pending: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<RawToken>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Produce the next token, or `None` at the end of the input
    pub fn next_token(&mut self) -> Result<Option<RawToken>, LexerError> {
        if let Some(token) = self.queue.pop_front() {
            return Ok(Some(self.emit(token)));
        }
        if self.pos >= self.input.len() {
            if self.stack.last() == Some(&b'l') {
                self.stack.pop();
            }
            return self.finish().map(|_| None);
        }
        let token = self.dispatch()?;
        Ok(Some(self.emit(token)))
    }

    fn finish(&self) -> Result<(), LexerError> {
        if let Some(doc) = self.pending_heredocs.front() {
            return Err(self.error(ErrorKind::UnterminatedHeredoc(doc.delimiter.clone())));
        }
        if self.heredoc_delimiter.is_some() || !self.stack.is_empty() {
            return Err(self.error(ErrorKind::UnexpectedEof));
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Result<RawToken, LexerError> {
        match self.stack.last().copied() {
            Some(b'"') => self.lex_string(),
            Some(b'h') => self.lex_heredoc(),
            Some(b'>') | Some(b'(') | Some(b':') => self.lex_arithmetic(),
            Some(b']') => self.lex_subscript(),
            Some(b'}') => self.lex_parameter(),
            Some(b'w') | Some(b'/') => self.lex_operand(),
            Some(b'~') => self.lex_regex(),
            Some(b'[') => self.lex_shell(true),
            Some(b'l') => self.lex_let_operand(),
            _ => self.lex_shell(false),
        }
    }

    /// Record the token and update the command-start state
    fn emit(&mut self, token: RawToken) -> RawToken {
        trace!(kind = token.0.as_str(), value = %token.1, "token");
        if matches!(token.0, TokenType::Whitespace | TokenType::Comment) {
            return token;
        }
        let function_name = self.last_is(TokenType::Keyword, "function");
        let command_word = self.command_start;
        match token.0 {
            TokenType::LineTerminator | TokenType::OpenBacktick => self.command_start = true,
            TokenType::Punctuator => {
                self.command_start = match token.1.as_str() {
                    ";" | "&" | "|" | "|&" | "&&" | "||" | ";;" | ";&" | ";;&" | "(" | "$("
                    | "<(" | ">(" => true,
                    ")" => self.stack.last() == Some(&b'c'),
                    _ => false,
                }
            }
            TokenType::Keyword => {
                // only in command position, or opening a function body
                let body = token.1 == "{"
                    && (self.function_name || self.last_is(TokenType::Punctuator, ")"));
                self.command_start = ((self.command_start || body)
                    && COMMAND_KEYWORDS.contains(token.1.as_str()))
                    || (token.1 == "in" && self.stack.last() == Some(&b'c'));
            }
            _ => self.command_start = false,
        }
        if self.command_start {
            self.let_command = false;
        } else if command_word {
            self.let_command = token.0 == TokenType::Word && token.1 == "let";
        }
        self.function_name = function_name;
        self.last = Some(token.clone());
        token
    }

    // =========================================================================
    // Character helpers
    // =========================================================================

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn take(&mut self, n: usize) -> String {
        let end = (self.pos + n).min(self.input.len());
        let s: String = self.input[self.pos..end].iter().collect();
        self.pos = end;
        s
    }

    fn error(&self, kind: ErrorKind) -> LexerError {
        self.error_at(kind, self.pos)
    }

    fn error_at(&self, kind: ErrorKind, pos: usize) -> LexerError {
        let end = pos.min(self.input.len());
        let offset = self.input[..end].iter().map(|c| c.len_utf8()).sum();
        LexerError { kind, offset }
    }

    fn at_word_boundary(&self) -> bool {
        self.pos == 0 || matches!(self.input[self.pos - 1], '`') || is_metachar(self.input[self.pos - 1])
    }

    fn at_word_end(&self, offset: usize) -> bool {
        self.peek(offset).map_or(true, is_metachar)
    }

    fn last_is(&self, token_type: TokenType, value: &str) -> bool {
        matches!(&self.last, Some((t, v)) if *t == token_type && v == value)
    }

    fn backtick_depth(&self) -> usize {
        self.stack.iter().filter(|&&m| m == b'`').count()
    }

    fn match_operator(&self, operators: &[&'static str]) -> Option<&'static str> {
        operators.iter().copied().find(|op| self.starts_with(op))
    }

    fn lex_blanks(&mut self, newlines: bool) -> RawToken {
        let mut text = String::new();
        while let Some(c) = self.current() {
            if is_blank(c) || (newlines && c == '\n') {
                text.push(c);
                self.pos += 1;
            } else if c == '\\' && self.peek(1) == Some('\n') {
                text.push_str("\\\n");
                self.pos += 2;
            } else {
                break;
            }
        }
        (TokenType::Whitespace, text)
    }

    fn is_blank_ahead(&self) -> bool {
        match self.current() {
            Some(c) if is_blank(c) => true,
            Some('\\') => self.peek(1) == Some('\n'),
            _ => false,
        }
    }

    // =========================================================================
    // Expansions shared by every context
    // =========================================================================

    /// Whether a `$` at the current position starts an expansion
    fn dollar_expands(&self, in_string: bool) -> bool {
        match self.peek(1) {
            Some('(') | Some('{') => true,
            Some('\'') | Some('"') => !in_string,
            Some(c) => is_name_start(c) || c.is_ascii_digit() || SPECIAL_PARAMETERS.contains(c),
            None => false,
        }
    }

    /// Count of backslashes before a backtick at the current position
    fn backtick_ahead(&self) -> Option<usize> {
        let mut k = 0;
        while self.peek(k) == Some('\\') {
            k += 1;
        }
        (self.peek(k) == Some('`')).then_some(k)
    }

    /// With `n` open backticks, `2^(n-1)-1` escapes close and `2^n-1` open
    fn backtick_action(&self, slashes: usize) -> Result<Backtick, LexerError> {
        let open = self.backtick_depth();
        if open == 0 {
            return Ok(if slashes == 0 { Backtick::Open } else { Backtick::Literal });
        }
        if open >= usize::BITS as usize - 1 {
            return Err(self.error(ErrorKind::BacktickNesting));
        }
        let close_needs = (1usize << (open - 1)) - 1;
        let open_needs = (1usize << open) - 1;
        if slashes == close_needs {
            Ok(Backtick::Close)
        } else if slashes == open_needs {
            Ok(Backtick::Open)
        } else if slashes > open_needs {
            Ok(Backtick::Literal)
        } else {
            Err(self.error(ErrorKind::BacktickNesting))
        }
    }

    /// Whether an expansion (not literal text) starts here
    fn expansion_ahead(&self, in_string: bool) -> Result<bool, LexerError> {
        match self.current() {
            Some('$') => Ok(self.dollar_expands(in_string)),
            Some('`') | Some('\\') => match self.backtick_ahead() {
                Some(k) => Ok(!matches!(self.backtick_action(k)?, Backtick::Literal)),
                None => Ok(false),
            },
            _ => Ok(false),
        }
    }

    /// Lex `$...` or a backtick at the current position
    fn lex_expansion(&mut self, in_string: bool) -> Result<Option<RawToken>, LexerError> {
        if self.current() == Some('$') {
            return self.lex_dollar(in_string);
        }
        let Some(k) = self.backtick_ahead() else {
            return Ok(None);
        };
        match self.backtick_action(k)? {
            Backtick::Open => {
                let text = self.take(k + 1);
                self.stack.push(b'`');
                Ok(Some((TokenType::OpenBacktick, text)))
            }
            Backtick::Close => {
                if self.stack.last() != Some(&b'`') {
                    return Err(self.error(ErrorKind::MismatchedBracket('`')));
                }
                let text = self.take(k + 1);
                self.stack.pop();
                Ok(Some((TokenType::CloseBacktick, text)))
            }
            Backtick::Literal => Ok(None),
        }
    }

    fn lex_dollar(&mut self, in_string: bool) -> Result<Option<RawToken>, LexerError> {
        if !self.dollar_expands(in_string) {
            return Ok(None);
        }
        if self.starts_with("$((") {
            self.pos += 3;
            self.stack.push(b'>');
            return Ok(Some((TokenType::Punctuator, "$((".to_string())));
        }
        if self.starts_with("$(") {
            self.pos += 2;
            self.stack.push(b')');
            return Ok(Some((TokenType::Punctuator, "$(".to_string())));
        }
        if self.starts_with("${") {
            self.pos += 2;
            self.stack.push(b'}');
            self.param_name_expected = true;
            return Ok(Some((TokenType::Punctuator, "${".to_string())));
        }
        if self.starts_with("$'") {
            let start = self.pos;
            self.pos += 2;
            self.scan_single_quoted(start)?;
            let text: String = self.input[start..self.pos].iter().collect();
            return Ok(Some((TokenType::Word, text)));
        }
        if self.starts_with("$\"") {
            self.pos += 1;
            return Ok(Some((TokenType::Word, "$".to_string())));
        }
        self.pos += 1;
        let Some(c) = self.current() else {
            return Ok(Some((TokenType::Word, "$".to_string())));
        };
        let name = if is_name_start(c) {
            let mut name = String::new();
            while let Some(c) = self.current().filter(|&c| is_name_char(c)) {
                name.push(c);
                self.pos += 1;
            }
            (TokenType::Identifier, name)
        } else if c.is_ascii_digit() {
            self.pos += 1;
            (TokenType::NumberLiteral, c.to_string())
        } else {
            self.pos += 1;
            (TokenType::Identifier, c.to_string())
        };
        self.queue.push_back(name);
        Ok(Some((TokenType::Punctuator, "$".to_string())))
    }

    /// Consume up to and including the closing single quote
    fn scan_single_quoted(&mut self, start: usize) -> Result<(), LexerError> {
        let ansi = self.input.get(start) == Some(&'$');
        loop {
            match self.current() {
                None => return Err(self.error_at(ErrorKind::UnexpectedEof, start)),
                Some('\'') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some('\\') if ansi => self.pos += 2,
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_single_quoted(&mut self) -> Result<RawToken, LexerError> {
        let start = self.pos;
        self.pos += 1;
        self.scan_single_quoted(start)?;
        Ok((TokenType::Word, self.input[start..self.pos].iter().collect()))
    }

    fn open_string(&mut self) -> Result<RawToken, LexerError> {
        self.pos += 1;
        self.stack.push(b'"');
        self.string_fresh = true;
        self.lex_string()
    }

    /// Try an expansion; otherwise report the character as invalid
    fn lex_required_expansion(&mut self, in_string: bool) -> Result<RawToken, LexerError> {
        let c = self.current().unwrap_or('\0');
        self.lex_expansion(in_string)?
            .ok_or_else(|| self.error(ErrorKind::InvalidCharacter(c)))
    }

    // =========================================================================
    // Command context
    // =========================================================================

    fn lex_shell(&mut self, test: bool) -> Result<RawToken, LexerError> {
        let Some(c) = self.current() else {
            return Err(self.error(ErrorKind::UnexpectedEof));
        };

        if self.is_blank_ahead() {
            return Ok(self.lex_blanks(false));
        }
        if let Some(strip_tabs) = self.heredoc_delimiter {
            return self.lex_heredoc_delimiter(strip_tabs);
        }
        if c == '\n' {
            self.pos += 1;
            if !self.pending_heredocs.is_empty() && !self.stack.contains(&b'h') {
                self.stack.push(b'h');
                self.heredoc_line_start = true;
            }
            return Ok((TokenType::LineTerminator, "\n".to_string()));
        }
        if c == '#' && self.at_word_boundary() {
            let mut text = String::new();
            while let Some(c) = self.current().filter(|&c| c != '\n') {
                text.push(c);
                self.pos += 1;
            }
            return Ok((TokenType::Comment, text));
        }
        if c == '"' {
            return self.open_string();
        }
        if c == '\'' {
            return self.lex_single_quoted();
        }
        if self.expansion_ahead(false)? {
            return self.lex_required_expansion(false);
        }

        if test {
            if let Some(op) = self.match_operator(TEST_OPERATORS) {
                self.pos += op.chars().count();
                return Ok((TokenType::Punctuator, op.to_string()));
            }
            if matches!(c, ';' | '&' | '|') {
                return Err(self.error(ErrorKind::InvalidCharacter(c)));
            }
        } else {
            if self.assign_pending && (c == '=' || self.starts_with("+=")) {
                self.assign_pending = false;
                let op = if c == '=' { "=" } else { "+=" };
                self.pos += op.len();
                if self.let_command {
                    self.stack.push(b'l');
                }
                return Ok((TokenType::Punctuator, op.to_string()));
            }
            if self.starts_with("((") && (self.command_start || self.last_is(TokenType::Keyword, "for")) {
                self.pos += 2;
                self.stack.push(b'>');
                return Ok((TokenType::Punctuator, "((".to_string()));
            }
            if let Some(op) = self.match_operator(SHELL_OPERATORS) {
                return self.lex_shell_operator(op);
            }
        }

        let boundary = self.at_word_boundary();
        if !test {
            if c == '{' {
                if boundary && self.peek(1).map_or(true, |c| is_blank(c) || c == '\n') {
                    self.pos += 1;
                    return Ok((TokenType::Keyword, "{".to_string()));
                }
                if let Some(len) = self.fd_variable_ahead() {
                    return Ok((TokenType::Word, self.take(len)));
                }
                if let Some((tokens, end)) = self.brace_expansion(self.pos) {
                    self.pos = end;
                    self.queue.extend(tokens);
                    if let Some(first) = self.queue.pop_front() {
                        return Ok(first);
                    }
                }
            }
            if boundary {
                if let Some(token) = self.lex_assignment()? {
                    return Ok(token);
                }
                if let Some(len) = self.redirect_fd_ahead() {
                    return Ok((TokenType::NumberLiteral, self.take(len)));
                }
            }
        }

        let start = self.pos;
        let (text, plain) = self.scan_word(test)?;
        if text.is_empty() {
            return Err(self.error(ErrorKind::InvalidCharacter(c)));
        }
        if boundary && plain && self.at_word_end(0) {
            if let Some(token) = self.classify_word(&text, test) {
                return Ok(token);
            }
        }
        if test && text == "=~" && boundary {
            self.stack.push(b'~');
            self.regex_started = false;
            self.regex_depth = 0;
        }
        trace!(start, "word");
        Ok((TokenType::Word, text))
    }

    fn lex_shell_operator(&mut self, op: &'static str) -> Result<RawToken, LexerError> {
        self.pos += op.len();
        match op {
            "(" | "<(" | ">(" => self.stack.push(b')'),
            ")" => match self.stack.last() {
                Some(b')') => {
                    self.stack.pop();
                }
                Some(b'c') => {}
                _ => return Err(self.error_at(ErrorKind::MismatchedBracket(')'), self.pos - 1)),
            },
            "<<" => self.heredoc_delimiter = Some(false),
            "<<-" => self.heredoc_delimiter = Some(true),
            _ => {}
        }
        Ok((TokenType::Punctuator, op.to_string()))
    }

    /// Turn a whole plain word into a keyword where one applies
    fn classify_word(&mut self, text: &str, test: bool) -> Option<RawToken> {
        if test {
            return match text {
                "]]" => {
                    self.stack.pop();
                    Some((TokenType::Keyword, text.to_string()))
                }
                "!" => Some((TokenType::Keyword, text.to_string())),
                _ => None,
            };
        }
        if !KEYWORDS.contains(text) {
            return None;
        }
        match text {
            "[[" if self.command_start => self.stack.push(b'['),
            "[[" => return None,
            "case" if self.command_start => self.stack.push(b'c'),
            "esac" if self.command_start && self.stack.last() == Some(&b'c') => {
                self.stack.pop();
            }
            _ => {}
        }
        Some((TokenType::Keyword, text.to_string()))
    }

    /// Scan an unquoted word; the flag is false when it holds escapes or globs
    fn scan_word(&mut self, test: bool) -> Result<(String, bool), LexerError> {
        let mut text = String::new();
        let mut plain = true;
        while let Some(c) = self.current() {
            if c == '(' && matches!(text.chars().last(), Some('@' | '!' | '+' | '*' | '?')) {
                self.scan_extglob(&mut text)?;
                plain = false;
                continue;
            }
            if is_metachar(c) || c == '"' || c == '\'' {
                break;
            }
            if c == '$' || c == '`' || c == '\\' {
                if self.expansion_ahead(false)? {
                    break;
                }
                if c == '\\' {
                    let slashes = self.backtick_ahead().map_or(2, |k| k + 1);
                    text.push_str(&self.take(slashes));
                    plain = false;
                    continue;
                }
            }
            if c == '{' && !test && !text.is_empty() && self.brace_expansion(self.pos).is_some() {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        Ok((text, plain))
    }

    /// Consume a balanced `( ... )` extended glob group
    fn scan_extglob(&mut self, text: &mut String) -> Result<(), LexerError> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let Some(c) = self.current() else {
                return Err(self.error_at(ErrorKind::UnexpectedEof, start));
            };
            text.push(c);
            self.pos += 1;
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '\\' => {
                    if let Some(next) = self.current() {
                        text.push(next);
                        self.pos += 1;
                    }
                }
                _ => {}
            }
        }
    }

    /// `name=`, `name+=` or `name[...]=` at the start of a word
    fn lex_assignment(&mut self) -> Result<Option<RawToken>, LexerError> {
        let c = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };
        if c == '[' {
            if self.subscript_assignment_len(0).is_some() {
                self.pos += 1;
                self.stack.push(b']');
                self.assign_pending = true;
                return Ok(Some((TokenType::Punctuator, "[".to_string())));
            }
            return Ok(None);
        }
        if !is_name_start(c) {
            return Ok(None);
        }
        let mut len = 0;
        while self.peek(len).is_some_and(is_name_char) {
            len += 1;
        }
        let op = match self.peek(len) {
            Some('=') => "=",
            Some('+') if self.peek(len + 1) == Some('=') => "+=",
            Some('[') if self.subscript_assignment_len(len).is_some() => "[",
            _ => return Ok(None),
        };
        let name = self.take(len);
        self.pos += op.len();
        if op == "[" {
            self.stack.push(b']');
            self.assign_pending = true;
        } else if self.let_command {
            self.stack.push(b'l');
        }
        self.queue.push_back((TokenType::Punctuator, op.to_string()));
        Ok(Some((TokenType::IdentifierAssign, name)))
    }

    /// Length of `[...]` at `offset` when followed by `=` or `+=`
    fn subscript_assignment_len(&self, offset: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = offset;
        loop {
            match self.peek(i)? {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                '\n' | ' ' | '\t' | ';' | '&' | '|' | '<' | '>' => return None,
                _ => {}
            }
            i += 1;
        }
        let after = self.peek(i + 1)?;
        (after == '=' || (after == '+' && self.peek(i + 2) == Some('='))).then_some(i + 1 - offset)
    }

    /// `{name}` immediately followed by a redirection operator
    fn fd_variable_ahead(&self) -> Option<usize> {
        if !self.peek(1).is_some_and(is_name_start) {
            return None;
        }
        let mut i = 2;
        while self.peek(i).is_some_and(is_name_char) {
            i += 1;
        }
        (self.peek(i) == Some('}') && matches!(self.peek(i + 1), Some('<' | '>'))).then_some(i + 1)
    }

    /// Digits immediately followed by a redirection operator
    fn redirect_fd_ahead(&self) -> Option<usize> {
        let mut i = 0;
        while self.peek(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        (i > 0 && matches!(self.peek(i), Some('<' | '>'))).then_some(i)
    }

    fn lex_heredoc_delimiter(&mut self, strip_tabs: bool) -> Result<RawToken, LexerError> {
        let start = self.pos;
        let mut raw = String::new();
        let mut delimiter = String::new();
        while let Some(c) = self.current() {
            if is_metachar(c) {
                break;
            }
            match c {
                '\'' | '"' => {
                    raw.push(c);
                    self.pos += 1;
                    loop {
                        let Some(q) = self.current() else {
                            return Err(self.error_at(ErrorKind::UnexpectedEof, start));
                        };
                        raw.push(q);
                        self.pos += 1;
                        if q == c {
                            break;
                        }
                        delimiter.push(q);
                    }
                }
                '\\' => {
                    raw.push(c);
                    self.pos += 1;
                    if let Some(next) = self.current() {
                        raw.push(next);
                        delimiter.push(next);
                        self.pos += 1;
                    }
                }
                _ => {
                    raw.push(c);
                    delimiter.push(c);
                    self.pos += 1;
                }
            }
        }
        if raw.is_empty() {
            let c = self.current().unwrap_or('\n');
            return Err(self.error(ErrorKind::InvalidCharacter(c)));
        }
        let quoted = raw.contains(['\'', '"', '\\']);
        self.heredoc_delimiter = None;
        self.pending_heredocs.push_back(PendingHeredoc {
            delimiter,
            strip_tabs,
            quoted,
        });
        Ok((TokenType::Word, raw))
    }

    // =========================================================================
    // Brace expansion
    // =========================================================================

    /// Speculatively scan a brace expansion starting at `start`
    fn brace_expansion(&self, start: usize) -> Option<(Vec<RawToken>, usize)> {
        if self.input.get(start) != Some(&'{') {
            return None;
        }
        self.brace_range(start).or_else(|| self.brace_list(start))
    }

    fn brace_range(&self, start: usize) -> Option<(Vec<RawToken>, usize)> {
        let mut i = start + 1;
        let mut tokens = vec![(TokenType::BraceExpansion, "{".to_string())];
        let (first, next) = self.range_bound(i)?;
        let letters = first.chars().all(|c| c.is_ascii_alphabetic());
        tokens.push((TokenType::BraceWord, first));
        i = next;
        let mut bounds = 1;
        while self.input.get(i) == Some(&'.') && self.input.get(i + 1) == Some(&'.') {
            let (bound, next) = self.range_bound(i + 2)?;
            let is_letter = bound.chars().all(|c| c.is_ascii_alphabetic());
            if (bounds == 1 && is_letter != letters) || (bounds == 2 && is_letter) || bounds == 3 {
                return None;
            }
            tokens.push((TokenType::BraceExpansion, "..".to_string()));
            tokens.push((TokenType::BraceWord, bound));
            bounds += 1;
            i = next;
        }
        if bounds < 2 || self.input.get(i) != Some(&'}') {
            return None;
        }
        tokens.push((TokenType::BraceExpansion, "}".to_string()));
        Some((tokens, i + 1))
    }

    /// An integer or a single letter
    fn range_bound(&self, start: usize) -> Option<(String, usize)> {
        let c = *self.input.get(start)?;
        if c.is_ascii_alphabetic() {
            return Some((c.to_string(), start + 1));
        }
        let mut i = start;
        let mut text = String::new();
        if c == '-' {
            text.push(c);
            i += 1;
        }
        while let Some(&d) = self.input.get(i).filter(|d| d.is_ascii_digit()) {
            text.push(d);
            i += 1;
        }
        (text.len() > usize::from(c == '-')).then_some((text, i))
    }

    fn brace_list(&self, start: usize) -> Option<(Vec<RawToken>, usize)> {
        let mut tokens = vec![(TokenType::BraceExpansion, "{".to_string())];
        let mut i = start + 1;
        let mut commas = 0;
        let mut element = String::new();
        loop {
            let c = *self.input.get(i)?;
            match c {
                '}' | ',' => {
                    if !element.is_empty() {
                        tokens.push((TokenType::BraceWord, std::mem::take(&mut element)));
                    }
                    tokens.push((TokenType::BraceExpansion, c.to_string()));
                    i += 1;
                    if c == '}' {
                        return (commas > 0).then_some((tokens, i));
                    }
                    commas += 1;
                }
                '{' => {
                    let (nested, end) = self.brace_expansion(i)?;
                    if !element.is_empty() {
                        tokens.push((TokenType::BraceWord, std::mem::take(&mut element)));
                    }
                    tokens.extend(nested);
                    i = end;
                }
                '\\' => {
                    element.push(c);
                    element.push(*self.input.get(i + 1)?);
                    i += 2;
                }
                '"' | '\'' | '$' | '`' => return None,
                c if is_metachar(c) => return None,
                c => {
                    element.push(c);
                    i += 1;
                }
            }
        }
    }

    // =========================================================================
    // Double-quoted strings and heredoc bodies
    // =========================================================================

    fn lex_string(&mut self) -> Result<RawToken, LexerError> {
        let mut text = String::new();
        if self.string_fresh {
            text.push('"');
        }
        loop {
            let Some(c) = self.current() else {
                return Err(self.error(ErrorKind::UnexpectedEof));
            };
            if c == '"' || self.expansion_ahead(true)? {
                break;
            }
            if c == '\\' {
                let slashes = self.backtick_ahead().map_or(2, |k| k + 1);
                text.push_str(&self.take(slashes));
                continue;
            }
            text.push(c);
            self.pos += 1;
        }
        if self.string_fresh {
            self.string_fresh = false;
            return Ok((TokenType::StringStart, text));
        }
        if self.current() == Some('"') {
            text.push('"');
            self.pos += 1;
            self.stack.pop();
            return Ok((TokenType::StringEnd, text));
        }
        if !text.is_empty() {
            return Ok((TokenType::StringMid, text));
        }
        self.lex_required_expansion(true)
    }

    /// Length of the current line when it closes the heredoc
    fn delimiter_line(&self, doc: &PendingHeredoc) -> Option<usize> {
        let mut i = 0;
        if doc.strip_tabs {
            while self.peek(i) == Some('\t') {
                i += 1;
            }
        }
        let mut line = String::new();
        while let Some(c) = self.peek(i).filter(|&c| c != '\n') {
            line.push(c);
            i += 1;
        }
        if line != doc.delimiter {
            return None;
        }
        Some(if self.peek(i) == Some('\n') { i + 1 } else { i })
    }

    fn lex_heredoc(&mut self) -> Result<RawToken, LexerError> {
        let Some(doc) = self.pending_heredocs.front().cloned() else {
            self.stack.pop();
            return self.dispatch();
        };
        let mut text = String::new();
        loop {
            if self.heredoc_line_start {
                if let Some(len) = self.delimiter_line(&doc) {
                    if !text.is_empty() {
                        return Ok((TokenType::HeredocBody, text));
                    }
                    let end = self.take(len);
                    self.stack.pop();
                    self.pending_heredocs.pop_front();
                    if !self.pending_heredocs.is_empty() {
                        self.stack.push(b'h');
                        self.heredoc_line_start = true;
                    }
                    return Ok((TokenType::HeredocEnd, end));
                }
            }
            let Some(c) = self.current() else {
                return Err(self.error(ErrorKind::UnterminatedHeredoc(doc.delimiter)));
            };
            if !doc.quoted {
                if self.expansion_ahead(true)? {
                    self.heredoc_line_start = false;
                    if !text.is_empty() {
                        return Ok((TokenType::HeredocBody, text));
                    }
                    return self.lex_required_expansion(true);
                }
                if c == '\\' {
                    let slashes = self.backtick_ahead().map_or(2, |k| k + 1);
                    let escaped = self.take(slashes);
                    self.heredoc_line_start = escaped.ends_with('\n');
                    text.push_str(&escaped);
                    continue;
                }
            }
            text.push(c);
            self.pos += 1;
            self.heredoc_line_start = c == '\n';
        }
    }

    // =========================================================================
    // Arithmetic, subscripts and parameter expansions
    // =========================================================================

    fn lex_number(&mut self, strict: bool) -> Result<RawToken, LexerError> {
        let start = self.pos;
        let mut text = String::new();
        while let Some(c) = self.current().filter(|&c| is_name_char(c) || c == '#' || c == '@') {
            text.push(c);
            self.pos += 1;
        }
        if NUMBER_RE.is_match(&text) {
            Ok((TokenType::NumberLiteral, text))
        } else if strict {
            Err(self.error_at(ErrorKind::InvalidNumber(text), start))
        } else {
            Ok((TokenType::Word, text))
        }
    }

    fn lex_name(&mut self) -> RawToken {
        let mut name = String::new();
        while let Some(c) = self.current().filter(|&c| is_name_char(c)) {
            name.push(c);
            self.pos += 1;
        }
        if self.current() == Some('[') {
            self.pos += 1;
            self.stack.push(b']');
            self.queue.push_back((TokenType::Punctuator, "[".to_string()));
        }
        (TokenType::Identifier, name)
    }

    fn lex_arithmetic(&mut self) -> Result<RawToken, LexerError> {
        let top = self.stack.last().copied();
        let Some(c) = self.current() else {
            return Err(self.error(ErrorKind::UnexpectedEof));
        };
        if c == '\n' || self.is_blank_ahead() {
            return Ok(self.lex_blanks(true));
        }
        match c {
            ')' if top == Some(b'>') => {
                if self.peek(1) != Some(')') {
                    return Err(self.error(ErrorKind::MismatchedBracket(')')));
                }
                self.pos += 2;
                self.stack.pop();
                Ok((TokenType::Punctuator, "))".to_string()))
            }
            ')' if top == Some(b'(') => {
                self.pos += 1;
                self.stack.pop();
                Ok((TokenType::Punctuator, ")".to_string()))
            }
            '(' => {
                self.pos += 1;
                self.stack.push(b'(');
                Ok((TokenType::Punctuator, "(".to_string()))
            }
            '}' if top == Some(b':') => {
                self.pos += 1;
                self.stack.pop();
                Ok((TokenType::Punctuator, "}".to_string()))
            }
            '$' | '`' | '\\' => self.lex_required_expansion(false),
            '"' => self.open_string(),
            '\'' => self.lex_single_quoted(),
            c if c.is_ascii_digit() => self.lex_number(true),
            c if is_name_start(c) => Ok(self.lex_name()),
            c => match self.match_operator(ARITHMETIC_OPERATORS) {
                Some(op) => {
                    self.pos += op.len();
                    Ok((TokenType::Punctuator, op.to_string()))
                }
                None => Err(self.error(ErrorKind::InvalidCharacter(c))),
            },
        }
    }

    fn lex_let_operand(&mut self) -> Result<RawToken, LexerError> {
        let end = self.current().map_or(true, is_metachar) || self.backtick_ahead().is_some();
        let Some(c) = self.current().filter(|_| !end) else {
            self.stack.pop();
            return self.dispatch();
        };
        match c {
            '$' | '\\' => self.lex_required_expansion(false),
            '"' => self.open_string(),
            '\'' => self.lex_single_quoted(),
            c if c.is_ascii_digit() => self.lex_number(false),
            c if is_name_start(c) => Ok(self.lex_name()),
            c => match self.match_operator(ARITHMETIC_OPERATORS) {
                Some(op) => {
                    self.pos += op.len();
                    Ok((TokenType::Punctuator, op.to_string()))
                }
                None => Err(self.error(ErrorKind::InvalidCharacter(c))),
            },
        }
    }

    fn lex_subscript(&mut self) -> Result<RawToken, LexerError> {
        let Some(c) = self.current() else {
            return Err(self.error(ErrorKind::UnexpectedEof));
        };
        if self.is_blank_ahead() {
            return Ok(self.lex_blanks(true));
        }
        match c {
            ']' => {
                self.pos += 1;
                self.stack.pop();
                Ok((TokenType::Punctuator, "]".to_string()))
            }
            '"' => self.open_string(),
            '\'' => self.lex_single_quoted(),
            c if c.is_ascii_digit() => self.lex_number(false),
            c if is_name_start(c) => Ok(self.lex_name()),
            _ => {
                if self.expansion_ahead(false)? {
                    return self.lex_required_expansion(false);
                }
                if let Some(op) = self.match_operator(ARITHMETIC_OPERATORS) {
                    self.pos += op.len();
                    return Ok((TokenType::Punctuator, op.to_string()));
                }
                let mut text = String::new();
                while let Some(c) = self.current() {
                    if matches!(c, ']' | '"' | '\'' | '$' | '`' | '[') || is_blank(c) || c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.pos += 1;
                }
                if text.is_empty() {
                    text.push(c);
                    self.pos += 1;
                }
                Ok((TokenType::Word, text))
            }
        }
    }

    fn lex_parameter(&mut self) -> Result<RawToken, LexerError> {
        let Some(c) = self.current() else {
            return Err(self.error(ErrorKind::UnexpectedEof));
        };
        if self.param_name_expected {
            let after_open = self.last_is(TokenType::Punctuator, "${");
            if after_open && (c == '#' || c == '!') && self.peek(1).is_some_and(|n| n != '}') {
                self.pos += 1;
                return Ok((TokenType::Punctuator, c.to_string()));
            }
            self.param_name_expected = false;
            if is_name_start(c) {
                let mut name = String::new();
                while let Some(c) = self.current().filter(|&c| is_name_char(c)) {
                    name.push(c);
                    self.pos += 1;
                }
                return Ok((TokenType::Identifier, name));
            }
            if c.is_ascii_digit() {
                let mut digits = String::new();
                while let Some(c) = self.current().filter(|c| c.is_ascii_digit()) {
                    digits.push(c);
                    self.pos += 1;
                }
                return Ok((TokenType::NumberLiteral, digits));
            }
            if SPECIAL_PARAMETERS.contains(c) {
                self.pos += 1;
                return Ok((TokenType::Identifier, c.to_string()));
            }
            return Err(self.error(ErrorKind::InvalidCharacter(c)));
        }
        match c {
            '}' => {
                self.pos += 1;
                self.stack.pop();
                Ok((TokenType::Punctuator, "}".to_string()))
            }
            '[' => {
                self.pos += 1;
                self.stack.push(b']');
                Ok((TokenType::Punctuator, "[".to_string()))
            }
            _ => {
                let Some(op) = self.match_operator(PARAMETER_OPERATORS) else {
                    return Err(self.error(ErrorKind::InvalidCharacter(c)));
                };
                self.pos += op.len();
                let marker = match op {
                    ":" => Some(b':'),
                    "/" | "//" | "/#" | "/%" => Some(b'/'),
                    "*" => None,
                    "@" if self.current() == Some('}') => None,
                    _ => Some(b'w'),
                };
                if let (Some(marker), Some(top)) = (marker, self.stack.last_mut()) {
                    *top = marker;
                }
                Ok((TokenType::Punctuator, op.to_string()))
            }
        }
    }

    fn lex_operand(&mut self) -> Result<RawToken, LexerError> {
        let top = self.stack.last().copied();
        let in_string = self.stack.len() >= 2 && self.stack[self.stack.len() - 2] == b'"';
        let Some(c) = self.current() else {
            return Err(self.error(ErrorKind::UnexpectedEof));
        };
        match c {
            '}' => {
                self.pos += 1;
                self.stack.pop();
                return Ok((TokenType::Punctuator, "}".to_string()));
            }
            '/' if top == Some(b'/') => {
                self.pos += 1;
                if let Some(top) = self.stack.last_mut() {
                    *top = b'w';
                }
                return Ok((TokenType::Punctuator, "/".to_string()));
            }
            '"' => return self.open_string(),
            '\'' if !in_string => return self.lex_single_quoted(),
            _ => {}
        }
        if self.expansion_ahead(in_string)? {
            return self.lex_required_expansion(in_string);
        }
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c == '}' || c == '"' || (c == '\'' && !in_string) || (c == '/' && top == Some(b'/')) {
                break;
            }
            if self.expansion_ahead(in_string)? {
                break;
            }
            if c == '\\' {
                let slashes = self.backtick_ahead().map_or(2, |k| k + 1);
                text.push_str(&self.take(slashes));
                continue;
            }
            text.push(c);
            self.pos += 1;
        }
        Ok((TokenType::Word, text))
    }

    fn lex_regex(&mut self) -> Result<RawToken, LexerError> {
        let Some(c) = self.current() else {
            return Err(self.error(ErrorKind::UnexpectedEof));
        };
        if !self.regex_started {
            if self.is_blank_ahead() {
                return Ok(self.lex_blanks(false));
            }
            self.regex_started = true;
        }
        if self.regex_depth == 0 && (is_blank(c) || c == '\n' || c == ')') {
            self.stack.pop();
            return self.lex_shell(true);
        }
        match c {
            '"' => return self.open_string(),
            '\'' => return self.lex_single_quoted(),
            _ => {}
        }
        if self.expansion_ahead(false)? {
            return self.lex_required_expansion(false);
        }
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c == '"' || c == '\'' || self.expansion_ahead(false)? {
                break;
            }
            match c {
                ' ' | '\t' | '\n' if self.regex_depth == 0 => break,
                ')' if self.regex_depth == 0 => break,
                '(' => self.regex_depth += 1,
                ')' => self.regex_depth -= 1,
                '\\' => {
                    text.push_str(&self.take(2));
                    continue;
                }
                _ => {}
            }
            text.push(c);
            self.pos += 1;
        }
        Ok((TokenType::Word, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<(TokenType, String)> {
        Lexer::new(input).tokenize().unwrap()
    }

    fn values(input: &str) -> Vec<String> {
        lex(input).into_iter().map(|(_, v)| v).collect()
    }

    fn kinds(input: &str) -> Vec<TokenType> {
        lex(input).into_iter().map(|(t, _)| t).collect()
    }

    fn error(input: &str) -> ErrorKind {
        Lexer::new(input).tokenize().unwrap_err().kind
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(values("echo hello"), vec!["echo", " ", "hello"]);
        assert_eq!(
            kinds("echo hello"),
            vec![TokenType::Word, TokenType::Whitespace, TokenType::Word]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(values("a&&b||c;d&"), vec!["a", "&&", "b", "||", "c", ";", "d", "&"]);
        assert_eq!(values("a |& b"), vec!["a", " ", "|&", " ", "b"]);
        assert_eq!(values("a &>> f"), vec!["a", " ", "&>>", " ", "f"]);
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("if a; then b; fi");
        assert_eq!(tokens[0], (TokenType::Keyword, "if".to_string()));
        assert_eq!(tokens[5], (TokenType::Keyword, "then".to_string()));
        assert_eq!(tokens[10], (TokenType::Keyword, "fi".to_string()));
        // Not whole words
        assert_eq!(lex("iffy")[0].0, TokenType::Word);
        assert_eq!(lex("{a")[0].0, TokenType::Word);
    }

    #[test]
    fn test_group_braces() {
        let tokens = lex("{ a; }");
        assert_eq!(tokens[0], (TokenType::Keyword, "{".to_string()));
        assert_eq!(tokens[5], (TokenType::Keyword, "}".to_string()));
    }

    #[test]
    fn test_keywords_as_arguments() {
        assert_eq!(values("echo then case"), vec!["echo", " ", "then", " ", "case"]);
        assert_eq!(lex("echo { [[")[4], (TokenType::Word, "[[".to_string()));
        assert_eq!(values("echo time ((x))")[4], "(");
        assert!(Lexer::new("echo ! case x").tokenize().is_ok());
        // still openers in command position
        assert!(Lexer::new("function f { case a in b) c;; esac; }").tokenize().is_ok());
        assert_eq!(lex("f() { [[ a ]]; }")[6], (TokenType::Keyword, "[[".to_string()));
        assert_eq!(error("if { case a"), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_let_operands() {
        assert_eq!(
            values("let i=i+1 j"),
            vec!["let", " ", "i", "=", "i", "+", "1", " ", "j"]
        );
        assert_eq!(kinds("let i=$k")[4..], [TokenType::Punctuator, TokenType::Identifier]);
        assert_eq!(
            values("let a[1]=2;b=c+d"),
            vec!["let", " ", "a", "[", "1", "]", "=", "2", ";", "b", "=", "c+d"]
        );
        assert_eq!(lex("x=i+1")[2], (TokenType::Word, "i+1".to_string()));
        assert_eq!(values("let x=`a`")[4..], ["`", "a", "`"]);
    }

    #[test]
    fn test_comment() {
        let tokens = lex("a # note\nb#c");
        assert_eq!(tokens[2], (TokenType::Comment, "# note".to_string()));
        assert_eq!(tokens[3].0, TokenType::LineTerminator);
        assert_eq!(tokens[4], (TokenType::Word, "b#c".to_string()));
    }

    #[test]
    fn test_parameter() {
        assert_eq!(values("$a$1$@"), vec!["$", "a", "$", "1", "$", "@"]);
        assert_eq!(
            kinds("$1"),
            vec![TokenType::Punctuator, TokenType::NumberLiteral]
        );
        assert_eq!(lex("a $")[2], (TokenType::Word, "$".to_string()));
        assert_eq!(lex("a$"), vec![(TokenType::Word, "a$".to_string())]);
    }

    #[test]
    fn test_braced_parameter() {
        assert_eq!(values("${a:-b c}"), vec!["${", "a", ":-", "b c", "}"]);
        assert_eq!(values("${#a}"), vec!["${", "#", "a", "}"]);
        assert_eq!(values("${a[1]}"), vec!["${", "a", "[", "1", "]", "}"]);
        assert_eq!(values("${a/b/c}"), vec!["${", "a", "/", "b", "/", "c", "}"]);
        assert_eq!(values("${a:1:2}"), vec!["${", "a", ":", "1", ":", "2", "}"]);
        assert_eq!(values("${a:-${b}}"), vec!["${", "a", ":-", "${", "b", "}", "}"]);
    }

    #[test]
    fn test_double_quotes() {
        assert_eq!(
            lex("\"abc\""),
            vec![
                (TokenType::StringStart, "\"abc".to_string()),
                (TokenType::StringEnd, "\"".to_string()),
            ]
        );
        assert_eq!(values("\"a $b c\""), vec!["\"a ", "$", "b", " c\""]);
        assert_eq!(values("\"$a-$b\""), vec!["\"", "$", "a", "-", "$", "b", "\""]);
        assert_eq!(
            kinds("\"$a-$b\"")[3],
            TokenType::StringMid
        );
        assert_eq!(values("\"\\\"$\""), vec!["\"\\\"$", "\""]);
    }

    #[test]
    fn test_single_quotes() {
        assert_eq!(lex("'a \"b'"), vec![(TokenType::Word, "'a \"b'".to_string())]);
        assert_eq!(lex("$'a\\'b'"), vec![(TokenType::Word, "$'a\\'b'".to_string())]);
        assert_eq!(error("'abc"), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_command_substitution() {
        assert_eq!(values("$(a b)"), vec!["$(", "a", " ", "b", ")"]);
        assert_eq!(values("<(a)"), vec!["<(", "a", ")"]);
        assert_eq!(error("$(a"), ErrorKind::UnexpectedEof);
        assert_eq!(error("a)"), ErrorKind::MismatchedBracket(')'));
    }

    #[test]
    fn test_backticks() {
        assert_eq!(
            kinds("`a`"),
            vec![TokenType::OpenBacktick, TokenType::Word, TokenType::CloseBacktick]
        );
        assert_eq!(values("`a \\`b\\``"), vec!["`", "a", " ", "\\`", "b", "\\`", "`"]);
        assert_eq!(lex("\\`")[0], (TokenType::Word, "\\`".to_string()));
        assert_eq!(error("`a \\`b \\\\`"), ErrorKind::BacktickNesting);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(values("(( a + 1 ))"), vec!["((", " ", "a", " ", "+", " ", "1", " ", "))"]);
        assert_eq!(values("$((a<<=2))"), vec!["$((", "a", "<<=", "2", "))"]);
        assert_eq!(values("$(( (1) ))"), vec!["$((", " ", "(", "1", ")", " ", "))"]);
        assert_eq!(values("((16#ff))"), vec!["((", "16#ff", "))"]);
        assert_eq!(error("((09))"), ErrorKind::InvalidNumber("09".to_string()));
        assert_eq!(values("a ((b))")[2], "(");
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            lex("a=b"),
            vec![
                (TokenType::IdentifierAssign, "a".to_string()),
                (TokenType::Punctuator, "=".to_string()),
                (TokenType::Word, "b".to_string()),
            ]
        );
        assert_eq!(values("a+=b"), vec!["a", "+=", "b"]);
        assert_eq!(values("a[i+1]=b"), vec!["a", "[", "i", "+", "1", "]", "=", "b"]);
        assert_eq!(values("a=(b c)"), vec!["a", "=", "(", "b", " ", "c", ")"]);
        assert_eq!(values("a=([k]=v)"), vec!["a", "=", "(", "[", "k", "]", "=", "v", ")"]);
        assert_eq!(lex("echo b=c")[2].0, TokenType::IdentifierAssign);
        assert_eq!(lex("x=a=b")[2], (TokenType::Word, "a=b".to_string()));
    }

    #[test]
    fn test_brace_expansion() {
        assert_eq!(values("a{b,c}d"), vec!["a", "{", "b", ",", "c", "}", "d"]);
        assert_eq!(
            kinds("{1..5}"),
            vec![
                TokenType::BraceExpansion,
                TokenType::BraceWord,
                TokenType::BraceExpansion,
                TokenType::BraceWord,
                TokenType::BraceExpansion,
            ]
        );
        assert_eq!(values("{a..z..2}"), vec!["{", "a", "..", "z", "..", "2", "}"]);
        assert_eq!(values("{a,{b,c}}"), vec!["{", "a", ",", "{", "b", ",", "c", "}", "}"]);
        assert_eq!(lex("{a}"), vec![(TokenType::Word, "{a}".to_string())]);
        assert_eq!(lex("{}"), vec![(TokenType::Word, "{}".to_string())]);
    }

    #[test]
    fn test_redirections() {
        assert_eq!(
            lex("2>&1"),
            vec![
                (TokenType::NumberLiteral, "2".to_string()),
                (TokenType::Punctuator, ">&".to_string()),
                (TokenType::Word, "1".to_string()),
            ]
        );
        assert_eq!(values("{fd}>f"), vec!["{fd}", ">", "f"]);
    }

    #[test]
    fn test_heredoc() {
        let tokens = lex("cat <<EOF\nhello $x\nEOF\n");
        let expected = vec![
            (TokenType::Word, "cat".to_string()),
            (TokenType::Whitespace, " ".to_string()),
            (TokenType::Punctuator, "<<".to_string()),
            (TokenType::Word, "EOF".to_string()),
            (TokenType::LineTerminator, "\n".to_string()),
            (TokenType::HeredocBody, "hello ".to_string()),
            (TokenType::Punctuator, "$".to_string()),
            (TokenType::Identifier, "x".to_string()),
            (TokenType::HeredocBody, "\n".to_string()),
            (TokenType::HeredocEnd, "EOF\n".to_string()),
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_heredoc_quoted_and_stripped() {
        let tokens = lex("cat <<-'E' <<F\n\t$a\n\tE\nb\nF\n");
        assert_eq!(tokens[3], (TokenType::Word, "'E'".to_string()));
        assert_eq!(tokens[8], (TokenType::HeredocBody, "\t$a\n".to_string()));
        assert_eq!(tokens[9], (TokenType::HeredocEnd, "\tE\n".to_string()));
        assert_eq!(tokens[10], (TokenType::HeredocBody, "b\n".to_string()));
        assert_eq!(tokens[11], (TokenType::HeredocEnd, "F\n".to_string()));
        assert_eq!(
            error("cat <<EOF\nbody\n"),
            ErrorKind::UnterminatedHeredoc("EOF".to_string())
        );
    }

    #[test]
    fn test_test_expression() {
        let tokens = lex("[[ a == b ]]");
        assert_eq!(tokens[0], (TokenType::Keyword, "[[".to_string()));
        assert_eq!(tokens[4], (TokenType::Word, "==".to_string()));
        assert_eq!(tokens[8], (TokenType::Keyword, "]]".to_string()));
        assert_eq!(values("[[ a =~ ^(b c)$ ]]")[6], "^(b c)$");
        assert_eq!(lex("echo [[")[2], (TokenType::Word, "[[".to_string()));
    }

    #[test]
    fn test_case_patterns() {
        let tokens = lex("case a in b) c;; esac");
        assert_eq!(tokens[0], (TokenType::Keyword, "case".to_string()));
        assert_eq!(tokens[7], (TokenType::Punctuator, ")".to_string()));
        assert_eq!(tokens[10], (TokenType::Punctuator, ";;".to_string()));
        assert_eq!(tokens[12], (TokenType::Keyword, "esac".to_string()));
    }

    #[test]
    fn test_extglob() {
        assert_eq!(lex("!(a|b)"), vec![(TokenType::Word, "!(a|b)".to_string())]);
        assert_eq!(lex("x@(y)z"), vec![(TokenType::Word, "x@(y)z".to_string())]);
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(lex("a \\\nb")[1], (TokenType::Whitespace, " \\\n".to_string()));
    }
}
