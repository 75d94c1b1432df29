//! AST Types for Bash
//!
//! A concrete syntax tree. Nodes never own text: each one records the span of
//! the token buffer it was built from, and every comment token is kept in a
//! named slot of exactly one node so the formatter can put it back.

use crate::parser::token_buffer::{TokenIndex, TokenSpan};

/// Comment tokens attached to one slot
pub type Comments = Vec<TokenIndex>;

// =============================================================================
// SCRIPT STRUCTURE
// =============================================================================

/// A sequence of lines: a whole script or the body of a compound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub span: TokenSpan,
    pub lines: Vec<Line>,
}

/// Statements of one physical line with its trailing comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub span: TokenSpan,
    pub statements: Vec<Statement>,
    pub comment: Option<TokenIndex>,
    /// Empty lines between this line and the previous one
    pub blank_lines_before: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndOr {
    And,
    Or,
}

impl AndOr {
    pub fn as_str(&self) -> &'static str {
        match self {
            AndOr::And => "&&",
            AndOr::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    #[default]
    None,
    Semicolon,
    Background,
}

/// `&&` / `||` continuation of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLink {
    pub operator: AndOr,
    /// Comments between the operator and the next statement
    pub comments: Comments,
    pub statement: Box<Statement>,
}

/// A pipeline, optionally chained with `&&`/`||`. The terminator belongs to
/// the innermost statement of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub span: TokenSpan,
    pub pipeline: Pipeline,
    pub next: Option<StatementLink>,
    pub terminator: Terminator,
}

impl Statement {
    /// Terminator of the whole chain
    pub fn final_terminator(&self) -> Terminator {
        match &self.next {
            Some(link) => link.statement.final_terminator(),
            None => self.terminator,
        }
    }
}

/// `|` / `|&` continuation of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLink {
    /// `|&` also pipes standard error
    pub stderr: bool,
    pub comments: Comments,
    pub pipeline: Box<Pipeline>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub span: TokenSpan,
    /// `time`, with `true` for `time -p`
    pub time: Option<bool>,
    pub negated: bool,
    /// `coproc`, with its optional name
    pub coproc: Option<Option<TokenIndex>>,
    pub command: CommandOrCompound,
    pub next: Option<PipelineLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOrCompound {
    Command(Command),
    Compound(Compound),
}

impl CommandOrCompound {
    pub fn span(&self) -> TokenSpan {
        match self {
            CommandOrCompound::Command(c) => c.span,
            CommandOrCompound::Compound(c) => c.span,
        }
    }
}

// =============================================================================
// SIMPLE COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub span: TokenSpan,
    /// Leading `NAME=value` assignments
    pub vars: Vec<Assignment>,
    /// Words, and assignments given to declaration builtins, in order
    pub assignments_or_words: Vec<AssignmentOrWord>,
    pub redirections: Vec<Redirection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOrWord {
    Assignment(Assignment),
    Word(Word),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub span: TokenSpan,
    pub name: TokenIndex,
    pub index: Option<Subscript>,
    /// `+=` rather than `=`
    pub append: bool,
    pub value: AssignmentValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentValue {
    None,
    Word(Word),
    Array(ArrayLiteral),
    /// Operand of `let`, kept as written
    Arithmetic(Vec<ArithmeticEntry>),
}

/// `( elements )` on the right of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLiteral {
    pub span: TokenSpan,
    pub elements: Vec<ArrayElement>,
    /// Comments after the last element
    pub trailing_comments: Comments,
}

impl ArrayLiteral {
    pub fn has_comments(&self) -> bool {
        !self.trailing_comments.is_empty()
            || self
                .elements
                .iter()
                .any(|e| !e.comments_before.is_empty() || e.comment_after.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayElement {
    pub span: TokenSpan,
    pub comments_before: Comments,
    /// `[key]=` prefix
    pub index: Option<Subscript>,
    pub value: Option<Word>,
    /// Comment on the same line after the element
    pub comment_after: Option<TokenIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub span: TokenSpan,
    /// Number or `{name}` before the operator
    pub fd: Option<TokenIndex>,
    pub operator: TokenIndex,
    pub target: Word,
    pub heredoc: Option<Heredoc>,
}

/// Body of a `<<` / `<<-` redirection. Its tokens follow the line that
/// introduced it and are spanned by the node that consumed that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heredoc {
    /// Body tokens, including the closing delimiter line
    pub span: TokenSpan,
    pub parts: Vec<WordPart>,
    /// Delimiter was quoted, so the body has no expansions
    pub quoted: bool,
    pub strip_tabs: bool,
    pub end: TokenIndex,
}

// =============================================================================
// COMPOUND COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    pub span: TokenSpan,
    pub kind: CompoundKind,
    pub redirections: Vec<Redirection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompoundKind {
    If(IfCompound),
    Case(CaseCompound),
    Loop(LoopCompound),
    For(ForCompound),
    Select(SelectCompound),
    Test(TestCompound),
    Grouping(GroupingCompound),
    Function(FunctionCompound),
    Arithmetic(ArithmeticCompound),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfCompound {
    pub span: TokenSpan,
    /// The `if` clause followed by every `elif` clause
    pub clauses: Vec<TestConsequence>,
    pub else_body: Option<File>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConsequence {
    pub span: TokenSpan,
    pub comments_before_test: Comments,
    pub test: Box<Statement>,
    pub comments_after_test: Comments,
    pub consequence: File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseTerminator {
    /// Last item without `;;`
    #[default]
    Unterminated,
    /// `;;`
    End,
    /// `;&`
    Fallthrough,
    /// `;;&`
    Continue,
}

impl CaseTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseTerminator::Unterminated => "",
            CaseTerminator::End => ";;",
            CaseTerminator::Fallthrough => ";&",
            CaseTerminator::Continue => ";;&",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseCompound {
    pub span: TokenSpan,
    pub subject: Word,
    pub comments_before_in: Comments,
    pub items: Vec<PatternLines>,
    pub comments_before_esac: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLines {
    pub span: TokenSpan,
    pub comments_before: Comments,
    pub patterns: Vec<Word>,
    pub body: File,
    pub terminator: CaseTerminator,
    /// Comment on the same line as the terminator
    pub comments_after: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopCompound {
    pub span: TokenSpan,
    /// `until` rather than `while`
    pub until: bool,
    pub comments_before_condition: Comments,
    pub condition: Box<Statement>,
    pub comments_after_condition: Comments,
    pub body: File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForCompound {
    pub span: TokenSpan,
    pub header: ForHeader,
    pub comments_before_do: Comments,
    pub body: File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForHeader {
    /// `for name [in words...]`
    Each {
        name: TokenIndex,
        words: Option<Vec<Word>>,
    },
    /// `for (( init; condition; step ))`
    CStyle {
        init: Vec<ArithmeticEntry>,
        condition: Vec<ArithmeticEntry>,
        step: Vec<ArithmeticEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectCompound {
    pub span: TokenSpan,
    pub name: TokenIndex,
    pub words: Option<Vec<Word>>,
    pub comments_before_do: Comments,
    pub body: File,
}

/// `[[ expression ]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCompound {
    pub span: TokenSpan,
    pub expression: TestExpression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestExpression {
    Binary {
        left: Box<TestExpression>,
        operator: AndOr,
        right: Box<TestExpression>,
    },
    Not(Box<TestExpression>),
    Group(Box<TestExpression>),
    /// `-f word` and friends
    Unary { operator: TokenIndex, operand: Word },
    /// `word == word`, `word -lt word`, `word =~ regex`...
    Compare {
        left: Word,
        operator: TokenIndex,
        right: Word,
    },
    /// A bare word, true when non-empty
    Word(Word),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingCompound {
    pub span: TokenSpan,
    /// `( )` rather than `{ }`
    pub subshell: bool,
    pub body: File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCompound {
    pub span: TokenSpan,
    /// Declared with the `function` keyword
    pub keyword: bool,
    pub name: TokenIndex,
    /// Declared with `()`
    pub parens: bool,
    pub comments_before_body: Comments,
    pub body: GroupingCompound,
}

/// `(( ))` or `$(( ))`: a flat list of operands and operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithmeticCompound {
    pub span: TokenSpan,
    /// `(( ))` command rather than `$(( ))` expansion
    pub expression: bool,
    pub entries: Vec<ArithmeticEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticEntry {
    Word(Word),
    Operator(TokenIndex),
}

// =============================================================================
// WORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub span: TokenSpan,
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    /// Unquoted text, or a piece of a double-quoted string or heredoc body
    Literal(TokenIndex),
    /// `'...'` or `$'...'`
    SingleQuoted(TokenIndex),
    DoubleQuoted {
        span: TokenSpan,
        parts: Vec<WordPart>,
    },
    Parameter(ParameterExpansion),
    CommandSubstitution {
        span: TokenSpan,
        /// `` `...` `` rather than `$(...)`
        backtick: bool,
        body: File,
    },
    Arithmetic(ArithmeticCompound),
    ProcessSubstitution {
        span: TokenSpan,
        /// `<(...)` rather than `>(...)`
        input: bool,
        body: File,
    },
    BraceExpansion(BraceExpansion),
    Subscript(Subscript),
}

/// `[ ... ]` index of an array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscript {
    pub span: TokenSpan,
    pub entries: Vec<ArithmeticEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BraceExpansion {
    pub span: TokenSpan,
    pub kind: BraceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BraceKind {
    /// `{a,b,c}`: each element is a run of literal and nested parts
    List(Vec<Vec<WordPart>>),
    /// `{1..5}` / `{a..z..2}`
    Range {
        start: TokenIndex,
        end: TokenIndex,
        step: Option<TokenIndex>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterPrefix {
    /// `${#name}`
    Length,
    /// `${!name}`
    Indirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterExpansion {
    pub span: TokenSpan,
    /// `${...}` rather than `$name`
    pub braced: bool,
    pub prefix: Option<ParameterPrefix>,
    pub name: TokenIndex,
    pub index: Option<Subscript>,
    pub operator: Option<TokenIndex>,
    pub operation: Option<ParameterOperation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    /// `-` / `:-`
    UseDefault,
    /// `=` / `:=`
    AssignDefault,
    /// `?` / `:?`
    ErrorIfUnset,
    /// `+` / `:+`
    UseAlternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceKind {
    First,
    All,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterOperation {
    Substring {
        offset: Vec<ArithmeticEntry>,
        length: Option<Vec<ArithmeticEntry>>,
    },
    Default {
        kind: DefaultKind,
        /// Also applies when the value is empty
        colon: bool,
        word: Word,
    },
    RemovePrefix {
        longest: bool,
        pattern: Word,
    },
    RemoveSuffix {
        longest: bool,
        pattern: Word,
    },
    Replace {
        kind: ReplaceKind,
        pattern: Word,
        replacement: Option<Word>,
    },
    CaseModify {
        upper: bool,
        all: bool,
        pattern: Word,
    },
    /// `${name@Q}` and the other `@` operators
    Transform { operator: TokenIndex },
    /// `${!prefix*}` / `${!prefix@}`
    MatchingNames,
}
