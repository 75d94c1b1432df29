//! Rendering of syntax tree nodes
//!
//! One [`Render`] implementation per node. Layout decisions that differ by
//! mode are made here; spacing between pieces is left to the [`Printer`].

use crate::ast::types::{
    ArithmeticCompound, ArithmeticEntry, ArrayElement, ArrayLiteral, Assignment, AssignmentOrWord,
    AssignmentValue, BraceExpansion, BraceKind, CaseCompound, CaseTerminator, Command,
    CommandOrCompound, Comments, Compound, CompoundKind, File, ForCompound, ForHeader,
    FunctionCompound, GroupingCompound, IfCompound, Line, LoopCompound, ParameterExpansion,
    ParameterOperation, ParameterPrefix, PatternLines, Pipeline, Redirection, SelectCompound,
    Statement, Subscript, Terminator, TestCompound, TestConsequence, TestExpression, Word, WordPart,
};
use crate::format::printer::{Gap, Printer};
use crate::parser::lexer::TokenType;
use crate::parser::token_buffer::TokenSpan;

/// A node that can be written out as shell source
pub trait Render {
    fn render(&self, p: &mut Printer<'_>);
}

// =============================================================================
// Helpers
// =============================================================================

/// Body of a compound: own lines in verbose mode, inline in simple mode
fn block(p: &mut Printer<'_>, file: &File) {
    p.indent();
    if p.verbose() {
        p.newline();
    } else {
        p.space();
    }
    file.render(p);
    p.dedent();
    if !p.verbose() {
        p.space();
    }
}

/// Space before the next item unless it is the first one
fn separate(p: &mut Printer<'_>, started: &mut bool, hard: bool) {
    if *started {
        p.gap(if hard { Gap::Hard } else { Gap::Soft });
    }
    *started = true;
}

/// `<(` and `>(` open a process substitution only at the start of a word
fn opens_substitution(word: &Word) -> bool {
    matches!(word.parts.first(), Some(WordPart::ProcessSubstitution { .. }))
}

fn entries(p: &mut Printer<'_>, entries: &[ArithmeticEntry], gap: Gap) {
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            p.gap(gap);
        }
        match entry {
            ArithmeticEntry::Word(word) => word.render(p),
            ArithmeticEntry::Operator(index) => p.token(*index),
        }
    }
}

/// Comments between an operator and the statement or pipeline it links to
fn continuation(p: &mut Printer<'_>, comments: &Comments, rest: impl FnOnce(&mut Printer<'_>)) {
    if comments.is_empty() {
        p.space();
        rest(p);
        return;
    }
    p.indent();
    for comment in comments {
        p.comment_line(*comment);
    }
    rest(p);
    p.dedent();
}

/// `if` / `while` / `until` condition up to the keyword that follows it
fn condition(p: &mut Printer<'_>, before: &Comments, statement: &Statement, after: &Comments) {
    p.space();
    for comment in before {
        p.comment_line(*comment);
    }
    if before.is_empty() {
        statement.render(p);
    } else {
        p.indent();
        statement.render(p);
        p.dedent();
    }
    for comment in after {
        p.comment_line(*comment);
    }
    p.space();
}

fn word_list(p: &mut Printer<'_>, words: &Option<Vec<Word>>) {
    if let Some(words) = words {
        p.space();
        p.write("in");
        for word in words {
            p.space();
            word.render(p);
        }
    }
    p.write(";");
}

fn render_statement(statement: &Statement, p: &mut Printer<'_>, explicit: bool) {
    statement.pipeline.render(p);
    match &statement.next {
        Some(link) => {
            p.space();
            p.write(link.operator.as_str());
            continuation(p, &link.comments, |p| render_statement(&link.statement, p, explicit));
        }
        None => match statement.terminator {
            Terminator::Background => {
                p.space();
                p.write("&");
            }
            _ if explicit => p.write(";"),
            _ => {}
        },
    }
}

/// Whether a substitution body fits on the line it starts on
fn fits_inline(p: &Printer<'_>, body: &File, span: TokenSpan) -> bool {
    body.lines.len() <= 1
        && !p
            .buffer()
            .slice(span)
            .iter()
            .any(|t| matches!(t.token_type, TokenType::Comment | TokenType::HeredocEnd))
}

/// Body of `$( )`, backticks or `<( )`, between its delimiters
fn substitution(p: &mut Printer<'_>, body: &File, span: TokenSpan) {
    if fits_inline(p, body, span) {
        if let Some(line) = body.lines.first() {
            let count = line.statements.len();
            for (i, statement) in line.statements.iter().enumerate() {
                if i > 0 {
                    p.space();
                }
                // verbose output drops the `;` before the closer
                let explicit = !p.verbose() || i + 1 < count;
                render_statement(statement, p, explicit);
            }
        }
    } else {
        p.indent();
        if p.verbose() {
            p.newline();
        }
        body.render(p);
        p.dedent();
    }
}

// =============================================================================
// Script structure
// =============================================================================

impl Render for File {
    fn render(&self, p: &mut Printer<'_>) {
        p.begin_alignment();
        for (i, line) in self.lines.iter().enumerate() {
            let aligned = line.comment.is_some() && !line.statements.is_empty();
            // blank lines only where the output breaks lines
            let blank = i > 0 && line.blank_lines_before > 0 && (p.verbose() || p.at_line_start());
            if !aligned || blank {
                p.break_alignment();
            }
            if blank {
                // verbose collapses a run to one, simple keeps it
                let count = if p.verbose() { 1 } else { line.blank_lines_before };
                for _ in 0..count {
                    p.newline();
                }
            }
            line.render(p);
            // simple output keeps nested lines together unless a comment or
            // heredoc body has to end the line
            if p.verbose() || line.comment.is_some() || p.has_heredocs() || !p.nested() {
                p.newline();
            } else {
                p.space();
            }
        }
        p.end_alignment();
    }
}

impl Render for Line {
    fn render(&self, p: &mut Printer<'_>) {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                p.space();
            }
            statement.render(p);
        }
        if let Some(comment) = self.comment {
            if self.statements.is_empty() {
                p.comment(comment);
            } else {
                p.aligned_comment(comment);
            }
        }
    }
}

impl Render for Statement {
    fn render(&self, p: &mut Printer<'_>) {
        render_statement(self, p, true);
    }
}

impl Render for Pipeline {
    fn render(&self, p: &mut Printer<'_>) {
        if let Some(posix) = self.time {
            p.write("time");
            if posix {
                p.space();
                p.write("-p");
            }
            p.space();
        }
        if self.negated {
            p.write("!");
            p.space();
        }
        if let Some(name) = self.coproc {
            p.write("coproc");
            p.space();
            if let Some(name) = name {
                p.token(name);
                p.space();
            }
        }
        self.command.render(p);
        if let Some(link) = &self.next {
            p.space();
            p.write(if link.stderr { "|&" } else { "|" });
            continuation(p, &link.comments, |p| link.pipeline.render(p));
        }
    }
}

impl Render for CommandOrCompound {
    fn render(&self, p: &mut Printer<'_>) {
        match self {
            CommandOrCompound::Command(command) => command.render(p),
            CommandOrCompound::Compound(compound) => compound.render(p),
        }
    }
}

// =============================================================================
// Simple commands
// =============================================================================

impl Render for Command {
    fn render(&self, p: &mut Printer<'_>) {
        let mut started = false;
        for var in &self.vars {
            separate(p, &mut started, false);
            var.render(p);
        }
        for item in &self.assignments_or_words {
            match item {
                AssignmentOrWord::Assignment(assignment) => {
                    separate(p, &mut started, false);
                    assignment.render(p);
                }
                AssignmentOrWord::Word(word) => {
                    separate(p, &mut started, opens_substitution(word));
                    word.render(p);
                }
            }
        }
        for redirection in &self.redirections {
            separate(p, &mut started, false);
            redirection.render(p);
        }
    }
}

impl Render for Assignment {
    fn render(&self, p: &mut Printer<'_>) {
        p.token(self.name);
        if let Some(index) = &self.index {
            index.render(p);
        }
        p.write(if self.append { "+=" } else { "=" });
        match &self.value {
            AssignmentValue::None => {}
            AssignmentValue::Word(word) => word.render(p),
            AssignmentValue::Array(array) => array.render(p),
            // packed, a blank ends the operand
            AssignmentValue::Arithmetic(list) => entries(p, list, Gap::None),
        }
    }
}

impl Render for ArrayLiteral {
    fn render(&self, p: &mut Printer<'_>) {
        if !p.verbose() {
            let text = p.buffer().text(self.span);
            p.write(&text);
            return;
        }
        p.write("(");
        if !self.has_comments() {
            for (i, element) in self.elements.iter().enumerate() {
                if i > 0 {
                    p.space();
                }
                element.render(p);
            }
            p.write(")");
            return;
        }

        p.indent();
        p.newline();
        for element in &self.elements {
            for comment in &element.comments_before {
                p.comment_line(*comment);
            }
            element.render(p);
            if let Some(comment) = element.comment_after {
                p.comment(comment);
            }
            p.newline();
        }
        for comment in &self.trailing_comments {
            p.comment_line(*comment);
        }
        p.dedent();
        p.write(")");
    }
}

impl Render for ArrayElement {
    fn render(&self, p: &mut Printer<'_>) {
        if let Some(index) = &self.index {
            index.render(p);
            p.write("=");
        }
        if let Some(value) = &self.value {
            value.render(p);
        }
    }
}

impl Render for Redirection {
    fn render(&self, p: &mut Printer<'_>) {
        if let Some(fd) = self.fd {
            p.token(fd);
        }
        p.token(self.operator);
        p.gap(Gap::Needed);
        self.target.render(p);
        if let Some(heredoc) = &self.heredoc {
            p.heredoc(heredoc.span);
        }
    }
}

// =============================================================================
// Compound commands
// =============================================================================

impl Render for Compound {
    fn render(&self, p: &mut Printer<'_>) {
        match &self.kind {
            CompoundKind::If(c) => c.render(p),
            CompoundKind::Case(c) => c.render(p),
            CompoundKind::Loop(c) => c.render(p),
            CompoundKind::For(c) => c.render(p),
            CompoundKind::Select(c) => c.render(p),
            CompoundKind::Test(c) => c.render(p),
            CompoundKind::Grouping(c) => c.render(p),
            CompoundKind::Function(c) => c.render(p),
            CompoundKind::Arithmetic(c) => c.render(p),
        }
        for redirection in &self.redirections {
            p.space();
            redirection.render(p);
        }
    }
}

impl Render for IfCompound {
    fn render(&self, p: &mut Printer<'_>) {
        for (i, clause) in self.clauses.iter().enumerate() {
            p.write(if i == 0 { "if" } else { "elif" });
            clause.render(p);
        }
        if let Some(body) = &self.else_body {
            p.write("else");
            block(p, body);
        }
        p.write("fi");
    }
}

impl Render for TestConsequence {
    fn render(&self, p: &mut Printer<'_>) {
        condition(p, &self.comments_before_test, &self.test, &self.comments_after_test);
        p.write("then");
        block(p, &self.consequence);
    }
}

impl Render for CaseCompound {
    fn render(&self, p: &mut Printer<'_>) {
        p.write("case");
        p.space();
        self.subject.render(p);
        for comment in &self.comments_before_in {
            p.comment_line(*comment);
        }
        p.space();
        p.write("in");
        if p.verbose() {
            p.newline();
        } else {
            p.space();
        }
        for item in &self.items {
            item.render(p);
        }
        for comment in &self.comments_before_esac {
            p.comment_line(*comment);
        }
        p.write("esac");
    }
}

impl Render for PatternLines {
    fn render(&self, p: &mut Printer<'_>) {
        for comment in &self.comments_before {
            p.comment_line(*comment);
        }
        for (i, pattern) in self.patterns.iter().enumerate() {
            if i > 0 {
                p.space();
                p.write("|");
                p.space();
            }
            pattern.render(p);
        }
        p.write(")");
        block(p, &self.body);
        if self.terminator == CaseTerminator::Unterminated {
            return;
        }

        p.indent();
        p.write(self.terminator.as_str());
        for comment in &self.comments_after {
            p.comment(*comment);
        }
        p.dedent();
        if p.verbose() || !self.comments_after.is_empty() {
            p.newline();
        } else {
            p.space();
        }
    }
}

impl Render for LoopCompound {
    fn render(&self, p: &mut Printer<'_>) {
        p.write(if self.until { "until" } else { "while" });
        condition(
            p,
            &self.comments_before_condition,
            &self.condition,
            &self.comments_after_condition,
        );
        p.write("do");
        block(p, &self.body);
        p.write("done");
    }
}

impl Render for ForCompound {
    fn render(&self, p: &mut Printer<'_>) {
        p.write("for");
        p.space();
        match &self.header {
            ForHeader::Each { name, words } => {
                p.token(*name);
                word_list(p, words);
            }
            ForHeader::CStyle {
                init,
                condition,
                step,
            } => {
                p.write("((");
                for (i, section) in [init, condition, step].into_iter().enumerate() {
                    if i > 0 {
                        p.write(";");
                    }
                    p.gap(Gap::Verbose);
                    entries(p, section, Gap::Arithmetic);
                }
                p.gap(Gap::Verbose);
                p.write("))");
                p.write(";");
            }
        }
        for comment in &self.comments_before_do {
            p.comment_line(*comment);
        }
        p.space();
        p.write("do");
        block(p, &self.body);
        p.write("done");
    }
}

impl Render for SelectCompound {
    fn render(&self, p: &mut Printer<'_>) {
        p.write("select");
        p.space();
        p.token(self.name);
        word_list(p, &self.words);
        for comment in &self.comments_before_do {
            p.comment_line(*comment);
        }
        p.space();
        p.write("do");
        block(p, &self.body);
        p.write("done");
    }
}

impl Render for TestCompound {
    fn render(&self, p: &mut Printer<'_>) {
        p.write("[[");
        p.gap(Gap::Hard);
        self.expression.render(p);
        p.gap(Gap::Hard);
        p.write("]]");
    }
}

impl Render for TestExpression {
    fn render(&self, p: &mut Printer<'_>) {
        match self {
            TestExpression::Binary {
                left,
                operator,
                right,
            } => {
                left.render(p);
                p.gap(Gap::Hard);
                p.write(operator.as_str());
                p.gap(Gap::Hard);
                right.render(p);
            }
            TestExpression::Not(inner) => {
                p.write("!");
                p.gap(Gap::Hard);
                inner.render(p);
            }
            TestExpression::Group(inner) => {
                p.write("(");
                p.gap(Gap::Hard);
                inner.render(p);
                p.gap(Gap::Hard);
                p.write(")");
            }
            TestExpression::Unary { operator, operand } => {
                p.token(*operator);
                p.gap(Gap::Hard);
                operand.render(p);
            }
            TestExpression::Compare {
                left,
                operator,
                right,
            } => {
                left.render(p);
                p.gap(Gap::Hard);
                match p.text(*operator) {
                    "=" if !p.verbose() => p.write("=="),
                    text => p.write(text),
                }
                p.gap(Gap::Hard);
                right.render(p);
            }
            TestExpression::Word(word) => word.render(p),
        }
    }
}

impl Render for GroupingCompound {
    fn render(&self, p: &mut Printer<'_>) {
        let (open, close) = if self.subshell { ("(", ")") } else { ("{", "}") };
        p.write(open);
        block(p, &self.body);
        p.write(close);
    }
}

impl Render for FunctionCompound {
    fn render(&self, p: &mut Printer<'_>) {
        if self.keyword {
            p.write("function");
            p.space();
        }
        p.token(self.name);
        if self.parens {
            p.write("()");
        }
        for comment in &self.comments_before_body {
            p.comment_line(*comment);
        }
        p.space();
        self.body.render(p);
    }
}

impl Render for ArithmeticCompound {
    fn render(&self, p: &mut Printer<'_>) {
        p.write(if self.expression { "((" } else { "$((" });
        p.gap(Gap::Verbose);
        entries(p, &self.entries, Gap::Arithmetic);
        p.gap(Gap::Verbose);
        p.write("))");
    }
}

// =============================================================================
// Words
// =============================================================================

impl Render for Word {
    fn render(&self, p: &mut Printer<'_>) {
        for part in &self.parts {
            part.render(p);
        }
    }
}

impl Render for WordPart {
    fn render(&self, p: &mut Printer<'_>) {
        match self {
            WordPart::Literal(index) | WordPart::SingleQuoted(index) => p.token(*index),
            WordPart::DoubleQuoted { parts, .. } => {
                for part in parts {
                    part.render(p);
                }
            }
            WordPart::Parameter(expansion) => expansion.render(p),
            WordPart::CommandSubstitution {
                span,
                backtick: true,
                body,
            } => {
                p.open_backtick();
                substitution(p, body, *span);
                p.close_backtick();
            }
            WordPart::CommandSubstitution { span, body, .. } => {
                p.write("$(");
                substitution(p, body, *span);
                p.write(")");
            }
            WordPart::Arithmetic(arithmetic) => arithmetic.render(p),
            WordPart::ProcessSubstitution { span, input, body } => {
                p.write(if *input { "<(" } else { ">(" });
                substitution(p, body, *span);
                p.write(")");
            }
            WordPart::BraceExpansion(expansion) => expansion.render(p),
            WordPart::Subscript(subscript) => subscript.render(p),
        }
    }
}

impl Render for Subscript {
    fn render(&self, p: &mut Printer<'_>) {
        p.write("[");
        entries(p, &self.entries, Gap::Tight);
        p.write("]");
    }
}

impl Render for BraceExpansion {
    fn render(&self, p: &mut Printer<'_>) {
        p.write("{");
        match &self.kind {
            BraceKind::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        p.write(",");
                    }
                    for part in item {
                        part.render(p);
                    }
                }
            }
            BraceKind::Range { start, end, step } => {
                p.token(*start);
                p.write("..");
                p.token(*end);
                if let Some(step) = step {
                    p.write("..");
                    p.token(*step);
                }
            }
        }
        p.write("}");
    }
}

/// Whether an offset starts with `-`, which must not touch the `:`
fn negative(p: &Printer<'_>, offset: &[ArithmeticEntry]) -> bool {
    match offset.first() {
        Some(ArithmeticEntry::Operator(index)) => p.text(*index).starts_with('-'),
        Some(ArithmeticEntry::Word(word)) => p.buffer().text(word.span).starts_with('-'),
        None => false,
    }
}

impl Render for ParameterExpansion {
    fn render(&self, p: &mut Printer<'_>) {
        if !self.braced {
            p.write("$");
            p.token(self.name);
            return;
        }
        p.write("${");
        match self.prefix {
            Some(ParameterPrefix::Length) => p.write("#"),
            Some(ParameterPrefix::Indirect) => p.write("!"),
            None => {}
        }
        p.token(self.name);
        if let Some(index) = &self.index {
            index.render(p);
        }
        if let Some(operator) = self.operator {
            p.token(operator);
        }
        if let Some(operation) = &self.operation {
            operation.render(p);
        }
        p.write("}");
    }
}

impl Render for ParameterOperation {
    fn render(&self, p: &mut Printer<'_>) {
        match self {
            ParameterOperation::Substring { offset, length } => {
                if negative(p, offset) {
                    p.gap(Gap::Hard);
                }
                entries(p, offset, Gap::Tight);
                if let Some(length) = length {
                    p.write(":");
                    entries(p, length, Gap::Tight);
                }
            }
            ParameterOperation::Default { word, .. }
            | ParameterOperation::RemovePrefix { pattern: word, .. }
            | ParameterOperation::RemoveSuffix { pattern: word, .. }
            | ParameterOperation::CaseModify { pattern: word, .. } => word.render(p),
            ParameterOperation::Replace {
                pattern,
                replacement,
                ..
            } => {
                pattern.render(p);
                if let Some(replacement) = replacement {
                    p.write("/");
                    replacement.render(p);
                }
            }
            ParameterOperation::Transform { operator } => p.token(*operator),
            ParameterOperation::MatchingNames => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::printer::FormatMode;
    use crate::parser::parse;

    fn simple(input: &str) -> String {
        parse(input).unwrap().format(FormatMode::Simple)
    }

    fn verbose(input: &str) -> String {
        parse(input).unwrap().format(FormatMode::Verbose)
    }

    #[test]
    fn test_if_layout() {
        assert_eq!(verbose("if a; then b; fi"), "if a; then\n\tb;\nfi;\n");
        assert_eq!(simple("if a; then b; fi"), "if a;then b;fi;\n");
        assert_eq!(
            verbose("if a\nthen b\nelif c; then d; else e; fi"),
            "if a; then\n\tb;\nelif c; then\n\td;\nelse\n\te;\nfi;\n"
        );
    }

    #[test]
    fn test_case_layout() {
        assert_eq!(verbose("case a in b)c\nesac"), "case a in\nb)\n\tc;\nesac;\n");
        assert_eq!(
            verbose("case a in b|c) d;; e) ;& esac"),
            "case a in\nb | c)\n\td;\n\t;;\ne)\n\t;&\nesac;\n"
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(verbose("(( a ))"), "(( a ));\n");
        assert_eq!(simple("(( a + 1 ))"), "((a+1));\n");
        assert_eq!(verbose("echo $((a+1))"), "echo $(( a + 1 ));\n");
    }

    #[test]
    fn test_operators_and_pipelines() {
        assert_eq!(verbose("a&&b||c"), "a && b || c;\n");
        assert_eq!(simple("a  |  b &"), "a|b&\n");
        assert_eq!(verbose("! a | b"), "! a | b;\n");
    }

    #[test]
    fn test_test_expression() {
        assert_eq!(simple("[[ $a = b ]]"), "[[ $a == b ]];\n");
        assert_eq!(verbose("[[ $a = b ]]"), "[[ $a = b ]];\n");
        assert_eq!(verbose("[[ ! -f x  &&  ( a||b ) ]]"), "[[ ! -f x && ( a || b ) ]];\n");
    }

    #[test]
    fn test_groups_and_functions() {
        assert_eq!(verbose("{ a; b; }"), "{\n\ta; b;\n};\n");
        assert_eq!(verbose("{ a\nb; }"), "{\n\ta;\n\tb;\n};\n");
        assert_eq!(simple("{ a; b; }"), "{ a;b;};\n");
        assert_eq!(verbose("f() { a; }"), "f() {\n\ta;\n};\n");
        assert_eq!(simple("function f { a; }"), "function f { a;};\n");
    }

    #[test]
    fn test_loops() {
        assert_eq!(verbose("while a; do b; done"), "while a; do\n\tb;\ndone;\n");
        assert_eq!(verbose("for i in a b; do c; done"), "for i in a b; do\n\tc;\ndone;\n");
        assert_eq!(
            simple("for ((i = 0; i < 3; i++)); do c; done"),
            "for ((i=0;i<3;i++));do c;done;\n"
        );
    }

    #[test]
    fn test_command_substitution() {
        assert_eq!(verbose("x=$( a ;b )"), "x=$(a; b);\n");
        assert_eq!(simple("x=$( a ;b )"), "x=$(a;b;);\n");
    }

    #[test]
    fn test_redirections_move_after_words() {
        assert_eq!(verbose(">out echo  a 2>&1"), "echo a >out 2>&1;\n");
    }

    #[test]
    fn test_redirection_targets_stay_tight() {
        assert_eq!(simple("echo a > /dev/null 2>&1"), "echo a>/dev/null 2>&1;\n");
        assert_eq!(verbose("echo a > /dev/null"), "echo a >/dev/null;\n");
        assert_eq!(simple("cat < <(a)"), "cat< <(a;);\n");
    }

    #[test]
    fn test_space_after_closing_paren() {
        assert_eq!(simple("a=(1 2) b"), "a=(1 2) b;\n");
        assert_eq!(simple("declare -a x=(1)  y"), "declare -a x=(1) y;\n");
        assert_eq!(simple("echo $(a)b $(c) d"), "echo $(a;)b $(c;) d;\n");
        assert_eq!(simple("x=$(a) <(b)"), "x=$(a;) <(b;);\n");
    }

    #[test]
    fn test_nested_backticks() {
        let input = "echo `a \\`b\\``";
        assert_eq!(verbose(input), "echo `a \\`b\\``;\n");
        assert_eq!(simple(input), "echo `a \\`b;\\`;`;\n");
        let reparsed = parse(&simple(input)).unwrap().format(FormatMode::Verbose);
        assert_eq!(reparsed, verbose(input));

        let deep = "echo `a \\`b \\\\\\`c\\\\\\`\\``";
        assert_eq!(verbose(deep), format!("{};\n", deep));
    }

    #[test]
    fn test_keywords_as_arguments() {
        assert_eq!(simple("echo then case"), "echo then case;\n");
        assert_eq!(verbose("echo { case"), "echo { case;\n");
        assert_eq!(verbose("echo ! case"), "echo ! case;\n");
        assert_eq!(verbose("echo do [[ x"), "echo do [[ x;\n");
        for input in [
            "function f { case a in b) c;; esac; }",
            "f() { [[ a ]]; }",
            "if { case a in b) ;; esac; }; then :; fi",
        ] {
            let once = verbose(input);
            assert_eq!(verbose(&once), once);
        }
    }

    #[test]
    fn test_let_operands_stay_packed() {
        assert_eq!(verbose("let  i=i+1   j=$k*2"), "let i=i+1 j=$k*2;\n");
        assert_eq!(simple("let i+=2**3;let \"j = 1\""), "let i+=2**3;let \"j = 1\";\n");
        assert_eq!(simple("x=1+2"), "x=1+2;\n");
    }

    #[test]
    fn test_heredoc_kept_verbatim() {
        let input = "cat <<EOF\n  body $x\n\tEOF2\nEOF\necho done\n";
        assert_eq!(verbose(input), "cat <<EOF;\n  body $x\n\tEOF2\nEOF\necho done;\n");
        assert_eq!(simple(input), "cat<<EOF;\n  body $x\n\tEOF2\nEOF\necho done;\n");
    }

    #[test]
    fn test_blank_lines_and_alignment() {
        assert_eq!(
            verbose("a # one\nlong # two\n\n\n\nb"),
            "a;    # one\nlong; # two\n\nb;\n"
        );
        assert_eq!(simple("a # one\n\n\nb"), "a; # one\n\n\nb;\n");
        assert_eq!(simple("{ a\n\nb; }"), "{ a;b;};\n");
    }

    #[test]
    fn test_array_comments() {
        let input = "a=(\n# word comment\nb # post-word comment\n)";
        assert_eq!(simple(input), "a=(\n# word comment\nb # post-word comment\n);\n");
        assert_eq!(
            verbose(input),
            "a=(\n\t# word comment\n\tb # post-word comment\n);\n"
        );
        assert_eq!(verbose("a=( x  y )"), "a=(x y);\n");
    }

    #[test]
    fn test_parameter_expansions() {
        assert_eq!(
            simple("echo ${a: -1} ${b:-x} ${c//a/b} ${#d[@]}"),
            "echo ${a: -1} ${b:-x} ${c//a/b} ${#d[@]};\n"
        );
    }
}
