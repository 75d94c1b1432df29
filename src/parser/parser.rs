//! Recursive Descent Parser for Bash Scripts
//!
//! Grammar rules above the simple command. Every rule opens a child cursor,
//! and on failure wraps the child's error in its own production name.
//!
//! Grammar (simplified):
//!   file         ::= line*
//!   line         ::= statement* [comment] (newline | EOF | closer)
//!   statement    ::= pipeline [(&& | '||') comment* statement] [; | &]
//!   pipeline     ::= [time [-p]] [!] [coproc [name]] command_or_compound [(| | |&) comment* pipeline]
//!   command_or_compound ::= compound | simple_command

use std::io::Read;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::ast::types::{
    AndOr, Comments, CommandOrCompound, File, Line, Pipeline, PipelineLink, Statement,
    StatementLink, Terminator,
};
use crate::ast::Script;
use crate::parser::command_parser::parse_command;
use crate::parser::compound_parser::{parse_compound, starts_compound};
use crate::parser::cursor::Cursor;
use crate::parser::lexer::{Token, TokenType};
use crate::parser::token_buffer::TokenBuffer;
use crate::parser::types::{Error, ErrorKind, ParseError, ParserOptions};

const FILE: &str = "File";
const LINE: &str = "Line";
const STATEMENT: &str = "Statement";
const PIPELINE: &str = "Pipeline";
const COMMAND_OR_COMPOUND: &str = "CommandOrCompound";

/// Tokens that end the enclosing body
pub fn is_closer(token: &Token) -> bool {
    match token.token_type {
        TokenType::Keyword => matches!(
            token.value.as_str(),
            "then" | "else" | "elif" | "fi" | "do" | "done" | "esac" | "}"
        ),
        TokenType::Punctuator => matches!(token.value.as_str(), ")" | ";;" | ";&" | ";;&"),
        TokenType::CloseBacktick => true,
        _ => false,
    }
}

/// Collect comments separated by whitespace and line breaks
pub fn parse_comments(cursor: &mut Cursor) -> Comments {
    let mut comments = Vec::new();
    loop {
        cursor.skip_whitespace();
        if cursor.accept_line_terminator() {
            continue;
        }
        match cursor.peek() {
            Some(t) if t.token_type == TokenType::Comment => {
                comments.extend(cursor.take());
            }
            _ => return comments,
        }
    }
}

/// Parse lines until the end of input or a closing keyword
pub fn parse_file(cursor: &mut Cursor) -> Result<File, ParseError> {
    let mut goal = cursor.nested(FILE)?;
    // The first newline of a body ends the line that opened it
    let mut header = !goal.at_line_start();
    let mut blank_lines = 0;
    let mut lines = Vec::new();
    loop {
        goal.skip_whitespace();
        if goal.accept_line_terminator() {
            if header {
                header = false;
            } else {
                blank_lines += 1;
            }
            continue;
        }
        match goal.peek() {
            None => break,
            Some(t) if is_closer(t) => break,
            Some(_) => {}
        }
        let mut line = parse_line(&mut goal).map_err(|e| e.wrap(FILE))?;
        line.blank_lines_before = blank_lines;
        lines.push(line);
        blank_lines = 0;
        header = false;
    }

    cursor.score(&goal);
    Ok(File {
        span: goal.span(),
        lines,
    })
}

/// Whether nothing more can follow on the current line
fn at_line_end(cursor: &Cursor) -> bool {
    match cursor.peek() {
        None => true,
        Some(t) => {
            matches!(t.token_type, TokenType::Comment | TokenType::LineTerminator) || is_closer(t)
        }
    }
}

fn parse_line(cursor: &mut Cursor) -> Result<Line, ParseError> {
    let mut goal = cursor.goal();
    let mut statements = Vec::new();
    let mut next = goal.goal();
    next.skip_whitespace();
    let mut done = at_line_end(&next);
    while !done {
        let statement = parse_statement(&mut goal).map_err(|e| e.wrap(LINE))?;
        let mut next = goal.goal();
        next.skip_whitespace();
        done = statement.final_terminator() == Terminator::None || at_line_end(&next);
        statements.push(statement);
    }

    let mut next = goal.goal();
    next.skip_whitespace();
    let comment = match next.peek() {
        Some(t) if t.token_type == TokenType::Comment => {
            let index = next.take();
            goal.score(&next);
            index
        }
        _ => None,
    };

    let mut next = goal.goal();
    next.skip_whitespace();
    if next.accept_line_terminator() {
        goal.score(&next);
    } else if next.peek().is_some_and(|t| !is_closer(t)) {
        return Err(next.error(ErrorKind::InvalidEndOfStatement, LINE));
    }

    cursor.score(&goal);
    Ok(Line {
        span: goal.span(),
        statements,
        comment,
        blank_lines_before: 0,
    })
}

/// Parse a pipeline and its `&&` / `||` continuation
pub fn parse_statement(cursor: &mut Cursor) -> Result<Statement, ParseError> {
    let mut goal = cursor.goal();
    goal.skip_whitespace();
    let pipeline = parse_pipeline(&mut goal).map_err(|e| e.wrap(STATEMENT))?;

    let mut next = goal.goal();
    next.skip_whitespace();
    let operator = match next.peek() {
        Some(t) if t.is_punct("&&") => Some(AndOr::And),
        Some(t) if t.is_punct("||") => Some(AndOr::Or),
        _ => None,
    };

    let (link, terminator) = match operator {
        Some(operator) => {
            next.next();
            let comments = parse_comments(&mut next);
            let mut inner = next.nested(STATEMENT)?;
            let statement = parse_statement(&mut inner).map_err(|e| e.wrap(STATEMENT))?;
            goal.score(&inner);
            let link = StatementLink {
                operator,
                comments,
                statement: Box::new(statement),
            };
            (Some(link), Terminator::None)
        }
        None if next.accept_punct(";").is_some() => {
            goal.score(&next);
            (None, Terminator::Semicolon)
        }
        None if next.accept_punct("&").is_some() => {
            goal.score(&next);
            (None, Terminator::Background)
        }
        None => (None, Terminator::None),
    };

    cursor.score(&goal);
    Ok(Statement {
        span: goal.span(),
        pipeline,
        next: link,
        terminator,
    })
}

/// Name of a `coproc NAME compound` form; a plain command is never named
fn coproc_name(cursor: &mut Cursor) -> Option<usize> {
    let mut next = cursor.goal();
    next.skip_whitespace();
    if next.peek()?.token_type != TokenType::Word {
        return None;
    }
    let opens_compound = next.peek_past_whitespace(1).is_some_and(|t| match t.token_type {
        TokenType::Keyword => matches!(
            t.value.as_str(),
            "if" | "case" | "while" | "until" | "for" | "select" | "[[" | "{"
        ),
        TokenType::Punctuator => t.value == "(" || t.value == "((",
        _ => false,
    });
    if !opens_compound {
        return None;
    }
    let name = next.take();
    cursor.score(&next);
    name
}

fn parse_pipeline(cursor: &mut Cursor) -> Result<Pipeline, ParseError> {
    let mut goal = cursor.goal();
    let mut time = None;
    let mut negated = false;
    let mut coproc = None;
    loop {
        goal.skip_whitespace();
        if time.is_none() && goal.accept_keyword("time").is_some() {
            let mut next = goal.goal();
            next.skip_whitespace();
            let posix = next.accept_value(TokenType::Word, "-p").is_some();
            if posix {
                goal.score(&next);
            }
            time = Some(posix);
        } else if !negated && goal.accept_keyword("!").is_some() {
            negated = true;
        } else if coproc.is_none() && goal.accept_keyword("coproc").is_some() {
            coproc = Some(coproc_name(&mut goal));
        } else {
            break;
        }
    }

    let command = parse_command_or_compound(&mut goal).map_err(|e| e.wrap(PIPELINE))?;

    let mut next = goal.goal();
    next.skip_whitespace();
    let stderr = match next.peek() {
        Some(t) if t.is_punct("|") => Some(false),
        Some(t) if t.is_punct("|&") => Some(true),
        _ => None,
    };
    let link = match stderr {
        Some(stderr) => {
            next.next();
            let comments = parse_comments(&mut next);
            let mut inner = next.nested(PIPELINE)?;
            let pipeline = parse_pipeline(&mut inner).map_err(|e| e.wrap(PIPELINE))?;
            goal.score(&inner);
            Some(PipelineLink {
                stderr,
                comments,
                pipeline: Box::new(pipeline),
            })
        }
        None => None,
    };

    cursor.score(&goal);
    Ok(Pipeline {
        span: goal.span(),
        time,
        negated,
        coproc,
        command,
        next: link,
    })
}

fn parse_command_or_compound(cursor: &mut Cursor) -> Result<CommandOrCompound, ParseError> {
    let mut goal = cursor.goal();
    let result = if starts_compound(&goal) {
        parse_compound(&mut goal).map(CommandOrCompound::Compound)
    } else {
        parse_command(&mut goal).map(CommandOrCompound::Command)
    };
    let node = result.map_err(|e| e.wrap(COMMAND_OR_COMPOUND))?;
    cursor.score(&goal);
    Ok(node)
}

/// Parse a complete script
pub fn parse(input: &str) -> Result<Script, ParseError> {
    parse_with_options(input, &ParserOptions::default())
}

/// Parse a complete script with explicit limits
pub fn parse_with_options(input: &str, options: &ParserOptions) -> Result<Script, ParseError> {
    debug!(bytes = input.len(), "parsing script");
    let buffer = TokenBuffer::with_options(input, options)?;

    let result = {
        let mut cursor = Cursor::new(&buffer, options);
        parse_file(&mut cursor).and_then(|file| match cursor.peek() {
            None => Ok(file),
            Some(token) => {
                trace!(token = %token.value, "input left over after the last line");
                Err(cursor.unexpected(FILE))
            }
        })
    };

    match result {
        Ok(file) => {
            debug!(lines = file.lines.len(), tokens = buffer.len(), "parsed script");
            Ok(Script::new(Arc::new(buffer), file))
        }
        Err(err) => {
            debug!(trace = ?err.trace(), cause = %err.root_cause(), "parse failed");
            Err(err)
        }
    }
}

/// Read a script from `reader` and parse it
pub fn parse_reader(mut reader: impl Read) -> Result<Script, Error> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    Ok(parse(&input)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{AssignmentOrWord, CompoundKind};

    fn words(script: &Script, pipeline: &Pipeline) -> Vec<String> {
        let CommandOrCompound::Command(command) = &pipeline.command else {
            panic!("expected a simple command");
        };
        command
            .assignments_or_words
            .iter()
            .map(|item| match item {
                AssignmentOrWord::Word(w) => script.buffer().text(w.span),
                AssignmentOrWord::Assignment(a) => script.buffer().text(a.span),
            })
            .collect()
    }

    #[test]
    fn test_if_then_fi() {
        let script = parse("if a; then b; fi").unwrap();
        let line = &script.file().lines[0];
        let CommandOrCompound::Compound(compound) = &line.statements[0].pipeline.command else {
            panic!("expected a compound");
        };
        let CompoundKind::If(if_compound) = &compound.kind else {
            panic!("expected if");
        };
        let clause = &if_compound.clauses[0];
        assert_eq!(words(&script, &clause.test.pipeline), vec!["a"]);
        let body = &clause.consequence.lines[0].statements[0];
        assert_eq!(words(&script, &body.pipeline), vec!["b"]);
    }

    #[test]
    fn test_missing_word_chain() {
        let err = parse("if ||;then b;fi").unwrap_err();
        assert_eq!(
            err.trace(),
            vec![
                "File",
                "Line",
                "Statement",
                "Pipeline",
                "CommandOrCompound",
                "Compound",
                "IfCompound",
                "TestConsequence",
                "Statement",
                "Pipeline",
                "CommandOrCompound",
                "Command",
            ]
        );
        assert_eq!(err.root_cause(), &ErrorKind::MissingWord);
        assert_eq!(err.token.value, "||");
        assert_eq!(err.token.start, 3);
        assert!(err
            .to_string()
            .starts_with("File: error at position 3 (1:4):\nLine: error at position 3 (1:4):\n"));
    }

    #[test]
    fn test_lines_and_blank_lines() {
        let script = parse("a; b & c\n\n\nd # note\n").unwrap();
        let lines = &script.file().lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].statements.len(), 3);
        assert_eq!(lines[0].statements[0].terminator, Terminator::Semicolon);
        assert_eq!(lines[0].statements[1].terminator, Terminator::Background);
        assert_eq!(lines[0].statements[2].terminator, Terminator::None);
        assert_eq!(lines[1].blank_lines_before, 2);
        let comment = lines[1].comment.unwrap();
        assert_eq!(script.buffer().token(comment).value, "# note");
    }

    #[test]
    fn test_and_or_chain() {
        let script = parse("a && # why\n  b || c;").unwrap();
        let statement = &script.file().lines[0].statements[0];
        let link = statement.next.as_ref().unwrap();
        assert_eq!(link.operator, AndOr::And);
        assert_eq!(link.comments.len(), 1);
        let inner = link.statement.next.as_ref().unwrap();
        assert_eq!(inner.operator, AndOr::Or);
        assert_eq!(statement.final_terminator(), Terminator::Semicolon);
    }

    #[test]
    fn test_pipeline_decorators() {
        let script = parse("time -p ! a | b |& c").unwrap();
        let pipeline = &script.file().lines[0].statements[0].pipeline;
        assert_eq!(pipeline.time, Some(true));
        assert!(pipeline.negated);
        let link = pipeline.next.as_ref().unwrap();
        assert!(!link.stderr);
        assert!(link.pipeline.next.as_ref().unwrap().stderr);
        assert_eq!(words(&script, &link.pipeline), vec!["b"]);
    }

    #[test]
    fn test_coproc() {
        let script = parse("coproc worker { read x; }").unwrap();
        let pipeline = &script.file().lines[0].statements[0].pipeline;
        let name = pipeline.coproc.unwrap().unwrap();
        assert_eq!(script.buffer().token(name).value, "worker");
        assert!(matches!(pipeline.command, CommandOrCompound::Compound(_)));

        let script = parse("coproc cat file").unwrap();
        let pipeline = &script.file().lines[0].statements[0].pipeline;
        assert_eq!(pipeline.coproc, Some(None));
        assert_eq!(words(&script, pipeline), vec!["cat", "file"]);
    }

    #[test]
    fn test_invalid_end_of_statement() {
        let err = parse("a\nfi").unwrap_err();
        assert_eq!(err.trace(), vec!["File"]);
        assert_eq!(err.root_cause(), &ErrorKind::UnexpectedToken("fi".to_string()));

        let err = parse("{ a; } b").unwrap_err();
        assert_eq!(err.trace(), vec!["File", "Line"]);
        assert_eq!(err.root_cause(), &ErrorKind::InvalidEndOfStatement);
    }

    #[test]
    fn test_empty_input() {
        let script = parse("").unwrap();
        assert!(script.file().lines.is_empty());
        let script = parse("\n\n# only a comment\n").unwrap();
        let line = &script.file().lines[0];
        assert!(line.statements.is_empty());
        assert!(line.comment.is_some());
        assert_eq!(line.blank_lines_before, 2);
    }

    #[test]
    fn test_depth_limit() {
        let options = ParserOptions {
            max_depth: 3,
            ..ParserOptions::default()
        };
        let err = parse_with_options("( ( ( ( a ) ) ) )", &options).unwrap_err();
        assert_eq!(err.root_cause(), &ErrorKind::LimitExceeded("nesting depth"));
    }

    #[test]
    fn test_parse_reader() {
        let script = parse_reader("echo hi\n".as_bytes()).unwrap();
        assert_eq!(script.file().lines.len(), 1);
    }
}
