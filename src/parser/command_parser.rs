//! Command Parser
//!
//! Handles parsing of simple commands, redirections, and assignments.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::ast::types::{
    Assignment, AssignmentOrWord, AssignmentValue, Command, Heredoc, Redirection, WordPart,
};
use crate::parser::arithmetic_parser::{parse_operand, parse_subscript};
use crate::parser::cursor::Cursor;
use crate::parser::lexer::TokenType;
use crate::parser::parser::is_closer;
use crate::parser::token_buffer::{TokenIndex, TokenSpan};
use crate::parser::types::{ErrorKind, ParseError};
use crate::parser::word_parser::{
    parse_array_literal, parse_expansion, parse_word, starts_word_part, WordContext,
};

const COMMAND: &str = "Command";
const ASSIGNMENT: &str = "Assignment";
const REDIRECTION: &str = "Redirection";
const HEREDOC: &str = "Heredoc";

/// Redirection operators
pub const REDIRECTION_OPERATORS: &[&str] = &[
    "<", ">", ">>", "<&", ">&", "<>", ">|", "&>", "&>>", "<<<", "<<", "<<-",
];

lazy_static! {
    /// Builtins whose `NAME=value` arguments are assignments
    static ref DECLARATION_BUILTINS: HashSet<&'static str> =
        ["declare", "export", "local", "readonly", "typeset", "let"]
            .into_iter()
            .collect();
}

fn is_redirection_operator(cursor: &Cursor, n: usize) -> bool {
    cursor.peek_at(n).is_some_and(|t| {
        t.token_type == TokenType::Punctuator && REDIRECTION_OPERATORS.contains(&t.value.as_str())
    })
}

/// Check if a redirection starts at the cursor
pub fn is_redirection(cursor: &Cursor) -> bool {
    let Some(token) = cursor.peek() else {
        return false;
    };
    match token.token_type {
        TokenType::Punctuator => REDIRECTION_OPERATORS.contains(&token.value.as_str()),
        // 2>file
        TokenType::NumberLiteral => is_redirection_operator(cursor, 1),
        // {fd}>file
        TokenType::Word => {
            token.value.starts_with('{') && token.value.ends_with('}') && is_redirection_operator(cursor, 1)
        }
        _ => false,
    }
}

/// Parse a simple command
pub fn parse_command(cursor: &mut Cursor) -> Result<Command, ParseError> {
    let mut goal = cursor.goal();
    let mut vars = Vec::new();
    let mut assignments_or_words = Vec::new();
    let mut redirections = Vec::new();
    // Set once the command name is a declaration builtin; true for a `let`
    // that starts the command, whose operands are lexed as arithmetic
    let mut declaration: Option<bool> = None;

    loop {
        let mut next = goal.goal();
        next.skip_whitespace();
        let Some(token) = next.peek() else {
            break;
        };

        if is_redirection(&next) {
            redirections.push(parse_redirection(&mut next).map_err(|e| e.wrap(COMMAND))?);
        } else if token.token_type == TokenType::IdentifierAssign && assignments_or_words.is_empty() {
            vars.push(parse_assignment(&mut next, false).map_err(|e| e.wrap(COMMAND))?);
        } else if let (TokenType::IdentifierAssign, Some(arithmetic)) = (token.token_type, declaration) {
            let assignment = parse_assignment(&mut next, arithmetic).map_err(|e| e.wrap(COMMAND))?;
            assignments_or_words.push(AssignmentOrWord::Assignment(assignment));
        } else {
            let first = assignments_or_words.is_empty() && vars.is_empty();
            if first && is_closer(token) {
                break;
            }
            if !starts_word_part(token, WordContext::Shell) {
                break;
            }
            let word = parse_word(&mut next, WordContext::Shell).map_err(|e| e.wrap(COMMAND))?;
            if assignments_or_words.is_empty() {
                declaration = match word.parts.as_slice() {
                    [WordPart::Literal(index)] => {
                        let name = next.buffer().token(*index).value.as_str();
                        let leading = vars.is_empty() && redirections.is_empty();
                        DECLARATION_BUILTINS
                            .contains(name)
                            .then_some(name == "let" && leading)
                    }
                    _ => None,
                };
            }
            assignments_or_words.push(AssignmentOrWord::Word(word));
        }
        goal.score(&next);
    }

    if vars.is_empty() && assignments_or_words.is_empty() && redirections.is_empty() {
        return Err(goal.error(ErrorKind::MissingWord, COMMAND));
    }

    cursor.score(&goal);
    Ok(Command {
        span: goal.span(),
        vars,
        assignments_or_words,
        redirections,
    })
}

/// Parse `NAME=value`, `NAME+=value`, `NAME[i]=value` or `NAME=(...)`
pub fn parse_assignment(cursor: &mut Cursor, arithmetic: bool) -> Result<Assignment, ParseError> {
    let mut goal = cursor.goal();
    if !goal.peek().is_some_and(|t| t.token_type == TokenType::IdentifierAssign) {
        return Err(goal.unexpected(ASSIGNMENT));
    }
    let name = goal.position();
    goal.next();
    let index = match goal.peek() {
        Some(t) if t.is_punct("[") => Some(parse_subscript(&mut goal).map_err(|e| e.wrap(ASSIGNMENT))?),
        _ => None,
    };
    let append = if goal.accept_punct("=").is_some() {
        false
    } else if goal.accept_punct("+=").is_some() {
        true
    } else {
        return Err(goal.error(ErrorKind::InvalidAssignment, ASSIGNMENT));
    };

    let value = match goal.peek() {
        Some(t) if t.is_punct("(") => {
            AssignmentValue::Array(parse_array_literal(&mut goal).map_err(|e| e.wrap(ASSIGNMENT))?)
        }
        Some(_) if arithmetic => match parse_operand(&mut goal).map_err(|e| e.wrap(ASSIGNMENT))? {
            entries if entries.is_empty() => AssignmentValue::None,
            entries => AssignmentValue::Arithmetic(entries),
        },
        Some(t) if starts_word_part(t, WordContext::Shell) && t.token_type != TokenType::Keyword => {
            AssignmentValue::Word(parse_word(&mut goal, WordContext::Shell).map_err(|e| e.wrap(ASSIGNMENT))?)
        }
        _ => AssignmentValue::None,
    };

    cursor.score(&goal);
    Ok(Assignment {
        span: goal.span(),
        name,
        index,
        append,
        value,
    })
}

/// Parse a redirection
pub fn parse_redirection(cursor: &mut Cursor) -> Result<Redirection, ParseError> {
    let mut goal = cursor.goal();

    // Parse optional file descriptor number or {name}
    let fd = match goal.peek() {
        Some(t) if t.token_type != TokenType::Punctuator => goal.take(),
        _ => None,
    };
    let operator = match goal.peek() {
        Some(t) if t.token_type == TokenType::Punctuator && REDIRECTION_OPERATORS.contains(&t.value.as_str()) => {
            goal.position()
        }
        _ => return Err(goal.unexpected(REDIRECTION)),
    };
    goal.next();
    goal.skip_whitespace();

    let target = parse_word(&mut goal, WordContext::Shell).map_err(|e| e.wrap(REDIRECTION))?;
    let op = goal.buffer().token(operator).value.as_str();
    let heredoc = if op == "<<" || op == "<<-" {
        let delimiter = goal.buffer().text(target.span);
        Some(parse_heredoc(&goal, operator, delimiter, op == "<<-").map_err(|e| e.wrap(REDIRECTION))?)
    } else {
        None
    };

    cursor.score(&goal);
    Ok(Redirection {
        span: goal.span(),
        fd,
        operator,
        target,
        heredoc,
    })
}

/// Locate and parse the body of the heredoc introduced at `operator`
fn parse_heredoc(
    cursor: &Cursor,
    operator: TokenIndex,
    delimiter: String,
    strip_tabs: bool,
) -> Result<Heredoc, ParseError> {
    let quoted = delimiter.contains(['\'', '"', '\\']);
    let Some((start, end)) = cursor.heredoc_body(operator) else {
        return Err(cursor.error(ErrorKind::UnterminatedHeredoc(delimiter), HEREDOC));
    };

    let mut body = cursor.bounded(start, end);
    let mut parts = Vec::new();
    while let Some(token) = body.peek() {
        if token.token_type == TokenType::HeredocBody {
            parts.push(WordPart::Literal(body.position()));
            body.next();
        } else {
            parts.push(parse_expansion(&mut body).map_err(|e| e.wrap(HEREDOC))?);
        }
    }

    Ok(Heredoc {
        span: TokenSpan::new(start, end + 1),
        parts,
        quoted,
        strip_tabs,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token_buffer::TokenBuffer;
    use crate::parser::types::ParserOptions;

    fn command(input: &str) -> (TokenBuffer, Command) {
        let buffer = TokenBuffer::new(input).unwrap();
        let options = ParserOptions::default();
        let command = {
            let mut cursor = Cursor::new(&buffer, &options);
            parse_command(&mut cursor).unwrap()
        };
        (buffer, command)
    }

    fn word_texts(buffer: &TokenBuffer, command: &Command) -> Vec<String> {
        command
            .assignments_or_words
            .iter()
            .map(|item| match item {
                AssignmentOrWord::Word(w) => buffer.text(w.span),
                AssignmentOrWord::Assignment(a) => format!("assign:{}", buffer.text(a.span)),
            })
            .collect()
    }

    #[test]
    fn test_simple_command() {
        let (buffer, cmd) = command("echo hello world");
        assert!(cmd.vars.is_empty());
        assert_eq!(word_texts(&buffer, &cmd), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_leading_vars() {
        let (buffer, cmd) = command("A=1 B+=two C= run b=c");
        assert_eq!(cmd.vars.len(), 3);
        assert!(cmd.vars[1].append);
        assert_eq!(cmd.vars[2].value, AssignmentValue::None);
        assert_eq!(word_texts(&buffer, &cmd), vec!["run", "b=c"]);
    }

    #[test]
    fn test_declaration_builtins() {
        let (buffer, cmd) = command("local -r a=1 b c[2]=x");
        assert_eq!(
            word_texts(&buffer, &cmd),
            vec!["local", "-r", "assign:a=1", "b", "assign:c[2]=x"]
        );

        let (buffer, cmd) = command("let i=i+1 j=$k*2");
        let AssignmentOrWord::Assignment(a) = &cmd.assignments_or_words[1] else {
            panic!("expected assignment");
        };
        let AssignmentValue::Arithmetic(entries) = &a.value else {
            panic!("expected arithmetic value");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(buffer.text(a.span), "i=i+1");
        assert_eq!(word_texts(&buffer, &cmd), vec!["let", "assign:i=i+1", "assign:j=$k*2"]);
    }

    #[test]
    fn test_let_after_prefix_vars_keeps_word_values() {
        let (_, cmd) = command("x=1 let i=i+1");
        let AssignmentOrWord::Assignment(a) = &cmd.assignments_or_words[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(a.value, AssignmentValue::Word(_)));
    }

    #[test]
    fn test_array_assignment() {
        let (_, cmd) = command("arr=(a b [3]=c)");
        let AssignmentValue::Array(array) = &cmd.vars[0].value else {
            panic!("expected array");
        };
        assert_eq!(array.elements.len(), 3);
        assert!(array.elements[2].index.is_some());
    }

    #[test]
    fn test_redirections_interleaved() {
        let (buffer, cmd) = command("2>/dev/null cmd >out arg {fd}<in 1>&2");
        assert_eq!(word_texts(&buffer, &cmd), vec!["cmd", "arg"]);
        assert_eq!(cmd.redirections.len(), 4);
        assert_eq!(cmd.redirections[0].fd.map(|i| buffer.token(i).value.clone()), Some("2".to_string()));
        assert_eq!(cmd.redirections[2].fd.map(|i| buffer.token(i).value.clone()), Some("{fd}".to_string()));
        assert_eq!(buffer.text(cmd.redirections[3].target.span), "2");
    }

    #[test]
    fn test_heredoc() {
        let (buffer, cmd) = command("cat <<-'EOF' >x\n\tliteral $a\n\tEOF\n");
        let heredoc = cmd.redirections[0].heredoc.as_ref().unwrap();
        assert!(heredoc.quoted);
        assert!(heredoc.strip_tabs);
        assert_eq!(heredoc.parts.len(), 1);
        assert_eq!(buffer.token(heredoc.end).value, "\tEOF\n");
        assert_eq!(cmd.redirections.len(), 2);
        // the body is spanned by whoever consumes the newline
        assert!(cmd.span.end <= heredoc.span.start);
    }

    #[test]
    fn test_heredoc_expansions() {
        let (_, cmd) = command("cat <<EOF\na $b c\nEOF");
        let heredoc = cmd.redirections[0].heredoc.as_ref().unwrap();
        assert!(!heredoc.quoted);
        assert_eq!(heredoc.parts.len(), 3);
        assert!(matches!(heredoc.parts[1], WordPart::Parameter(_)));
    }

    #[test]
    fn test_missing_word() {
        let buffer = TokenBuffer::new("|| a").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let err = parse_command(&mut cursor).unwrap_err();
        assert_eq!(err.production, "Command");
        assert_eq!(err.root_cause(), &ErrorKind::MissingWord);
    }

    #[test]
    fn test_missing_redirection_target() {
        let buffer = TokenBuffer::new("echo >;").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let err = parse_command(&mut cursor).unwrap_err();
        assert_eq!(err.trace(), vec!["Command", "Redirection", "Word"]);
    }
}
