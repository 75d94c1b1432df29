//! Word Parser
//!
//! Assembles adjacent tokens into words. A word ends at the first token that
//! cannot continue it: whitespace, an operator, or anything the current
//! context reads as syntax.

use crate::ast::types::{
    ArrayElement, ArrayLiteral, BraceExpansion, BraceKind, Comments, Word, WordPart,
};
use crate::parser::arithmetic_parser::{parse_arithmetic, parse_subscript};
use crate::parser::cursor::Cursor;
use crate::parser::expansion_parser::parse_parameter_expansion;
use crate::parser::lexer::{Token, TokenType};
use crate::parser::parser::parse_file;
use crate::parser::token_buffer::TokenSpan;
use crate::parser::types::{ErrorKind, ParseError};

const WORD: &str = "Word";
const COMMAND_SUBSTITUTION: &str = "CommandSubstitution";
const PROCESS_SUBSTITUTION: &str = "ProcessSubstitution";
const ARRAY_LITERAL: &str = "ArrayLiteral";

/// Where a word is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordContext {
    /// Command arguments, where keywords are plain text
    Shell,
    /// Operands of `[[ ]]`
    Test,
    Arithmetic,
    /// Operand of a parameter expansion operator
    Operand,
}

/// Whether `token` can begin or continue a word
pub fn starts_word_part(token: &Token, context: WordContext) -> bool {
    match token.token_type {
        TokenType::Word | TokenType::StringStart | TokenType::OpenBacktick => true,
        TokenType::BraceExpansion => token.value == "{" && context == WordContext::Shell,
        TokenType::Identifier | TokenType::NumberLiteral => context != WordContext::Operand,
        TokenType::IdentifierAssign | TokenType::Keyword => context == WordContext::Shell,
        TokenType::Punctuator => match token.value.as_str() {
            "$" | "${" | "$(" | "$((" => true,
            "<(" | ">(" => context == WordContext::Shell,
            "[" => context == WordContext::Shell || context == WordContext::Arithmetic,
            "=" | "+=" => context == WordContext::Shell,
            _ => false,
        },
        _ => false,
    }
}

/// Whether `token` opens an expansion
pub fn starts_expansion(token: &Token) -> bool {
    match token.token_type {
        TokenType::OpenBacktick => true,
        TokenType::Punctuator => matches!(token.value.as_str(), "$" | "${" | "$(" | "$(("),
        _ => false,
    }
}

/// Parse one word
pub fn parse_word(cursor: &mut Cursor, context: WordContext) -> Result<Word, ParseError> {
    let mut goal = cursor.goal();
    let mut parts = Vec::new();
    while let Some(token) = goal.peek() {
        if !starts_word_part(token, context) {
            break;
        }
        parts.push(parse_word_part(&mut goal).map_err(|e| e.wrap(WORD))?);
    }
    if parts.is_empty() {
        return Err(goal.error(ErrorKind::MissingWord, WORD));
    }

    cursor.score(&goal);
    Ok(Word {
        span: goal.span(),
        parts,
    })
}

/// Parse a word that may be empty, as in `${a:-}`
pub fn parse_optional_word(cursor: &mut Cursor, context: WordContext) -> Result<Word, ParseError> {
    match cursor.peek() {
        Some(token) if starts_word_part(token, context) => parse_word(cursor, context),
        _ => {
            let at = cursor.position();
            Ok(Word {
                span: TokenSpan::new(at, at),
                parts: Vec::new(),
            })
        }
    }
}

fn parse_word_part(cursor: &mut Cursor) -> Result<WordPart, ParseError> {
    let Some(token) = cursor.peek() else {
        return Err(cursor.error(ErrorKind::MissingWord, WORD));
    };
    let index = cursor.position();
    match token.token_type {
        TokenType::Word => {
            cursor.next();
            if token.value.starts_with('\'') || token.value.starts_with("$'") {
                Ok(WordPart::SingleQuoted(index))
            } else {
                Ok(WordPart::Literal(index))
            }
        }
        TokenType::Identifier
        | TokenType::NumberLiteral
        | TokenType::IdentifierAssign
        | TokenType::Keyword => {
            cursor.next();
            Ok(WordPart::Literal(index))
        }
        TokenType::StringStart => parse_double_quoted(cursor),
        TokenType::BraceExpansion => Ok(WordPart::BraceExpansion(parse_brace_expansion(cursor)?)),
        TokenType::Punctuator => match token.value.as_str() {
            "<(" | ">(" => parse_process_substitution(cursor),
            "[" => Ok(WordPart::Subscript(parse_subscript(cursor)?)),
            "=" | "+=" => {
                cursor.next();
                Ok(WordPart::Literal(index))
            }
            _ => parse_expansion(cursor),
        },
        _ => parse_expansion(cursor),
    }
}

/// Parse `$name`, `${...}`, `$(...)`, `` `...` `` or `$((...))`
pub fn parse_expansion(cursor: &mut Cursor) -> Result<WordPart, ParseError> {
    let Some(token) = cursor.peek() else {
        return Err(cursor.error(ErrorKind::UnexpectedEof, WORD));
    };
    if token.token_type == TokenType::OpenBacktick {
        return parse_command_substitution(cursor);
    }
    match token.value.as_str() {
        "$" | "${" if token.token_type == TokenType::Punctuator => {
            Ok(WordPart::Parameter(parse_parameter_expansion(cursor)?))
        }
        "$(" if token.token_type == TokenType::Punctuator => parse_command_substitution(cursor),
        "$((" if token.token_type == TokenType::Punctuator => {
            Ok(WordPart::Arithmetic(parse_arithmetic(cursor)?))
        }
        _ => Err(cursor.unexpected(WORD)),
    }
}

fn parse_double_quoted(cursor: &mut Cursor) -> Result<WordPart, ParseError> {
    let mut goal = cursor.goal();
    let mut parts = Vec::new();
    if let Some(index) = goal.take() {
        parts.push(WordPart::Literal(index));
    }
    loop {
        let Some(token) = goal.peek() else {
            return Err(goal.error(ErrorKind::MissingClose("\""), WORD));
        };
        match token.token_type {
            TokenType::StringEnd => {
                parts.push(WordPart::Literal(goal.position()));
                goal.next();
                break;
            }
            TokenType::StringMid => {
                parts.push(WordPart::Literal(goal.position()));
                goal.next();
            }
            _ => parts.push(parse_expansion(&mut goal)?),
        }
    }

    cursor.score(&goal);
    Ok(WordPart::DoubleQuoted {
        span: goal.span(),
        parts,
    })
}

/// Parse `$( ... )` or `` `...` ``
pub fn parse_command_substitution(cursor: &mut Cursor) -> Result<WordPart, ParseError> {
    let mut goal = cursor.goal();
    let (backtick, stop, closer) = match goal.peek() {
        Some(t) if t.token_type == TokenType::OpenBacktick => {
            (true, TokenType::CloseBacktick, "")
        }
        Some(t) if t.is_punct("$(") => (false, TokenType::Punctuator, ")"),
        _ => return Err(goal.unexpected(COMMAND_SUBSTITUTION)),
    };
    goal.next();

    let mut inner = goal.goal().with_stop(stop, closer);
    let body = parse_file(&mut inner).map_err(|e| e.wrap(COMMAND_SUBSTITUTION))?;
    goal.score(&inner);
    if goal.accept_closer(stop, closer).is_none() {
        let expected = if backtick { "`" } else { ")" };
        return Err(goal.error(ErrorKind::MissingClose(expected), COMMAND_SUBSTITUTION));
    }

    cursor.score(&goal);
    Ok(WordPart::CommandSubstitution {
        span: goal.span(),
        backtick,
        body,
    })
}

fn parse_process_substitution(cursor: &mut Cursor) -> Result<WordPart, ParseError> {
    let mut goal = cursor.goal();
    let input = match goal.next() {
        Some(t) if t.is_punct("<(") => true,
        Some(t) if t.is_punct(">(") => false,
        _ => return Err(cursor.unexpected(PROCESS_SUBSTITUTION)),
    };

    let mut inner = goal.goal().with_stop(TokenType::Punctuator, ")");
    let body = parse_file(&mut inner).map_err(|e| e.wrap(PROCESS_SUBSTITUTION))?;
    goal.score(&inner);
    if goal.accept_closer(TokenType::Punctuator, ")").is_none() {
        return Err(goal.error(ErrorKind::MissingClose(")"), PROCESS_SUBSTITUTION));
    }

    cursor.score(&goal);
    Ok(WordPart::ProcessSubstitution {
        span: goal.span(),
        input,
        body,
    })
}

/// Parse `{a,b}` or `{1..9..2}`
pub fn parse_brace_expansion(cursor: &mut Cursor) -> Result<BraceExpansion, ParseError> {
    let mut goal = cursor.goal();
    if goal.accept_value(TokenType::BraceExpansion, "{").is_none() {
        return Err(goal.unexpected(WORD));
    }

    let is_range = goal.peek().is_some_and(|t| t.token_type == TokenType::BraceWord)
        && goal.peek_at(1).is_some_and(|t| t.is(TokenType::BraceExpansion, ".."));
    let kind = if is_range {
        let mut bounds = Vec::new();
        loop {
            match goal.accept(&[TokenType::BraceWord]) {
                Some(_) => bounds.push(goal.position() - 1),
                None => return Err(goal.error(ErrorKind::MissingWord, WORD)),
            }
            if goal.accept_value(TokenType::BraceExpansion, "..").is_none() {
                break;
            }
        }
        if goal.accept_value(TokenType::BraceExpansion, "}").is_none() || bounds.len() < 2 {
            return Err(goal.error(ErrorKind::MissingClose("}"), WORD));
        }
        BraceKind::Range {
            start: bounds[0],
            end: bounds[1],
            step: bounds.get(2).copied(),
        }
    } else {
        let mut elements = Vec::new();
        let mut current = Vec::new();
        loop {
            let Some(token) = goal.peek() else {
                return Err(goal.error(ErrorKind::MissingClose("}"), WORD));
            };
            match (token.token_type, token.value.as_str()) {
                (TokenType::BraceWord, _) => {
                    current.push(WordPart::Literal(goal.position()));
                    goal.next();
                }
                (TokenType::BraceExpansion, "{") => {
                    current.push(WordPart::BraceExpansion(parse_brace_expansion(&mut goal)?));
                }
                (TokenType::BraceExpansion, ",") => {
                    goal.next();
                    elements.push(std::mem::take(&mut current));
                }
                (TokenType::BraceExpansion, "}") => {
                    goal.next();
                    elements.push(std::mem::take(&mut current));
                    break;
                }
                _ => return Err(goal.unexpected(WORD)),
            }
        }
        BraceKind::List(elements)
    };

    cursor.score(&goal);
    Ok(BraceExpansion {
        span: goal.span(),
        kind,
    })
}

/// Parse the `( ... )` value of an array assignment
pub fn parse_array_literal(cursor: &mut Cursor) -> Result<ArrayLiteral, ParseError> {
    let mut goal = cursor.goal();
    if goal.accept_punct("(").is_none() {
        return Err(goal.unexpected(ARRAY_LITERAL));
    }

    let mut body = goal.goal().with_stop(TokenType::Punctuator, ")");
    let mut elements: Vec<ArrayElement> = Vec::new();
    let mut pending: Comments = Vec::new();
    // Element that a comment on the current line would follow
    let mut last_on_line: Option<usize> = None;
    loop {
        body.skip_whitespace();
        let Some(token) = body.peek() else {
            break;
        };
        match token.token_type {
            TokenType::LineTerminator => {
                body.accept_line_terminator();
                last_on_line = None;
            }
            TokenType::Comment => {
                let index = body.position();
                body.next();
                match last_on_line.take() {
                    Some(element) => elements[element].comment_after = Some(index),
                    None => pending.push(index),
                }
            }
            _ => {
                let comments_before = std::mem::take(&mut pending);
                let element = parse_array_element(&mut body, comments_before)
                    .map_err(|e| e.wrap(ARRAY_LITERAL))?;
                elements.push(element);
                last_on_line = Some(elements.len() - 1);
            }
        }
    }
    goal.score(&body);
    if goal.accept_closer(TokenType::Punctuator, ")").is_none() {
        return Err(goal.error(ErrorKind::MissingClose(")"), ARRAY_LITERAL));
    }

    cursor.score(&goal);
    Ok(ArrayLiteral {
        span: goal.span(),
        elements,
        trailing_comments: pending,
    })
}

fn parse_array_element(cursor: &mut Cursor, comments_before: Comments) -> Result<ArrayElement, ParseError> {
    let mut goal = cursor.goal();
    let index = match goal.peek() {
        Some(t) if t.is_punct("[") => {
            let subscript = parse_subscript(&mut goal).map_err(|e| e.wrap(ARRAY_LITERAL))?;
            if goal.accept_punct("=").is_none() {
                return Err(goal.error(ErrorKind::InvalidAssignment, ARRAY_LITERAL));
            }
            Some(subscript)
        }
        _ => None,
    };
    let value = match goal.peek() {
        Some(t) if starts_word_part(t, WordContext::Shell) => {
            Some(parse_word(&mut goal, WordContext::Shell)?)
        }
        _ if index.is_some() => None,
        _ => return Err(goal.unexpected(ARRAY_LITERAL)),
    };

    cursor.score(&goal);
    Ok(ArrayElement {
        span: goal.span(),
        comments_before,
        index,
        value,
        comment_after: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token_buffer::TokenBuffer;
    use crate::parser::types::ParserOptions;

    fn word(input: &str) -> (TokenBuffer, Word) {
        let buffer = TokenBuffer::new(input).unwrap();
        let options = ParserOptions::default();
        let word = {
            let mut cursor = Cursor::new(&buffer, &options);
            parse_word(&mut cursor, WordContext::Shell).unwrap()
        };
        (buffer, word)
    }

    #[test]
    fn test_adjacent_parts_form_one_word() {
        let (buffer, word) = word("pre\"$a b\"'q'$(c)post x");
        assert_eq!(buffer.text(word.span), "pre\"$a b\"'q'$(c)post");
        assert!(matches!(word.parts[0], WordPart::Literal(_)));
        assert!(matches!(word.parts[1], WordPart::DoubleQuoted { .. }));
        assert!(matches!(word.parts[2], WordPart::SingleQuoted(_)));
        assert!(matches!(word.parts[3], WordPart::CommandSubstitution { backtick: false, .. }));
        assert!(matches!(word.parts[4], WordPart::Literal(_)));
    }

    #[test]
    fn test_double_quoted_parts() {
        let (_, word) = word("\"a ${b} c\"");
        let WordPart::DoubleQuoted { parts, .. } = &word.parts[0] else {
            panic!("expected double quotes");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[1], WordPart::Parameter(_)));
    }

    #[test]
    fn test_backtick_substitution() {
        let (buffer, word) = word("`echo a`");
        let WordPart::CommandSubstitution { backtick, body, .. } = &word.parts[0] else {
            panic!("expected substitution");
        };
        assert!(*backtick);
        assert_eq!(body.lines.len(), 1);
        assert_eq!(buffer.text(word.span), "`echo a`");
    }

    #[test]
    fn test_brace_expansions() {
        let (_, parsed) = word("a{b,c{d,e}}f");
        assert_eq!(parsed.parts.len(), 3);
        let WordPart::BraceExpansion(brace) = &parsed.parts[1] else {
            panic!("expected brace expansion");
        };
        let BraceKind::List(elements) = &brace.kind else {
            panic!("expected list");
        };
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[1][1], WordPart::BraceExpansion(_)));

        let (buffer, parsed) = word("{1..10..2}");
        let WordPart::BraceExpansion(brace) = &parsed.parts[0] else {
            panic!("expected brace expansion");
        };
        let BraceKind::Range { start, end, step } = brace.kind else {
            panic!("expected range");
        };
        assert_eq!(buffer.token(start).value, "1");
        assert_eq!(buffer.token(end).value, "10");
        assert_eq!(step.map(|s| buffer.token(s).value.clone()), Some("2".to_string()));
    }

    #[test]
    fn test_process_substitution() {
        let (_, word) = word("<(ls)");
        assert!(matches!(word.parts[0], WordPart::ProcessSubstitution { input: true, .. }));
    }

    #[test]
    fn test_missing_word() {
        let buffer = TokenBuffer::new("; a").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let err = parse_word(&mut cursor, WordContext::Shell).unwrap_err();
        assert_eq!(err.root_cause(), &ErrorKind::MissingWord);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_array_literal_comments() {
        let buffer = TokenBuffer::new("(\n# before\nb # after\n[k]=v\n# trailing\n)").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let array = parse_array_literal(&mut cursor).unwrap();
        assert_eq!(array.elements.len(), 2);
        assert_eq!(buffer.token(array.elements[0].comments_before[0]).value, "# before");
        assert_eq!(
            array.elements[0].comment_after.map(|c| buffer.token(c).value.clone()),
            Some("# after".to_string())
        );
        assert!(array.elements[1].index.is_some());
        assert_eq!(array.trailing_comments.len(), 1);
        assert!(array.has_comments());
    }
}
