//! Parameter Expansion Parser
//!
//! Handles `$name` and `${...}`. Everything after the parameter name is
//! dispatched on the operator token through one table.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::types::{
    DefaultKind, ParameterExpansion, ParameterOperation, ParameterPrefix, ReplaceKind, Word,
};
use crate::parser::arithmetic_parser::{parse_entries, parse_subscript};
use crate::parser::cursor::Cursor;
use crate::parser::lexer::TokenType;
use crate::parser::types::{ErrorKind, ParseError};
use crate::parser::word_parser::{parse_optional_word, WordContext};

const PRODUCTION: &str = "ParameterExpansion";

/// Operators accepted by `${name@OP}`
pub const TRANSFORM_OPERATORS: &[&str] = &["Q", "E", "P", "A", "K", "a", "k", "u", "U", "L"];

/// What an operator after the parameter name does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Substring,
    Default { kind: DefaultKind, colon: bool },
    RemovePrefix { longest: bool },
    RemoveSuffix { longest: bool },
    Replace(ReplaceKind),
    CaseModify { upper: bool, all: bool },
    /// `@`: a transformation, or matching names when `}` follows
    At,
    /// `*`: matching names
    Star,
}

lazy_static! {
    static ref OPERATORS: HashMap<&'static str, Operator> = {
        use DefaultKind::*;
        [
            (":", Operator::Substring),
            ("-", Operator::Default { kind: UseDefault, colon: false }),
            (":-", Operator::Default { kind: UseDefault, colon: true }),
            ("=", Operator::Default { kind: AssignDefault, colon: false }),
            (":=", Operator::Default { kind: AssignDefault, colon: true }),
            ("?", Operator::Default { kind: ErrorIfUnset, colon: false }),
            (":?", Operator::Default { kind: ErrorIfUnset, colon: true }),
            ("+", Operator::Default { kind: UseAlternate, colon: false }),
            (":+", Operator::Default { kind: UseAlternate, colon: true }),
            ("#", Operator::RemovePrefix { longest: false }),
            ("##", Operator::RemovePrefix { longest: true }),
            ("%", Operator::RemoveSuffix { longest: false }),
            ("%%", Operator::RemoveSuffix { longest: true }),
            ("/", Operator::Replace(ReplaceKind::First)),
            ("//", Operator::Replace(ReplaceKind::All)),
            ("/#", Operator::Replace(ReplaceKind::Prefix)),
            ("/%", Operator::Replace(ReplaceKind::Suffix)),
            ("^", Operator::CaseModify { upper: true, all: false }),
            ("^^", Operator::CaseModify { upper: true, all: true }),
            (",", Operator::CaseModify { upper: false, all: false }),
            (",,", Operator::CaseModify { upper: false, all: true }),
            ("@", Operator::At),
            ("*", Operator::Star),
        ]
        .into_iter()
        .collect()
    };
}

/// Parse `$name` or `${...}`
pub fn parse_parameter_expansion(cursor: &mut Cursor) -> Result<ParameterExpansion, ParseError> {
    let mut goal = cursor.goal();
    if goal.accept_punct("$").is_some() {
        let name = accept_name(&mut goal)?;
        cursor.score(&goal);
        return Ok(ParameterExpansion {
            span: goal.span(),
            braced: false,
            prefix: None,
            name,
            index: None,
            operator: None,
            operation: None,
        });
    }
    if goal.accept_punct("${").is_none() {
        return Err(goal.unexpected(PRODUCTION));
    }

    let mut body = goal.goal().with_stop(TokenType::Punctuator, "}");
    let prefix = if body.accept_punct("#").is_some() {
        Some(ParameterPrefix::Length)
    } else if body.accept_punct("!").is_some() {
        Some(ParameterPrefix::Indirect)
    } else {
        None
    };
    let name = accept_name(&mut body)?;
    let index = match body.peek() {
        Some(t) if t.is_punct("[") => Some(parse_subscript(&mut body).map_err(|e| e.wrap(PRODUCTION))?),
        _ => None,
    };
    let (operator, operation) = match body.peek() {
        Some(_) => {
            let (index, operation) = parse_operation(&mut body)?;
            (Some(index), Some(operation))
        }
        None => (None, None),
    };
    goal.score(&body);
    if goal.accept_closer(TokenType::Punctuator, "}").is_none() {
        return Err(goal.error(ErrorKind::MissingClose("}"), PRODUCTION));
    }

    cursor.score(&goal);
    Ok(ParameterExpansion {
        span: goal.span(),
        braced: true,
        prefix,
        name,
        index,
        operator,
        operation,
    })
}

fn accept_name(cursor: &mut Cursor) -> Result<usize, ParseError> {
    match cursor.accept(&[TokenType::Identifier, TokenType::NumberLiteral]) {
        Some(_) => Ok(cursor.position() - 1),
        None => Err(cursor.error(ErrorKind::MissingWord, PRODUCTION)),
    }
}

fn operand(cursor: &mut Cursor) -> Result<Word, ParseError> {
    parse_optional_word(cursor, WordContext::Operand).map_err(|e| e.wrap(PRODUCTION))
}

/// Parse the operator and its operands; returns the operator's token index
fn parse_operation(cursor: &mut Cursor) -> Result<(usize, ParameterOperation), ParseError> {
    let Some(token) = cursor.peek() else {
        return Err(cursor.error(ErrorKind::UnexpectedEof, PRODUCTION));
    };
    let operator = match OPERATORS.get(token.value.as_str()) {
        Some(op) if token.token_type == TokenType::Punctuator => *op,
        _ => return Err(cursor.unexpected(PRODUCTION)),
    };
    let index = cursor.position();
    cursor.next();

    let operation = match operator {
        Operator::Substring => {
            let offset = parse_entries(cursor, Some(":")).map_err(|e| e.wrap(PRODUCTION))?;
            let length = match cursor.accept_punct(":") {
                Some(_) => Some(parse_entries(cursor, None).map_err(|e| e.wrap(PRODUCTION))?),
                None => None,
            };
            ParameterOperation::Substring { offset, length }
        }
        Operator::Default { kind, colon } => ParameterOperation::Default {
            kind,
            colon,
            word: operand(cursor)?,
        },
        Operator::RemovePrefix { longest } => ParameterOperation::RemovePrefix {
            longest,
            pattern: operand(cursor)?,
        },
        Operator::RemoveSuffix { longest } => ParameterOperation::RemoveSuffix {
            longest,
            pattern: operand(cursor)?,
        },
        Operator::Replace(kind) => {
            let pattern = operand(cursor)?;
            let replacement = match cursor.accept_punct("/") {
                Some(_) => Some(operand(cursor)?),
                None => None,
            };
            ParameterOperation::Replace {
                kind,
                pattern,
                replacement,
            }
        }
        Operator::CaseModify { upper, all } => ParameterOperation::CaseModify {
            upper,
            all,
            pattern: operand(cursor)?,
        },
        Operator::At => match cursor.peek() {
            None => ParameterOperation::MatchingNames,
            Some(t) if t.token_type == TokenType::Word && TRANSFORM_OPERATORS.contains(&t.value.as_str()) => {
                let operator = cursor.position();
                cursor.next();
                ParameterOperation::Transform { operator }
            }
            Some(_) => return Err(cursor.unexpected(PRODUCTION)),
        },
        Operator::Star => ParameterOperation::MatchingNames,
    };
    if cursor.peek().is_some() {
        return Err(cursor.unexpected(PRODUCTION));
    }
    Ok((index, operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::WordPart;
    use crate::parser::token_buffer::TokenBuffer;
    use crate::parser::types::ParserOptions;

    fn expand(input: &str) -> (TokenBuffer, ParameterExpansion) {
        let buffer = TokenBuffer::new(input).unwrap();
        let options = ParserOptions::default();
        let expansion = {
            let mut cursor = Cursor::new(&buffer, &options);
            parse_parameter_expansion(&mut cursor).unwrap()
        };
        (buffer, expansion)
    }

    #[test]
    fn test_simple_parameter() {
        let (buffer, p) = expand("$HOME");
        assert!(!p.braced);
        assert_eq!(buffer.token(p.name).value, "HOME");

        let (buffer, p) = expand("$1");
        assert_eq!(buffer.token(p.name).value, "1");
    }

    #[test]
    fn test_length_and_indirect() {
        let (_, p) = expand("${#arr[@]}");
        assert_eq!(p.prefix, Some(ParameterPrefix::Length));
        assert!(p.index.is_some());
        assert!(p.operation.is_none());

        let (_, p) = expand("${!ref}");
        assert_eq!(p.prefix, Some(ParameterPrefix::Indirect));

        let (buffer, p) = expand("${#}");
        assert_eq!(p.prefix, None);
        assert_eq!(buffer.token(p.name).value, "#");
    }

    #[test]
    fn test_default_forms() {
        let (buffer, p) = expand("${a:-fallback value}");
        let Some(ParameterOperation::Default { kind, colon, word }) = p.operation else {
            panic!("expected default");
        };
        assert_eq!(kind, DefaultKind::UseDefault);
        assert!(colon);
        assert_eq!(buffer.text(word.span), "fallback value");

        let (_, p) = expand("${a=}");
        let Some(ParameterOperation::Default { kind, colon, word }) = p.operation else {
            panic!("expected default");
        };
        assert_eq!(kind, DefaultKind::AssignDefault);
        assert!(!colon);
        assert!(word.parts.is_empty());
    }

    #[test]
    fn test_substring() {
        let (_, p) = expand("${a:1:2}");
        let Some(ParameterOperation::Substring { offset, length }) = p.operation else {
            panic!("expected substring");
        };
        assert_eq!(offset.len(), 1);
        assert_eq!(length.map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_replace() {
        let (buffer, p) = expand("${path//\\//_}");
        let Some(ParameterOperation::Replace { kind, pattern, replacement }) = p.operation else {
            panic!("expected replace");
        };
        assert_eq!(kind, ReplaceKind::All);
        assert_eq!(buffer.text(pattern.span), "\\/");
        assert_eq!(replacement.map(|r| buffer.text(r.span)), Some("_".to_string()));
    }

    #[test]
    fn test_removal_with_nested_expansion() {
        let (_, p) = expand("${file%.$ext}");
        let Some(ParameterOperation::RemoveSuffix { longest, pattern }) = p.operation else {
            panic!("expected suffix removal");
        };
        assert!(!longest);
        assert!(matches!(pattern.parts[1], WordPart::Parameter(_)));
    }

    #[test]
    fn test_case_and_transform() {
        let (_, p) = expand("${a^^}");
        assert!(matches!(
            p.operation,
            Some(ParameterOperation::CaseModify { upper: true, all: true, .. })
        ));

        let (buffer, p) = expand("${a@Q}");
        let Some(ParameterOperation::Transform { operator }) = p.operation else {
            panic!("expected transform");
        };
        assert_eq!(buffer.token(operator).value, "Q");

        let (_, p) = expand("${!pre*}");
        assert_eq!(p.operation, Some(ParameterOperation::MatchingNames));
    }

    #[test]
    fn test_unknown_transform() {
        let buffer = TokenBuffer::new("${a@Z}").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let err = parse_parameter_expansion(&mut cursor).unwrap_err();
        assert_eq!(err.root_cause(), &ErrorKind::UnexpectedToken("Z".to_string()));
    }
}
