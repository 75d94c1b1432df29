//! Arithmetic Parser
//!
//! Arithmetic contexts are kept flat: a list of operand words and operator
//! tokens. Operator precedence is left to consumers of the tree.

use crate::ast::types::{ArithmeticCompound, ArithmeticEntry, Subscript};
use crate::parser::cursor::Cursor;
use crate::parser::lexer::TokenType;
use crate::parser::types::{ErrorKind, ParseError};
use crate::parser::word_parser::{parse_word, starts_word_part, WordContext};

const ARITHMETIC: &str = "ArithmeticCompound";
const SUBSCRIPT: &str = "Subscript";

/// Parse entries up to the cursor's stop token.
///
/// With a `separator`, parsing also ends before that operator when it
/// appears outside parentheses and outside a `?:` conditional.
pub fn parse_entries(
    cursor: &mut Cursor,
    separator: Option<&str>,
) -> Result<Vec<ArithmeticEntry>, ParseError> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut conditional = 0usize;
    loop {
        cursor.skip_whitespace();
        let Some(token) = cursor.peek() else {
            break;
        };
        if starts_word_part(token, WordContext::Arithmetic) {
            entries.push(ArithmeticEntry::Word(parse_word(cursor, WordContext::Arithmetic)?));
            continue;
        }
        if token.token_type != TokenType::Punctuator {
            return Err(cursor.unexpected(ARITHMETIC));
        }
        let value = token.value.as_str();
        if depth == 0 && conditional == 0 && separator == Some(value) {
            break;
        }
        match value {
            "(" => depth += 1,
            ")" => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return Err(cursor.error(ErrorKind::MismatchedBracket(')'), ARITHMETIC)),
            },
            "?" => conditional += 1,
            ":" => conditional = conditional.saturating_sub(1),
            _ => {}
        }
        if let Some(index) = cursor.take() {
            entries.push(ArithmeticEntry::Operator(index));
        }
    }
    if depth > 0 {
        return Err(cursor.error(ErrorKind::MissingClose(")"), ARITHMETIC));
    }
    Ok(entries)
}

/// Parse the operand of a `let` assignment, which ends with its shell word
pub fn parse_operand(cursor: &mut Cursor) -> Result<Vec<ArithmeticEntry>, ParseError> {
    let mut entries = Vec::new();
    while let Some(token) = cursor.peek() {
        if starts_word_part(token, WordContext::Arithmetic) {
            entries.push(ArithmeticEntry::Word(parse_word(cursor, WordContext::Arithmetic)?));
            continue;
        }
        let operator = token.token_type == TokenType::Punctuator
            && !token.value.starts_with(|c| ";&|()<>".contains(c));
        if !operator {
            break;
        }
        if let Some(index) = cursor.take() {
            entries.push(ArithmeticEntry::Operator(index));
        }
    }
    Ok(entries)
}

/// Parse a `(( ))` command or a `$(( ))` expansion
pub fn parse_arithmetic(cursor: &mut Cursor) -> Result<ArithmeticCompound, ParseError> {
    let mut goal = cursor.goal();
    let expression = match goal.peek() {
        Some(t) if t.is_punct("((") => true,
        Some(t) if t.is_punct("$((") => false,
        _ => return Err(goal.unexpected(ARITHMETIC)),
    };
    goal.next();

    let mut inner = goal.goal().with_stop(TokenType::Punctuator, "))");
    let entries = parse_entries(&mut inner, None).map_err(|e| e.wrap(ARITHMETIC))?;
    goal.score(&inner);
    if goal.accept_closer(TokenType::Punctuator, "))").is_none() {
        return Err(goal.error(ErrorKind::MissingClose("))"), ARITHMETIC));
    }

    cursor.score(&goal);
    Ok(ArithmeticCompound {
        span: goal.span(),
        expression,
        entries,
    })
}

/// Parse an array index `[ ... ]`
pub fn parse_subscript(cursor: &mut Cursor) -> Result<Subscript, ParseError> {
    let mut goal = cursor.goal();
    if goal.accept_punct("[").is_none() {
        return Err(goal.unexpected(SUBSCRIPT));
    }

    let mut inner = goal.goal().with_stop(TokenType::Punctuator, "]");
    let entries = parse_entries(&mut inner, None).map_err(|e| e.wrap(SUBSCRIPT))?;
    goal.score(&inner);
    if goal.accept_closer(TokenType::Punctuator, "]").is_none() {
        return Err(goal.error(ErrorKind::MissingClose("]"), SUBSCRIPT));
    }

    cursor.score(&goal);
    Ok(Subscript {
        span: goal.span(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::WordPart;
    use crate::parser::token_buffer::TokenBuffer;
    use crate::parser::types::ParserOptions;

    fn entry_texts(buffer: &TokenBuffer, entries: &[ArithmeticEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                ArithmeticEntry::Word(w) => buffer.text(w.span),
                ArithmeticEntry::Operator(i) => buffer.token(*i).value.clone(),
            })
            .collect()
    }

    #[test]
    fn test_arithmetic_command() {
        let buffer = TokenBuffer::new("(( a + 1 ))").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let arith = parse_arithmetic(&mut cursor).unwrap();
        assert!(arith.expression);
        assert_eq!(entry_texts(&buffer, &arith.entries), vec!["a", "+", "1"]);
        assert_eq!(arith.span.end, buffer.len());
    }

    #[test]
    fn test_arithmetic_expansion_with_parens() {
        let buffer = TokenBuffer::new("$(( (x*2) % $y ))").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let arith = parse_arithmetic(&mut cursor).unwrap();
        assert!(!arith.expression);
        assert_eq!(
            entry_texts(&buffer, &arith.entries),
            vec!["(", "x", "*", "2", ")", "%", "$y"]
        );
    }

    #[test]
    fn test_indexed_operand() {
        let buffer = TokenBuffer::new("(( a[i+1] ))").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let arith = parse_arithmetic(&mut cursor).unwrap();
        assert_eq!(arith.entries.len(), 1);
        let ArithmeticEntry::Word(word) = &arith.entries[0] else {
            panic!("expected word");
        };
        assert!(matches!(word.parts[1], WordPart::Subscript(_)));
        assert_eq!(buffer.text(word.span), "a[i+1]");
    }

    #[test]
    fn test_separator() {
        let buffer = TokenBuffer::new("(( i = 0; i < n ? 1 : 2; i++ ))").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        cursor.next();
        let mut inner = cursor.goal().with_stop(TokenType::Punctuator, "))");
        let init = parse_entries(&mut inner, Some(";")).unwrap();
        assert_eq!(entry_texts(&buffer, &init), vec!["i", "=", "0"]);
        assert!(inner.accept_punct(";").is_some());
        let condition = parse_entries(&mut inner, Some(";")).unwrap();
        assert_eq!(condition.len(), 7);
    }
}
