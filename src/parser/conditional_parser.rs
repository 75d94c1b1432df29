//! Conditional Expression Parser
//!
//! Handles parsing of [[ ... ]] conditional commands.

use crate::ast::types::{AndOr, TestCompound, TestExpression, Word, WordPart};
use crate::parser::cursor::Cursor;
use crate::parser::lexer::TokenType;
use crate::parser::token_buffer::TokenIndex;
use crate::parser::types::{ErrorKind, ParseError};
use crate::parser::word_parser::{parse_word, starts_word_part, WordContext};

const PRODUCTION: &str = "TestCompound";

/// Unary operators for conditional expressions
pub const UNARY_OPS: &[&str] = &[
    "-a", "-b", "-c", "-d", "-e", "-f", "-g", "-h", "-k", "-p", "-r", "-s", "-t", "-u", "-w", "-x",
    "-G", "-L", "-N", "-O", "-S", "-z", "-n", "-o", "-v", "-R",
];

/// Binary operators for conditional expressions
pub const BINARY_OPS: &[&str] = &[
    "==", "=", "!=", "=~", "<", ">", "-eq", "-ne", "-lt", "-le", "-gt", "-ge", "-nt", "-ot", "-ef",
];

/// Parse `[[ expression ]]`
pub fn parse_test_compound(cursor: &mut Cursor) -> Result<TestCompound, ParseError> {
    let mut goal = cursor.goal();
    if goal.accept_keyword("[[").is_none() {
        return Err(goal.unexpected(PRODUCTION));
    }

    let mut inner = goal.goal().with_stop(TokenType::Keyword, "]]");
    let expression = parse_or(&mut inner)?;
    skip_blanks(&mut inner)?;
    if inner.peek().is_some() {
        return Err(inner.unexpected(PRODUCTION));
    }
    goal.score(&inner);
    if goal.accept_closer(TokenType::Keyword, "]]").is_none() {
        return Err(goal.error(ErrorKind::MissingClose("]]"), PRODUCTION));
    }

    cursor.score(&goal);
    Ok(TestCompound {
        span: goal.span(),
        expression,
    })
}

/// Skip whitespace and line breaks; comments are not allowed inside `[[ ]]`
fn skip_blanks(cursor: &mut Cursor) -> Result<(), ParseError> {
    loop {
        cursor.skip_whitespace();
        if cursor.accept_line_terminator() {
            continue;
        }
        if cursor.peek().is_some_and(|t| t.token_type == TokenType::Comment) {
            return Err(cursor.unexpected(PRODUCTION));
        }
        return Ok(());
    }
}

fn parse_or(cursor: &mut Cursor) -> Result<TestExpression, ParseError> {
    let mut left = parse_and(cursor)?;
    loop {
        let mut next = cursor.goal();
        skip_blanks(&mut next)?;
        if next.accept_punct("||").is_none() {
            return Ok(left);
        }
        let right = parse_and(&mut next)?;
        cursor.score(&next);
        left = TestExpression::Binary {
            left: Box::new(left),
            operator: AndOr::Or,
            right: Box::new(right),
        };
    }
}

fn parse_and(cursor: &mut Cursor) -> Result<TestExpression, ParseError> {
    let mut left = parse_not(cursor)?;
    loop {
        let mut next = cursor.goal();
        skip_blanks(&mut next)?;
        if next.accept_punct("&&").is_none() {
            return Ok(left);
        }
        let right = parse_not(&mut next)?;
        cursor.score(&next);
        left = TestExpression::Binary {
            left: Box::new(left),
            operator: AndOr::And,
            right: Box::new(right),
        };
    }
}

fn parse_not(cursor: &mut Cursor) -> Result<TestExpression, ParseError> {
    skip_blanks(cursor)?;
    if cursor.accept_keyword("!").is_some() {
        return Ok(TestExpression::Not(Box::new(parse_not(cursor)?)));
    }
    parse_primary(cursor)
}

/// Token of a word that is exactly a unary test operator
fn unary_operator(cursor: &Cursor, word: &Word) -> Option<TokenIndex> {
    match word.parts.as_slice() {
        [WordPart::Literal(index)] if UNARY_OPS.contains(&cursor.buffer().token(*index).value.as_str()) => {
            Some(*index)
        }
        _ => None,
    }
}

fn operand(cursor: &mut Cursor) -> Result<Word, ParseError> {
    parse_word(cursor, WordContext::Test).map_err(|e| e.wrap(PRODUCTION))
}

fn parse_primary(cursor: &mut Cursor) -> Result<TestExpression, ParseError> {
    skip_blanks(cursor)?;
    let Some(token) = cursor.peek() else {
        return Err(cursor.error(ErrorKind::MissingWord, PRODUCTION));
    };

    if token.is_punct("(") {
        cursor.next();
        let inner = parse_or(cursor)?;
        skip_blanks(cursor)?;
        if cursor.accept_punct(")").is_none() {
            return Err(cursor.error(ErrorKind::MissingClose(")"), PRODUCTION));
        }
        return Ok(TestExpression::Group(Box::new(inner)));
    }
    if !starts_word_part(token, WordContext::Test) {
        return Err(cursor.error(ErrorKind::MissingWord, PRODUCTION));
    }

    let first = operand(cursor)?;

    // -f file
    if let Some(operator) = unary_operator(cursor, &first) {
        let mut next = cursor.goal();
        next.skip_whitespace();
        let takes_operand = next
            .peek()
            .is_some_and(|t| starts_word_part(t, WordContext::Test) && !is_binary_operator(&next));
        if takes_operand {
            let operand = operand(&mut next)?;
            cursor.score(&next);
            return Ok(TestExpression::Unary { operator, operand });
        }
    }

    // left OP right
    let mut next = cursor.goal();
    next.skip_whitespace();
    if is_binary_operator(&next) {
        let operator = next.position();
        next.next();
        next.skip_whitespace();
        let right = operand(&mut next)?;
        cursor.score(&next);
        return Ok(TestExpression::Compare {
            left: first,
            operator,
            right,
        });
    }

    Ok(TestExpression::Word(first))
}

/// Whether the next token is a comparison operator on its own
fn is_binary_operator(cursor: &Cursor) -> bool {
    let Some(token) = cursor.peek() else {
        return false;
    };
    match token.token_type {
        TokenType::Punctuator => token.value == "<" || token.value == ">",
        // a whole word, not the start of `==$x`
        TokenType::Word => {
            BINARY_OPS.contains(&token.value.as_str())
                && cursor
                    .peek_at(1)
                    .map_or(true, |next| !starts_word_part(next, WordContext::Test))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token_buffer::TokenBuffer;
    use crate::parser::types::ParserOptions;

    fn test(input: &str) -> (TokenBuffer, TestExpression) {
        let buffer = TokenBuffer::new(input).unwrap();
        let options = ParserOptions::default();
        let expression = {
            let mut cursor = Cursor::new(&buffer, &options);
            let compound = parse_test_compound(&mut cursor).unwrap();
            assert_eq!(compound.span.end, buffer.len());
            compound.expression
        };
        (buffer, expression)
    }

    #[test]
    fn test_unary() {
        let (buffer, expr) = test("[[ -f $file ]]");
        let TestExpression::Unary { operator, operand } = expr else {
            panic!("expected unary");
        };
        assert_eq!(buffer.token(operator).value, "-f");
        assert_eq!(buffer.text(operand.span), "$file");
    }

    #[test]
    fn test_compare() {
        let (buffer, expr) = test("[[ $a = \"b\" ]]");
        let TestExpression::Compare { operator, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(buffer.token(operator).value, "=");

        let (buffer, expr) = test("[[ a < b ]]");
        let TestExpression::Compare { operator, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(buffer.token(operator).value, "<");
    }

    #[test]
    fn test_regex() {
        let (buffer, expr) = test("[[ $x =~ ^[0-9]+(a|b)$ ]]");
        let TestExpression::Compare { operator, right, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(buffer.token(operator).value, "=~");
        assert_eq!(buffer.text(right.span), "^[0-9]+(a|b)$");
    }

    #[test]
    fn test_logical_tree() {
        let (_, expr) = test("[[ ! a && ( b || -n c ) ]]");
        let TestExpression::Binary { left, operator, right } = expr else {
            panic!("expected binary");
        };
        assert_eq!(operator, AndOr::And);
        assert!(matches!(*left, TestExpression::Not(_)));
        let TestExpression::Group(inner) = *right else {
            panic!("expected group");
        };
        assert!(matches!(*inner, TestExpression::Binary { operator: AndOr::Or, .. }));
    }

    #[test]
    fn test_multiline() {
        let (_, expr) = test("[[ a &&\n  b ]]");
        assert!(matches!(expr, TestExpression::Binary { .. }));
    }

    #[test]
    fn test_bare_operator_word() {
        let (_, expr) = test("[[ -n ]]");
        assert!(matches!(expr, TestExpression::Word(_)));
    }

    #[test]
    fn test_comment_rejected() {
        let buffer = TokenBuffer::new("[[ a # c\n]]").unwrap();
        let options = ParserOptions::default();
        let mut cursor = Cursor::new(&buffer, &options);
        let err = parse_test_compound(&mut cursor).unwrap_err();
        assert_eq!(err.root_cause(), &ErrorKind::UnexpectedToken("# c".to_string()));
    }
}
