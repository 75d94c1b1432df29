//! Compound Command Parser
//!
//! Handles parsing of compound commands: if, case, while, until, for, select,
//! [[ ]], groups, subshells, functions and (( )).

use crate::ast::types::{
    CaseCompound, CaseTerminator, Compound, CompoundKind, File, ForCompound, ForHeader,
    FunctionCompound, GroupingCompound, IfCompound, LoopCompound, PatternLines, SelectCompound,
    TestConsequence, Word,
};
use crate::parser::arithmetic_parser::{parse_arithmetic, parse_entries};
use crate::parser::command_parser::{is_redirection, parse_redirection};
use crate::parser::conditional_parser::parse_test_compound;
use crate::parser::cursor::Cursor;
use crate::parser::lexer::TokenType;
use crate::parser::parser::{parse_comments, parse_file, parse_statement};
use crate::parser::token_buffer::TokenIndex;
use crate::parser::types::{ErrorKind, ParseError};
use crate::parser::word_parser::{parse_word, starts_word_part, WordContext};

const COMPOUND: &str = "Compound";
const IF: &str = "IfCompound";
const TEST_CONSEQUENCE: &str = "TestConsequence";
const CASE: &str = "CaseCompound";
const PATTERN_LINES: &str = "PatternLines";
const LOOP: &str = "LoopCompound";
const FOR: &str = "ForCompound";
const SELECT: &str = "SelectCompound";
const GROUPING: &str = "GroupingCompound";
const FUNCTION: &str = "FunctionCompound";

/// Whether a compound command starts at the cursor
pub fn starts_compound(cursor: &Cursor) -> bool {
    let Some(token) = cursor.peek() else {
        return false;
    };
    match token.token_type {
        TokenType::Keyword => matches!(
            token.value.as_str(),
            "if" | "case" | "while" | "until" | "for" | "select" | "[[" | "{" | "function"
        ),
        TokenType::Punctuator => token.value == "(" || token.value == "((",
        TokenType::Word => is_function_definition(cursor),
        _ => false,
    }
}

/// `name ()` ahead of the cursor
fn is_function_definition(cursor: &Cursor) -> bool {
    let mut n = 1;
    let mut expect = ["(", ")"].into_iter();
    while let Some(token) = cursor.peek_at(n) {
        n += 1;
        if token.token_type == TokenType::Whitespace {
            continue;
        }
        match expect.next() {
            Some(value) if token.is_punct(value) => {
                if value == ")" {
                    return true;
                }
            }
            _ => return false,
        }
    }
    false
}

/// Parse a compound command and the redirections that follow it
pub fn parse_compound(cursor: &mut Cursor) -> Result<Compound, ParseError> {
    let mut goal = cursor.goal();
    let Some(token) = goal.peek() else {
        return Err(goal.error(ErrorKind::UnexpectedEof, COMPOUND));
    };

    let kind = match (token.token_type, token.value.as_str()) {
        (TokenType::Keyword, "if") => parse_if(&mut goal).map(CompoundKind::If),
        (TokenType::Keyword, "case") => parse_case(&mut goal).map(CompoundKind::Case),
        (TokenType::Keyword, "while" | "until") => parse_loop(&mut goal).map(CompoundKind::Loop),
        (TokenType::Keyword, "for") => parse_for(&mut goal).map(CompoundKind::For),
        (TokenType::Keyword, "select") => parse_select(&mut goal).map(CompoundKind::Select),
        (TokenType::Keyword, "[[") => parse_test_compound(&mut goal).map(CompoundKind::Test),
        (TokenType::Keyword, "{") | (TokenType::Punctuator, "(") => {
            parse_grouping(&mut goal).map(CompoundKind::Grouping)
        }
        (TokenType::Punctuator, "((") => parse_arithmetic(&mut goal).map(CompoundKind::Arithmetic),
        (TokenType::Keyword, "function") | (TokenType::Word, _) => {
            parse_function(&mut goal).map(CompoundKind::Function)
        }
        _ => Err(goal.unexpected(COMPOUND)),
    }
    .map_err(|e| e.wrap(COMPOUND))?;

    let mut redirections = Vec::new();
    loop {
        let mut next = goal.goal();
        next.skip_whitespace();
        if !is_redirection(&next) {
            break;
        }
        redirections.push(parse_redirection(&mut next).map_err(|e| e.wrap(COMPOUND))?);
        goal.score(&next);
    }

    cursor.score(&goal);
    Ok(Compound {
        span: goal.span(),
        kind,
        redirections,
    })
}

fn expect_keyword(cursor: &mut Cursor, keyword: &'static str, production: &'static str) -> Result<(), ParseError> {
    match cursor.accept_keyword(keyword) {
        Some(_) => Ok(()),
        None if cursor.peek().is_none() => Err(cursor.error(ErrorKind::MissingClose(keyword), production)),
        None => Err(cursor.unexpected(production)),
    }
}

/// Parse an if statement
pub fn parse_if(cursor: &mut Cursor) -> Result<IfCompound, ParseError> {
    let mut goal = cursor.goal();
    expect_keyword(&mut goal, "if", IF)?;

    let mut clauses = vec![parse_test_consequence(&mut goal).map_err(|e| e.wrap(IF))?];
    let mut else_body = None;
    loop {
        if goal.accept_keyword("elif").is_some() {
            clauses.push(parse_test_consequence(&mut goal).map_err(|e| e.wrap(IF))?);
        } else if goal.accept_keyword("else").is_some() {
            else_body = Some(parse_file(&mut goal).map_err(|e| e.wrap(IF))?);
            break;
        } else {
            break;
        }
    }
    expect_keyword(&mut goal, "fi", IF)?;

    cursor.score(&goal);
    Ok(IfCompound {
        span: goal.span(),
        clauses,
        else_body,
    })
}

/// Parse the condition and body of an `if` or `elif` clause
fn parse_test_consequence(cursor: &mut Cursor) -> Result<TestConsequence, ParseError> {
    let mut goal = cursor.goal();
    let comments_before_test = parse_comments(&mut goal);
    let test = Box::new(parse_statement(&mut goal).map_err(|e| e.wrap(TEST_CONSEQUENCE))?);
    let comments_after_test = parse_comments(&mut goal);
    expect_keyword(&mut goal, "then", TEST_CONSEQUENCE)?;
    let consequence = parse_file(&mut goal).map_err(|e| e.wrap(TEST_CONSEQUENCE))?;

    cursor.score(&goal);
    Ok(TestConsequence {
        span: goal.span(),
        comments_before_test,
        test,
        comments_after_test,
        consequence,
    })
}

/// Parse a case statement
pub fn parse_case(cursor: &mut Cursor) -> Result<CaseCompound, ParseError> {
    let mut goal = cursor.goal();
    expect_keyword(&mut goal, "case", CASE)?;
    goal.skip_whitespace();
    let subject = parse_word(&mut goal, WordContext::Shell).map_err(|e| e.wrap(CASE))?;
    let comments_before_in = parse_comments(&mut goal);
    expect_keyword(&mut goal, "in", CASE)?;

    let mut items = Vec::new();
    let comments_before_esac = loop {
        let comments = parse_comments(&mut goal);
        if goal.accept_keyword("esac").is_some() {
            break comments;
        }
        if goal.peek().is_none() {
            return Err(goal.error(ErrorKind::MissingClose("esac"), CASE));
        }
        let item = parse_pattern_lines(&mut goal, comments).map_err(|e| e.wrap(CASE))?;
        let terminated = item.terminator != CaseTerminator::Unterminated;
        items.push(item);
        if !terminated {
            let comments = parse_comments(&mut goal);
            expect_keyword(&mut goal, "esac", CASE)?;
            break comments;
        }
    };

    cursor.score(&goal);
    Ok(CaseCompound {
        span: goal.span(),
        subject,
        comments_before_in,
        items,
        comments_before_esac,
    })
}

/// Parse one `pattern | pattern) body ;;` item
fn parse_pattern_lines(cursor: &mut Cursor, comments_before: Vec<TokenIndex>) -> Result<PatternLines, ParseError> {
    let mut goal = cursor.goal();
    goal.accept_punct("(");

    let mut patterns = Vec::new();
    loop {
        goal.skip_whitespace();
        patterns.push(parse_word(&mut goal, WordContext::Shell).map_err(|e| e.wrap(PATTERN_LINES))?);
        goal.skip_whitespace();
        if goal.accept_punct("|").is_some() {
            continue;
        }
        if goal.accept_closer(TokenType::Punctuator, ")").is_some() {
            break;
        }
        return Err(goal.error(ErrorKind::MissingClose(")"), PATTERN_LINES));
    }

    let body = parse_file(&mut goal).map_err(|e| e.wrap(PATTERN_LINES))?;

    let mut next = goal.goal();
    next.skip_whitespace();
    let terminator = match next.peek().map(|t| (t.token_type, t.value.as_str())) {
        Some((TokenType::Punctuator, ";;")) => CaseTerminator::End,
        Some((TokenType::Punctuator, ";&")) => CaseTerminator::Fallthrough,
        Some((TokenType::Punctuator, ";;&")) => CaseTerminator::Continue,
        _ => CaseTerminator::Unterminated,
    };
    let mut comments_after = Vec::new();
    if terminator != CaseTerminator::Unterminated {
        next.next();
        goal.score(&next);
        let mut trailing = goal.goal();
        trailing.skip_whitespace();
        if let Some(index) = trailing.accept(&[TokenType::Comment]).map(|_| trailing.position() - 1) {
            comments_after.push(index);
            goal.score(&trailing);
        }
    }

    cursor.score(&goal);
    Ok(PatternLines {
        span: goal.span(),
        comments_before,
        patterns,
        body,
        terminator,
        comments_after,
    })
}

/// Parse a while or until loop
pub fn parse_loop(cursor: &mut Cursor) -> Result<LoopCompound, ParseError> {
    let mut goal = cursor.goal();
    let until = if goal.accept_keyword("until").is_some() {
        true
    } else {
        expect_keyword(&mut goal, "while", LOOP)?;
        false
    };
    let comments_before_condition = parse_comments(&mut goal);
    let condition = Box::new(parse_statement(&mut goal).map_err(|e| e.wrap(LOOP))?);
    let comments_after_condition = parse_comments(&mut goal);
    let body = parse_do_body(&mut goal, LOOP)?;

    cursor.score(&goal);
    Ok(LoopCompound {
        span: goal.span(),
        until,
        comments_before_condition,
        condition,
        comments_after_condition,
        body,
    })
}

/// Parse `do ... done`
fn parse_do_body(cursor: &mut Cursor, production: &'static str) -> Result<File, ParseError> {
    expect_keyword(cursor, "do", production)?;
    let body = parse_file(cursor).map_err(|e| e.wrap(production))?;
    expect_keyword(cursor, "done", production)?;
    Ok(body)
}

/// Parse `name [in words...]` up to the optional `;`
fn parse_for_each(cursor: &mut Cursor, production: &'static str) -> Result<(TokenIndex, Option<Vec<Word>>), ParseError> {
    cursor.skip_whitespace();
    let Some(name) = cursor.accept(&[TokenType::Word]).map(|_| cursor.position() - 1) else {
        return Err(cursor.error(ErrorKind::MissingWord, production));
    };

    let mut probe = cursor.goal();
    probe.skip_whitespace();
    let words = if probe.accept_keyword("in").is_some() {
        cursor.score(&probe);
        let mut words = Vec::new();
        loop {
            let mut next = cursor.goal();
            next.skip_whitespace();
            match next.peek() {
                Some(t) if starts_word_part(t, WordContext::Shell) => {
                    words.push(parse_word(&mut next, WordContext::Shell).map_err(|e| e.wrap(production))?);
                    cursor.score(&next);
                }
                _ => break,
            }
        }
        Some(words)
    } else {
        None
    };

    let mut next = cursor.goal();
    next.skip_whitespace();
    if next.accept_punct(";").is_some() {
        cursor.score(&next);
    }
    Ok((name, words))
}

/// Parse a for loop, either `for name in ...` or `for (( ; ; ))`
pub fn parse_for(cursor: &mut Cursor) -> Result<ForCompound, ParseError> {
    let mut goal = cursor.goal();
    expect_keyword(&mut goal, "for", FOR)?;
    goal.skip_whitespace();

    let header = if goal.accept_punct("((").is_some() {
        let mut inner = goal.goal().with_stop(TokenType::Punctuator, "))");
        let mut sections = Vec::with_capacity(3);
        for separator in [Some(";"), Some(";"), None] {
            sections.push(parse_entries(&mut inner, separator).map_err(|e| e.wrap(FOR))?);
            if let Some(separator) = separator {
                if inner.accept_punct(separator).is_none() {
                    return Err(inner.error(ErrorKind::MissingClose(";"), FOR));
                }
            }
        }
        goal.score(&inner);
        if goal.accept_closer(TokenType::Punctuator, "))").is_none() {
            return Err(goal.error(ErrorKind::MissingClose("))"), FOR));
        }
        let mut next = goal.goal();
        next.skip_whitespace();
        if next.accept_punct(";").is_some() {
            goal.score(&next);
        }
        let step = sections.pop().unwrap_or_default();
        let condition = sections.pop().unwrap_or_default();
        let init = sections.pop().unwrap_or_default();
        ForHeader::CStyle { init, condition, step }
    } else {
        let (name, words) = parse_for_each(&mut goal, FOR)?;
        ForHeader::Each { name, words }
    };

    let comments_before_do = parse_comments(&mut goal);
    let body = parse_do_body(&mut goal, FOR)?;

    cursor.score(&goal);
    Ok(ForCompound {
        span: goal.span(),
        header,
        comments_before_do,
        body,
    })
}

/// Parse a select loop
pub fn parse_select(cursor: &mut Cursor) -> Result<SelectCompound, ParseError> {
    let mut goal = cursor.goal();
    expect_keyword(&mut goal, "select", SELECT)?;
    let (name, words) = parse_for_each(&mut goal, SELECT)?;
    let comments_before_do = parse_comments(&mut goal);
    let body = parse_do_body(&mut goal, SELECT)?;

    cursor.score(&goal);
    Ok(SelectCompound {
        span: goal.span(),
        name,
        words,
        comments_before_do,
        body,
    })
}

/// Parse `{ ...; }` or `( ... )`
pub fn parse_grouping(cursor: &mut Cursor) -> Result<GroupingCompound, ParseError> {
    let mut goal = cursor.goal();
    let (subshell, stop, closer) = if goal.accept_keyword("{").is_some() {
        (false, TokenType::Keyword, "}")
    } else if goal.accept_punct("(").is_some() {
        (true, TokenType::Punctuator, ")")
    } else {
        return Err(goal.unexpected(GROUPING));
    };

    let mut inner = goal.goal().with_stop(stop, closer);
    let body = parse_file(&mut inner).map_err(|e| e.wrap(GROUPING))?;
    goal.score(&inner);
    if goal.accept_closer(stop, closer).is_none() {
        return Err(goal.error(ErrorKind::MissingClose(closer), GROUPING));
    }

    cursor.score(&goal);
    Ok(GroupingCompound {
        span: goal.span(),
        subshell,
        body,
    })
}

/// Parse `function name [()] body` or `name() body`
pub fn parse_function(cursor: &mut Cursor) -> Result<FunctionCompound, ParseError> {
    let mut goal = cursor.goal();
    let keyword = goal.accept_keyword("function").is_some();
    goal.skip_whitespace();
    let Some(name) = goal.accept(&[TokenType::Word]).map(|_| goal.position() - 1) else {
        return Err(goal.error(ErrorKind::MissingWord, FUNCTION));
    };

    let mut next = goal.goal();
    next.skip_whitespace();
    let parens = next.accept_punct("(").is_some();
    if parens {
        next.skip_whitespace();
        if next.accept_closer(TokenType::Punctuator, ")").is_none() {
            return Err(next.error(ErrorKind::MissingClose(")"), FUNCTION));
        }
        goal.score(&next);
    }

    let comments_before_body = parse_comments(&mut goal);
    let body = parse_grouping(&mut goal).map_err(|e| e.wrap(FUNCTION))?;

    cursor.score(&goal);
    Ok(FunctionCompound {
        span: goal.span(),
        keyword,
        name,
        parens,
        comments_before_body,
        body,
    })
}
