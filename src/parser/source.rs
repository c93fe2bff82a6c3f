//! The concrete concat/"Seq" source grammar (spec.md §4.6), built on the
//! generic [`super::rules::Rules`] table and [`super::vm::eval`] driver.

use super::rules::{Op, Rules};
use super::vm::{eval, EvalError};
use crate::error::{CatError, CatResult};
use crate::list::CatList;
use crate::numeric::parse::parse_number;
use crate::string::CatString;
use crate::value::Value;

// --- parse classes (spec.md §4.6, grounded on vm_parser.h's `parse_class`) ---
const PCLASS_NULL: usize = 0;
const PCLASS_BSLASH: usize = 1;
const PCLASS_HASH: usize = 2;
const PCLASS_NEWLINE: usize = 3;
const PCLASS_SQUOTE: usize = 4;
const PCLASS_DQUOTE: usize = 5;
const PCLASS_SPACE: usize = 6;
const PCLASS_DIGIT: usize = 7;
const PCLASS_SIGN: usize = 8;
const PCLASS_IDENT: usize = 9;
const PCLASS_OP: usize = 10;
const PCLASS_CLOSE_GROUP: usize = 11;
const PCLASS_OTHER: usize = 12;
const PCLASS_COUNT: usize = 13;

// --- parse states (spec.md §4.6, grounded on vm_parser.h's `parse_state`) ---
const PSTATE_INIT: usize = 0;
const PSTATE_DSTRING_ESCAPE: usize = 1;
const PSTATE_DSTRING: usize = 2;
const PSTATE_SSTRING: usize = 3;
const PSTATE_IDENT: usize = 4;
const PSTATE_DIGIT: usize = 5;
const PSTATE_IDENT_ESCAPE: usize = 6;
const PSTATE_OP: usize = 7;
const PSTATE_CLOSE_GROUP: usize = 8;
const PSTATE_COMMENT: usize = 9;
const PSTATE_SIGN: usize = 10;
const PSTATE_COUNT: usize = 11;
const PSTATE_FIN: usize = PSTATE_COUNT;

const OPERATOR_CHARS: &[u8] = b"~!@$%^*()={}[]<>_,;+-/&|";
const CLOSE_GROUP_CHARS: &[u8] = b")]";

fn is_op_char(c: u8) -> bool {
    OPERATOR_CHARS.contains(&c)
}

fn is_close_group_char(c: u8) -> bool {
    CLOSE_GROUP_CHARS.contains(&c)
}

fn classify(c: u8) -> usize {
    match c {
        0 => PCLASS_NULL,
        b'\\' => PCLASS_BSLASH,
        b'\n' => PCLASS_NEWLINE,
        b'#' => PCLASS_HASH,
        b'\'' => PCLASS_SQUOTE,
        b'"' => PCLASS_DQUOTE,
        b'+' | b'-' => PCLASS_SIGN,
        b'_' | b'.' => PCLASS_IDENT,
        c if c.is_ascii_whitespace() => PCLASS_SPACE,
        c if c.is_ascii_digit() => PCLASS_DIGIT,
        c if c.is_ascii_alphabetic() => PCLASS_IDENT,
        c if is_close_group_char(c) => PCLASS_CLOSE_GROUP,
        c if is_op_char(c) => PCLASS_OP,
        _ => PCLASS_OTHER,
    }
}

/// Build the concat source tokenizer's rule table (spec.md §4.6), mirroring
/// `vm_new_parser`'s "paint the default, then paint exceptions" sequence.
pub fn source_rules() -> Rules {
    let mut r = Rules::new(PSTATE_COUNT + 1, PCLASS_COUNT, PSTATE_INIT, PSTATE_FIN, classify);

    r.set_global_op_target(PCLASS_NULL, Op::SplitBefore, PSTATE_FIN);
    r.set_global_op_target(PCLASS_SPACE, Op::SplitSkip, PSTATE_INIT);
    r.set_global_op_target(PCLASS_NEWLINE, Op::SplitSkip, PSTATE_INIT);
    r.set_global_op_target(PCLASS_DIGIT, Op::SplitBefore, PSTATE_DIGIT);
    r.set_global_op_target(PCLASS_IDENT, Op::SplitBefore, PSTATE_IDENT);
    r.set_global_op_target(PCLASS_BSLASH, Op::SplitBefore, PSTATE_IDENT_ESCAPE);
    r.set_global_op_target(PCLASS_OP, Op::SplitBefore, PSTATE_OP);
    r.set_global_op_target(PCLASS_SIGN, Op::SplitBefore, PSTATE_SIGN);
    r.set_global_op_target(PCLASS_CLOSE_GROUP, Op::SplitBefore, PSTATE_CLOSE_GROUP);
    r.set_global_op_target(PCLASS_HASH, Op::SplitBefore, PSTATE_COMMENT);
    r.set_global_op_target(PCLASS_SQUOTE, Op::SplitBefore, PSTATE_SSTRING);
    r.set_global_op_target(PCLASS_DQUOTE, Op::SplitBefore, PSTATE_DSTRING);

    r.set_list_op_target(PSTATE_SIGN, Op::NoSplit, PSTATE_DIGIT, &[PCLASS_DIGIT]);
    r.set_list_op_target(PSTATE_IDENT, Op::NoSplit, PSTATE_IDENT, &[PCLASS_IDENT, PCLASS_OP, PCLASS_SIGN]);
    r.set_list_op_target(PSTATE_DIGIT, Op::NoSplit, PSTATE_IDENT, &[PCLASS_IDENT]);
    r.set_list_op_target(PSTATE_IDENT, Op::NoSplit, PSTATE_DIGIT, &[PCLASS_DIGIT]);
    r.set_list_op_target(PSTATE_DIGIT, Op::NoSplit, PSTATE_DIGIT, &[PCLASS_DIGIT]);
    r.set_list_op_target(PSTATE_IDENT_ESCAPE, Op::NoSplit, PSTATE_IDENT, &[PCLASS_IDENT]);
    r.set_list_op_target(PSTATE_IDENT_ESCAPE, Op::NoSplit, PSTATE_DIGIT, &[PCLASS_DIGIT]);
    r.set_entry(PSTATE_IDENT_ESCAPE, PCLASS_BSLASH, Op::NoSplit, PSTATE_IDENT_ESCAPE);
    r.set_list_op_target(PSTATE_IDENT_ESCAPE, Op::SplitAfter, PSTATE_OP, &[PCLASS_OP, PCLASS_SIGN]);

    r.set_state_op_target(PSTATE_COMMENT, Op::NoSplit, PSTATE_COMMENT);
    r.set_entry(PSTATE_COMMENT, PCLASS_NEWLINE, Op::SplitAfter, PSTATE_INIT);
    r.set_entry(PSTATE_COMMENT, PCLASS_NULL, Op::SplitAfter, PSTATE_INIT);

    r.set_state_op_target(PSTATE_SSTRING, Op::NoSplit, PSTATE_SSTRING);
    r.set_entry(PSTATE_SSTRING, PCLASS_SQUOTE, Op::SplitAfter, PSTATE_INIT);

    r.set_state_op_target(PSTATE_DSTRING, Op::NoSplit, PSTATE_DSTRING);
    r.set_entry(PSTATE_DSTRING, PCLASS_DQUOTE, Op::SplitAfter, PSTATE_INIT);
    r.set_entry(PSTATE_DSTRING, PCLASS_BSLASH, Op::NoSplit, PSTATE_DSTRING_ESCAPE);
    r.set_state_op_target(PSTATE_DSTRING_ESCAPE, Op::NoSplit, PSTATE_DSTRING);

    // sign after a digit-run or a close-group becomes an operator, not a
    // number sign (disambiguates `3-4` as three tokens, spec.md §4.6).
    r.set_entry(PSTATE_DIGIT, PCLASS_SIGN, Op::SplitBefore, PSTATE_OP);
    r.set_entry(PSTATE_CLOSE_GROUP, PCLASS_SIGN, Op::SplitBefore, PSTATE_OP);

    r
}

/// A flat token stream: every token (operators, grouping chars, comments)
/// parsed into a [`Value`], without building nested groups.
pub fn tokenize(input: &[u8]) -> CatResult<Vec<Value>> {
    let rules = source_rules();
    let mut out = Vec::new();
    let mut null_terminated = Vec::with_capacity(input.len() + 1);
    null_terminated.extend_from_slice(input);
    null_terminated.push(0);

    let result = eval(
        &rules,
        &null_terminated,
        0,
        None,
        |start, end| {
            let tok = &null_terminated[start..end];
            match parse_token(tok) {
                Ok(Some(v)) => {
                    out.push(v);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(_) => Err(-1),
            }
        },
        None,
    );
    match result {
        Ok(_) => Ok(out),
        Err(EvalError::ParseError { offset }) => Err(CatError::bad_parse("invalid source token", offset)),
        Err(EvalError::HandlerAbort { .. }) => Err(CatError::bad_parse("invalid source token", 0)),
    }
}

/// Parse source text into a tree of nested `Value::List`/`Value::Code`
/// values, following the group stack discipline in spec.md §4.6.
pub fn parse_tree(input: &[u8]) -> CatResult<CatList> {
    let rules = source_rules();
    let mut null_terminated = Vec::with_capacity(input.len() + 1);
    null_terminated.extend_from_slice(input);
    null_terminated.push(0);

    let mut stack: Vec<(CatList, bool)> = vec![(CatList::new(), true)]; // (list, is_code)
    let mut parse_err: Option<CatError> = None;

    let result = eval(
        &rules,
        &null_terminated,
        0,
        None,
        |start, end| {
            let tok = &null_terminated[start..end];
            match handle_group_token(tok, &mut stack) {
                Ok(()) => Ok(()),
                Err(e) => {
                    parse_err = Some(e);
                    Err(-1)
                }
            }
        },
        None,
    );

    if let Some(e) = parse_err {
        return Err(e);
    }
    match result {
        Ok(_) => {}
        Err(EvalError::ParseError { offset }) => return Err(CatError::bad_parse("invalid source token", offset)),
        Err(EvalError::HandlerAbort { .. }) => return Err(CatError::bad_parse("invalid source token", 0)),
    }

    if stack.len() != 1 {
        return Err(CatError::bad_parse("unclosed group at end of input", input.len()));
    }
    Ok(stack.pop().unwrap().0)
}

fn handle_group_token(tok: &[u8], stack: &mut Vec<(CatList, bool)>) -> CatResult<()> {
    if tok.len() == 1 && matches!(tok[0], b'[' | b']' | b'(' | b')') {
        match tok[0] {
            b'[' => stack.push((CatList::new(), true)),
            b'(' => stack.push((CatList::new(), false)),
            b']' | b')' => {
                let wants_code = tok[0] == b']';
                if stack.len() < 2 {
                    return Err(CatError::bad_parse("unmatched closing group", 0));
                }
                let (closed, is_code) = stack.pop().unwrap();
                if is_code != wants_code {
                    return Err(CatError::bad_parse("mismatched group closer", 0));
                }
                let v = if is_code { Value::Code(closed) } else { Value::List(closed) };
                stack.last_mut().unwrap().0.rpush(v);
            }
            _ => unreachable!(),
        }
        return Ok(());
    }
    if let Some(v) = parse_token(tok)? {
        stack.last_mut().unwrap().0.rpush(v);
    }
    Ok(())
}

/// Parse a single source token into a `Value` (spec.md §4.6 "The handler
/// consumes each token"), or `None` for tokens that produce no value
/// (empty tokens, comments).
fn parse_token(tok: &[u8]) -> CatResult<Option<Value>> {
    if tok.is_empty() {
        return Ok(None);
    }
    match tok[0] {
        b'"' | b'\'' => {
            let (s, _consumed) = CatString::parse_quoted(tok)?;
            Ok(Some(Value::String(s)))
        }
        b'#' => Ok(None),
        b'\\' => Ok(Some(Value::Ident(CatString::from_bytes(tok)))),
        _ => {
            if is_operator_token(tok) {
                return Ok(Some(Value::Ident(CatString::from_bytes(tok))));
            }
            if let Some(v) = parse_number(tok) {
                return Ok(Some(v));
            }
            if is_identifier_token(tok) {
                return Ok(Some(Value::Ident(CatString::from_bytes(tok))));
            }
            Err(CatError::bad_parse(
                format!("invalid token '{}'", String::from_utf8_lossy(tok)),
                0,
            ))
        }
    }
}

fn is_operator_token(tok: &[u8]) -> bool {
    tok.len() == 1 && (is_op_char(tok[0]) || is_close_group_char(tok[0]))
}

fn is_identifier_token(tok: &[u8]) -> bool {
    let mut s = tok;
    while let Some((b'\\', rest)) = s.split_first() {
        s = rest;
    }
    let Some((&first, _)) = s.split_first() else { return false };
    if !(first.is_ascii_alphanumeric() || first == b'_' || first == b'.') {
        return false;
    }
    s[1..].iter().all(|&c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.' || is_op_char(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_flat_stream() {
        let toks = tokenize(b"foo 12").unwrap();
        assert_eq!(toks, vec![Value::Ident(CatString::from_bytes(b"foo")), Value::Int32(12)]);
    }

    #[test]
    fn nested_grouping_builds_tree() {
        // spec.md §8 scenario 6
        let tree = parse_tree(b"[ 1 ( 2 3 ) ]").unwrap();
        assert_eq!(tree.len(), 1);
        match &tree.as_slice()[0] {
            Value::Code(inner) => {
                assert_eq!(inner.as_slice()[0], Value::Int32(1));
                match &inner.as_slice()[1] {
                    Value::List(l) => assert_eq!(l.as_slice(), &[Value::Int32(2), Value::Int32(3)]),
                    other => panic!("expected nested list, got {other:?}"),
                }
            }
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_closer_is_bad_parse() {
        let err = parse_tree(b"[ 1 )").unwrap_err();
        assert_eq!(err.code_name(), "ERR_BADPARSE");
    }

    #[test]
    fn unclosed_group_is_bad_parse() {
        let err = parse_tree(b"[ 1").unwrap_err();
        assert_eq!(err.code_name(), "ERR_BADPARSE");
    }

    #[test]
    fn sign_after_digit_is_an_operator_not_part_of_the_number() {
        // disambiguates "3-4" as three tokens, not one malformed number.
        let toks = tokenize(b"3-4").unwrap();
        assert_eq!(toks, vec![Value::Int32(3), Value::Ident(CatString::from_bytes(b"-")), Value::Int32(4)]);
    }

    #[test]
    fn hash_starts_a_comment_terminated_by_newline() {
        let toks = tokenize(b"1 # a comment\n2").unwrap();
        assert_eq!(toks, vec![Value::Int32(1), Value::Int32(2)]);
    }

    #[test]
    fn quoted_strings_are_tokenized_whole_including_quotes() {
        let toks = tokenize(br#"foo "a b c" bar"#).unwrap();
        assert_eq!(
            toks,
            vec![
                Value::Ident(CatString::from_bytes(b"foo")),
                Value::String(CatString::from_bytes(b"a b c")),
                Value::Ident(CatString::from_bytes(b"bar")),
            ]
        );
    }
}
