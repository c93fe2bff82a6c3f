//! The parser VM: `eval` and `validate` over a [`Rules`] table (spec.md §4.5.4–4.5.5).

use super::rules::{Op, Rules};

/// Resumable parse position, sufficient to continue tokenizing the next
/// chunk with no loss (spec.md §4.5.4 "Resumable").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseState {
    pub state: usize,
    /// Offset (within the *overall* logical stream) where the in-progress token began.
    pub tok_start: usize,
}

/// Outcome of a validator-only run (spec.md §4.5.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateOutcome {
    ReachedFin,
    ParseError { offset: usize },
    EndOfInput { state: usize },
}

/// Run the shorter validator loop: no handler calls, just whether the
/// input reaches `fin_state`.
pub fn validate(rules: &Rules, input: &[u8], start_state: Option<usize>) -> ValidateOutcome {
    let mut state = start_state.unwrap_or(rules.init_state);
    for (i, &b) in input.iter().enumerate() {
        let class = (rules.classify)(b);
        let (op, next_state) = rules.entry(state, class);
        match op {
            None | Some(Op::Err) => return ValidateOutcome::ParseError { offset: i },
            Some(_) => {
                state = next_state;
                if state == rules.fin_state {
                    return ValidateOutcome::ReachedFin;
                }
            }
        }
    }
    ValidateOutcome::EndOfInput { state }
}

/// Result of one `eval` call: the tokens emitted and, if more input is
/// expected, the state to resume from.
#[derive(Debug)]
pub struct EvalResult {
    pub tokens: Vec<(usize, usize)>,
    pub resume: Option<ParseState>,
}

/// Error raised by `eval`: either a structural parse error, or a handler
/// requesting early abort by returning a non-zero code (spec.md §4.5.4
/// "Handler may return non-zero to abort evaluation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    ParseError { offset: usize },
    HandlerAbort { code: i32 },
}

/// Tokenize `input`, calling `handler(start, end)` for each split token
/// (empty tokens are suppressed). `base_offset` lets a resumed call report
/// token offsets relative to the logical start of the whole stream rather
/// than this chunk.
///
/// `tail_handler`, if present, is invoked with the residual
/// `[tok_start, end)` range when end-of-input is reached in a non-final,
/// non-empty-residual state (spec.md §4.5.4's "end-of-input" clause).
pub fn eval(
    rules: &Rules,
    input: &[u8],
    base_offset: usize,
    resume: Option<ParseState>,
    mut handler: impl FnMut(usize, usize) -> Result<(), i32>,
    tail_handler: Option<&mut dyn FnMut(usize, usize) -> Result<(), i32>>,
) -> Result<EvalResult, EvalError> {
    let mut state = resume.map(|r| r.state).unwrap_or(rules.init_state);
    let mut tok_start = resume.map(|r| r.tok_start).unwrap_or(base_offset);
    let mut tokens = Vec::new();

    let mut emit = |start: usize, end: usize, handler: &mut dyn FnMut(usize, usize) -> Result<(), i32>| -> Result<(), EvalError> {
        if start < end {
            handler(start, end).map_err(|code| EvalError::HandlerAbort { code })?;
            tokens.push((start, end));
        }
        Ok(())
    };

    for (i, &b) in input.iter().enumerate() {
        let pos = base_offset + i;
        let class = (rules.classify)(b);
        let (op, next_state) = rules.entry(state, class);
        match op {
            None | Some(Op::Err) => return Err(EvalError::ParseError { offset: pos }),
            Some(Op::NoSplit) => {}
            Some(Op::SplitBefore) => {
                emit(tok_start, pos, &mut handler)?;
                tok_start = pos;
            }
            Some(Op::SplitAfter) => {
                emit(tok_start, pos + 1, &mut handler)?;
                tok_start = pos + 1;
            }
            Some(Op::SplitSkip) => {
                emit(tok_start, pos, &mut handler)?;
                tok_start = pos + 1;
            }
        }
        state = next_state;
        if state == rules.fin_state {
            return Ok(EvalResult { tokens, resume: None });
        }
    }

    let end = base_offset + input.len();
    if tok_start == end {
        return Ok(EvalResult { tokens, resume: None });
    }
    match tail_handler {
        Some(th) => {
            emit(tok_start, end, th)?;
            Ok(EvalResult { tokens, resume: None })
        }
        None => Ok(EvalResult { tokens, resume: Some(ParseState { state, tok_start }) }),
    }
}
