//! Table-driven parser VM (spec.md §4.5): a generic rule-table/dispatch
//! layer (`rules`, `vm`) plus the concrete concatenative source grammar
//! built on top of it (`source`).

pub mod rules;
pub mod source;
pub mod vm;

pub use rules::{Op, Rules};
pub use source::{parse_tree, tokenize};
pub use vm::{eval, validate, EvalError, EvalResult, ParseState, ValidateOutcome};
