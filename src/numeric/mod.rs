//! Numeric parsing, formatting, and the `printf`-style engine (spec.md §4.4).

pub mod format;
pub mod parse;
pub mod printf;
