//! Error taxonomy shared by every fallible operation in this crate.
//!
//! Mirrors the closed, negative-integer error enumeration described in
//! `spec.md` §6.5 / §7 (itself grounded on `err_t` in the original C
//! implementation's `vm_err.c`): every error has a stable symbolic name
//! and a human-readable string, and `ERR_THROW`/`ERR_USER_THROW` mean
//! "an exception value is already on the caller's value stack" rather
//! than carrying their own payload.
//!
//! Propagation rule (spec.md §7): a function must not translate one
//! error code into another except to upgrade to `Fatal`, or to raise
//! `Throw` when control crosses from this substrate into a host VM.

use std::fmt;

/// A parse error's position within the input, for user-visible diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the parse.
    pub offset: usize,
}

impl Position {
    pub const fn new(offset: usize) -> Self {
        Position { offset }
    }
}

/// The closed error taxonomy from spec.md §7.
#[derive(Debug, Clone, PartialEq)]
pub enum CatError {
    /// Malformed input to a tokenizer, number parser, or quoted-string parser.
    BadParse { message: String, position: Option<Position> },
    /// A backslash escape sequence could not be decoded.
    BadEscape { message: String },
    /// An operation received a value of the wrong variant.
    BadType { message: String },
    /// An operation received arguments it cannot act on (bad flags, bad width, ...).
    BadArgs { message: String },
    /// A `printf`/argument-stream consumer ran out of arguments.
    MissingArgs,
    /// Allocation failed.
    Malloc,
    /// An I/O operation failed.
    Io { message: String },
    /// End of input reached where more was required.
    Eof,
    /// The operation is not implemented by this substrate (host's job).
    NotImplemented { what: String },
    /// An internal invariant was violated.
    Assert { message: String },
    /// An exception value is already on the caller's stack (substrate -> host transition).
    Throw,
    /// As `Throw`, but raised directly by user code rather than this substrate.
    UserThrow,
    /// Non-recoverable; the current evaluation must terminate.
    Fatal { message: String },
}

impl CatError {
    /// The negative numeric code used by `spec.md` §6.5 ("0 = success").
    pub fn code(&self) -> i32 {
        match self {
            CatError::BadParse { .. } => -1,
            CatError::BadEscape { .. } => -2,
            CatError::BadType { .. } => -3,
            CatError::BadArgs { .. } => -4,
            CatError::MissingArgs => -5,
            CatError::Malloc => -6,
            CatError::Io { .. } => -7,
            CatError::Eof => -8,
            CatError::NotImplemented { .. } => -9,
            CatError::Assert { .. } => -10,
            CatError::Throw => -11,
            CatError::UserThrow => -12,
            CatError::Fatal { .. } => -13,
        }
    }

    /// Stable symbolic name, e.g. `"ERR_BADPARSE"`.
    pub fn code_name(&self) -> &'static str {
        match self {
            CatError::BadParse { .. } => "ERR_BADPARSE",
            CatError::BadEscape { .. } => "ERR_BADESCAPE",
            CatError::BadType { .. } => "ERR_BADTYPE",
            CatError::BadArgs { .. } => "ERR_BADARGS",
            CatError::MissingArgs => "ERR_MISSINGARGS",
            CatError::Malloc => "ERR_MALLOC",
            CatError::Io { .. } => "ERR_IO",
            CatError::Eof => "ERR_EOF",
            CatError::NotImplemented { .. } => "ERR_NOT_IMPLEMENTED",
            CatError::Assert { .. } => "ERR_ASSERT",
            CatError::Throw => "ERR_THROW",
            CatError::UserThrow => "ERR_USER_THROW",
            CatError::Fatal { .. } => "ERR_FATAL",
        }
    }

    /// Look up an error variant by its `code()`, for the printf `%m` conversion.
    ///
    /// Variants that carry a message are reconstructed with an empty message.
    pub fn from_code(code: i32) -> Option<CatError> {
        Some(match code {
            -1 => CatError::BadParse { message: String::new(), position: None },
            -2 => CatError::BadEscape { message: String::new() },
            -3 => CatError::BadType { message: String::new() },
            -4 => CatError::BadArgs { message: String::new() },
            -5 => CatError::MissingArgs,
            -6 => CatError::Malloc,
            -7 => CatError::Io { message: String::new() },
            -8 => CatError::Eof,
            -9 => CatError::NotImplemented { what: String::new() },
            -10 => CatError::Assert { message: String::new() },
            -11 => CatError::Throw,
            -12 => CatError::UserThrow,
            -13 => CatError::Fatal { message: String::new() },
            _ => return None,
        })
    }

    /// Look up an error variant by its `code_name()`, for the printf `%m` conversion.
    ///
    /// Variants that carry a message are reconstructed with an empty message,
    /// since the name alone does not recover the original detail.
    pub fn from_code_name(name: &str) -> Option<CatError> {
        Some(match name {
            "ERR_BADPARSE" => CatError::BadParse { message: String::new(), position: None },
            "ERR_BADESCAPE" => CatError::BadEscape { message: String::new() },
            "ERR_BADTYPE" => CatError::BadType { message: String::new() },
            "ERR_BADARGS" => CatError::BadArgs { message: String::new() },
            "ERR_MISSINGARGS" => CatError::MissingArgs,
            "ERR_MALLOC" => CatError::Malloc,
            "ERR_IO" => CatError::Io { message: String::new() },
            "ERR_EOF" => CatError::Eof,
            "ERR_NOT_IMPLEMENTED" => CatError::NotImplemented { what: String::new() },
            "ERR_ASSERT" => CatError::Assert { message: String::new() },
            "ERR_THROW" => CatError::Throw,
            "ERR_USER_THROW" => CatError::UserThrow,
            "ERR_FATAL" => CatError::Fatal { message: String::new() },
            _ => return None,
        })
    }

    /// Human-readable message, as would be produced by the printf `%m` conversion.
    pub fn message(&self) -> String {
        match self {
            CatError::BadParse { message, position } => match position {
                Some(p) => format!("parse error at byte {}: {message}", p.offset),
                None => format!("parse error: {message}"),
            },
            CatError::BadEscape { message } => format!("bad escape sequence: {message}"),
            CatError::BadType { message } => format!("wrong value type: {message}"),
            CatError::BadArgs { message } => format!("bad arguments: {message}"),
            CatError::MissingArgs => "missing arguments".to_string(),
            CatError::Malloc => "allocation failed".to_string(),
            CatError::Io { message } => format!("I/O error: {message}"),
            CatError::Eof => "unexpected end of input".to_string(),
            CatError::NotImplemented { what } => format!("not implemented: {what}"),
            CatError::Assert { message } => format!("assertion failed: {message}"),
            CatError::Throw => "exception".to_string(),
            CatError::UserThrow => "user exception".to_string(),
            CatError::Fatal { message } => format!("fatal: {message}"),
        }
    }

    /// Whether this error is non-recoverable (spec.md §6.5).
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatError::Fatal { .. })
    }

    pub fn bad_parse(message: impl Into<String>, position: usize) -> CatError {
        CatError::BadParse { message: message.into(), position: Some(Position::new(position)) }
    }
}

impl fmt::Display for CatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CatError {}

pub type CatResult<T> = Result<T, CatError>;
