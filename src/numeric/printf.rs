//! The `printf` spec parser and argument-stream driver (spec.md §4.4.5).
//!
//! Ported from `_val_printf_parse`/`val_printfv`: the format string is
//! re-parsed top to bottom on every call rather than compiled once, since
//! the strings involved are short and this keeps the two-list argument
//! mode (a value list plus a separate format list for `*` width/precision
//! and `%m$` indexed args) simple to drive.

use crate::error::{CatError, CatResult};
use crate::value::Value;

use super::format::{format_double, format_hex_double, format_int, Flags};

/// One parsed directive: either a literal run of bytes, or a conversion
/// spec plus the argument indices it consumes (spec.md §4.4.5's token
/// grammar: `literal_run | {spec, value_index, precision_index,
/// field_width_index}`).
#[derive(Debug, Clone)]
pub enum Token {
    Literal(Vec<u8>),
    Conv(ConvSpec),
}

#[derive(Debug, Clone, Default)]
pub struct ConvSpec {
    pub flags: Flags,
    /// Field width: a literal value, or `None` with `width_from_arg` set.
    pub width: Option<i32>,
    pub width_from_arg: bool,
    /// 1-based index into the format list for an indexed `%*m$` width.
    pub width_arg_index: Option<usize>,
    pub precision: Option<i32>,
    pub precision_from_arg: bool,
    pub precision_arg_index: Option<usize>,
    /// 1-based index into the value list for an indexed `%m$` argument;
    /// `None` means "pop the next value implicitly".
    pub value_arg_index: Option<usize>,
    pub conversion: char,
}

/// Parse the next directive out of `fmt` starting at `pos`. Returns the
/// token and the position just past it.
fn parse_one(fmt: &[u8], mut pos: usize) -> CatResult<(Token, usize)> {
    if fmt[pos] != b'%' {
        let start = pos;
        while pos < fmt.len() && fmt[pos] != b'%' {
            pos += 1;
        }
        return Ok((Token::Literal(fmt[start..pos].to_vec()), pos));
    }

    pos += 1; // consume '%'
    if pos >= fmt.len() {
        return Err(CatError::BadEscape { message: "dangling '%' at end of format string".into() });
    }

    let mut spec = ConvSpec::default();

    // Optional leading "N$" positional index for the value argument.
    if let Some((n, next)) = take_digits(fmt, pos) {
        if next < fmt.len() && fmt[next] == b'$' {
            spec.value_arg_index = Some(n);
            pos = next + 1;
        }
    }

    // Flags.
    loop {
        if pos >= fmt.len() {
            return Err(CatError::BadEscape { message: "truncated format spec".into() });
        }
        match fmt[pos] {
            b'#' => spec.flags.alt = true,
            b'0' => spec.flags.zero = true,
            b'-' => spec.flags.left = true,
            b' ' => spec.flags.space = true,
            b'+' => spec.flags.plus = true,
            b'\'' => spec.flags.squote = true,
            b'b' => spec.flags.binary = true,
            b'_' => spec.flags.pop = true,
            _ => break,
        }
        pos += 1;
    }

    // Width.
    if pos < fmt.len() && fmt[pos] == b'*' {
        pos += 1;
        spec.width_from_arg = true;
        if let Some((n, next)) = take_digits(fmt, pos) {
            if next < fmt.len() && fmt[next] == b'$' {
                spec.width_arg_index = Some(n);
                pos = next + 1;
            }
        }
    } else if let Some((n, next)) = take_digits(fmt, pos) {
        spec.width = Some(n as i32);
        pos = next;
    }

    // Precision.
    if pos < fmt.len() && fmt[pos] == b'.' {
        pos += 1;
        if pos < fmt.len() && fmt[pos] == b'*' {
            pos += 1;
            spec.precision_from_arg = true;
            if let Some((n, next)) = take_digits(fmt, pos) {
                if next < fmt.len() && fmt[next] == b'$' {
                    spec.precision_arg_index = Some(n);
                    pos = next + 1;
                }
            }
        } else if let Some((n, next)) = take_digits(fmt, pos) {
            spec.precision = Some(n as i32);
            pos = next;
        } else {
            spec.precision = Some(0);
        }
    }

    // Length modifiers: parsed but semantically inert (spec.md §4.4.4).
    while pos < fmt.len() && matches!(fmt[pos], b'h' | b'l' | b'L' | b'j' | b'z' | b't') {
        pos += 1;
    }

    if pos >= fmt.len() {
        return Err(CatError::BadEscape { message: "format spec missing conversion character".into() });
    }
    spec.conversion = fmt[pos] as char;
    pos += 1;

    Ok((Token::Conv(spec), pos))
}

fn take_digits(fmt: &[u8], pos: usize) -> Option<(usize, usize)> {
    let start = pos;
    let mut p = pos;
    while p < fmt.len() && fmt[p].is_ascii_digit() {
        p += 1;
    }
    if p == start {
        None
    } else {
        let n: usize = std::str::from_utf8(&fmt[start..p]).unwrap().parse().ok()?;
        Some((n, p))
    }
}

/// Tokenize an entire format string (spec.md §4.4.5).
pub fn parse(fmt: &[u8]) -> CatResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < fmt.len() {
        let (tok, next) = parse_one(fmt, pos)?;
        tokens.push(tok);
        pos = next;
    }
    Ok(tokens)
}

/// An argument source: either a simple forward-only cursor over a single
/// list (C-variadic mode), or (spec.md §4.4.5) a pair of cursors over a
/// value list and a format list, where `%m$`/`%*m$` indexing inhibits the
/// implicit pop.
pub struct Args<'a> {
    values: &'a [Value],
    value_cursor: usize,
    formats: &'a [Value],
    format_cursor: usize,
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Args { values, value_cursor: 0, formats: values, format_cursor: 0 }
    }

    pub fn with_format_list(values: &'a [Value], formats: &'a [Value]) -> Self {
        Args { values, value_cursor: 0, formats, format_cursor: 0 }
    }

    fn take_value(&mut self, index: Option<usize>) -> CatResult<&'a Value> {
        match index {
            Some(i) => self.values.get(i - 1).ok_or(CatError::MissingArgs),
            None => {
                let v = self.values.get(self.value_cursor).ok_or(CatError::MissingArgs)?;
                self.value_cursor += 1;
                Ok(v)
            }
        }
    }

    fn take_format_int(&mut self, index: Option<usize>) -> CatResult<i32> {
        let v = match index {
            Some(i) => self.formats.get(i - 1).ok_or(CatError::MissingArgs)?,
            None => {
                let v = self.formats.get(self.format_cursor).ok_or(CatError::MissingArgs)?;
                self.format_cursor += 1;
                v
            }
        };
        match v {
            Value::Int32(n) => Ok(*n),
            Value::Double(d) => Ok(*d as i32),
            _ => Err(CatError::BadType { message: "expected a numeric width/precision argument".into() }),
        }
    }
}

fn value_as_i64(v: &Value) -> CatResult<i64> {
    match v {
        Value::Int32(n) => Ok(*n as i64),
        Value::Double(d) => Ok(*d as i64),
        _ => Err(CatError::BadType { message: "expected a numeric argument".into() }),
    }
}

fn value_as_f64(v: &Value) -> CatResult<f64> {
    match v {
        Value::Int32(n) => Ok(*n as f64),
        Value::Double(d) => Ok(*d),
        _ => Err(CatError::BadType { message: "expected a numeric argument".into() }),
    }
}

/// Apply left/right padding per the spec's width/flags semantics.
fn pad(mut body: String, width: i32, flags: Flags) -> String {
    let width = width.unsigned_abs() as usize;
    if body.len() >= width {
        return body;
    }
    let fill = if flags.zero && !flags.left { '0' } else { ' ' };
    let padding: String = std::iter::repeat(fill).take(width - body.len()).collect();
    if flags.left {
        body.push_str(&padding);
        body
    } else if fill == '0' && (body.starts_with('-') || body.starts_with('+')) {
        let (sign, rest) = body.split_at(1);
        format!("{sign}{padding}{rest}")
    } else {
        format!("{padding}{body}")
    }
}

/// Render `fmt` against `args`, producing the final formatted bytes
/// (spec.md §4.4.5).
pub fn render(fmt: &[u8], args: &mut Args) -> CatResult<Vec<u8>> {
    let tokens = parse(fmt)?;
    let mut out = Vec::new();
    let mut produced = 0usize;

    for tok in tokens {
        match tok {
            Token::Literal(bytes) => {
                out.extend_from_slice(&bytes);
                produced += bytes.len();
            }
            Token::Conv(spec) => {
                let width = if spec.width_from_arg {
                    Some(args.take_format_int(spec.width_arg_index)?)
                } else {
                    spec.width
                };
                let precision = if spec.precision_from_arg {
                    Some(args.take_format_int(spec.precision_arg_index)?)
                } else {
                    spec.precision
                };

                let rendered = match spec.conversion {
                    '%' => "%".to_string(),
                    '_' => {
                        args.take_value(spec.value_arg_index)?;
                        String::new()
                    }
                    'n' => produced.to_string(),
                    'c' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        let n = value_as_i64(v)?;
                        (n as u8 as char).to_string()
                    }
                    's' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        match v {
                            Value::String(s) | Value::Ident(s) => String::from_utf8_lossy(s.as_bytes()).into_owned(),
                            other => other.type_name().to_string(),
                        }
                    }
                    'v' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        let mut s = String::new();
                        v.print(&mut s, false);
                        s
                    }
                    'V' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        let mut s = String::new();
                        v.print(&mut s, true);
                        s
                    }
                    'm' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        let code = value_as_i64(v)? as i32;
                        match CatError::from_code(code) {
                            Some(e) => e.message(),
                            None => format!("unknown error code {code}"),
                        }
                    }
                    'd' | 'i' | 'o' | 'u' | 'x' | 'X' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        format_int(value_as_i64(v)?, spec.conversion, precision, spec.flags)
                    }
                    'f' | 'e' | 'E' | 'g' | 'G' | 'q' | 'Q' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        format_double(value_as_f64(v)?, spec.conversion, precision, spec.flags)
                    }
                    'a' | 'A' => {
                        let v = args.take_value(spec.value_arg_index)?;
                        let (sign, body) = format_hex_double(value_as_f64(v)?, spec.conversion, precision, spec.flags);
                        match sign {
                            Some(c) => format!("{}{}", c as char, body),
                            None => body,
                        }
                    }
                    other => {
                        return Err(CatError::BadEscape { message: format!("unsupported conversion '{other}'") });
                    }
                };

                let padded = match width {
                    Some(w) => pad(rendered, w, spec.flags),
                    None => rendered,
                };
                produced += padded.len();
                out.extend_from_slice(padded.as_bytes());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_literal_and_percent_escape() {
        let mut args = Args::new(&[]);
        assert_eq!(render(b"100%%", &mut args).unwrap(), b"100%");
    }

    #[test]
    fn renders_decimal_and_string_args_in_order() {
        let values = vec![Value::Int32(7), Value::String(crate::string::CatString::from_str("hi"))];
        let mut args = Args::new(&values);
        assert_eq!(render(b"n=%d s=%s", &mut args).unwrap(), b"n=7 s=hi");
    }

    #[test]
    fn indexed_argument_inhibits_implicit_pop() {
        let values = vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)];
        let mut args = Args::new(&values);
        // %2$d explicitly selects index 2 (1-based); %d afterwards still
        // pops from the untouched implicit cursor, starting at index 0.
        assert_eq!(render(b"%2$d-%d", &mut args).unwrap(), b"2-1");
    }

    #[test]
    fn star_width_is_drawn_from_the_format_list() {
        let values = vec![Value::Int32(5)];
        let formats = vec![Value::Int32(4)];
        let mut args = Args::with_format_list(&values, &formats);
        assert_eq!(render(b"%*d", &mut args).unwrap(), b"   5");
    }

    #[test]
    fn precision_controls_float_digits() {
        let values = vec![Value::Double(1234.0)];
        let mut args = Args::new(&values);
        assert_eq!(render(b"%.3q", &mut args).unwrap(), b"1.234e+03");
    }

    #[test]
    fn missing_argument_is_an_error() {
        let mut args = Args::new(&[]);
        assert!(matches!(render(b"%d", &mut args), Err(CatError::MissingArgs)));
    }

    #[test]
    fn raw_value_conversion_prints_string_unquoted() {
        let values = vec![Value::String(crate::string::CatString::from_str("hi\nthere"))];
        let mut args = Args::new(&values);
        assert_eq!(render(b"%v", &mut args).unwrap(), b"hi\nthere");
    }

    #[test]
    fn verbose_value_conversion_quotes_and_escapes_string() {
        let values = vec![Value::String(crate::string::CatString::from_str("hi\nthere"))];
        let mut args = Args::new(&values);
        assert_eq!(render(b"%V", &mut args).unwrap(), b"\"hi\\nthere\"");
    }

    #[test]
    fn value_conversions_agree_on_numbers() {
        let values = vec![Value::Int32(42), Value::Int32(42)];
        let mut args = Args::new(&values);
        assert_eq!(render(b"%v %V", &mut args).unwrap(), b"42 42");
    }

    #[test]
    fn verbose_value_conversion_recurses_into_lists() {
        let inner = vec![Value::String(crate::string::CatString::from_str("a"))];
        let values = vec![Value::List(crate::list::CatList::from_vec(inner))];
        let mut args = Args::new(&values);
        assert_eq!(render(b"%V", &mut args).unwrap(), b"(\"a\")");
    }

    #[test]
    fn error_conversion_looks_up_message_by_code() {
        let values = vec![Value::Int32(-8)];
        let mut args = Args::new(&values);
        let out = render(b"%m", &mut args).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "unexpected end of input");
    }
}
