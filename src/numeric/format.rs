//! Double -> decimal digit-string conversion and the format stage
//! (spec.md §4.4.3–4.4.4).
//!
//! Ported from the source's `_val_double_to_decimal` / `_val_num_dstring_*`
//! family: a double is first converted to an *exact* base-10 digit string
//! by repeated doubling (for a positive binary exponent) or halving (for a
//! negative one) of the 53-bit integer mantissa, then a single formatting
//! stage slices, rounds, and zero-extends that digit string for whichever
//! conversion was requested.

/// Printf-style formatting flags (spec.md §4.4.4 "Flags").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub alt: bool,
    pub zero: bool,
    pub left: bool,
    pub space: bool,
    pub plus: bool,
    pub squote: bool,
    pub binary: bool,
    pub pop: bool,
}

/// The sign character to emit, if any, for a value of the given sign.
pub fn sign_char(is_neg: bool, flags: Flags) -> Option<u8> {
    if is_neg {
        Some(b'-')
    } else if flags.plus {
        Some(b'+')
    } else if flags.space {
        Some(b' ')
    } else {
        None
    }
}

/// Number of bits in a double's significand, including the implicit leading bit.
const MANT_BITS: i32 = 53;

/// Decompose `val` into `(mantissa, exp)` with `0.5 <= |mantissa| < 1.0`
/// and `val == mantissa * 2^exp`, the way C's `frexp` does (`f64` has no
/// stdlib equivalent).
fn frexp(val: f64) -> (f64, i32) {
    if val == 0.0 || !val.is_finite() {
        return (val, 0);
    }
    let bits = val.to_bits();
    let sign = bits & (1 << 63);
    let biased_exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & 0x000f_ffff_ffff_ffff;
    if biased_exp == 0 {
        // Subnormal: normalize by re-biasing through a scaled multiply.
        let scaled = val * 2f64.powi(64);
        let (m, e) = frexp(scaled);
        return (m, e - 64);
    }
    let exp = biased_exp - 1022;
    let out_bits = sign | (1022u64 << 52) | frac;
    (f64::from_bits(out_bits), exp)
}

/// Convert `val` to an exact base-10 digit string plus the count of digits
/// left of the decimal point (spec.md §4.4.3). Digits are in `'0'..='9'`,
/// most-significant first; `val` must be finite and non-negative (the
/// caller handles sign separately).
pub fn double_to_decimal(val: f64) -> (Vec<u8>, usize) {
    if val == 0.0 {
        return (vec![b'0'], 1);
    }
    let (frac, e0) = frexp(val);
    let mut mantissa = (frac * (1i64 << MANT_BITS) as f64) as i64;
    let mut e = e0 - MANT_BITS;
    if mantissa < 0 {
        mantissa = -mantissa;
    }

    let mut digits: Vec<u8> = Vec::new();
    {
        let mut m = mantissa;
        while m != 0 {
            digits.push(b'0' + (m % 10) as u8);
            m /= 10;
        }
        if digits.is_empty() {
            digits.push(b'0');
        }
        digits.reverse();
    }

    while e > 0 {
        let mut carry = 0u32;
        for d in digits.iter_mut().rev() {
            let x = 2 * (*d - b'0') as u32 + carry;
            *d = b'0' + (x % 10) as u8;
            carry = x / 10;
        }
        if carry != 0 {
            digits.insert(0, b'0' + carry as u8);
        }
        e -= 1;
    }
    let mut int_digits = digits.len();

    while e < 0 {
        if digits.last().map(|d| (*d - b'0') % 2 == 1).unwrap_or(false) {
            digits.push(b'0');
        }
        let mut borrow = 0u32;
        if digits[0] < b'2' {
            borrow = ((digits[0] - b'0') % 2) as u32;
            digits.remove(0);
            int_digits -= 1;
        }
        for d in digits.iter_mut() {
            let x = borrow * 10 + (*d - b'0') as u32;
            *d = b'0' + (x / 2) as u8;
            borrow = x % 2;
        }
        e += 1;
    }

    (digits, int_digits)
}

/// Round `digits` to `trunc` digits using nearest-half-even rounding;
/// returns whether a carry propagated off the most significant digit
/// (meaning the caller must prepend a `'1'` and bump the exponent/sep).
pub fn dstring_round_nhe(digits: &mut Vec<u8>, trunc: usize) -> bool {
    if trunc >= digits.len() {
        return false;
    }
    let round_up = digits[trunc] > b'5'
        || (digits[trunc] == b'5'
            && ((trunc > 0 && (digits[trunc - 1] - b'0') % 2 == 1)
                || digits[trunc + 1..].iter().any(|&d| d != b'0')));
    digits.truncate(trunc);
    if !round_up {
        return false;
    }
    if trunc == 0 {
        return true;
    }
    let mut i = trunc;
    loop {
        if i == 0 {
            return true;
        }
        i -= 1;
        if digits[i] == b'9' {
            digits[i] = b'0';
        } else {
            digits[i] += 1;
            return false;
        }
    }
}

/// Render a non-negative decimal digit string (`digits[..int_digits]` is
/// the integer part) as `f`/`e`/`E`/`g`/`G`/`q`/`Q` per spec.md §4.4.4,
/// given the conversion has already selected precision, rounding point,
/// and separator placement the way `_val_double_fprintf` computes them.
fn render_digits(mut digits: Vec<u8>, sep_index: i32, round_to: usize, extend_to: usize, exp: i32, conv: char, flags: Flags) -> String {
    let carried = dstring_round_nhe(&mut digits, round_to);
    let mut sep_index = sep_index;
    let mut exp = exp;
    if carried {
        digits.insert(0, b'1');
        if conv == 'e' || conv == 'E' {
            exp += 1;
        } else {
            sep_index += 1;
        }
    }
    while sep_index <= 0 {
        digits.insert(0, b'0');
        sep_index += 1;
    }
    while digits.len() < extend_to {
        digits.push(b'0');
    }

    let sep_index = sep_index as usize;
    let mut out = String::new();
    if sep_index == 0 || sep_index > digits.len() || (sep_index == digits.len() && !flags.alt) {
        out.push_str(std::str::from_utf8(&digits).unwrap());
    } else {
        out.push_str(std::str::from_utf8(&digits[..sep_index]).unwrap());
        out.push('.');
        out.push_str(std::str::from_utf8(&digits[sep_index..]).unwrap());
    }
    if conv == 'e' || conv == 'E' {
        out.push(conv);
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.abs()));
    }
    out
}

/// Format a finite double per one of `f e E g G q Q` (spec.md §4.4.4).
/// `precision` defaults to 6 as in the source when absent.
pub fn format_double(val: f64, conv: char, precision: Option<i32>, flags: Flags) -> String {
    let sign = sign_char(val.is_sign_negative(), flags);
    let prefix = |body: String| match sign {
        Some(c) => format!("{}{}", c as char, body),
        None => body,
    };

    if val.is_nan() {
        return prefix("nan".to_string());
    }
    if !val.is_finite() {
        return prefix("inf".to_string());
    }

    let magnitude = val.abs();
    let (digits, int_digits) = double_to_decimal(magnitude);
    let prec = precision.unwrap_or(6).max(0) as usize;

    match conv {
        'f' => prefix(render_digits(digits, int_digits as i32, int_digits + prec, int_digits + prec, 0, 'f', flags)),
        'e' | 'E' => {
            let mut first = 0;
            while first < digits.len() && digits[first] == b'0' {
                first += 1;
            }
            let exp = if first == digits.len() { 0 } else { int_digits as i32 - first as i32 - 1 };
            let rest: Vec<u8> = digits[first.min(digits.len())..].to_vec();
            prefix(render_digits(rest, 1, 1 + prec, 1 + prec, exp, conv, flags))
        }
        'q' | 'Q' => {
            let e_conv = if conv == 'q' { 'e' } else { 'E' };
            let mut first = 0;
            while first < digits.len() && digits[first] == b'0' {
                first += 1;
            }
            let exp = if first == digits.len() { 0 } else { int_digits as i32 - first as i32 - 1 };
            let lhs = if exp >= 0 { exp.rem_euclid(3) + 1 } else { (exp + 1).rem_euclid(3) + 3 };
            let rest: Vec<u8> = digits[first.min(digits.len())..].to_vec();
            prefix(render_digits(rest, lhs, (lhs + prec as i32) as usize, (lhs + prec as i32) as usize, exp - (lhs - 1), e_conv, flags))
        }
        'g' | 'G' => {
            let prec = prec.max(1);
            let mut rounded = digits.clone();
            let mut int_digits = int_digits as i32;
            let mut exp;
            {
                let mut first = 0;
                while first < rounded.len() && rounded[first] == b'0' {
                    first += 1;
                }
                exp = if first == rounded.len() { 0 } else { int_digits - first as i32 - 1 };
            }
            if rounded.len() > prec {
                let carried = dstring_round_nhe(&mut rounded, prec);
                if carried {
                    rounded.insert(0, b'1');
                    int_digits += 1;
                    exp += 1;
                }
            }
            let e_conv = if conv == 'g' { 'e' } else { 'E' };
            if exp < -4 || exp >= prec as i32 {
                prefix(render_digits(rounded, 1, prec, 1, exp, e_conv, flags))
            } else {
                prefix(render_digits(rounded, int_digits, prec, int_digits.max(0) as usize, 0, 'f', flags))
            }
        }
        _ => prefix(render_digits(digits, int_digits as i32, int_digits + prec, int_digits + prec, 0, 'f', flags)),
    }
}

/// Format a finite double as a hex float (`%a`/`%A`, spec.md §4.4.4),
/// ported from `_val_double_to_hex`: `0x1.hhhp±d` with the leading hex
/// digit always `1` (or `2` if explicit-precision rounding carries) for
/// a normalized non-zero input.
pub fn format_hex_double(val: f64, conv: char, precision: Option<i32>, flags: Flags) -> (Option<u8>, String) {
    let sign = sign_char(val.is_sign_negative(), flags);
    let prefix = conv == 'A';
    let pchar = if prefix { 'P' } else { 'p' };
    let digit_char = |d: u32| -> char {
        if d < 10 {
            (b'0' + d as u8) as char
        } else if prefix {
            (b'A' + (d - 10) as u8) as char
        } else {
            (b'a' + (d - 10) as u8) as char
        }
    };

    let magnitude = val.abs();
    if magnitude == 0.0 {
        let mut out = String::from(if prefix { "0X0" } else { "0x0" });
        if precision.unwrap_or(0) > 0 || flags.alt {
            out.push('.');
            for _ in 0..precision.unwrap_or(0) {
                out.push('0');
            }
        }
        out.push(pchar);
        out.push_str("+0");
        return (sign, out);
    }

    let (frac, mut e) = frexp(magnitude);
    let mut m = frac * 2.0;
    e -= 1;

    if let Some(p) = precision {
        let scale = (1u64 << (p.max(0) * 4)) as f64;
        m = (m * scale).round() / scale;
    }

    let h = m.trunc();
    let mut frac_part = m - h;
    let mut out = String::from(if prefix { "0X" } else { "0x" });
    out.push((b'0' + h as u8) as char);

    let want_frac_digits = precision.is_some() || flags.alt || frac_part != 0.0;
    if want_frac_digits {
        out.push('.');
        match precision {
            Some(p) => {
                for _ in 0..p {
                    frac_part *= 16.0;
                    let d = frac_part.trunc() as u32;
                    frac_part -= d as f64;
                    out.push(digit_char(d));
                }
            }
            None => {
                while frac_part != 0.0 {
                    frac_part *= 16.0;
                    let d = frac_part.trunc() as u32;
                    frac_part -= d as f64;
                    out.push(digit_char(d));
                }
            }
        }
    }
    out.push(pchar);
    out.push_str(&format!("{:+}", e));
    (sign, out)
}

/// Format an integer conversion (`d i o u x X`, spec.md §4.4.4).
pub fn format_int(val: i64, conv: char, precision: Option<i32>, flags: Flags) -> String {
    let neg = val < 0;
    let mag = val.unsigned_abs();
    let prec = precision.filter(|&p| p >= 0).map(|p| p as usize);

    let mut digits = match conv {
        'o' => {
            if mag == 0 { vec![b'0'] } else { to_radix(mag, 8) }
        }
        'x' | 'X' => {
            if mag == 0 { vec![b'0'] } else { to_radix_case(mag, 16, conv == 'X') }
        }
        _ => {
            if mag == 0 { vec![b'0'] } else { to_radix(mag, 10) }
        }
    };
    if let Some(p) = prec {
        while digits.len() < p {
            digits.insert(0, b'0');
        }
        if p == 0 && mag == 0 {
            digits.clear();
        }
    }
    if conv == 'x' || conv == 'X' {
        if flags.alt && mag != 0 {
            let prefix = if conv == 'x' { "0x" } else { "0X" };
            digits = prefix.bytes().chain(digits).collect();
        }
    } else if conv == 'o' && flags.alt && (digits.is_empty() || digits[0] != b'0') {
        digits.insert(0, b'0');
    }

    let sign = sign_char(neg, flags);
    match sign {
        Some(c) => format!("{}{}", c as char, std::str::from_utf8(&digits).unwrap()),
        None => std::str::from_utf8(&digits).unwrap().to_string(),
    }
}

fn to_radix(mut val: u64, radix: u64) -> Vec<u8> {
    let mut out = Vec::new();
    while val != 0 {
        out.push(b'0' + (val % radix) as u8);
        val /= radix;
    }
    out.reverse();
    out
}

fn to_radix_case(mut val: u64, radix: u64, upper: bool) -> Vec<u8> {
    let mut out = Vec::new();
    while val != 0 {
        let d = (val % radix) as u8;
        out.push(if d < 10 { b'0' + d } else if upper { b'A' + d - 10 } else { b'a' + d - 10 });
        val /= radix;
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_to_decimal_handles_zero() {
        assert_eq!(double_to_decimal(0.0), (vec![b'0'], 1));
    }

    #[test]
    fn double_to_decimal_round_trips_small_integer() {
        let (digits, int_digits) = double_to_decimal(1234.0);
        assert_eq!(int_digits, 4);
        assert_eq!(std::str::from_utf8(&digits).unwrap(), "1234");
    }

    #[test]
    fn double_to_decimal_handles_fraction() {
        let (digits, int_digits) = double_to_decimal(15.5);
        assert_eq!(int_digits, 2);
        assert_eq!(std::str::from_utf8(&digits).unwrap(), "155");
    }

    #[test]
    fn engineering_format_matches_scenario() {
        // spec.md §8 scenario 5
        assert_eq!(format_double(1234.0, 'q', Some(3), Flags::default()), "1.234e+03");
    }

    #[test]
    fn hex_float_format_matches_scenario() {
        // spec.md §8 scenario 4
        let (sign, body) = format_hex_double(15.5, 'a', None, Flags::default());
        assert_eq!(sign, None);
        assert_eq!(body, "0x1.fp+3");
    }

    #[test]
    fn fixed_format_default_precision() {
        assert_eq!(format_double(3.5, 'f', None, Flags::default()), "3.500000");
    }

    #[test]
    fn format_int_plain_decimal() {
        assert_eq!(format_int(-42, 'd', None, Flags::default()), "-42");
        assert_eq!(format_int(42, 'd', None, Flags { plus: true, ..Default::default() }), "+42");
    }

    #[test]
    fn format_int_hex_alt_prefix() {
        assert_eq!(format_int(255, 'x', None, Flags { alt: true, ..Default::default() }), "0xff");
        assert_eq!(format_int(255, 'X', None, Flags { alt: true, ..Default::default() }), "0XFF");
    }

    #[test]
    fn dstring_round_nhe_rounds_half_to_even() {
        let mut d = b"125".to_vec();
        let carry = dstring_round_nhe(&mut d, 2);
        assert!(!carry);
        assert_eq!(d, b"12");
    }
}
