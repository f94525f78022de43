//! Format verbs: `[flags][width][.precision]letter`.
//!
//! Flags are `+` (always print a sign), `-` (pad on the right), `#`
//! (alternate form: radix prefixes, quoted strings), `0` (pad numbers with
//! leading zeros) and ` ` (leave a space for the sign of positive numbers).
//! A verb that cannot be applied to a value does not fail; it renders as
//! `%!verb(kind=value)` so the problem is visible in the message.

use crate::value::Value;

/// Verb letters understood by [`format_value`].
pub const VERB_LETTERS: &str = "vsqdboxXeEfFgGt";

/// Largest width or precision a verb may request.
pub const MAX_PAD: usize = 1_000_000;

/// A parsed format verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatSpec {
    pub plus: bool,
    pub minus: bool,
    pub sharp: bool,
    pub zero: bool,
    pub space: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub letter: char,
}

impl FormatSpec {
    /// Parses a verb string. Returns `None` for anything that is not a
    /// well-formed verb with a known letter, and for a width or precision
    /// above [`MAX_PAD`].
    pub fn parse(verb: &str) -> Option<Self> {
        let mut spec = FormatSpec::default();
        let mut chars = verb.chars().peekable();
        while let Some(&c) = chars.peek() {
            match c {
                '+' => spec.plus = true,
                '-' => spec.minus = true,
                '#' => spec.sharp = true,
                '0' => spec.zero = true,
                ' ' => spec.space = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = take_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(take_number(&mut chars).unwrap_or(0));
        }
        if spec.width.unwrap_or(0) > MAX_PAD || spec.precision.unwrap_or(0) > MAX_PAD {
            return None;
        }
        let letter = chars.next()?;
        if chars.next().is_some() || !VERB_LETTERS.contains(letter) {
            return None;
        }
        spec.letter = letter;
        Some(spec)
    }

    /// Formats `value`, or `None` if the verb does not apply to it.
    pub fn apply(&self, value: &Value) -> Option<String> {
        let letter = match (self.letter, value) {
            ('v', Value::Int(_) | Value::Uint(_)) => 'd',
            ('v', Value::Float(_)) => 'g',
            ('v', Value::Bool(_)) => 't',
            ('v', Value::Str(_)) if self.sharp => 'q',
            ('v', _) => 's',
            (letter, _) => letter,
        };

        match (letter, value) {
            ('d' | 'b' | 'o' | 'x' | 'X', Value::Int(i)) => {
                Some(self.integer(*i < 0, i.unsigned_abs(), letter))
            }
            ('d' | 'b' | 'o' | 'x' | 'X', Value::Uint(u)) => Some(self.integer(false, *u, letter)),
            ('x' | 'X', Value::Str(s)) => Some(self.pad(self.hex(s.as_bytes(), letter))),
            ('x' | 'X', Value::Bytes(b)) => Some(self.pad(self.hex(b, letter))),
            ('e' | 'E' | 'f' | 'F' | 'g' | 'G', Value::Float(x)) => Some(self.float(*x, letter)),
            ('t', Value::Bool(b)) => Some(self.pad(b.to_string())),
            ('s', Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Bool(_)) => None,
            ('s', Value::Bytes(b)) => Some(self.text(&String::from_utf8_lossy(b))),
            ('s', other) => Some(self.text(&other.to_string())),
            ('q', Value::Str(s)) => Some(self.pad(format!("{:?}", self.truncate(s)))),
            ('q', Value::Bytes(b)) => {
                let s = String::from_utf8_lossy(b);
                Some(self.pad(format!("{:?}", self.truncate(&s))))
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Per-kind formatting
    // ------------------------------------------------------------------------

    fn integer(&self, negative: bool, magnitude: u64, letter: char) -> String {
        let mut digits = match letter {
            'b' => format!("{:b}", magnitude),
            'o' => format!("{:o}", magnitude),
            'x' => format!("{:x}", magnitude),
            'X' => format!("{:X}", magnitude),
            _ => magnitude.to_string(),
        };
        if let Some(precision) = self.precision {
            if digits.len() < precision {
                digits = format!("{}{}", "0".repeat(precision - digits.len()), digits);
            }
        }
        let prefix = match (self.sharp, letter) {
            (true, 'b') => "0b",
            (true, 'o') => "0",
            (true, 'x') => "0x",
            (true, 'X') => "0X",
            _ => "",
        };
        let head = format!("{}{}", self.sign(negative), prefix);
        self.pad_numeric(&head, &digits, self.precision.is_none())
    }

    fn float(&self, x: f64, letter: char) -> String {
        let negative = x.is_sign_negative() && !x.is_nan();
        let magnitude = x.abs();
        if !magnitude.is_finite() {
            let body = if magnitude.is_nan() { "NaN" } else { "Inf" };
            let head = if magnitude.is_nan() { "" } else { self.sign(negative) };
            return self.pad(format!("{head}{body}"));
        }
        let upper = letter.is_ascii_uppercase();
        let digits = match letter {
            'f' | 'F' => format!("{:.*}", self.precision.unwrap_or(6), magnitude),
            'e' | 'E' => exponent_form(magnitude, self.precision.unwrap_or(6), upper),
            _ => general_form(magnitude, self.precision, self.shortest_limit(), upper),
        };
        self.pad_numeric(self.sign(negative), &digits, true)
    }

    /// Exponent at which shortest `%g` output switches to exponent form.
    /// `%v` prints plain decimals for much larger values.
    fn shortest_limit(&self) -> i32 {
        if self.letter == 'v' {
            21
        } else {
            6
        }
    }

    fn hex(&self, bytes: &[u8], letter: char) -> String {
        let mut out = String::with_capacity(bytes.len() * 2 + 2);
        if self.sharp {
            out.push_str(if letter == 'X' { "0X" } else { "0x" });
        }
        for byte in bytes {
            if letter == 'X' {
                out.push_str(&format!("{:02X}", byte));
            } else {
                out.push_str(&format!("{:02x}", byte));
            }
        }
        out
    }

    fn text(&self, s: &str) -> String {
        self.pad(self.truncate(s).to_string())
    }

    fn truncate<'s>(&self, s: &'s str) -> &'s str {
        match self.precision {
            Some(precision) => match s.char_indices().nth(precision) {
                Some((index, _)) => &s[..index],
                None => s,
            },
            None => s,
        }
    }

    // ------------------------------------------------------------------------
    // Padding
    // ------------------------------------------------------------------------

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    fn pad(&self, body: String) -> String {
        let width = self.width.unwrap_or(0);
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = " ".repeat(width - len);
        if self.minus {
            body + &fill
        } else {
            fill + &body
        }
    }

    fn pad_numeric(&self, head: &str, digits: &str, zero_allowed: bool) -> String {
        let width = self.width.unwrap_or(0);
        let len = head.chars().count() + digits.chars().count();
        if self.zero && zero_allowed && !self.minus && len < width {
            format!("{head}{}{digits}", "0".repeat(width - len))
        } else {
            self.pad(format!("{head}{digits}"))
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        let current = number.unwrap_or(0);
        number = Some(current.saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    number
}

/// Splits Rust's `1.5e2` exponent notation into mantissa and exponent.
fn split_exponent(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn join_exponent(mantissa: &str, exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}

fn exponent_form(x: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, x);
    let (mantissa, exp) = split_exponent(&raw);
    join_exponent(mantissa, exp, upper)
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `%g`: exponent notation for very large or very small exponents, plain
/// decimal otherwise, without trailing zeros. Without a precision the
/// shortest representation is used and `limit` is the first exponent shown
/// in exponent form.
fn general_form(x: f64, precision: Option<usize>, limit: i32, upper: bool) -> String {
    match precision {
        Some(precision) => {
            let precision = precision.max(1);
            let raw = format!("{:.*e}", precision - 1, x);
            let (mantissa, exp) = split_exponent(&raw);
            if exp < -4 || exp >= precision as i32 {
                join_exponent(trim_fraction(mantissa), exp, upper)
            } else {
                let decimals = (precision as i32 - 1 - exp).max(0) as usize;
                trim_fraction(&format!("{:.*}", decimals, x)).to_string()
            }
        }
        None => {
            let raw = format!("{:e}", x);
            let (mantissa, exp) = split_exponent(&raw);
            if x != 0.0 && (exp < -4 || exp >= limit) {
                join_exponent(mantissa, exp, upper)
            } else {
                x.to_string()
            }
        }
    }
}

/// Text rendered for a verb that does not apply to `value`.
pub fn bad_verb(verb: &str, value: &Value) -> String {
    format!("%!{}({}={})", verb, value.kind(), value)
}

/// Formats `value` with `verb`, falling back to [`bad_verb`].
pub fn format_value(value: &Value, verb: &str) -> String {
    FormatSpec::parse(verb)
        .and_then(|spec| spec.apply(value))
        .unwrap_or_else(|| bad_verb(verb, value))
}
