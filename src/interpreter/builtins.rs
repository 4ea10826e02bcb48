//! Built-in function implementations
//!
//! This module provides the library functions a sketch can call inside an
//! expression, plus the `Serial.printf` formatter.
//!
//! # Supported Built-ins
//!
//! - `map(v, inMin, inMax, outMin, outMax)`: linear rescale, rounded
//! - `constrain(v, lo, hi)`: clamp into a range
//! - `random(max)` / `random(min, max)`: uniform integer in `[min, max)`
//! - `abs`, `sqrt`, `min`, `max`, `pow`
//! - `isnan(v)`: 1 if `v` is not a number, else 0
//!
//! # Implementation Notes
//!
//! - A call with the wrong number of arguments evaluates to 0
//! - Rounding is half-up (`map(-2.5 ...)` style ties go toward positive)
//! - `printf` supports `%d %i %u %f %s %c %x %X %%` with optional `-`/`0`
//!   flags, width, `.precision` and `l`/`h` length modifiers

use crate::interpreter::constants::MAX_PRINTF_WIDTH;
use crate::memory::value::{format_number, Value};
use crate::parser::ast::Builtin;
use rand::Rng;

pub fn call_builtin(func: Builtin, args: &[f64], rng: &mut impl Rng) -> f64 {
    match (func, args) {
        (Builtin::Map, &[v, in_min, in_max, out_min, out_max]) => {
            if in_max == in_min {
                return 0.0;
            }
            round_half_up((v - in_min) * (out_max - out_min) / (in_max - in_min) + out_min)
        }
        (Builtin::Constrain, &[v, lo, hi]) => v.max(lo).min(hi),
        (Builtin::Random, &[max]) => random_between(0.0, max, rng),
        (Builtin::Random, &[min, max]) => random_between(min, max, rng),
        (Builtin::Abs, &[v]) => v.abs(),
        (Builtin::Sqrt, &[v]) => v.sqrt(),
        (Builtin::Min, &[a, b]) => a.min(b),
        (Builtin::Max, &[a, b]) => a.max(b),
        (Builtin::Pow, &[base, exp]) => base.powf(exp),
        (Builtin::IsNan, &[v]) => f64::from(u8::from(v.is_nan())),
        _ => 0.0,
    }
}

fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn random_between(min: f64, max: f64, rng: &mut impl Rng) -> f64 {
    if !(max > min) {
        return min;
    }
    let unit: f64 = rng.gen();
    (unit * (max - min)).floor() + min
}

/// Pending conversion state while reading a `%` directive
#[derive(Default)]
struct Directive {
    left_align: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
}

impl Directive {
    fn pad(&self, body: String) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.width - len;
        if self.left_align {
            format!("{}{}", body, " ".repeat(fill))
        } else if self.zero_pad {
            match body.strip_prefix('-') {
                Some(digits) => format!("-{}{}", "0".repeat(fill), digits),
                None => format!("{}{}", "0".repeat(fill), body),
            }
        } else {
            format!("{}{}", " ".repeat(fill), body)
        }
    }
}

/// Add a decimal digit to a width or precision, capped at [`MAX_PRINTF_WIDTH`].
fn append_digit(current: usize, digit: u32) -> usize {
    current
        .saturating_mul(10)
        .saturating_add(digit as usize)
        .min(MAX_PRINTF_WIDTH)
}

fn as_integer(value: &Value) -> Option<i64> {
    let n = value.as_number();
    n.is_finite().then(|| n.trunc() as i64)
}

pub fn format_printf(format: &str, args: &[Value]) -> String {
    let mut output = String::new();
    let mut chars = format.chars().peekable();
    let mut arg_index = 0;
    let missing = Value::default();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            output.push(ch);
            continue;
        }

        let mut conv = Directive::default();
        let mut raw = String::from("%");
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => conv.left_align = true,
                '0' => conv.zero_pad = true,
                _ => break,
            }
            raw.push(flag);
            chars.next();
        }
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            conv.width = append_digit(conv.width, digit);
            raw.push(chars.next().unwrap_or_default());
        }
        if chars.peek() == Some(&'.') {
            raw.push('.');
            chars.next();
            let mut precision = 0;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                precision = append_digit(precision, digit);
                raw.push(chars.next().unwrap_or_default());
            }
            conv.precision = Some(precision);
        }
        let mut has_length = false;
        while let Some(&modifier) = chars.peek() {
            if modifier != 'l' && modifier != 'h' {
                break;
            }
            has_length = true;
            raw.push(modifier);
            chars.next();
        }

        // A bare `%l` is an integer conversion of its own
        let conversion = match chars.peek() {
            Some(&c) if c == '%' || "diufscxX".contains(c) => {
                chars.next();
                c
            }
            _ if has_length => 'd',
            Some(&c) => {
                chars.next();
                output.push_str(&raw);
                output.push(c);
                continue;
            }
            None => {
                output.push_str(&raw);
                break;
            }
        };
        if conversion == '%' {
            output.push('%');
            continue;
        }

        let arg = args.get(arg_index).unwrap_or(&missing);
        arg_index += 1;
        let body = match conversion {
            'd' | 'i' => as_integer(arg).map_or_else(|| format_number(arg.as_number()), |n| n.to_string()),
            'u' => as_integer(arg).map_or_else(|| format_number(arg.as_number()), |n| (n as u32).to_string()),
            'x' => format!("{:x}", as_integer(arg).unwrap_or(0) as u32),
            'X' => format!("{:X}", as_integer(arg).unwrap_or(0) as u32),
            'f' => format!("{:.*}", conv.precision.unwrap_or(6), arg.as_number()),
            'c' => match arg {
                Value::Text(s) => s.chars().next().map(String::from).unwrap_or_default(),
                Value::Number(n) => char::from_u32(*n as u32).map(String::from).unwrap_or_default(),
            },
            _ => {
                let text = arg.to_text();
                match conv.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
        };
        output.push_str(&conv.pad(body));
    }

    output
}
