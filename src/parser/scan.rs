//! Text scanning helpers shared by extraction and lowering
//!
//! The sketch dialect is handled as text rather than a token stream, so these
//! helpers do the bracket matching and splitting that a lexer would otherwise
//! make trivial. All of them skip over string and char literals.

use crate::memory::{Scope, Value};

/// Compound statement keywords, as they open a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    For,
    While,
}

/// Walks text tracking whether the current byte sits inside a literal.
struct QuoteState {
    quote: Option<u8>,
    escaped: bool,
}

impl QuoteState {
    fn new() -> Self {
        QuoteState {
            quote: None,
            escaped: false,
        }
    }

    /// Feed one byte; returns true if it is outside any literal.
    fn outside(&mut self, b: u8) -> bool {
        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == q {
                self.quote = None;
            }
            return false;
        }
        if b == b'"' || b == b'\'' {
            self.quote = Some(b);
            return false;
        }
        true
    }
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        _ => None,
    }
}

/// Byte index of the bracket closing the one at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open_byte = *bytes.get(open)?;
    let close_byte = closer_for(open_byte)?;
    let mut depth = 0usize;
    let mut quotes = QuoteState::new();
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if !quotes.outside(b) {
            continue;
        }
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn bracket_delta(text: &str, open: u8, close: u8) -> i64 {
    let mut quotes = QuoteState::new();
    text.bytes().fold(0, |acc, b| {
        if !quotes.outside(b) {
            acc
        } else if b == open {
            acc + 1
        } else if b == close {
            acc - 1
        } else {
            acc
        }
    })
}

/// Net `{`/`}` balance of a line, literals excluded.
pub fn brace_delta(text: &str) -> i64 {
    bracket_delta(text, b'{', b'}')
}

/// Net `(`/`)` balance of a line, literals excluded.
pub fn paren_delta(text: &str) -> i64 {
    bracket_delta(text, b'(', b')')
}

/// Whether `needle` occurs outside literals.
pub fn contains_code(text: &str, needle: u8) -> bool {
    let mut quotes = QuoteState::new();
    text.bytes().any(|b| quotes.outside(b) && b == needle)
}

/// `(open, close)` byte spans of every brace block at depth 0. An unclosed
/// block runs to the end of the text.
pub fn top_level_blocks(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut blocks = Vec::new();
    let mut quotes = QuoteState::new();
    let mut i = 0;
    while i < bytes.len() {
        if quotes.outside(bytes[i]) && bytes[i] == b'{' {
            match matching_close(text, i) {
                Some(close) => {
                    blocks.push((i, close));
                    i = close + 1;
                    continue;
                }
                None => {
                    blocks.push((i, text.len()));
                    break;
                }
            }
        }
        i += 1;
    }
    blocks
}

/// Split at every `sep` that sits outside brackets and literals.
pub fn split_top_level<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let bytes = text.as_bytes();
    let sep_bytes = sep.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i64;
    let mut quotes = QuoteState::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !quotes.outside(b) {
            i += 1;
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {}
        }
        if depth == 0 && !sep_bytes.is_empty() && bytes[i..].starts_with(sep_bytes) {
            parts.push(&text[start..i]);
            i += sep_bytes.len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// First top-level occurrence of `pat`, outside brackets and literals.
pub fn find_top_level(text: &str, pat: &str) -> Option<usize> {
    let parts = split_top_level(text, pat);
    if parts.len() < 2 {
        return None;
    }
    Some(parts[0].len())
}

/// Split a call's argument list; an empty list has no arguments.
pub fn split_args(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    split_top_level(text, ",")
        .into_iter()
        .map(str::trim)
        .collect()
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// If `text` is exactly `name(...)`, return the text between the parentheses.
pub fn strip_call<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let text = text.trim();
    let rest = text.strip_prefix(name)?;
    let offset = text.len() - rest.trim_start().len();
    if !text[offset..].starts_with('(') {
        return None;
    }
    let close = matching_close(text, offset)?;
    if close != text.len() - 1 {
        return None;
    }
    Some(&text[offset + 1..close])
}

/// Split `name(args)` into its callee and argument text.
pub fn split_call(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let open = text.find('(')?;
    let name = text[..open].trim();
    if !is_identifier(name) {
        return None;
    }
    let args = strip_call(text, name)?;
    Some((name, args))
}

/// Signed decimal, `0x` hex, with optional C literal suffixes (`10UL`, `1.5f`).
pub fn parse_number_literal(text: &str) -> Option<f64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let value = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        let hex = hex.trim_end_matches(&['u', 'U', 'l', 'L'][..]);
        i64::from_str_radix(hex, 16).ok()? as f64
    } else {
        let digits = body.trim_end_matches(&['u', 'U', 'l', 'L', 'f', 'F'][..]);
        let well_formed = !digits.is_empty()
            && digits.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
            && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
            && digits.matches('.').count() <= 1
            && digits != ".";
        if !well_formed {
            return None;
        }
        digits.parse::<f64>().ok()?
    };
    Some(if negative { -value } else { value })
}

/// The contents of a `"..."` or `'...'` literal, escapes left as written.
pub fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    // The opening literal must close at the very end, so `"a" + "b"` is rejected
    let mut quotes = QuoteState::new();
    for (i, b) in text.bytes().enumerate() {
        quotes.outside(b);
        if i > 0 && quotes.quote.is_none() {
            return (i == text.len() - 1).then_some(inner);
        }
    }
    None
}

pub fn expand_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Literal value rule used for `#define` values and global initializers.
pub fn parse_value(text: &str, globals: &Scope) -> Value {
    let text = text.trim().trim_end_matches(';').trim();
    match text {
        "true" | "HIGH" => return Value::Number(1.0),
        "false" | "LOW" => return Value::Number(0.0),
        _ => {}
    }
    if let Some(n) = parse_number_literal(text) {
        return Value::Number(n);
    }
    if text.starts_with('"') {
        if let Some(inner) = unquote(text) {
            return Value::Text(expand_escapes(inner));
        }
    }
    globals.get(text).cloned().unwrap_or_default()
}

/// Which compound keyword, if any, opens `line`.
pub fn leading_keyword(line: &str) -> Option<Keyword> {
    let line = line.trim_start();
    let starts_word = |word: &str| {
        line.strip_prefix(word)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_'))
    };
    if starts_word("else") {
        let rest = line["else".len()..].trim_start();
        let is_else_if = rest
            .strip_prefix("if")
            .is_some_and(|r| !r.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_'));
        return Some(if is_else_if { Keyword::ElseIf } else { Keyword::Else });
    }
    if starts_word("if") {
        return Some(Keyword::If);
    }
    if starts_word("for") {
        return Some(Keyword::For);
    }
    if starts_word("while") {
        return Some(Keyword::While);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_close_skips_literals() {
        let text = r#"f("(", g(1)) + 2"#;
        assert_eq!(matching_close(text, 1), Some(11));
        assert_eq!(matching_close("(()", 0), None);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_args(r#"map(a, 0, 10, 0, 1), "x,y", 3"#),
            vec!["map(a, 0, 10, 0, 1)", r#""x,y""#, "3"]
        );
        assert_eq!(
            split_top_level("int i = 0; i < 5; i++", ";"),
            vec!["int i = 0", " i < 5", " i++"]
        );
        assert_eq!(split_top_level("a && (b && c)", "&&"), vec!["a ", " (b && c)"]);
        assert!(split_args("  ").is_empty());
    }

    #[test]
    fn test_strip_call() {
        assert_eq!(strip_call("delay(500)", "delay"), Some("500"));
        assert_eq!(strip_call("delay (f(1))", "delay"), Some("f(1)"));
        assert_eq!(strip_call("delay(1) + delay(2)", "delay"), None);
        assert_eq!(strip_call("delayed(1)", "delay"), None);
        assert_eq!(split_call("blink(2, 100)"), Some(("blink", "2, 100")));
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(parse_number_literal("42"), Some(42.0));
        assert_eq!(parse_number_literal("-3.5"), Some(-3.5));
        assert_eq!(parse_number_literal("0xFF"), Some(255.0));
        assert_eq!(parse_number_literal("1000UL"), Some(1000.0));
        assert_eq!(parse_number_literal(".5"), Some(0.5));
        assert_eq!(parse_number_literal("1.2.3"), None);
        assert_eq!(parse_number_literal("x1"), None);
        assert_eq!(parse_number_literal("-"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""hello""#), Some("hello"));
        assert_eq!(unquote("'a'"), Some("a"));
        assert_eq!(unquote(r#""a\"b""#), Some(r#"a\"b"#));
        assert_eq!(unquote(r#""a" + "b""#), None);
        assert_eq!(unquote(r#"""#), None);
    }

    #[test]
    fn test_parse_value() {
        let mut globals = Scope::default();
        globals.insert("LED".to_string(), Value::Number(2.0));
        assert_eq!(parse_value("HIGH;", &globals), Value::Number(1.0));
        assert_eq!(parse_value(" 0x10 ", &globals), Value::Number(16.0));
        assert_eq!(parse_value(r#""hi\n""#, &globals), Value::from("hi\n"));
        assert_eq!(parse_value("LED", &globals), Value::Number(2.0));
        assert_eq!(parse_value("analogRead(34)", &globals), Value::Number(0.0));
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(leading_keyword("  if (x) {"), Some(Keyword::If));
        assert_eq!(leading_keyword("} else if(x){"), None);
        assert_eq!(leading_keyword("else if(x){"), Some(Keyword::ElseIf));
        assert_eq!(leading_keyword("else {"), Some(Keyword::Else));
        assert_eq!(leading_keyword("for(;;)"), Some(Keyword::For));
        assert_eq!(leading_keyword("iffy = 1"), None);
        assert_eq!(leading_keyword("whileCount++"), None);
    }
}
