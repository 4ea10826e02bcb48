//! Guarded arithmetic fallback
//!
//! Expressions that match no other form end up here. Every identifier that
//! names a numeric variable is replaced by its value and `HIGH`, `LOW`,
//! `true` and `false` by `1` or `0`. If what remains uses only digits, `.`,
//! whitespace, `+ - * / %` and parentheses, it is evaluated with the usual
//! precedence. Anything else evaluates to zero, as does any failure (a
//! malformed expression, division by zero).

use crate::interpreter::constants::MAX_ARITHMETIC_DEPTH;

/// Evaluate `text`, resolving identifiers through `lookup`.
pub fn evaluate_arithmetic(text: &str, lookup: impl Fn(&str) -> Option<f64>) -> f64 {
    let substituted = substitute(text, lookup);
    let allowed = |c: char| c.is_ascii_digit() || c.is_whitespace() || "+-*/%().".contains(c);
    if substituted.trim().is_empty() || !substituted.chars().all(allowed) {
        return 0.0;
    }
    // `a++b` and `a--b` do not parse as arithmetic
    if substituted.contains("++") || substituted.contains("--") {
        return 0.0;
    }
    let mut parser = Parser {
        tokens: tokenize(&substituted),
        pos: 0,
        depth: 0,
    };
    match parser.expr() {
        Some(value) if parser.pos == parser.tokens.len() && value.is_finite() => value,
        _ => 0.0,
    }
}

/// Replace every whole-word identifier that `lookup` knows.
fn substitute(text: &str, lookup: impl Fn(&str) -> Option<f64>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        let value = match word.as_str() {
            "HIGH" | "true" => Some(1.0),
            "LOW" | "false" => Some(0.0),
            name if name.starts_with(|c: char| c.is_ascii_digit()) => None,
            name => lookup(name),
        };
        match value {
            // Negative values are parenthesised so `a-b` stays well formed
            Some(n) if n < 0.0 => out.push_str(&format!("({})", n)),
            Some(n) => out.push_str(&format!("{}", n)),
            None => out.push_str(word),
        }
        word.clear();
    };
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
    Bad,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if !(d.is_ascii_digit() || d == '.') {
                    break;
                }
                literal.push(d);
                chars.next();
            }
            tokens.push(literal.parse().map_or(Token::Bad, Token::Number));
        } else {
            chars.next();
            tokens.push(match c {
                '(' => Token::Open,
                ')' => Token::Close,
                _ => Token::Op(c),
            });
        }
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek_op(&self, ops: &str) -> Option<char> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) if ops.contains(*op) => Some(*op),
            _ => None,
        }
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.peek_op("+-") {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.unary()?;
        while let Some(op) = self.peek_op("*/%") {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return None,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Some(value)
    }

    /// Run `parse` one nesting level deeper, failing past the limit.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Option<f64>) -> Option<f64> {
        if self.depth >= MAX_ARITHMETIC_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn unary(&mut self) -> Option<f64> {
        match self.peek_op("+-") {
            Some(op) => {
                self.pos += 1;
                let value = self.nested(Self::unary)?;
                Some(if op == '-' { -value } else { value })
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<f64> {
        let token = self.tokens.get(self.pos)?.clone();
        self.pos += 1;
        match token {
            Token::Number(n) => Some(n),
            Token::Open => {
                let value = self.nested(Self::expr)?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Some(value)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
