//! Expression and condition lowering
//!
//! Lowering follows the evaluation order of the sketch dialect: keyword
//! constants, literals, the time and pin reads, the math builtins, a bare
//! variable name, and finally the guarded arithmetic fallback. The first
//! form that matches the whole text wins.

use super::ast::{Builtin, CmpOp, Cond, Expr};
use super::scan::{
    expand_escapes, find_top_level, is_identifier, matching_close, parse_number_literal,
    split_args, split_call, split_top_level, strip_call, unquote,
};

/// Nesting of calls and conditions lowered before the rest reads as zero
const MAX_NESTING: usize = 64;

pub fn lower_expr(text: &str) -> Expr {
    lower_expr_at(text, 0)
}

fn lower_expr_at(text: &str, depth: usize) -> Expr {
    if depth > MAX_NESTING {
        return Expr::Number(0.0);
    }
    let text = text.trim();
    let lower_arg = |arg: &str| lower_expr_at(arg, depth + 1);
    match text {
        "HIGH" | "true" => return Expr::Number(1.0),
        "LOW" | "false" => return Expr::Number(0.0),
        "INPUT" | "OUTPUT" | "INPUT_PULLUP" => return Expr::Text(text.to_string()),
        _ => {}
    }
    if let Some(n) = parse_number_literal(text) {
        return Expr::Number(n);
    }
    if let Some(inner) = unquote(text) {
        return Expr::Text(expand_escapes(inner));
    }
    if strip_call(text, "millis").is_some_and(|args| args.trim().is_empty()) {
        return Expr::Millis;
    }
    if strip_call(text, "micros").is_some_and(|args| args.trim().is_empty()) {
        return Expr::Micros;
    }
    if let Some(pin) = strip_call(text, "digitalRead") {
        return Expr::DigitalRead(Box::new(lower_arg(pin)));
    }
    if let Some(pin) = strip_call(text, "analogRead") {
        return Expr::AnalogRead(Box::new(lower_arg(pin)));
    }
    if let Some((name, args)) = split_call(text) {
        if let Some(func) = Builtin::from_name(name) {
            let args = split_args(args).into_iter().map(lower_arg).collect();
            return Expr::Builtin { func, args };
        }
    }
    if is_identifier(text) {
        return Expr::Variable(text.to_string());
    }
    Expr::Arithmetic(text.to_string())
}

/// Drop one pair of parentheses that encloses the whole text.
fn strip_enclosing_parens(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with('(') && matching_close(text, 0) == Some(text.len() - 1) {
        return text[1..text.len() - 1].trim();
    }
    text
}

/// Lower a condition. `&&` is split before `||`, so whichever is present
/// first in that order binds the whole condition.
pub fn lower_cond(text: &str) -> Cond {
    lower_cond_at(text, 0)
}

fn lower_cond_at(text: &str, depth: usize) -> Cond {
    if depth > MAX_NESTING {
        return Cond::Truthy(Expr::Number(0.0));
    }
    let text = strip_enclosing_parens(text);
    let lower_sub = |sub: &str| lower_cond_at(sub, depth + 1);

    let all = split_top_level(text, "&&");
    if all.len() > 1 {
        return Cond::All(all.into_iter().map(lower_sub).collect());
    }
    let any = split_top_level(text, "||");
    if any.len() > 1 {
        return Cond::Any(any.into_iter().map(lower_sub).collect());
    }
    if let Some(rest) = text.strip_prefix('!') {
        if !rest.starts_with('=') {
            return Cond::Not(Box::new(lower_sub(rest)));
        }
    }
    for (op, symbol) in CmpOp::SEARCH_ORDER {
        if let Some(at) = find_top_level(text, symbol) {
            return Cond::Compare {
                lhs: lower_expr_at(&text[..at], depth + 1),
                op,
                rhs: lower_expr_at(&text[at + symbol.len()..], depth + 1),
            };
        }
    }
    Cond::Truthy(lower_expr_at(text, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_and_literals() {
        assert_eq!(lower_expr("HIGH"), Expr::Number(1.0));
        assert_eq!(lower_expr("OUTPUT"), Expr::Text("OUTPUT".to_string()));
        assert_eq!(lower_expr(" 0x1F "), Expr::Number(31.0));
        assert_eq!(lower_expr(r#""a\tb""#), Expr::Text("a\tb".to_string()));
        assert_eq!(lower_expr("'x'"), Expr::Text("x".to_string()));
    }

    #[test]
    fn test_calls() {
        assert_eq!(lower_expr("millis()"), Expr::Millis);
        assert_eq!(
            lower_expr("digitalRead(BUTTON)"),
            Expr::DigitalRead(Box::new(Expr::Variable("BUTTON".to_string())))
        );
        assert_eq!(
            lower_expr("constrain(v, 0, 255)"),
            Expr::Builtin {
                func: Builtin::Constrain,
                args: vec![
                    Expr::Variable("v".to_string()),
                    Expr::Number(0.0),
                    Expr::Number(255.0)
                ],
            }
        );
    }

    #[test]
    fn test_arithmetic_fallback() {
        assert_eq!(lower_expr("x + 1"), Expr::Arithmetic("x + 1".to_string()));
        assert_eq!(
            lower_expr(r#""a" + "b""#),
            Expr::Arithmetic(r#""a" + "b""#.to_string())
        );
        // A builtin must span the whole expression
        assert_eq!(
            lower_expr("abs(x) + 1"),
            Expr::Arithmetic("abs(x) + 1".to_string())
        );
    }

    #[test]
    fn test_and_binds_before_or() {
        let cond = lower_cond("a || b && c");
        let Cond::All(parts) = cond else {
            panic!("expected conjunction, got {:?}", cond);
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Cond::Any(_)));
    }

    #[test]
    fn test_comparison_priority() {
        assert_eq!(
            lower_cond("(x >= 10)"),
            Cond::Compare {
                lhs: Expr::Variable("x".to_string()),
                op: CmpOp::Ge,
                rhs: Expr::Number(10.0),
            }
        );
        assert_eq!(
            lower_cond("!digitalRead(4)"),
            Cond::Not(Box::new(Cond::Truthy(Expr::DigitalRead(Box::new(
                Expr::Number(4.0)
            )))))
        );
        assert!(matches!(
            lower_cond("a != b"),
            Cond::Compare { op: CmpOp::Ne, .. }
        ));
        assert_eq!(lower_cond("ready"), Cond::Truthy(Expr::Variable("ready".to_string())));
    }

    #[test]
    fn test_deep_nesting_is_cut_off() {
        let deep = format!("{}1{}", "abs(".repeat(5000), ")".repeat(5000));
        let mut expr = lower_expr(&deep);
        let mut calls = 0;
        while let Expr::Builtin { mut args, .. } = expr {
            calls += 1;
            expr = args.pop().unwrap_or(Expr::Number(-1.0));
        }
        assert_eq!(calls, MAX_NESTING + 1);
        assert_eq!(expr, Expr::Number(0.0));

        let mut cond = lower_cond(&format!("{}ready", "!".repeat(100_000)));
        let mut negations = 0;
        while let Cond::Not(inner) = cond {
            negations += 1;
            cond = *inner;
        }
        assert_eq!(negations, MAX_NESTING + 1);
        assert_eq!(cond, Cond::Truthy(Expr::Number(0.0)));
    }
}
