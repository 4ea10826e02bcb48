//! Statement lowering
//!
//! Turns extracted statement text into [`Stmt`] nodes. Simple statements are
//! matched against the hardware calls, assignments, increments and user calls
//! in a fixed order. Compound statements (`if` chains, `for`, `while`) have
//! their headers parsed here and their bodies re-tokenized and lowered
//! recursively.

use super::ast::{
    AssignOp, Block, Cond, Expr, ForLoop, IfChain, PrintArg, SourceLocation, Stmt, StmtKind,
    WhileLoop,
};
use super::expressions::{lower_cond, lower_expr};
use super::extract::{tokenize_block, StatementSource};
use super::scan::{
    expand_escapes, is_identifier, leading_keyword, matching_close, split_args, split_call,
    split_top_level, strip_call, unquote, Keyword,
};
use std::rc::Rc;

/// Duty written by `tone()`
pub const TONE_DUTY: f64 = 128.0;

pub fn lower_block(statements: &[StatementSource]) -> Block {
    statements
        .iter()
        .map(|source| lower_statement(&source.text, source.location))
        .collect()
}

pub fn lower_statement(text: &str, location: SourceLocation) -> Stmt {
    let text = text.trim();
    let kind = match leading_keyword(text) {
        Some(Keyword::If) => lower_if(text, location.line),
        Some(Keyword::For) => lower_for(text, location.line),
        Some(Keyword::While) => lower_while(text, location.line),
        // An else with no if in front of it
        Some(Keyword::Else | Keyword::ElseIf) => None,
        None => lower_simple(text),
    }
    .unwrap_or_else(|| StmtKind::Ignored(text.to_string()));
    Stmt { kind, location }
}

fn lower_simple(text: &str) -> Option<StmtKind> {
    if let Some(arg) = strip_call(text, "delay") {
        return Some(StmtKind::Delay(lower_expr(arg)));
    }
    if let Some(arg) = strip_call(text, "delayMicroseconds") {
        return Some(StmtKind::DelayMicros(lower_expr(arg)));
    }
    if strip_call(text, "Serial.begin").is_some() {
        return Some(StmtKind::SerialBegin);
    }
    if let Some(args) = strip_call(text, "Serial.println") {
        return Some(StmtKind::SerialPrint {
            arg: print_arg(args),
            newline: true,
        });
    }
    if let Some(args) = strip_call(text, "Serial.print") {
        return Some(StmtKind::SerialPrint {
            arg: print_arg(args),
            newline: false,
        });
    }
    if let Some(args) = strip_call(text, "Serial.printf") {
        return lower_printf(args);
    }
    if let Some(args) = strip_call(text, "pinMode") {
        let [pin, mode] = two_args(args)?;
        return Some(StmtKind::PinMode { pin, mode });
    }
    if let Some(args) = strip_call(text, "digitalWrite") {
        let [pin, value] = two_args(args)?;
        return Some(StmtKind::DigitalWrite { pin, value });
    }
    if let Some(args) = strip_call(text, "analogWrite").or_else(|| strip_call(text, "ledcWrite")) {
        let [pin, duty] = two_args(args)?;
        return Some(StmtKind::AnalogWrite { pin, duty });
    }
    if let Some(args) = strip_call(text, "tone") {
        let pin = split_args(args).first().map(|pin| lower_expr(pin))?;
        return Some(StmtKind::AnalogWrite {
            pin,
            duty: Expr::Number(TONE_DUTY),
        });
    }
    if let Some(args) = strip_call(text, "noTone") {
        return Some(StmtKind::AnalogWrite {
            pin: lower_expr(args),
            duty: Expr::Number(0.0),
        });
    }
    if let Some(assign) = lower_assignment(text) {
        return Some(assign);
    }
    if let Some(step) = lower_increment(text) {
        return Some(step);
    }
    let (name, args) = split_call(text)?;
    Some(StmtKind::Call {
        name: name.to_string(),
        args: split_args(args).into_iter().map(lower_expr).collect(),
    })
}

fn two_args(args: &str) -> Option<[Expr; 2]> {
    match split_args(args).as_slice() {
        [first, second] => Some([lower_expr(first), lower_expr(second)]),
        _ => None,
    }
}

/// First argument of `Serial.print`; a second (format) argument is ignored.
fn print_arg(args: &str) -> PrintArg {
    let args = split_args(args);
    let Some(&first) = args.first() else {
        return PrintArg::Empty;
    };
    // `F("...")` only moves the literal to flash
    let first = strip_call(first, "F").unwrap_or(first);
    match unquote(first) {
        Some(inner) => PrintArg::Literal(expand_escapes(inner)),
        None => PrintArg::Value(lower_expr(first)),
    }
}

fn lower_printf(args: &str) -> Option<StmtKind> {
    let args = split_args(args);
    let (format, rest) = args.split_first()?;
    let format = unquote(format).filter(|_| format.starts_with('"'))?;
    Some(StmtKind::SerialPrintf {
        format: expand_escapes(format),
        args: rest.iter().map(|arg| lower_expr(arg)).collect(),
    })
}

const ASSIGN_OPS: [(&str, AssignOp); 4] = [
    ("+=", AssignOp::Add),
    ("-=", AssignOp::Sub),
    ("*=", AssignOp::Mul),
    ("/=", AssignOp::Div),
];

/// `[type] name op expr`
fn lower_assignment(text: &str) -> Option<StmtKind> {
    let (at, width, op) = find_assign_op(text)?;
    let words: Vec<&str> = text[..at].split_whitespace().collect();
    let (name, type_words) = words.split_last()?;
    let name = name.trim_start_matches('*');
    if !is_identifier(name) || !type_words.iter().all(|w| is_identifier(w.trim_end_matches('*'))) {
        return None;
    }
    Some(StmtKind::Assign {
        name: name.to_string(),
        op,
        value: lower_expr(&text[at + width..]),
    })
}

/// Position, width and kind of the first top-level assignment operator
fn find_assign_op(text: &str) -> Option<(usize, usize, AssignOp)> {
    let bytes = text.as_bytes();
    let mut offset = 0;
    for part in split_top_level(text, "=") {
        let at = offset + part.len();
        offset = at + 1;
        if at >= bytes.len() {
            return None;
        }
        let prev = if at > 0 { bytes[at - 1] } else { b' ' };
        let next = bytes.get(at + 1).copied().unwrap_or(b' ');
        if next == b'=' || matches!(prev, b'=' | b'!' | b'<' | b'>') {
            continue;
        }
        if let Some((_, op)) = ASSIGN_OPS.iter().find(|(sym, _)| sym.as_bytes()[0] == prev) {
            return Some((at - 1, 2, *op));
        }
        return Some((at, 1, AssignOp::Set));
    }
    None
}

/// `name++`, `name--`, `++name`, `--name`
fn lower_increment(text: &str) -> Option<StmtKind> {
    let (name, delta) = if let Some(name) = text.strip_suffix("++") {
        (name, 1.0)
    } else if let Some(name) = text.strip_suffix("--") {
        (name, -1.0)
    } else if let Some(name) = text.strip_prefix("++") {
        (name, 1.0)
    } else {
        (text.strip_prefix("--")?, -1.0)
    };
    let name = name.trim();
    is_identifier(name).then(|| StmtKind::Step {
        name: name.to_string(),
        delta,
    })
}

/// Text between the parentheses after a keyword, and the rest after them
fn header_and_rest(text: &str) -> Option<(&str, usize)> {
    let open = text.find('(')?;
    let close = matching_close(text, open)?;
    Some((&text[open + 1..close], close + 1))
}

/// A compound statement's body: a brace block or a single statement up to
/// the first top-level `;`. Returns the body and the offset after it.
fn body_at(text: &str, start: usize, base_line: usize) -> (Block, usize) {
    let rest = &text[start..];
    let skipped = rest.len() - rest.trim_start().len();
    let at = start + skipped;
    let line = base_line + text[..at].matches('\n').count();

    if text[at..].starts_with('{') {
        let close = matching_close(text, at).unwrap_or(text.len());
        let inner = &text[at + 1..close.min(text.len())];
        let block = lower_block(&tokenize_block(inner, line));
        return (block, (close + 1).min(text.len()));
    }

    let tail = &text[at..];
    let (len, consumed) = if leading_keyword(tail).is_some() {
        let end = compound_end(tail);
        (end, end)
    } else {
        let len = split_top_level(tail, ";")[0].len();
        (len, len + 1)
    };
    let single = &tail[..len.min(tail.len())];
    let block: Block = if single.trim().is_empty() {
        Rc::from(Vec::new())
    } else {
        Rc::from(vec![lower_statement(single, SourceLocation::new(line, 1))])
    };
    (block, (at + consumed).min(text.len()))
}

/// End of a nested braceless compound (`if (a) for (...) x++;`)
fn compound_end(text: &str) -> usize {
    let Some((_, after)) = header_and_rest(text) else {
        return text.len();
    };
    let rest = &text[after..];
    let skipped = rest.len() - rest.trim_start().len();
    let at = after + skipped;
    if text[at..].starts_with('{') {
        return matching_close(text, at).map_or(text.len(), |close| close + 1);
    }
    (at + split_top_level(&text[at..], ";")[0].len() + 1).min(text.len())
}

fn lower_if(text: &str, line: usize) -> Option<StmtKind> {
    let mut branches = Vec::new();
    let mut otherwise = None;
    let mut pos = 0;

    loop {
        let (cond, after) = header_and_rest(&text[pos..])?;
        let (body, next) = body_at(text, pos + after, line);
        branches.push((lower_cond(cond), body));
        pos = next;

        let rest = text[pos..].trim_start();
        let at = text.len() - rest.len();
        match leading_keyword(rest) {
            Some(Keyword::ElseIf) => {
                pos = at + rest.find("if").unwrap_or(0);
            }
            Some(Keyword::Else) => {
                let (body, _) = body_at(text, at + "else".len(), line);
                otherwise = Some(body);
                break;
            }
            _ => break,
        }
    }
    Some(StmtKind::If(Rc::new(IfChain {
        branches,
        otherwise,
    })))
}

fn lower_for(text: &str, line: usize) -> Option<StmtKind> {
    let (header, after) = header_and_rest(text)?;
    let clauses = split_top_level(header, ";");
    let &[init, cond, step] = clauses.as_slice() else {
        return None;
    };
    let clause = |text: &str| {
        (!text.trim().is_empty()).then(|| lower_statement(text, SourceLocation::new(line, 1)))
    };
    let cond = if cond.trim().is_empty() {
        Cond::Truthy(Expr::Number(1.0))
    } else {
        lower_cond(cond)
    };
    let (body, _) = body_at(text, after, line);
    Some(StmtKind::For(Rc::new(ForLoop {
        init: clause(init),
        cond,
        step: clause(step),
        body,
    })))
}

fn lower_while(text: &str, line: usize) -> Option<StmtKind> {
    let (cond, after) = header_and_rest(text)?;
    let (body, _) = body_at(text, after, line);
    Some(StmtKind::While(Rc::new(WhileLoop {
        cond: lower_cond(cond),
        body,
    })))
}
