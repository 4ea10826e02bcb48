//! Sketch extraction
//!
//! Splits raw sketch text into the global table, the `setup` and `loop`
//! statement sequences and the user-defined functions. Extraction is total:
//! malformed input yields fewer or emptier pieces, never an error.
//!
//! # Statements
//!
//! Function bodies are cut into statement texts line by line. A line opening
//! with `if`, `else`, `for` or `while` absorbs the following lines until its
//! braces balance and becomes one compound statement; an `if` keeps absorbing
//! `else` branches that start on later lines. Every other line is split at
//! top-level `;` into simple statements. Each statement remembers the source
//! line it starts on.

use super::ast::SourceLocation;
use super::scan::{
    brace_delta, contains_code, find_top_level, is_identifier, leading_keyword, paren_delta,
    parse_value, split_args, split_top_level, top_level_blocks, Keyword,
};
use crate::memory::{Scope, Value};

/// One statement's text and where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct StatementSource {
    pub text: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSource {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<StatementSource>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedSketch {
    pub globals: Scope,
    pub setup: Vec<StatementSource>,
    pub loop_body: Vec<StatementSource>,
    pub functions: Vec<FunctionSource>,
}

pub fn extract(source: &str) -> ExtractedSketch {
    let text = strip_comments(source);
    let mut sketch = ExtractedSketch {
        globals: scan_globals(&text),
        ..Default::default()
    };

    for (open, close) in top_level_blocks(&text) {
        let Some(signature) = signature_before(&text, open) else {
            continue;
        };
        let body_end = close.min(text.len());
        let body = tokenize_block(&text[open + 1..body_end], line_of(&text, open));
        match signature.name.as_str() {
            "setup" => sketch.setup = body,
            "loop" => sketch.loop_body = body,
            _ => sketch.functions.push(FunctionSource {
                location: SourceLocation::new(line_of(&text, signature.start), 1),
                name: signature.name,
                params: signature.params,
                body,
            }),
        }
    }
    sketch
}

/// Remove `//` and `/* */` comments. Literals are left intact and newlines
/// inside block comments are kept, so line numbers do not shift.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q || c == '\n' {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|next| *next != '\n') {
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}

/// `#define`s and declarations found outside every brace block
fn scan_globals(text: &str) -> Scope {
    let mut globals = Scope::default();
    let mut depth = 0i64;
    for line in text.lines() {
        let at_top = depth == 0;
        depth += brace_delta(line);
        if !at_top {
            continue;
        }
        let line = line.trim();
        if let Some(define) = line.strip_prefix("#define") {
            parse_define(define, &mut globals);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let segments = split_top_level(line, ";");
        // The text after the last `;` is not a complete declaration
        for segment in &segments[..segments.len() - 1] {
            parse_declaration(segment, &mut globals);
        }
    }
    globals
}

fn parse_define(rest: &str, globals: &mut Scope) {
    if !rest.starts_with(char::is_whitespace) {
        return;
    }
    let rest = rest.trim();
    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..name_end];
    if !is_identifier(name) {
        return;
    }
    let value = parse_value(&rest[name_end..], globals);
    globals.insert(name.to_string(), value);
}

/// `[const] <type> name [= value] [, name [= value]]...`
fn parse_declaration(text: &str, globals: &mut Scope) {
    for (index, part) in split_top_level(text, ",").into_iter().enumerate() {
        let (lhs, init) = match find_top_level(part, "=") {
            Some(eq) => (&part[..eq], Some(&part[eq + 1..])),
            None => (part, None),
        };
        if lhs.contains('(') {
            return;
        }
        let words: Vec<&str> = lhs.split_whitespace().collect();
        let Some(last) = words.last() else { return };
        let is_typed = words.len() >= 2
            && words[..words.len() - 1]
                .iter()
                .all(|w| is_identifier(w.trim_end_matches(&['*', '&'][..])));
        if (index == 0 && !is_typed) || (index > 0 && words.len() != 1) {
            return;
        }
        let name = last.trim_start_matches(&['*', '&'][..]);
        let name = name.split('[').next().unwrap_or(name);
        if !is_identifier(name) {
            return;
        }
        let value = init.map_or(Value::Number(0.0), |init| parse_value(init, globals));
        globals.insert(name.to_string(), value);
    }
}

struct Signature {
    name: String,
    params: Vec<String>,
    start: usize,
}

/// Recognise `<type> name(params)` directly before the brace at `open`.
fn signature_before(text: &str, open: usize) -> Option<Signature> {
    let head = text[..open].trim_end();
    if !head.ends_with(')') {
        return None;
    }
    let mut depth = 0i64;
    let mut paren_open = None;
    for (i, b) in head.bytes().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    paren_open = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let paren_open = paren_open?;
    let before = head[..paren_open].trim_end();
    let start = before
        .char_indices()
        .rev()
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_'))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let name = &before[start..];
    if !is_identifier(name) || matches!(name, "if" | "for" | "while" | "switch") {
        return None;
    }
    let separated = before[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_whitespace() || c == '*' || c == '&');
    if !separated {
        return None;
    }
    let return_type = before[..start].trim_end();
    let ends_in_type = return_type
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '*' || c == '&');
    if !ends_in_type {
        return None;
    }
    let params = split_args(&head[paren_open + 1..head.len() - 1])
        .into_iter()
        .filter_map(param_name)
        .collect();
    Some(Signature {
        name: name.to_string(),
        params,
        start,
    })
}

/// Last identifier of a parameter declaration (`const char *msg` → `msg`)
fn param_name(param: &str) -> Option<String> {
    let decl = param.split('=').next().unwrap_or(param);
    let name = decl
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .last()?;
    if name == "void" || !is_identifier(name) {
        return None;
    }
    Some(name.to_string())
}

fn is_filler(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || c == '{' || c == '}' || c == ';')
}

fn is_chain(keyword: Keyword) -> bool {
    matches!(keyword, Keyword::If | Keyword::ElseIf | Keyword::Else)
}

/// Cut a block body into statements. `first_line` is the line the body text
/// starts on.
pub fn tokenize_block(text: &str, first_line: usize) -> Vec<StatementSource> {
    let lines: Vec<&str> = text.lines().collect();
    let mut statements = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let raw = lines[i];
        let line = raw.trim().trim_start_matches('}').trim_start();
        let location = SourceLocation::new(first_line + i, raw.len() - raw.trim_start().len() + 1);
        if is_filler(line) {
            i += 1;
            continue;
        }

        if let Some(keyword) = leading_keyword(line) {
            let (next, text) = absorb_compound(&lines, i, line, keyword);
            statements.push(StatementSource { text, location });
            i = next;
            continue;
        }

        // A call split over several lines is joined back together
        let mut joined = line.to_string();
        let mut open_parens = paren_delta(line);
        while open_parens > 0 && i + 1 < lines.len() {
            i += 1;
            joined.push(' ');
            joined.push_str(lines[i].trim());
            open_parens += paren_delta(lines[i]);
        }
        i += 1;

        for part in split_top_level(&joined, ";") {
            let part = part.trim();
            if !is_filler(part) {
                statements.push(StatementSource {
                    text: part.to_string(),
                    location,
                });
            }
        }
    }
    statements
}

/// Collect a compound statement starting at `lines[start]` (given trimmed as
/// `first`). Returns the index after it and its text.
fn absorb_compound(lines: &[&str], start: usize, first: &str, keyword: Keyword) -> (usize, String) {
    let mut collected: Vec<&str> = Vec::new();
    let mut depth = 0i64;
    let mut opened = false;
    let mut i = start;

    loop {
        let line = if i == start { first } else { lines[i] };
        collected.push(line);
        depth += brace_delta(line);
        opened |= contains_code(line, b'{');
        i += 1;

        let complete = depth <= 0 && (opened || line.trim_end().ends_with(';'));
        if complete {
            if !is_chain(keyword) {
                break;
            }
            let next = (i..lines.len()).find(|&j| !lines[j].trim().is_empty());
            let continues = next.is_some_and(|j| {
                matches!(
                    leading_keyword(lines[j]),
                    Some(Keyword::Else | Keyword::ElseIf)
                )
            });
            match next {
                Some(j) if continues => {
                    collected.extend(&lines[i..j]);
                    i = j;
                    depth = 0;
                    opened = false;
                }
                _ => break,
            }
        }
        if i >= lines.len() {
            break;
        }
    }
    (i, collected.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(statements: &[StatementSource]) -> Vec<&str> {
        statements.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_strip_comments_keeps_lines_and_strings() {
        let src = "a(); // note\n/* one\ntwo */b(\"//x\");";
        assert_eq!(strip_comments(src), "a(); \n\nb(\"//x\");");
    }

    #[test]
    fn test_globals() {
        let sketch = extract(
            "#define LED 2\n\
             const int DELAY_MS = 500;\n\
             int count;\n\
             String name = \"esp\";\n\
             int pin = LED, other = 3;\n\
             void blink(int times);\n\
             void setup() { int local = 4; }\n",
        );
        let g = &sketch.globals;
        assert_eq!(g.get("LED"), Some(&Value::Number(2.0)));
        assert_eq!(g.get("DELAY_MS"), Some(&Value::Number(500.0)));
        assert_eq!(g.get("count"), Some(&Value::Number(0.0)));
        assert_eq!(g.get("name"), Some(&Value::from("esp")));
        assert_eq!(g.get("pin"), Some(&Value::Number(2.0)));
        assert_eq!(g.get("other"), Some(&Value::Number(3.0)));
        assert!(g.get("local").is_none());
        assert!(g.get("times").is_none());
    }

    #[test]
    fn test_setup_loop_and_functions() {
        let src = "void setup() {\n  pinMode(2, OUTPUT);\n}\n\nvoid loop()\n{\n  blink(2, 100);\n}\n\nvoid blink(int pin, unsigned long ms) {\n  digitalWrite(pin, HIGH);\n  delay(ms);\n}\n";
        let sketch = extract(src);
        assert_eq!(texts(&sketch.setup), vec!["pinMode(2, OUTPUT)"]);
        assert_eq!(sketch.setup[0].location.line, 2);
        assert_eq!(texts(&sketch.loop_body), vec!["blink(2, 100)"]);
        assert_eq!(sketch.loop_body[0].location.line, 7);

        assert_eq!(sketch.functions.len(), 1);
        let blink = &sketch.functions[0];
        assert_eq!(blink.name, "blink");
        assert_eq!(blink.params, vec!["pin", "ms"]);
        assert_eq!(texts(&blink.body), vec!["digitalWrite(pin, HIGH)", "delay(ms)"]);
        assert_eq!(blink.location.line, 10);
    }

    #[test]
    fn test_missing_setup_and_loop() {
        let sketch = extract("int x = 1;");
        assert!(sketch.setup.is_empty());
        assert!(sketch.loop_body.is_empty());
        assert!(sketch.functions.is_empty());
    }

    #[test]
    fn test_non_ascii_text_around_signatures() {
        let src = "void café() { }\nString título = \"ñ\";\nvoid ünïcode_setup(int ß) { }\nvoid setup() { Serial.println(\"héllo\"); }\nvoid loop() {}";
        let sketch = extract(src);
        assert!(sketch.functions.is_empty());
        assert_eq!(texts(&sketch.setup), vec!["Serial.println(\"héllo\")"]);
        assert_eq!(sketch.setup[0].location.line, 4);
        assert!(sketch.loop_body.is_empty());
    }

    #[test]
    fn test_compound_statements() {
        let body = "\n  if (x > 1) {\n    a();\n  }\n  else {\n    b();\n  }\n  for (int i = 0; i < 3; i++) {\n    c();\n  }\n  d(); e();\n";
        let statements = tokenize_block(body, 1);
        assert_eq!(
            texts(&statements),
            vec![
                "if (x > 1) {\n    a();\n  }\n  else {\n    b();\n  }",
                "for (int i = 0; i < 3; i++) {\n    c();\n  }",
                "d()",
                "e()",
            ]
        );
        assert_eq!(statements[0].location.line, 2);
        assert_eq!(statements[1].location.line, 8);
        assert_eq!(statements[2].location.line, 11);
    }

    #[test]
    fn test_braceless_compound() {
        let statements = tokenize_block("if (x)\n  a();\nelse\n  b();\nc();", 1);
        assert_eq!(texts(&statements), vec!["if (x)\n  a();\nelse\n  b();", "c()"]);
    }

    #[test]
    fn test_multiline_call_is_joined() {
        let statements = tokenize_block("Serial.printf(\"%d\\n\",\n    value);", 1);
        assert_eq!(texts(&statements), vec!["Serial.printf(\"%d\\n\", value)"]);
    }
}
