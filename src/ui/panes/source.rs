//! Source code pane rendering with syntax highlighting
//!
//! This module renders the source code pane, which displays the sketch being
//! run with basic syntax highlighting and an execution indicator.
//!
//! # Features
//!
//! - Syntax highlighting for sketch keywords, types, pin constants, strings,
//!   numbers and comments
//! - The line of the statement executed last is highlighted, or marked red
//!   when the run failed there
//! - The highlighted line is kept at a fixed visual row while the sketch runs
//!
//! # Rendering
//!
//! The pane uses a simple character-by-character tokenizer to apply syntax
//! highlighting styles without requiring a full lexer.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Simple syntax highlighting for sketch source
fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (at, c) = chars[i];

        // Comments and preprocessor lines run to the end of the line
        let rest = &line[at..];
        if rest.starts_with("//") || (c == '#' && current_word.is_empty()) {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            let color = if c == '#' {
                DEFAULT_THEME.keyword
            } else {
                DEFAULT_THEME.comment
            };
            spans.push(Span::styled(rest.to_string(), Style::default().fg(color)));
            break;
        }

        if c == '"' || c == '\'' {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != c {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let stop = chars.get(end).map_or(line.len(), |(pos, _)| *pos);
            spans.push(Span::styled(
                line[at..stop].to_string(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            if !current_word.is_empty() {
                let style = get_keyword_style(&current_word, c == '(');
                spans.push(Span::styled(std::mem::take(&mut current_word), style));
            }
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    if !current_word.is_empty() {
        let style = get_keyword_style(&current_word, false);
        spans.push(Span::styled(current_word, style));
    }

    Line::from(spans)
}

fn get_keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "int" | "long" | "short" | "unsigned" | "float" | "double" | "bool" | "boolean"
        | "byte" | "char" | "void" | "String" | "const" | "static" | "volatile" | "uint8_t"
        | "uint16_t" | "uint32_t" | "int8_t" | "int16_t" | "int32_t" | "size_t" => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        "if" | "else" | "for" | "while" | "return" | "break" | "continue" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "HIGH" | "LOW" | "INPUT" | "OUTPUT" | "INPUT_PULLUP" | "true" | "false" => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Scroll state for the source pane
#[derive(Debug, Default)]
pub struct SourceScrollState {
    pub offset: usize,
    /// Visual row the current line is pinned to, `None` until first render
    pub target_line_row: Option<usize>,
}

/// Render the source code pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current_line: usize,
    is_error: bool,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Sketch ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    if current_line > 0 && current_line <= total_lines {
        let target_line_idx = current_line - 1;
        scroll_state.offset = target_line_idx.saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;

            let (num_style, content_style) = match (is_current, is_error) {
                (true, true) => (
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                    Some(
                        Style::default()
                            .bg(DEFAULT_THEME.error)
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    ),
                ),
                (true, false) => (
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD),
                    Some(Style::default().bg(DEFAULT_THEME.current_line_bg)),
                ),
                _ => (Style::default().fg(DEFAULT_THEME.comment), None),
            };

            let mut content_line = highlight_source_code(line);
            if let Some(style) = content_style {
                for span in &mut content_line.spans {
                    span.style = if is_error { style } else { span.style.patch(style) };
                }
            }

            let mut spans = vec![Span::styled(format!("{:4} ", line_num), num_style)];
            spans.extend(content_line.spans);
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_highlighting_keeps_text() {
        let src = r#"  if (x > 0) { Serial.println("a \"b\""); } // done"#;
        assert_eq!(text(&highlight_source_code(src)), src);
    }

    #[test]
    fn test_unterminated_string() {
        let src = "char c = 'x";
        assert_eq!(text(&highlight_source_code(src)), src);
    }

    #[test]
    fn test_keyword_styles() {
        assert_eq!(
            get_keyword_style("HIGH", false).fg,
            Some(DEFAULT_THEME.number)
        );
        assert_eq!(
            get_keyword_style("digitalWrite", true).fg,
            Some(DEFAULT_THEME.function)
        );
        assert_eq!(
            get_keyword_style("String", false).fg,
            Some(DEFAULT_THEME.type_name)
        );
    }
}
