//! Serial monitor pane rendering

use crate::serial::{SerialCategory, SerialMonitor};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

fn category_style(category: SerialCategory) -> Style {
    match category {
        SerialCategory::Print | SerialCategory::Println => Style::default().fg(DEFAULT_THEME.fg),
        SerialCategory::Printf => Style::default().fg(DEFAULT_THEME.type_name),
        SerialCategory::System => Style::default().fg(DEFAULT_THEME.primary),
        SerialCategory::Error => Style::default()
            .fg(DEFAULT_THEME.error)
            .add_modifier(Modifier::BOLD),
    }
}

/// One display line per text line of every event, each stamped with the
/// simulated time of its event.
fn serial_lines(serial: &SerialMonitor) -> Vec<Line<'static>> {
    let stamp_style = Style::default().fg(DEFAULT_THEME.comment);
    let mut lines = Vec::new();
    for event in serial.events() {
        let style = category_style(event.category);
        let text = event.text.strip_suffix('\n').unwrap_or(&event.text);
        for part in text.split('\n') {
            lines.push(Line::from(vec![
                Span::styled(format!("{:>9.3}s ", event.elapsed), stamp_style),
                Span::styled(part.to_string(), style),
            ]));
        }
    }
    if !serial.pending().is_empty() {
        lines.push(Line::from(vec![
            Span::styled(format!("{:>10} ", "…"), stamp_style),
            Span::styled(
                serial.pending().to_string(),
                Style::default()
                    .fg(DEFAULT_THEME.fg)
                    .add_modifier(Modifier::DIM),
            ),
        ]));
    }
    lines
}

/// Render the serial monitor pane
pub fn render_serial_pane(
    frame: &mut Frame,
    area: Rect,
    serial: &SerialMonitor,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Serial Monitor ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines = serial_lines(serial);

    if lines.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let total_items = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // usize::MAX pins the view to the newest output
    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let visible_items: Vec<ListItem> = lines
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(ListItem::new)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
