//! Status bar rendering with keybindings and run state

use crate::interpreter::RunStatus;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

fn status_color(status: RunStatus) -> Color {
    match status {
        RunStatus::Idle => DEFAULT_THEME.comment,
        RunStatus::Running => DEFAULT_THEME.success,
        RunStatus::Stopped => DEFAULT_THEME.secondary,
        RunStatus::Error => DEFAULT_THEME.error,
    }
}

/// Simulated time as `m:ss.mmm`
fn format_sim_time(millis: f64) -> String {
    let total = millis.max(0.0) as u64;
    format!("{}:{:02}.{:03}", total / 60_000, (total / 1000) % 60, total % 1000)
}

/// Render the status bar at the bottom.
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    status: RunStatus,
    speed: f64,
    sim_millis: f64,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let bar_style = Style::default().bg(DEFAULT_THEME.current_line_bg);
    let left_spans = vec![
        Span::styled(
            format!(" {} ", status.as_str().to_uppercase()),
            Style::default()
                .bg(status_color(status))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} │ ×{} ", format_sim_time(sim_millis), speed),
            bar_style.fg(DEFAULT_THEME.comment),
        ),
        Span::styled(
            format!(" {} ", message),
            bar_style.fg(if status == RunStatus::Error {
                DEFAULT_THEME.error
            } else {
                DEFAULT_THEME.fg
            }),
        ),
    ];
    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(bar_style)
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar_style.fg(DEFAULT_THEME.fg);
    let sep_style = bar_style.fg(DEFAULT_THEME.comment);

    let bindings = [
        ("s", "run/stop"),
        ("r", "reset"),
        ("+/-", "speed"),
        ("⎵", "toggle pin"),
        ("[/]", "adc"),
        ("e", "export"),
        ("q", "quit"),
    ];
    let mut right_spans = Vec::new();
    for (idx, (key, desc)) in bindings.iter().enumerate() {
        if idx > 0 {
            right_spans.push(Span::styled("│", sep_style));
        }
        right_spans.push(Span::styled(format!(" {} ", key), key_style));
        right_spans.push(Span::styled(format!(" {} ", desc), desc_style));
    }
    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(bar_style)
            .alignment(Alignment::Right),
        layout[1],
    );
}
