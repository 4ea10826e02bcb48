//! Pin table pane rendering
//!
//! One row per pin of the simulated board: name, mode, digital level, PWM
//! duty, last ADC reading, capabilities and the peripheral wired to it. The
//! selected row is the target of the pin input keys.

use crate::board::{PinBoard, PinId, PinMode, PinState};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

fn capabilities(pin: &PinState) -> &'static str {
    match (pin.is_adc, pin.is_dac) {
        (true, true) => "ADC DAC",
        (true, false) => "ADC",
        (false, true) => "DAC",
        (false, false) => "",
    }
}

fn pin_row(id: PinId, pin: &PinState, selected: bool) -> Line<'static> {
    let level_style = if pin.mode == PinMode::Power {
        Style::default().fg(DEFAULT_THEME.power)
    } else if pin.digital == 1 {
        Style::default()
            .fg(DEFAULT_THEME.success)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.comment)
    };
    let pwm_style = if pin.pwm > 0 {
        Style::default().fg(DEFAULT_THEME.secondary)
    } else {
        Style::default().fg(DEFAULT_THEME.comment)
    };
    let connection = pin
        .connection
        .as_ref()
        .map(|c| format!("{} ({})", c.component_id, c.label))
        .unwrap_or_default();

    let mut line = Line::from(vec![
        Span::styled(
            format!("{:<7}", id.to_string()),
            Style::default().fg(DEFAULT_THEME.function),
        ),
        Span::styled(
            format!("{:<13}", pin.mode.as_str()),
            Style::default().fg(DEFAULT_THEME.type_name),
        ),
        Span::styled(format!("{:<3}", if pin.digital == 1 { "H" } else { "L" }), level_style),
        Span::styled(format!("{:>4} ", pin.pwm), pwm_style),
        Span::styled(
            format!("{:>5} ", pin.analog),
            Style::default().fg(DEFAULT_THEME.number),
        ),
        Span::styled(
            format!("{:<8}", capabilities(pin)),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
        Span::styled(connection, Style::default().fg(DEFAULT_THEME.fg)),
    ]);
    if selected {
        line = line.style(Style::default().bg(DEFAULT_THEME.current_line_bg));
    }
    line
}

/// Render the pin table pane
pub fn render_pins_pane(
    frame: &mut Frame,
    area: Rect,
    pins: &PinBoard,
    selected: usize,
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
        .title(" Pins ")
        .borders(Borders::ALL)
        .border_style(border_style);

    // Header row plus borders
    let visible_height = area.height.saturating_sub(3).max(1) as usize;
    if selected < *scroll_offset {
        *scroll_offset = selected;
    } else if selected >= *scroll_offset + visible_height {
        *scroll_offset = selected + 1 - visible_height;
    }

    let header = ListItem::new(Line::from(Span::styled(
        format!(
            "{:<7}{:<13}{:<3}{:>4} {:>5} {:<8}{}",
            "PIN", "MODE", "D", "PWM", "ADC", "CAPS", "WIRED TO"
        ),
        Style::default()
            .fg(DEFAULT_THEME.comment)
            .add_modifier(Modifier::BOLD),
    )));
    let rows = pins
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, (id, pin))| ListItem::new(pin_row(id, pin, idx == selected)));

    let list = List::new(std::iter::once(header).chain(rows)).block(block);
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_row_shows_state() {
        let mut board = PinBoard::new();
        board.write_analog(PinId::Gpio(25), 128.0);
        board.connect(PinId::Gpio(25), "led1", "led");
        let pin = board.pin(PinId::Gpio(25)).cloned().unwrap();
        let row = text(&pin_row(PinId::Gpio(25), &pin, false));
        assert!(row.starts_with("GPIO25 INPUT"));
        assert!(row.contains(" 128 "));
        assert!(row.contains("ADC DAC"));
        assert!(row.ends_with("led1 (led)"));
    }

    #[test]
    fn test_level_colours() {
        let board = PinBoard::new();
        let rail: PinId = "3V3".parse().unwrap();
        let row = pin_row(rail, board.pin(rail).unwrap(), false);
        assert_eq!(row.spans[2].style.fg, Some(DEFAULT_THEME.power));

        let mut board = PinBoard::new();
        board.write_digital(PinId::Gpio(2), 1.0);
        let row = pin_row(PinId::Gpio(2), board.pin(PinId::Gpio(2)).unwrap(), false);
        assert_eq!(row.spans[2].style.fg, Some(DEFAULT_THEME.success));
    }
}
