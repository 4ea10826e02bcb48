use ratatui::style::Color;

/// Colours shared by every pane
pub struct Theme {
    pub fg: Color,
    pub primary: Color,         // serial system lines
    pub secondary: Color,       // PWM output, stopped runs
    pub comment: Color,         // idle pins, timestamps
    pub success: Color,         // HIGH levels, running
    pub error: Color,           // fatal errors
    pub keyword: Color,         // sketch keywords
    pub string: Color,          // string and char literals
    pub number: Color,          // numbers, ADC readings
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color, // executing line
    pub function: Color,        // calls, pin names
    pub type_name: Color,       // types, pin modes, printf
    pub power: Color,           // supply rails
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),
    secondary: Color::Rgb(250, 179, 135),
    comment: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    keyword: Color::Rgb(203, 166, 247),
    string: Color::Rgb(166, 227, 161),
    number: Color::Rgb(250, 179, 135),
    border_focused: Color::Rgb(249, 226, 175),
    border_normal: Color::Rgb(88, 91, 112),
    current_line_bg: Color::Rgb(49, 50, 68),
    function: Color::Rgb(137, 220, 235),
    type_name: Color::Rgb(148, 226, 213),
    power: Color::Rgb(245, 194, 231),
};
