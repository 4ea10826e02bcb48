//! Main TUI application state and logic

use crate::board::{PinId, MAX_ADC};
use crate::circuit::Circuit;
use crate::interpreter::{Engine, RunStatus, Step};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::panes::SourceScrollState;

/// Longest wait for input between engine polls
const MAX_IDLE: Duration = Duration::from_millis(50);
const MIN_SPEED: f64 = 1.0 / 64.0;
const MAX_SPEED: f64 = 64.0;
/// ADC change per `[` / `]` press
const ADC_STEP: f64 = 256.0;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Pins,
    Serial,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> serial -> pins)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Serial,
            FocusedPane::Serial => FocusedPane::Pins,
            FocusedPane::Pins => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Pins,
            FocusedPane::Serial => FocusedPane::Source,
            FocusedPane::Pins => FocusedPane::Serial,
        }
    }
}

/// Circuit loaded on the command line, kept for export
pub struct LoadedCircuit {
    pub circuit: Circuit,
    pub path: PathBuf,
}

/// The main application state
pub struct App {
    pub engine: Engine,

    /// The sketch being run
    pub source_code: String,
    pub circuit: Option<LoadedCircuit>,

    pub focused_pane: FocusedPane,

    pub source_scroll: SourceScrollState,
    pub pins_scroll: usize,
    pub serial_scroll: usize,
    /// Row of the pin table targeted by the pin input keys
    pub selected_pin: usize,

    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,
    /// Latest transition reported by the engine, not yet shown
    status_change: Rc<Cell<Option<RunStatus>>>,
}

impl App {
    pub fn new(mut engine: Engine, source_code: String, circuit: Option<LoadedCircuit>) -> Self {
        let status_change = Rc::new(Cell::new(None));
        let sink = Rc::clone(&status_change);
        engine.on_status(move |status| sink.set(Some(status)));

        App {
            engine,
            source_code,
            circuit,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            pins_scroll: 0,
            serial_scroll: usize::MAX,
            selected_pin: 0,
            should_quit: false,
            status_message: String::from("Ready!"),
            status_change,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            let step = self.engine.poll();
            self.take_status_change();

            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            let timeout = match step {
                Step::Pending(due) => due.saturating_duration_since(Instant::now()).min(MAX_IDLE),
                Step::Halted(_) => MAX_IDLE,
            };
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        self.engine.stop();
        Ok(())
    }

    fn take_status_change(&mut self) {
        let Some(status) = self.status_change.take() else {
            return;
        };
        self.status_message = match status {
            RunStatus::Idle => "Board reset".to_string(),
            RunStatus::Running => "Sketch running".to_string(),
            RunStatus::Stopped => "Sketch stopped".to_string(),
            RunStatus::Error => "Sketch failed, see the serial monitor".to_string(),
        };
        self.serial_scroll = usize::MAX;
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Serial (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(columns[0]);

        let status = self.engine.status();
        super::panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            self.engine.current_location().line,
            status == RunStatus::Error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        super::panes::render_serial_pane(
            frame,
            left_rows[1],
            self.engine.serial(),
            self.focused_pane == FocusedPane::Serial,
            &mut self.serial_scroll,
        );

        super::panes::render_pins_pane(
            frame,
            columns[1],
            self.engine.pins(),
            self.selected_pin,
            self.focused_pane == FocusedPane::Pins,
            &mut self.pins_scroll,
        );

        super::panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            status,
            self.engine.speed(),
            self.engine.millis(),
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char('s') => self.toggle_run(),
            KeyCode::Char('r') => {
                self.engine.reset();
                self.take_status_change();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.scale_speed(2.0),
            KeyCode::Char('-') => self.scale_speed(0.5),
            KeyCode::Char('e') => self.export_circuit(),
            KeyCode::Char(' ') => self.toggle_selected_pin(),
            KeyCode::Char('[') => self.nudge_selected_adc(-ADC_STEP),
            KeyCode::Char(']') => self.nudge_selected_adc(ADC_STEP),
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Pins => {
                    self.selected_pin = self.selected_pin.saturating_sub(1);
                }
                FocusedPane::Serial => {
                    self.serial_scroll = self.serial_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Pins => {
                    let last = self.engine.pins().iter().count().saturating_sub(1);
                    self.selected_pin = (self.selected_pin + 1).min(last);
                }
                FocusedPane::Serial => {
                    self.serial_scroll = self.serial_scroll.saturating_add(1);
                }
            },
            KeyCode::End => {
                self.serial_scroll = usize::MAX;
            }
            _ => {}
        }
    }

    fn toggle_run(&mut self) {
        if self.engine.status() == RunStatus::Running {
            self.engine.stop();
        } else if let Err(err) = self.engine.start(&self.source_code) {
            self.status_message = err.to_string();
        }
        self.take_status_change();
    }

    fn scale_speed(&mut self, factor: f64) {
        let speed = (self.engine.speed() * factor).clamp(MIN_SPEED, MAX_SPEED);
        self.status_message = match self.engine.set_speed(speed) {
            Ok(()) => format!("Speed ×{}", speed),
            Err(err) => err.to_string(),
        };
    }

    fn selected_pin_id(&self) -> Option<PinId> {
        self.engine
            .pins()
            .iter()
            .nth(self.selected_pin)
            .map(|(id, _)| id)
    }

    fn toggle_selected_pin(&mut self) {
        let Some(id) = self.selected_pin_id() else {
            return;
        };
        if id.is_rail() {
            self.status_message = format!("{} is a supply rail", id);
            return;
        }
        let level = self.engine.pins().read_digital(id);
        self.engine.pins_mut().write_digital(id, f64::from(1 - level.min(1)));
        self.status_message = format!("{} driven {}", id, if level == 0 { "HIGH" } else { "LOW" });
    }

    fn nudge_selected_adc(&mut self, delta: f64) {
        let Some(id) = self.selected_pin_id() else {
            return;
        };
        let Some(pin) = self.engine.pins().pin(id) else {
            return;
        };
        if !pin.is_adc {
            self.status_message = format!("{} has no ADC channel", id);
            return;
        }
        let raw = (f64::from(pin.analog) + delta).clamp(0.0, f64::from(MAX_ADC));
        self.engine.pins_mut().set_analog_value(id, raw);
        self.status_message = format!("{} ADC = {}", id, raw);
    }

    fn export_circuit(&mut self) {
        let Some(loaded) = &self.circuit else {
            self.status_message = "No circuit loaded".to_string();
            return;
        };
        let target = export_path(&loaded.path);
        let result = self
            .engine
            .export_circuit(&loaded.circuit)
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(&target, json).map_err(|err| err.to_string()));
        self.status_message = match result {
            Ok(()) => format!("Circuit exported to {}", target.display()),
            Err(err) => format!("Export failed: {}", err),
        };
    }
}

/// `diagram.json` exports to `diagram.export.json`
pub fn export_path(circuit: &Path) -> PathBuf {
    circuit.with_extension("export.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{EngineConfig, ManualClock};

    fn app(source: &str) -> App {
        let engine = Engine::with_clock(EngineConfig::default(), ManualClock::new());
        App::new(engine, source.to_string(), None)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::from(code));
    }

    #[test]
    fn test_focus_cycles() {
        let mut focus = FocusedPane::Source;
        for _ in 0..3 {
            focus = focus.next();
        }
        assert_eq!(focus, FocusedPane::Source);
        assert_eq!(FocusedPane::Source.prev().next(), FocusedPane::Source);
    }

    #[test]
    fn test_run_and_stop_keys() {
        let mut app = app("void loop() { delay(1000); }");
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.engine.status(), RunStatus::Running);
        assert_eq!(app.status_message, "Sketch running");
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.engine.status(), RunStatus::Stopped);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.status_message, "Board reset");
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut app = app("");
        for _ in 0..10 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.engine.speed(), MAX_SPEED);
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.engine.speed(), MAX_SPEED / 2.0);
    }

    #[test]
    fn test_pin_input_keys() {
        let mut app = app("");
        // Rails come first in the table
        press(&mut app, KeyCode::Char(' '));
        assert!(app.status_message.contains("supply rail"));

        app.focused_pane = FocusedPane::Pins;
        for _ in 0..3 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.selected_pin_id(), Some(PinId::Gpio(0)));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.engine.pins().read_digital(PinId::Gpio(0)), 1);
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char('['));
        assert_eq!(app.engine.pins().read_analog(PinId::Gpio(0)), 256);
    }

    #[test]
    fn test_export_needs_a_circuit() {
        let mut app = app("");
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.status_message, "No circuit loaded");
        assert_eq!(
            export_path(Path::new("demo/diagram.json")),
            PathBuf::from("demo/diagram.export.json")
        );
    }
}
