// Run-loop scheduler for the sketch interpreter

use crate::board::{PeripheralDescriptor, PeripheralRegistry, PinBoard};
use crate::circuit::{Circuit, CircuitError};
use crate::interpreter::clock::{Clock, SystemClock};
use crate::interpreter::constants::{ERROR_PREFIX, MAX_CALL_DEPTH, MAX_STEPS_PER_POLL, POLL_SLICE};
use crate::interpreter::errors::{EngineError, RuntimeError};
use crate::interpreter::loops::Frame;
use crate::interpreter::state::InterpreterState;
use crate::memory::Value;
use crate::parser::ast::SourceLocation;
use crate::parser::expressions::{lower_cond, lower_expr};
use crate::serial::{SerialCategory, SerialEvent, SerialMonitor, SerialSubscription, DEFAULT_HISTORY};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Stopped => "stopped",
            RunStatus::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of driving the engine once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Still running; nothing is due before this instant
    Pending(Instant),
    /// Not running (any more)
    Halted(RunStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Setup,
    Loop,
}

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Initial simulation speed multiplier
    pub speed: f64,
    /// Serial events kept in the history
    pub serial_history: usize,
    /// Deepest allowed nesting of user function calls
    pub max_call_depth: usize,
    /// Wall-clock budget of one `poll`
    pub poll_slice: Duration,
    /// Seed for `random()`; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            speed: 1.0,
            serial_history: DEFAULT_HISTORY,
            max_call_depth: MAX_CALL_DEPTH,
            poll_slice: POLL_SLICE,
            seed: None,
        }
    }
}

type StatusCallback = Box<dyn FnMut(RunStatus)>;

/// The sketch engine: owns the pins, the serial monitor and the run state
pub struct Engine {
    pub(crate) config: EngineConfig,
    clock: Box<dyn Clock>,
    status: RunStatus,
    status_subscribers: Vec<StatusCallback>,

    /// Parsed sketch and its variables
    pub(crate) state: InterpreterState,
    /// Suspended execution, innermost last
    pub(crate) frames: Vec<Frame>,
    pub(crate) phase: Phase,

    pub(crate) pins: PinBoard,
    peripherals: PeripheralRegistry,
    pub(crate) serial: SerialMonitor,

    pub(crate) speed: f64,
    started_at: Option<Instant>,
    /// Elapsed time pinned when the run ended
    frozen_elapsed: Option<Duration>,
    /// Next instant at which `step` may run
    due: Option<Instant>,
    pub(crate) current_location: SourceLocation,
    pub(crate) rng: StdRng,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: EngineConfig, clock: impl Clock + 'static) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let speed = if config.speed.is_finite() && config.speed > 0.0 {
            config.speed
        } else {
            1.0
        };
        Engine {
            serial: SerialMonitor::with_capacity(config.serial_history),
            config,
            clock: Box::new(clock),
            status: RunStatus::Idle,
            status_subscribers: Vec::new(),
            state: InterpreterState::empty(),
            frames: Vec::new(),
            phase: Phase::Setup,
            pins: PinBoard::new(),
            peripherals: PeripheralRegistry::new(),
            speed,
            started_at: None,
            frozen_elapsed: None,
            due: None,
            current_location: SourceLocation::default(),
            rng,
        }
    }

    /// Parse `source` and begin running it from `setup`.
    ///
    /// Allowed from every state except running. The sketch executes as the
    /// host calls [`step`](Self::step) or [`poll`](Self::poll).
    pub fn start(&mut self, source: &str) -> Result<(), EngineError> {
        if self.status == RunStatus::Running {
            return Err(EngineError::AlreadyRunning);
        }
        self.state = InterpreterState::parse(source);
        self.frames.clear();
        self.frames.push(Frame::sequence(&self.state.setup));
        self.phase = Phase::Setup;
        self.started_at = Some(self.clock.now());
        self.frozen_elapsed = None;
        self.due = None;
        self.current_location = SourceLocation::default();
        self.set_status(RunStatus::Running);
        Ok(())
    }

    /// Stop a running sketch. Takes effect before the next statement runs.
    pub fn stop(&mut self) {
        if self.status != RunStatus::Running {
            return;
        }
        self.halt();
        self.set_status(RunStatus::Stopped);
    }

    /// Stop if running, then return pins, variables, pending serial text
    /// and peripherals to their initial state.
    pub fn reset(&mut self) {
        self.stop();
        self.pins.reset_all();
        self.peripherals.reset_all(&mut self.pins);
        self.state.scopes.clear();
        self.serial.clear_pending();
        self.frames.clear();
        self.started_at = None;
        self.frozen_elapsed = None;
        self.due = None;
        self.current_location = SourceLocation::default();
        self.set_status(RunStatus::Idle);
    }

    /// Run until the next suspension point, if one is due.
    pub fn step(&mut self) -> Step {
        if self.status != RunStatus::Running {
            return Step::Halted(self.status);
        }
        if let Some(due) = self.due {
            if self.clock.now() < due {
                return Step::Pending(due);
            }
        }
        match self.run_frames() {
            Ok(pause) => {
                let due = self.clock.now() + pause;
                self.due = Some(due);
                Step::Pending(due)
            }
            Err(err) => {
                self.fail(err);
                Step::Halted(self.status)
            }
        }
    }

    /// Run every step that is due, within one poll slice.
    pub fn poll(&mut self) -> Step {
        let started = self.clock.now();
        let mut last = self.step();
        for _ in 1..MAX_STEPS_PER_POLL {
            let now = self.clock.now();
            match last {
                Step::Pending(due) if due <= now && now - started < self.config.poll_slice => {
                    last = self.step();
                }
                _ => break,
            }
        }
        last
    }

    fn halt(&mut self) {
        let timestamp = self.serial_timestamp();
        self.serial.flush(timestamp);
        self.frozen_elapsed = Some(self.elapsed());
        self.frames.clear();
        self.state.scopes.exit_all_calls();
        self.due = None;
    }

    fn fail(&mut self, err: RuntimeError) {
        self.halt();
        let timestamp = self.serial_timestamp();
        self.serial.emit(
            &format!("{}{}", ERROR_PREFIX, err),
            SerialCategory::Error,
            timestamp,
        );
        self.set_status(RunStatus::Error);
    }

    fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        for callback in self.status_subscribers.iter_mut() {
            callback(status);
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn on_status(&mut self, callback: impl FnMut(RunStatus) + 'static) {
        self.status_subscribers.push(Box::new(callback));
    }

    pub fn on_serial(&mut self, callback: impl FnMut(&SerialEvent) + 'static) -> SerialSubscription {
        self.serial.subscribe(callback)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change the speed multiplier. Applies from the next delay or time read.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), EngineError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(EngineError::InvalidSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    /// Wall time since start, frozen once the run ends
    pub fn elapsed(&self) -> Duration {
        match (self.frozen_elapsed, self.started_at) {
            (Some(frozen), _) => frozen,
            (None, Some(start)) => self.clock.now().saturating_duration_since(start),
            (None, None) => Duration::ZERO,
        }
    }

    /// Simulated milliseconds, as `millis()` reports them
    pub fn millis(&self) -> f64 {
        (self.elapsed().as_secs_f64() * 1000.0 * self.speed).floor()
    }

    /// Simulated microseconds, as `micros()` reports them
    pub fn micros(&self) -> f64 {
        (self.elapsed().as_secs_f64() * 1000.0 * self.speed * 1000.0).floor()
    }

    pub(crate) fn serial_timestamp(&self) -> f64 {
        self.elapsed().as_secs_f64() * self.speed
    }

    pub fn pins(&self) -> &PinBoard {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut PinBoard {
        &mut self.pins
    }

    pub fn serial(&self) -> &SerialMonitor {
        &self.serial
    }

    pub fn peripherals(&self) -> &PeripheralRegistry {
        &self.peripherals
    }

    pub fn register_peripheral(&mut self, id: &str, descriptor: PeripheralDescriptor) {
        self.peripherals.register(id, descriptor, &mut self.pins);
    }

    pub fn remove_peripheral(&mut self, id: &str) -> bool {
        self.peripherals.remove(id, &mut self.pins)
    }

    /// Parse circuit JSON. Malformed input is reported on the serial monitor
    /// and yields `None`.
    pub fn import_circuit(&mut self, json: &str) -> Option<Circuit> {
        match Circuit::from_json(json) {
            Ok(circuit) => Some(circuit),
            Err(err) => {
                let timestamp = self.serial_timestamp();
                self.serial.emit(
                    &format!("{}{}", ERROR_PREFIX, err),
                    SerialCategory::Error,
                    timestamp,
                );
                None
            }
        }
    }

    pub fn export_circuit(&self, circuit: &Circuit) -> Result<String, CircuitError> {
        circuit.to_json()
    }

    /// Register every part wired to the board as a peripheral. Returns how
    /// many were attached.
    pub fn attach_circuit(&mut self, circuit: &Circuit) -> usize {
        let Some(board) = circuit.board_id() else {
            return 0;
        };
        let mut attached = 0;
        for part in circuit.parts.iter().filter(|part| part.id != board) {
            let pins = circuit.pins_for_part(&part.id, board);
            if pins.is_empty() {
                continue;
            }
            self.register_peripheral(&part.id, PeripheralDescriptor::new(part.kind.as_str(), pins));
            attached += 1;
        }
        attached
    }

    /// Evaluate an expression against the current variables.
    pub fn evaluate(&mut self, expr: &str) -> Value {
        let expr = lower_expr(expr);
        self.evaluate_expr(&expr)
    }

    /// Evaluate a condition against the current variables.
    pub fn check(&mut self, cond: &str) -> bool {
        let cond = lower_cond(cond);
        self.evaluate_condition(&cond)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.state.scopes.lookup(name)
    }

    /// Location of the statement executed last
    pub fn current_location(&self) -> SourceLocation {
        self.current_location
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("status", &self.status)
            .field("speed", &self.speed)
            .field("frames", &self.frames.len())
            .field("location", &self.current_location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::clock::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> (Engine, ManualClock) {
        let clock = ManualClock::new();
        let config = EngineConfig {
            seed: Some(1),
            ..EngineConfig::default()
        };
        (Engine::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn test_start_refuses_while_running() {
        let (mut engine, _) = engine();
        assert_eq!(engine.start("void setup(){} void loop(){}"), Ok(()));
        assert_eq!(engine.start(""), Err(EngineError::AlreadyRunning));
        engine.stop();
        assert_eq!(engine.start(""), Ok(()));
    }

    #[test]
    fn test_status_transitions_are_reported() {
        let (mut engine, _) = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.on_status(move |status| sink.borrow_mut().push(status));

        engine.stop();
        engine.start("void loop(){}").ok();
        engine.stop();
        engine.reset();

        assert_eq!(
            seen.borrow().as_slice(),
            &[RunStatus::Running, RunStatus::Stopped, RunStatus::Idle]
        );
    }

    #[test]
    fn test_elapsed_is_frozen_after_stop() {
        let (mut engine, clock) = engine();
        engine.start("void loop(){}").ok();
        clock.advance(Duration::from_millis(1500));
        engine.set_speed(2.0).ok();
        assert_eq!(engine.millis(), 3000.0);
        engine.stop();
        clock.advance(Duration::from_millis(500));
        assert_eq!(engine.elapsed(), Duration::from_millis(1500));
        assert_eq!(engine.micros(), 3_000_000.0);
        engine.reset();
        assert_eq!(engine.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_speed_is_rejected() {
        let (mut engine, _) = engine();
        assert_eq!(engine.set_speed(0.0), Err(EngineError::InvalidSpeed(0.0)));
        assert!(engine.set_speed(f64::NAN).is_err());
        assert_eq!(engine.speed(), 1.0);
    }

    #[test]
    fn test_step_is_halted_when_idle() {
        let (mut engine, _) = engine();
        assert_eq!(engine.step(), Step::Halted(RunStatus::Idle));
    }

    #[test]
    fn test_import_reports_malformed_json() {
        let (mut engine, _) = engine();
        assert!(engine.import_circuit("{ not json").is_none());
        let event = engine.serial().events().last().cloned();
        assert_eq!(event.as_ref().map(|e| e.category), Some(SerialCategory::Error));
        assert!(event.is_some_and(|e| e.text.starts_with(ERROR_PREFIX)));
    }
}
