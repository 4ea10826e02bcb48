//! Statement execution
//!
//! Adds the `impl Engine` method that carries out a single lowered
//! statement. Simple statements complete immediately or ask for a pause;
//! compound statements and user calls push [`Frame`]s and leave the actual
//! execution of their bodies to the frame runner in [`super::loops`].

use crate::board::{PinId, PinMode};
use crate::interpreter::constants::SERIAL_BEGIN_MESSAGE;
use crate::interpreter::engine::Engine;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::loops::{ForPhase, Frame};
use crate::memory::Value;
use crate::parser::ast::{AssignOp, Expr, PrintArg, Stmt, StmtKind};
use crate::serial::SerialCategory;
use std::rc::Rc;
use std::time::Duration;

/// What the frame runner does after a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Next,
    Suspend(Duration),
}

/// Pin addressed by an evaluated argument: a GPIO number or a pin name
pub(crate) fn pin_id(value: &Value) -> Option<PinId> {
    match value {
        Value::Number(n) if *n >= 0.0 && *n <= f64::from(u8::MAX) && n.fract() == 0.0 => {
            Some(PinId::Gpio(*n as u8))
        }
        Value::Number(_) => None,
        Value::Text(name) => name.parse().ok(),
    }
}

fn pause_for_millis(ms: f64, speed: f64) -> Duration {
    let scaled = ms / speed;
    if scaled.is_finite() && scaled > 0.0 {
        Duration::from_secs_f64(scaled / 1000.0)
    } else {
        Duration::ZERO
    }
}

impl Engine {
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Delay(ms) => {
                let ms = self.evaluate_expr(ms).as_number();
                return Ok(Flow::Suspend(pause_for_millis(ms, self.speed)));
            }
            StmtKind::DelayMicros(us) => {
                let us = self.evaluate_expr(us).as_number();
                return Ok(Flow::Suspend(pause_for_millis(us / 1000.0, self.speed)));
            }
            StmtKind::SerialBegin => {
                let timestamp = self.serial_timestamp();
                self.serial
                    .emit(SERIAL_BEGIN_MESSAGE, SerialCategory::System, timestamp);
            }
            StmtKind::SerialPrint { arg, newline } => {
                let text = match arg {
                    PrintArg::Literal(text) => text.clone(),
                    PrintArg::Value(expr) => self.evaluate_expr(expr).to_text(),
                    PrintArg::Empty => String::new(),
                };
                if *newline {
                    let timestamp = self.serial_timestamp();
                    self.serial.emit(&text, SerialCategory::Println, timestamp);
                } else {
                    self.serial.print(&text);
                }
            }
            StmtKind::SerialPrintf { format, args } => {
                let values: Vec<Value> = args.iter().map(|arg| self.evaluate_expr(arg)).collect();
                let text = super::builtins::format_printf(format, &values);
                let timestamp = self.serial_timestamp();
                self.serial.emit(&text, SerialCategory::Printf, timestamp);
            }
            StmtKind::PinMode { pin, mode } => {
                let pin = self.evaluate_expr(pin);
                let mode = self.evaluate_expr(mode);
                // A numeric mode has no keyword to map to
                let mode = match &mode {
                    Value::Text(keyword) => PinMode::from_keyword(keyword),
                    Value::Number(_) => None,
                };
                if let (Some(pin), Some(mode)) = (pin_id(&pin), mode) {
                    self.pins.set_mode(pin, mode);
                }
            }
            StmtKind::DigitalWrite { pin, value } => {
                let pin = self.evaluate_expr(pin);
                let value = self.evaluate_expr(value).as_number();
                if let Some(pin) = pin_id(&pin) {
                    self.pins.write_digital(pin, value);
                }
            }
            StmtKind::AnalogWrite { pin, duty } => {
                let pin = self.evaluate_expr(pin);
                let duty = self.evaluate_expr(duty).as_number();
                if let Some(pin) = pin_id(&pin) {
                    self.pins.write_analog(pin, duty);
                }
            }
            StmtKind::Assign { name, op, value } => {
                let value = self.evaluate_expr(value);
                self.execute_assignment(name, *op, value);
            }
            StmtKind::Step { name, delta } => {
                let current = self.variable(name).map_or(0.0, Value::as_number);
                self.state
                    .scopes
                    .assign(name, Value::Number(current + delta));
            }
            StmtKind::If(chain) => {
                let mut taken = None;
                for (cond, body) in &chain.branches {
                    if self.evaluate_condition(cond) {
                        taken = Some(body);
                        break;
                    }
                }
                if let Some(body) = taken.or(chain.otherwise.as_ref()) {
                    self.frames.push(Frame::sequence(body));
                }
            }
            StmtKind::For(lp) => {
                self.frames.push(Frame::For {
                    lp: Rc::clone(lp),
                    phase: ForPhase::Check,
                });
                if let Some(init) = &lp.init {
                    return self.execute_statement(init);
                }
            }
            StmtKind::While(lp) => {
                self.frames.push(Frame::While {
                    lp: Rc::clone(lp),
                    iterations: 0,
                });
            }
            StmtKind::Call { name, args } => {
                self.call_user_function(name, args, stmt)?;
            }
            StmtKind::Ignored(_) => {}
        }
        Ok(Flow::Next)
    }

    fn execute_assignment(&mut self, name: &str, op: AssignOp, value: Value) {
        if op == AssignOp::Set {
            self.state.scopes.assign(name, value);
            return;
        }
        let current = self.variable(name).cloned().unwrap_or_default();
        let result = match (op, &current, &value) {
            (AssignOp::Add, Value::Text(_), _) | (AssignOp::Add, _, Value::Text(_)) => {
                Value::Text(current.to_text() + &value.to_text())
            }
            (AssignOp::Add, _, _) => Value::Number(current.as_number() + value.as_number()),
            (AssignOp::Sub, _, _) => Value::Number(current.as_number() - value.as_number()),
            (AssignOp::Mul, _, _) => Value::Number(current.as_number() * value.as_number()),
            (AssignOp::Div, _, _) | (AssignOp::Set, _, _) => {
                Value::Number(current.as_number() / value.as_number())
            }
        };
        self.state.scopes.assign(name, result);
    }

    /// Bind arguments and push the callee's body. Unknown functions are
    /// ignored.
    fn call_user_function(
        &mut self,
        name: &str,
        args: &[Expr],
        stmt: &Stmt,
    ) -> Result<(), RuntimeError> {
        let Some(function) = self.state.functions.get(name).cloned() else {
            return Ok(());
        };
        if self.state.scopes.depth() >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                function: name.to_string(),
                depth: self.config.max_call_depth,
                location: stmt.location,
            });
        }

        let mut values: Vec<Value> = args.iter().map(|arg| self.evaluate_expr(arg)).collect();
        values.resize(function.params.len(), Value::default());
        let bindings = function.params.iter().cloned().zip(values).collect();

        self.state.scopes.enter_call(bindings);
        self.frames.push(Frame::Call);
        self.frames.push(Frame::sequence(&function.body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::clock::ManualClock;
    use crate::interpreter::engine::{EngineConfig, RunStatus};

    fn run(source: &str) -> Engine {
        let mut engine = Engine::with_clock(EngineConfig::default(), ManualClock::new());
        engine.start(source).ok();
        engine.poll();
        engine
    }

    fn texts(engine: &Engine) -> Vec<String> {
        engine.serial().events().map(|e| e.text.clone()).collect()
    }

    #[test]
    fn test_pin_id_from_value() {
        assert_eq!(pin_id(&Value::Number(13.0)), Some(PinId::Gpio(13)));
        assert_eq!(pin_id(&Value::Number(2.5)), None);
        assert_eq!(pin_id(&Value::Number(-1.0)), None);
        assert_eq!(pin_id(&Value::from("GPIO4")), Some(PinId::Gpio(4)));
    }

    #[test]
    fn test_pause_scales_with_speed() {
        assert_eq!(pause_for_millis(1000.0, 2.0), Duration::from_millis(500));
        assert_eq!(pause_for_millis(-5.0, 1.0), Duration::ZERO);
        assert_eq!(pause_for_millis(f64::NAN, 1.0), Duration::ZERO);
    }

    #[test]
    fn test_pin_statements() {
        let engine = run(
            "void setup() {\n  pinMode(2, OUTPUT);\n  digitalWrite(2, HIGH);\n  analogWrite(25, 300);\n  tone(26, 440);\n  pinMode(4, 1);\n}",
        );
        let pins = engine.pins();
        assert_eq!(pins.pin(PinId::Gpio(2)).map(|p| p.mode), Some(PinMode::Output));
        assert_eq!(pins.read_digital(PinId::Gpio(2)), 1);
        assert_eq!(pins.pin(PinId::Gpio(25)).map(|p| p.pwm), Some(255));
        assert_eq!(pins.pin(PinId::Gpio(26)).map(|p| p.pwm), Some(128));
        assert_eq!(pins.pin(PinId::Gpio(4)).map(|p| p.mode), Some(PinMode::Input));
    }

    #[test]
    fn test_compound_assignment() {
        let engine = run(
            "int a = 10;\nString s = \"n=\";\nvoid setup() {\n  a -= 4;\n  a *= 2;\n  a /= 3;\n  s += a;\n  missing += 5;\n}",
        );
        assert_eq!(engine.variable("a"), Some(&Value::Number(4.0)));
        assert_eq!(engine.variable("s"), Some(&Value::from("n=4")));
        assert_eq!(engine.variable("missing"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_if_chain_takes_first_match() {
        let engine = run(
            "int x = 3; int r = 0;\nvoid setup() {\n  if (x > 5) {\n    r = 1;\n  } else if (x > 2) {\n    r = 2;\n  } else {\n    r = 3;\n  }\n}",
        );
        assert_eq!(engine.variable("r"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_function_call_scoping() {
        let engine = run(
            "int total = 0;\n\
             void add(int n, int m) {\n  total += n + m;\n  seen = n;\n}\n\
             void setup() {\n  add(2, 3);\n  add(4);\n}",
        );
        assert_eq!(engine.variable("total"), Some(&Value::Number(9.0)));
        assert_eq!(engine.variable("seen"), Some(&Value::Number(4.0)));
        // Parameters do not outlive the call
        assert_eq!(engine.variable("n"), None);
    }

    #[test]
    fn test_runaway_recursion_is_fatal() {
        let engine = run("void down() { down(); }\nvoid setup() { down(); }");
        assert_eq!(engine.status(), RunStatus::Error);
        let last = texts(&engine).pop().unwrap_or_default();
        assert!(last.starts_with("ERROR: Call to 'down' exceeds"), "{}", last);
    }

    #[test]
    fn test_printf_and_begin() {
        let engine = run(
            "int v = 7;\nvoid setup() {\n  Serial.begin(115200);\n  Serial.printf(\"v=%d\\n\", v);\n}",
        );
        assert_eq!(texts(&engine), vec![SERIAL_BEGIN_MESSAGE.to_string(), "v=7\n".to_string()]);
    }
}
