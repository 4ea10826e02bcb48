//! Expression and condition evaluation
//!
//! Evaluation never fails: unknown variables read as 0, reads of pins that do
//! not exist read as 0 and the arithmetic fallback turns anything it cannot
//! evaluate into 0.

use crate::interpreter::arithmetic::evaluate_arithmetic;
use crate::interpreter::builtins::call_builtin;
use crate::interpreter::engine::Engine;
use crate::interpreter::statements::pin_id;
use crate::memory::Value;
use crate::parser::ast::{CmpOp, Cond, Expr};
use std::cmp::Ordering;

impl Engine {
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Text(s) => Value::Text(s.clone()),
            Expr::Millis => Value::Number(self.millis()),
            Expr::Micros => Value::Number(self.micros()),
            Expr::DigitalRead(pin) => {
                let pin = self.evaluate_expr(pin);
                let level = pin_id(&pin).map_or(0, |id| self.pins.read_digital(id));
                Value::Number(f64::from(level))
            }
            Expr::AnalogRead(pin) => {
                let pin = self.evaluate_expr(pin);
                let raw = pin_id(&pin).map_or(0, |id| self.pins.read_analog(id));
                Value::Number(f64::from(raw))
            }
            Expr::Builtin { func, args } => {
                let args: Vec<f64> = args
                    .iter()
                    .map(|arg| self.evaluate_expr(arg).as_number())
                    .collect();
                Value::Number(call_builtin(*func, &args, &mut self.rng))
            }
            Expr::Variable(name) => self.variable(name).cloned().unwrap_or_default(),
            Expr::Arithmetic(text) => {
                let scopes = &self.state.scopes;
                let value = evaluate_arithmetic(text, |name| {
                    scopes.lookup(name).and_then(Value::as_f64)
                });
                Value::Number(value)
            }
        }
    }

    pub(crate) fn evaluate_condition(&mut self, cond: &Cond) -> bool {
        match cond {
            Cond::All(parts) => parts.iter().all(|part| self.evaluate_condition(part)),
            Cond::Any(parts) => parts.iter().any(|part| self.evaluate_condition(part)),
            Cond::Not(inner) => !self.evaluate_condition(inner),
            Cond::Compare { lhs, op, rhs } => {
                let lhs = self.evaluate_expr(lhs);
                let rhs = self.evaluate_expr(rhs);
                compare(&lhs, *op, &rhs)
            }
            Cond::Truthy(expr) => self.evaluate_expr(expr).is_truthy(),
        }
    }
}

fn compare(lhs: &Value, op: CmpOp, rhs: &Value) -> bool {
    match op {
        CmpOp::Eq => lhs.loose_eq(rhs),
        CmpOp::Ne => !lhs.loose_eq(rhs),
        CmpOp::Gt => lhs.loose_cmp(rhs) == Some(Ordering::Greater),
        CmpOp::Lt => lhs.loose_cmp(rhs) == Some(Ordering::Less),
        CmpOp::Ge => matches!(lhs.loose_cmp(rhs), Some(Ordering::Greater | Ordering::Equal)),
        CmpOp::Le => matches!(lhs.loose_cmp(rhs), Some(Ordering::Less | Ordering::Equal)),
    }
}

#[cfg(test)]
mod tests {
    use crate::board::PinId;
    use crate::interpreter::clock::ManualClock;
    use crate::interpreter::engine::{Engine, EngineConfig};
    use crate::memory::Value;
    use std::time::Duration;

    fn engine(source: &str) -> (Engine, ManualClock) {
        let clock = ManualClock::new();
        let config = EngineConfig {
            seed: Some(7),
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_clock(config, clock.clone());
        engine.start(source).ok();
        engine.poll();
        (engine, clock)
    }

    #[test]
    fn test_variables_and_arithmetic() {
        let (mut engine, _) = engine("int a = 6;\nint b = -2;\nvoid loop() {}");
        assert_eq!(engine.evaluate("a"), Value::Number(6.0));
        assert_eq!(engine.evaluate("a - b * 2"), Value::Number(10.0));
        assert_eq!(engine.evaluate("(a + b) % 3"), Value::Number(1.0));
        assert_eq!(engine.evaluate("unknown"), Value::Number(0.0));
        assert_eq!(engine.evaluate("a / 0"), Value::Number(0.0));
        assert_eq!(engine.evaluate(r#""a" + "b""#), Value::Number(0.0));
    }

    #[test]
    fn test_builtins() {
        let (mut engine, _) = engine("int v = 512;\nvoid loop() {}");
        assert_eq!(engine.evaluate("map(v, 0, 1024, 0, 100)"), Value::Number(50.0));
        assert_eq!(engine.evaluate("constrain(300, 0, 255)"), Value::Number(255.0));
        assert_eq!(engine.evaluate("max(v, 1000)"), Value::Number(1000.0));
        let roll = engine.evaluate("random(1, 7)").as_number();
        assert!((1.0..7.0).contains(&roll));
    }

    #[test]
    fn test_time_reads_follow_speed() {
        let (mut engine, clock) = engine("void loop() {}");
        clock.advance(Duration::from_millis(250));
        assert_eq!(engine.evaluate("millis()"), Value::Number(250.0));
        engine.set_speed(4.0).ok();
        assert_eq!(engine.evaluate("millis()"), Value::Number(1000.0));
    }

    #[test]
    fn test_pin_reads() {
        let (mut engine, _) = engine("void setup() { pinMode(15, INPUT_PULLUP); }");
        engine.pins_mut().set_analog_value(PinId::Gpio(34), 2048.0);
        assert_eq!(engine.evaluate("digitalRead(15)"), Value::Number(1.0));
        assert_eq!(engine.evaluate("analogRead(34)"), Value::Number(2048.0));
        assert_eq!(engine.evaluate("digitalRead(200)"), Value::Number(0.0));
    }

    #[test]
    fn test_conditions() {
        let (mut engine, _) = engine("int x = 5;\nString name = \"esp\";\nvoid loop() {}");
        assert!(engine.check("x >= 5 && x < 10"));
        assert!(engine.check("x == 1 || x != 4"));
        assert!(!engine.check("!(x > 2)"));
        assert!(engine.check("name == \"esp\""));
        assert!(engine.check("x"));
        assert!(!engine.check("missing"));
    }
}
