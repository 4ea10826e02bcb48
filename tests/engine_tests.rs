// Integration tests for the sketch engine

use sketchsim::board::{PeripheralDescriptor, PinId, PinMode};
use sketchsim::interpreter::{Engine, EngineConfig, ManualClock, RunStatus, Step};
use sketchsim::memory::Value;
use sketchsim::serial::SerialCategory;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn engine_with(config: EngineConfig) -> (Engine, ManualClock) {
    let clock = ManualClock::new();
    let engine = Engine::with_clock(config, clock.clone());
    (engine, clock)
}

fn engine() -> (Engine, ManualClock) {
    engine_with(EngineConfig {
        seed: Some(42),
        ..EngineConfig::default()
    })
}

/// Poll repeatedly, advancing the clock by `tick` between polls.
fn run_for(engine: &mut Engine, clock: &ManualClock, total: Duration, tick: Duration) {
    let mut elapsed = Duration::ZERO;
    engine.poll();
    while elapsed < total {
        clock.advance(tick);
        elapsed += tick;
        engine.poll();
    }
}

fn events(engine: &Engine) -> Vec<(String, SerialCategory)> {
    engine
        .serial()
        .events()
        .map(|e| (e.text.clone(), e.category))
        .collect()
}

#[test]
fn test_setup_runs_once() {
    let (mut engine, clock) = engine();
    engine
        .start(r#"void setup(){ Serial.println("A"); } void loop(){ }"#)
        .expect("start failed");
    run_for(&mut engine, &clock, Duration::from_millis(50), Duration::from_millis(1));

    assert_eq!(events(&engine), vec![("A".to_string(), SerialCategory::Println)]);
    assert_eq!(engine.status(), RunStatus::Running);
}

#[test]
fn test_print_accumulates_until_println() {
    let (mut engine, _) = engine();
    let source = r#"
        void setup() {
            Serial.print("x");
            Serial.print("y");
            Serial.println("z");
        }
        void loop() {}
    "#;
    engine.start(source).expect("start failed");
    engine.poll();

    assert_eq!(events(&engine), vec![("xyz".to_string(), SerialCategory::Println)]);
    assert_eq!(engine.serial().pending(), "");
}

#[test]
fn test_expression_semantics() {
    let (mut engine, _) = engine();
    assert_eq!(engine.evaluate("map(512, 0, 1023, 0, 100)"), Value::Number(50.0));
    assert_eq!(engine.evaluate(r#""a" + "b""#), Value::Number(0.0));
    assert_eq!(engine.evaluate("constrain(-4, 0, 10)"), Value::Number(0.0));
}

#[test]
fn test_for_loop_counts() {
    let (mut engine, _) = engine();
    let source = r#"
        int x = 0;
        void setup() {
            for (int i = 0; i < 5; i++) {
                x += 1;
            }
        }
        void loop() {}
    "#;
    engine.start(source).expect("start failed");
    engine.poll();

    assert_eq!(engine.variable("x"), Some(&Value::Number(5.0)));
    assert_eq!(engine.variable("i"), Some(&Value::Number(5.0)));
}

#[test]
fn test_stop_during_long_delay() {
    let (mut engine, clock) = engine();
    let source = r#"
        void setup() {
            delay(10000);
            Serial.println("late");
        }
        void loop() {}
    "#;
    engine.start(source).expect("start failed");
    assert!(matches!(engine.poll(), Step::Pending(_)));

    engine.stop();
    assert_eq!(engine.status(), RunStatus::Stopped);

    clock.advance(Duration::from_secs(11));
    assert_eq!(engine.poll(), Step::Halted(RunStatus::Stopped));
    assert!(events(&engine).is_empty());
}

#[test]
fn test_blink_follows_the_clock() {
    let (mut engine, clock) = engine();
    let source = r#"
        #define LED 2

        void setup() {
            pinMode(LED, OUTPUT);
        }

        void loop() {
            digitalWrite(LED, HIGH);
            delay(500);
            digitalWrite(LED, LOW);
            delay(500);
        }
    "#;
    engine.start(source).expect("start failed");
    engine.poll();
    let led = PinId::Gpio(2);
    assert_eq!(engine.pins().pin(led).map(|p| p.mode), Some(PinMode::Output));
    assert_eq!(engine.pins().read_digital(led), 1);

    clock.advance(Duration::from_millis(499));
    engine.poll();
    assert_eq!(engine.pins().read_digital(led), 1);

    clock.advance(Duration::from_millis(1));
    engine.poll();
    assert_eq!(engine.pins().read_digital(led), 0);

    // Second delay, then the pause between loop passes
    clock.advance(Duration::from_millis(500));
    engine.poll();
    clock.advance(Duration::from_millis(1));
    engine.poll();
    assert_eq!(engine.pins().read_digital(led), 1);
}

#[test]
fn test_speed_shortens_delays() {
    let (mut engine, clock) = engine_with(EngineConfig {
        speed: 2.0,
        ..EngineConfig::default()
    });
    let source = r#"
        int done = 0;
        void setup() {
            delay(1000);
            done = 1;
        }
    "#;
    engine.start(source).expect("start failed");
    engine.poll();

    clock.advance(Duration::from_millis(499));
    engine.poll();
    assert_eq!(engine.variable("done"), Some(&Value::Number(0.0)));

    clock.advance(Duration::from_millis(1));
    engine.poll();
    assert_eq!(engine.variable("done"), Some(&Value::Number(1.0)));
    assert_eq!(engine.millis(), 1000.0);
}

#[test]
fn test_millis_based_timing() {
    let (mut engine, clock) = engine();
    let source = r#"
        unsigned long last = 0;
        int ticks = 0;

        void loop() {
            unsigned long now = millis();
            if (now - last >= 100) {
                last = now;
                ticks++;
            }
        }
    "#;
    engine.start(source).expect("start failed");
    run_for(&mut engine, &clock, Duration::from_millis(1050), Duration::from_millis(5));

    assert_eq!(engine.variable("ticks"), Some(&Value::Number(10.0)));
}

#[test]
fn test_call_depth_limit_is_fatal() {
    let (mut engine, _) = engine_with(EngineConfig {
        max_call_depth: 2,
        ..EngineConfig::default()
    });
    let source = r#"
        void inner() { Serial.println("deep"); }
        void middle() { inner(); }
        void outer() { middle(); }
        void setup() { outer(); }
    "#;
    engine.start(source).expect("start failed");
    engine.poll();

    assert_eq!(engine.status(), RunStatus::Error);
    let (text, category) = events(&engine).pop().expect("no error event");
    assert_eq!(category, SerialCategory::Error);
    assert!(
        text.starts_with("ERROR: Call to 'inner' exceeds the maximum call depth of 2"),
        "{}",
        text
    );
}

#[test]
fn test_pending_print_is_flushed_on_stop() {
    let (mut engine, _) = engine();
    engine
        .start(r#"void setup() { Serial.print("half"); delay(100); }"#)
        .expect("start failed");
    engine.poll();
    assert_eq!(engine.serial().pending(), "half");

    engine.stop();
    assert_eq!(events(&engine), vec![("half".to_string(), SerialCategory::Print)]);
}

#[test]
fn test_reset_restores_initial_state() {
    let (mut engine, _) = engine();
    let source = r#"
        int count = 0;
        void setup() {
            Serial.begin(115200);
            pinMode(2, OUTPUT);
            digitalWrite(2, HIGH);
            count = 5;
        }
        void loop() { delay(1000); }
    "#;
    engine.start(source).expect("start failed");
    engine.poll();
    assert_eq!(engine.variable("count"), Some(&Value::Number(5.0)));

    engine.reset();

    assert_eq!(engine.status(), RunStatus::Idle);
    assert_eq!(engine.variable("count"), None);
    let pin = engine.pins().pin(PinId::Gpio(2)).cloned().expect("pin 2");
    assert_eq!((pin.mode, pin.digital), (PinMode::Input, 0));
    assert_eq!(engine.elapsed(), Duration::ZERO);
    // History survives a reset
    assert_eq!(engine.serial().len(), 1);

    engine.start(source).expect("restart failed");
    engine.poll();
    assert_eq!(engine.variable("count"), Some(&Value::Number(5.0)));
}

#[test]
fn test_peripheral_reset_hook() {
    let (mut engine, _) = engine();
    let resets = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&resets);
    engine.register_peripheral(
        "btn",
        PeripheralDescriptor::new("pushbutton", vec![PinId::Gpio(15)])
            .with_reset(move || *counter.borrow_mut() += 1),
    );

    engine.reset();

    assert_eq!(*resets.borrow(), 1);
    let connection = engine
        .pins()
        .pin(PinId::Gpio(15))
        .and_then(|p| p.connection.clone())
        .map(|c| c.component_id);
    assert_eq!(connection, Some("btn".to_string()));

    assert!(engine.remove_peripheral("btn"));
    assert!(!engine.remove_peripheral("btn"));
    assert!(engine.pins().pin(PinId::Gpio(15)).and_then(|p| p.connection.as_ref()).is_none());
}

#[test]
fn test_subscribers_see_sketch_activity() {
    let (mut engine, _) = engine();
    let pin_changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&pin_changes);
    engine
        .pins_mut()
        .subscribe(move |id, state| sink.borrow_mut().push((id, state.digital)));

    let serial_seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&serial_seen);
    engine.on_serial(move |event| sink.borrow_mut().push(event.text.clone()));

    let source = r#"
        void setup() {
            pinMode(4, OUTPUT);
            digitalWrite(4, HIGH);
            digitalWrite(4, HIGH);
            Serial.println("on");
        }
        void loop() {}
    "#;
    engine.start(source).expect("start failed");
    engine.poll();

    // Mode change plus one level change; the repeated write is silent
    assert_eq!(
        pin_changes.borrow().as_slice(),
        &[(PinId::Gpio(4), 0), (PinId::Gpio(4), 1)]
    );
    assert_eq!(serial_seen.borrow().as_slice(), &["on".to_string()]);
}

#[test]
fn test_input_from_outside_the_sketch() {
    let (mut engine, clock) = engine();
    let source = r#"
        int pressed = 0;
        int level = 0;
        void setup() {
            pinMode(15, INPUT_PULLUP);
        }
        void loop() {
            if (digitalRead(15) == LOW) {
                pressed = 1;
            }
            level = analogRead(34);
        }
    "#;
    engine.start(source).expect("start failed");
    engine.poll();
    assert_eq!(engine.variable("pressed"), Some(&Value::Number(0.0)));

    engine.pins_mut().write_digital(PinId::Gpio(15), 0.0);
    engine.pins_mut().set_analog_value(PinId::Gpio(34), 5000.0);
    clock.advance(Duration::from_millis(2));
    engine.poll();

    assert_eq!(engine.variable("pressed"), Some(&Value::Number(1.0)));
    assert_eq!(engine.variable("level"), Some(&Value::Number(4095.0)));
}

#[test]
fn test_while_loop_does_not_starve_the_host() {
    let (mut engine, clock) = engine();
    let source = r#"
        long n = 0;
        void loop() {
            while (true) {
                n++;
            }
        }
    "#;
    engine.start(source).expect("start failed");
    assert!(matches!(engine.step(), Step::Pending(_)));
    engine.stop();
    clock.advance(Duration::from_millis(10));
    assert_eq!(engine.poll(), Step::Halted(RunStatus::Stopped));
    assert!(engine.variable("n").is_some_and(|n| n.as_number() > 0.0));
}
