//! # Introduction
//!
//! sketchsim runs microcontroller sketches (`setup()` plus `loop()` written in
//! the usual Arduino dialect) against a simulated ESP32-style board. Pin
//! activity and serial output are shown live in a terminal UI built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Extract → Lower → Engine (frames, clock) → Pins / Serial → TUI
//! ```
//!
//! 1. [`parser`]: splits the sketch into globals, `setup`, `loop` and user
//!    functions, then lowers every statement and expression into a closed AST.
//! 2. [`interpreter`]: the cooperative run loop. The host polls it; it runs
//!    statements until the sketch suspends on `delay` or a loop yield.
//! 3. [`memory`]: loosely typed [`memory::Value`]s and the global/call scopes.
//! 4. [`board`]: the pin table and registered peripherals.
//! 5. [`serial`]: the serial monitor event history.
//! 6. [`circuit`]: circuit JSON import and export.
//! 7. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Supported sketch subset
//!
//! Declarations of `int`/`float`/`String`-style globals and `#define`s,
//! `if/else if/else`, `for`, `while`, calls to user `void` functions,
//! `pinMode`, `digitalWrite/Read`, `analogWrite/Read`, `ledcWrite`, `tone`,
//! `delay`, `millis`, `Serial.print/println/printf` and the `map`,
//! `constrain`, `random`, `abs`, `min`, `max`, `pow`, `sqrt` helpers.

pub mod board;
pub mod circuit;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod serial;
pub mod ui;
