//! Sketch execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: the run-loop scheduler, lifecycle and host API
//! - [`errors`]: runtime and engine error types
//! - [`arithmetic`] and [`builtins`]: value computation
//! - [`clock`]: wall-clock sources, swappable for tests
//!
//! # Execution Model
//!
//! A sketch is extracted and lowered once per start. The engine then runs
//! `setup` followed by `loop` forever, holding its position in an explicit
//! frame stack. The host drives it with [`Engine::poll`], which executes
//! statements until the sketch suspends on a `delay` or a loop yield and
//! reports when the next step is due.
//!
//! # Built-in Functions
//!
//! Pin access, serial output and timing are statements or expression forms
//! recognised by the lowering pass; the math helpers (`map`, `constrain`,
//! `random` and friends) live in [`builtins`].

pub mod arithmetic;
pub mod builtins;
pub mod clock;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
mod loops;
pub mod state;
mod statements;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, EngineConfig, RunStatus, Step};
pub use errors::{EngineError, RuntimeError};
