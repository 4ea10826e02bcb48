// Constants for the sketch engine

use std::time::Duration;

/// Pause between two passes of `loop()`
pub const LOOP_YIELD: Duration = Duration::from_millis(1);

/// Yield taken after each `for` iteration; zero only hands control back
pub const BODY_YIELD: Duration = Duration::ZERO;

/// A `while` loop yields once per this many iterations
pub const WHILE_YIELD_EVERY: u64 = 100;

/// Text emitted by `Serial.begin()`
pub const SERIAL_BEGIN_MESSAGE: &str = "Serial communication started";

/// Prefix of the serial event reporting a fatal failure
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Deepest allowed nesting of user function calls
pub const MAX_CALL_DEPTH: usize = 64;

/// Wall-clock budget of one [`poll`](crate::interpreter::engine::Engine::poll)
pub const POLL_SLICE: Duration = Duration::from_millis(8);

/// Upper bound on steps run by one poll
pub const MAX_STEPS_PER_POLL: usize = 10_000;

/// Widest field and longest precision a `printf` directive may ask for
pub const MAX_PRINTF_WIDTH: usize = 256;

/// Deepest parenthesis nesting the arithmetic fallback evaluates
pub const MAX_ARITHMETIC_DEPTH: usize = 64;
