//! Error types for the sketch engine
//!
//! [`RuntimeError`] covers failures while a sketch executes. Every one of them
//! is fatal: the engine reports it once on the serial monitor and moves to the
//! error state. Sketch text itself never produces an error, since unknown
//! statements and expressions fall back to no-ops and zero.
//!
//! [`EngineError`] is returned to the host for API misuse (starting twice, an
//! invalid speed) and leaves the engine untouched.

use crate::parser::ast::SourceLocation;
use std::fmt;

/// Errors that abort a running sketch
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// User function calls nested deeper than the configured limit
    CallDepthExceeded {
        function: String,
        depth: usize,
        location: SourceLocation,
    },
}

impl RuntimeError {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::CallDepthExceeded { location, .. } => Some(location),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::CallDepthExceeded {
                function,
                depth,
                location,
            } => write!(
                f,
                "Call to '{}' exceeds the maximum call depth of {} at line {}",
                function, depth, location.line
            ),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Errors returned by engine control operations
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `start` while a sketch is already running
    AlreadyRunning,
    /// Speed multipliers must be finite and positive
    InvalidSpeed(f64),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::AlreadyRunning => write!(f, "A sketch is already running"),
            EngineError::InvalidSpeed(speed) => {
                write!(f, "Invalid speed {} (must be a positive number)", speed)
            }
        }
    }
}

impl std::error::Error for EngineError {}
