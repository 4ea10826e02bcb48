//! Interpreter memory model
//!
//! - [`value`]: tagged runtime [`value::Value`]s (number or text)
//! - [`scope`]: the global table and the call-local tables

pub mod scope;
pub mod value;

pub use scope::{Scope, Scopes};
pub use value::Value;
