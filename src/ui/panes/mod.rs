//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: Sketch source with syntax highlighting and the executing line
//! - [`pins`]: The board's pin table
//! - [`serial`]: Serial monitor output with timestamps
//! - [`status`]: Status bar with run state, speed, simulated time and keys
//!
//! Each pane module exports a primary `render_*` function plus any scroll
//! state it needs between frames.

pub mod pins;
pub mod serial;
pub mod source;
pub mod status;

pub use pins::render_pins_pane;
pub use serial::render_serial_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::render_status_bar;
