//! Simulated hardware
//!
//! - [`pins`]: the pin table and its change notifications
//! - [`peripherals`]: bookkeeping for components wired to the pins

pub mod peripherals;
pub mod pins;

pub use peripherals::{PeripheralDescriptor, PeripheralRegistry};
pub use pins::{PinBoard, PinId, PinMode, PinState, PowerRail, SubscriptionId, MAX_ADC, MAX_PWM};
