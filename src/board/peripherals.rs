//! External peripheral attachment
//!
//! A peripheral is anything wired to the board from outside the sketch: an LED,
//! a button, a potentiometer. The registry only does bookkeeping. Registering a
//! peripheral marks each of its pins as connected to it, and removing it clears
//! those marks. The optional reset hook is how a peripheral returns to its idle
//! state when the engine is reset.

use super::pins::{PinBoard, PinId};
use std::fmt;

/// Description of one attached peripheral
pub struct PeripheralDescriptor {
    pub connected_pins: Vec<PinId>,
    pub kind: String,
    pub reset: Option<Box<dyn FnMut()>>,
}

impl PeripheralDescriptor {
    pub fn new(kind: impl Into<String>, connected_pins: Vec<PinId>) -> Self {
        PeripheralDescriptor {
            connected_pins,
            kind: kind.into(),
            reset: None,
        }
    }

    pub fn with_reset(mut self, reset: impl FnMut() + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }
}

impl fmt::Debug for PeripheralDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeripheralDescriptor")
            .field("connected_pins", &self.connected_pins)
            .field("kind", &self.kind)
            .field("reset", &self.reset.is_some())
            .finish()
    }
}

/// Attached peripherals in registration order
#[derive(Debug, Default)]
pub struct PeripheralRegistry {
    entries: Vec<(String, PeripheralDescriptor)>,
}

impl PeripheralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a peripheral, replacing any earlier one with the same id.
    pub fn register(&mut self, id: &str, descriptor: PeripheralDescriptor, pins: &mut PinBoard) {
        self.remove(id, pins);
        for pin in &descriptor.connected_pins {
            pins.connect(*pin, id, &descriptor.kind);
        }
        self.entries.push((id.to_string(), descriptor));
    }

    /// Detach a peripheral. Returns false if nothing was registered under `id`.
    pub fn remove(&mut self, id: &str, pins: &mut PinBoard) -> bool {
        let Some(index) = self.entries.iter().position(|(entry, _)| entry == id) else {
            return false;
        };
        let (_, descriptor) = self.entries.remove(index);
        for pin in descriptor.connected_pins {
            let owned = pins
                .pin(pin)
                .and_then(|state| state.connection.as_ref())
                .is_some_and(|conn| conn.component_id == id);
            if owned {
                pins.disconnect(pin);
            }
        }
        true
    }

    /// Run every reset hook and restore the pin connections, which a board
    /// reset wipes.
    pub fn reset_all(&mut self, pins: &mut PinBoard) {
        for (id, descriptor) in self.entries.iter_mut() {
            if let Some(reset) = descriptor.reset.as_mut() {
                reset();
            }
            for pin in &descriptor.connected_pins {
                pins.connect(*pin, id, &descriptor.kind);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&PeripheralDescriptor> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PeripheralDescriptor)> {
        self.entries
            .iter()
            .map(|(id, descriptor)| (id.as_str(), descriptor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
