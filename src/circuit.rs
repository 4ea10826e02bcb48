//! # Circuit Description
//!
//! The circuit file is the JSON diagram a sketch runs against: the board and
//! the parts around it, plus the wires between their pins. The simulator only
//! needs the wiring; `attrs`, `position` and wire colours are carried through
//! untouched, along with any fields this crate does not know, so an export
//! reproduces what was imported.
//!
//! ## Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "editor": "sketchsim",
//!   "parts": [
//!     { "type": "board-esp32-devkit-c-v4", "id": "esp", "attrs": {}, "position": { "x": 0, "y": 0 } },
//!     { "type": "led", "id": "led1", "attrs": { "color": "red" }, "position": { "x": 120, "y": 40 } }
//!   ],
//!   "connections": [
//!     { "from": "esp:D2", "to": "led1:A", "color": "green" },
//!     { "from": "led1:C", "to": "esp:GND", "color": "black" }
//!   ]
//! }
//! ```
//!
//! Wire endpoints are `"<part id>:<pin name>"`. Board pin names go through
//! [`PinId`] parsing, so `D2`, `GPIO2` and `2` all name the same pin.

use crate::board::PinId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub version: serde_json::Value,
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub connections: Vec<Wire>,
    /// Fields this crate does not interpret, kept for export
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub attrs: serde_json::Value,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub position: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub color: String,
}

impl Wire {
    /// Both endpoints, split into `(part id, pin name)`
    fn endpoints(&self) -> [Option<(&str, &str)>; 2] {
        [self.from.split_once(':'), self.to.split_once(':')]
    }
}

#[derive(Debug)]
pub enum CircuitError {
    Json(serde_json::Error),
}

impl fmt::Display for CircuitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitError::Json(err) => write!(f, "Invalid circuit JSON: {}", err),
        }
    }
}

impl std::error::Error for CircuitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CircuitError::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for CircuitError {
    fn from(err: serde_json::Error) -> Self {
        CircuitError::Json(err)
    }
}

impl Circuit {
    pub fn from_json(json: &str) -> Result<Self, CircuitError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CircuitError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.id == id)
    }

    /// Id of the microcontroller board part, if the circuit has one
    pub fn board_id(&self) -> Option<&str> {
        self.parts
            .iter()
            .find(|part| part.kind.starts_with("board-") || part.kind.contains("esp32"))
            .map(|part| part.id.as_str())
    }

    /// Board pins wired directly to `part_id`, in wire order without repeats.
    pub fn pins_for_part(&self, part_id: &str, board_id: &str) -> Vec<PinId> {
        let mut pins = Vec::new();
        for wire in &self.connections {
            let [Some(a), Some(b)] = wire.endpoints() else {
                continue;
            };
            let board_pin = match (a, b) {
                ((board, pin), (part, _)) | ((part, _), (board, pin))
                    if board == board_id && part == part_id =>
                {
                    pin
                }
                _ => continue,
            };
            if let Ok(pin) = board_pin.parse::<PinId>() {
                if !pins.contains(&pin) {
                    pins.push(pin);
                }
            }
        }
        pins
    }
}
