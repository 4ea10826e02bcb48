//! Simulated pin state
//!
//! [`PinBoard`] owns every pin of the simulated module and is the only place
//! electrical attributes change. It has no error conditions: writes to an
//! unknown pin are ignored and reads from one return zero, so a sketch that
//! addresses a pin the board does not have simply has no effect.
//!
//! # Notifications
//!
//! Observers registered with [`PinBoard::subscribe`] are called synchronously,
//! on the executing thread, whenever a pin's mode, digital value or PWM duty
//! actually changes. Callbacks must not block.
//!
//! # Power rails
//!
//! `3V3`, `VIN` and `GND` are created in mode `POWER` with fixed levels and
//! ignore every write for the lifetime of the table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// GPIO numbers broken out on the simulated module
pub const GPIO_PINS: &[u8] = &[
    0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33, 34, 35,
    36, 37, 38, 39,
];

/// Pins wired to an ADC channel
pub const ADC_PINS: &[u8] = &[
    0, 2, 4, 12, 13, 14, 15, 25, 26, 27, 32, 33, 34, 35, 36, 37, 38, 39,
];

/// Pins wired to a DAC channel
pub const DAC_PINS: &[u8] = &[25, 26];

pub const MAX_PWM: u8 = 255;
pub const MAX_ADC: u16 = 4095;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PowerRail {
    V3V3,
    Vin,
    Gnd,
}

impl PowerRail {
    pub const ALL: [PowerRail; 3] = [PowerRail::V3V3, PowerRail::Vin, PowerRail::Gnd];

    pub fn name(&self) -> &'static str {
        match self {
            PowerRail::V3V3 => "3V3",
            PowerRail::Vin => "VIN",
            PowerRail::Gnd => "GND",
        }
    }

    fn is_high(&self) -> bool {
        !matches!(self, PowerRail::Gnd)
    }
}

/// Pin identifier: a GPIO number or a power rail
///
/// Rails order before GPIOs so iteration lists the supply pins first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinId {
    Rail(PowerRail),
    Gpio(u8),
}

impl PinId {
    pub fn is_rail(&self) -> bool {
        matches!(self, PinId::Rail(_))
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinId::Rail(rail) => write!(f, "{}", rail.name()),
            PinId::Gpio(n) => write!(f, "GPIO{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePinError(pub String);

impl fmt::Display for ParsePinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unrecognized pin name '{}'", self.0)
    }
}

impl std::error::Error for ParsePinError {}

impl FromStr for PinId {
    type Err = ParsePinError;

    /// Accepts `2`, `D2`, `GPIO2`, `IO2`, `3V3`, `3.3V`, `VIN`, `5V`, `GND`
    /// (rail names case-insensitive, `GND.1`-style suffixes allowed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let base = match upper.strip_prefix("3.3V") {
            Some(_) => "3V3",
            None => upper.split('.').next().unwrap_or(""),
        };
        match base {
            "3V3" | "3V" => return Ok(PinId::Rail(PowerRail::V3V3)),
            "VIN" | "5V" => return Ok(PinId::Rail(PowerRail::Vin)),
            "GND" => return Ok(PinId::Rail(PowerRail::Gnd)),
            _ => {}
        }
        let digits = ["GPIO", "IO", "D"]
            .iter()
            .find_map(|prefix| upper.strip_prefix(prefix))
            .unwrap_or(&upper);
        digits
            .parse::<u8>()
            .map(PinId::Gpio)
            .map_err(|_| ParsePinError(s.to_string()))
    }
}

/// Electrical mode of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    InputPullup,
    Power,
}

impl PinMode {
    /// Parse the sketch keyword (`INPUT`, `OUTPUT`, `INPUT_PULLUP`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "INPUT" => Some(PinMode::Input),
            "OUTPUT" => Some(PinMode::Output),
            "INPUT_PULLUP" => Some(PinMode::InputPullup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PinMode::Input => "INPUT",
            PinMode::Output => "OUTPUT",
            PinMode::InputPullup => "INPUT_PULLUP",
            PinMode::Power => "POWER",
        }
    }
}

/// Bookkeeping link to the peripheral wired to a pin. Has no electrical effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub component_id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinState {
    pub mode: PinMode,
    pub digital: u8,
    pub analog: u16,
    pub pwm: u8,
    pub is_adc: bool,
    pub is_dac: bool,
    pub connection: Option<Connection>,
}

impl PinState {
    fn gpio(number: u8) -> Self {
        PinState {
            mode: PinMode::Input,
            digital: 0,
            analog: 0,
            pwm: 0,
            is_adc: ADC_PINS.contains(&number),
            is_dac: DAC_PINS.contains(&number),
            connection: None,
        }
    }

    fn rail(rail: PowerRail) -> Self {
        let high = rail.is_high();
        PinState {
            mode: PinMode::Power,
            digital: u8::from(high),
            analog: if high { MAX_ADC } else { 0 },
            pwm: 0,
            is_adc: false,
            is_dac: false,
            connection: None,
        }
    }
}

/// Handle returned by [`PinBoard::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type PinCallback = Box<dyn FnMut(PinId, &PinState)>;

/// The full pin table of the simulated module
pub struct PinBoard {
    pins: BTreeMap<PinId, PinState>,
    subscribers: Vec<(SubscriptionId, PinCallback)>,
    next_subscription: u64,
}

impl PinBoard {
    pub fn new() -> Self {
        PinBoard {
            pins: Self::initial_pins(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    fn initial_pins() -> BTreeMap<PinId, PinState> {
        let rails = PowerRail::ALL
            .iter()
            .map(|rail| (PinId::Rail(*rail), PinState::rail(*rail)));
        let gpios = GPIO_PINS
            .iter()
            .map(|n| (PinId::Gpio(*n), PinState::gpio(*n)));
        rails.chain(gpios).collect()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(PinId, &PinState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn pin(&self, id: PinId) -> Option<&PinState> {
        self.pins.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PinId, &PinState)> {
        self.pins.iter().map(|(id, state)| (*id, state))
    }

    pub fn set_mode(&mut self, id: PinId, mode: PinMode) {
        let Some(pin) = self.writable(id) else { return };
        let before = (pin.mode, pin.digital);
        pin.mode = mode;
        if mode == PinMode::InputPullup && pin.pwm == 0 {
            pin.digital = 1;
        }
        if before != (pin.mode, pin.digital) {
            self.notify(id);
        }
    }

    /// Drive the digital level; any nonzero value reads back as 1.
    pub fn write_digital(&mut self, id: PinId, value: f64) {
        let Some(pin) = self.writable(id) else { return };
        let level = u8::from(value != 0.0 && !value.is_nan());
        if pin.digital != level {
            pin.digital = level;
            self.notify(id);
        }
    }

    pub fn read_digital(&self, id: PinId) -> u8 {
        self.pins.get(&id).map_or(0, |pin| pin.digital)
    }

    /// Set the PWM duty, clamped to `0..=255`. The digital level follows the
    /// duty: high iff the stored duty is nonzero.
    pub fn write_analog(&mut self, id: PinId, duty: f64) {
        let Some(pin) = self.writable(id) else { return };
        let duty = duty.clamp(0.0, f64::from(MAX_PWM)) as u8;
        let level = u8::from(duty > 0);
        if pin.pwm != duty || pin.digital != level {
            pin.pwm = duty;
            pin.digital = level;
            self.notify(id);
        }
    }

    /// Inject an ADC reading from outside the sketch, clamped to `0..=4095`.
    pub fn set_analog_value(&mut self, id: PinId, raw: f64) {
        if let Some(pin) = self.writable(id) {
            pin.analog = raw.clamp(0.0, f64::from(MAX_ADC)) as u16;
        }
    }

    pub fn read_analog(&self, id: PinId) -> u16 {
        self.pins.get(&id).map_or(0, |pin| pin.analog)
    }

    pub fn connect(&mut self, id: PinId, component_id: &str, label: &str) {
        if let Some(pin) = self.pins.get_mut(&id) {
            pin.connection = Some(Connection {
                component_id: component_id.to_string(),
                label: label.to_string(),
            });
        }
    }

    pub fn disconnect(&mut self, id: PinId) {
        if let Some(pin) = self.pins.get_mut(&id) {
            pin.connection = None;
        }
    }

    /// Recreate the whole table and notify every pin so observers resync.
    pub fn reset_all(&mut self) {
        self.pins = Self::initial_pins();
        let ids: Vec<PinId> = self.pins.keys().copied().collect();
        for id in ids {
            self.notify(id);
        }
    }

    fn writable(&mut self, id: PinId) -> Option<&mut PinState> {
        if id.is_rail() {
            return None;
        }
        self.pins.get_mut(&id)
    }

    fn notify(&mut self, id: PinId) {
        let Some(state) = self.pins.get(&id) else { return };
        for (_, callback) in self.subscribers.iter_mut() {
            callback(id, state);
        }
    }
}

impl Default for PinBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PinBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinBoard")
            .field("pins", &self.pins.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
