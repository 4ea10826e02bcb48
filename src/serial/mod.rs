//! Serial monitor
//!
//! Collects everything a sketch writes to `Serial`. `Serial.print` output is
//! held in a pending buffer; every other emission takes the pending text, adds
//! its own and becomes one [`SerialEvent`]. Events are kept in a bounded history
//! (oldest dropped first) and pushed to subscribers as they happen.

use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_HISTORY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialCategory {
    Print,
    Println,
    Printf,
    System,
    Error,
}

impl SerialCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialCategory::Print => "print",
            SerialCategory::Println => "println",
            SerialCategory::Printf => "printf",
            SerialCategory::System => "system",
            SerialCategory::Error => "error",
        }
    }

    /// Whether the event ends the current monitor line
    fn ends_line(&self) -> bool {
        !matches!(self, SerialCategory::Print | SerialCategory::Printf)
    }
}

impl fmt::Display for SerialCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One serial emission
#[derive(Debug, Clone, PartialEq)]
pub struct SerialEvent {
    pub text: String,
    pub category: SerialCategory,
    /// Simulated seconds since the run started
    pub elapsed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialSubscription(u64);

pub type SerialCallback = Box<dyn FnMut(&SerialEvent)>;

pub struct SerialMonitor {
    pending: String,
    events: VecDeque<SerialEvent>,
    capacity: usize,
    subscribers: Vec<(SerialSubscription, SerialCallback)>,
    next_subscription: u64,
}

impl SerialMonitor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SerialMonitor {
            pending: String::new(),
            events: VecDeque::new(),
            capacity: capacity.max(1),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Print without ending the event
    pub fn print(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Flush the pending text followed by `text` as a single event.
    pub fn emit(&mut self, text: &str, category: SerialCategory, elapsed: f64) {
        let mut full = std::mem::take(&mut self.pending);
        full.push_str(text);
        self.push(SerialEvent {
            text: full,
            category,
            elapsed,
        });
    }

    /// Emit any pending `print` text on its own. Does nothing when empty.
    pub fn flush(&mut self, elapsed: f64) {
        if !self.pending.is_empty() {
            self.emit("", SerialCategory::Print, elapsed);
        }
    }

    fn push(&mut self, event: SerialEvent) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&event);
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&SerialEvent) + 'static) -> SerialSubscription {
        let id = SerialSubscription(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SerialSubscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn events(&self) -> impl Iterator<Item = &SerialEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The history as monitor lines, pending text included.
    pub fn get_output(&self) -> Vec<String> {
        let mut text = String::new();
        for event in &self.events {
            text.push_str(&event.text);
            if event.category.ends_line() {
                text.push('\n');
            }
        }
        text.push_str(&self.pending);

        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.last().is_some_and(|s| s.is_empty()) {
            lines.pop();
        }
        lines
    }

    /// Drop the history and the pending text. Subscribers stay.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.events.clear();
    }
}

impl Default for SerialMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SerialMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialMonitor")
            .field("pending", &self.pending)
            .field("events", &self.events.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_print_accumulates_until_println() {
        let mut serial = SerialMonitor::new();
        serial.print("x");
        serial.print("y");
        assert!(serial.is_empty());
        serial.emit("z", SerialCategory::Println, 0.5);

        let events: Vec<_> = serial.events().cloned().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "xyz");
        assert_eq!(events[0].category, SerialCategory::Println);
        assert_eq!(events[0].elapsed, 0.5);
        assert_eq!(serial.pending(), "");
    }

    #[test]
    fn test_history_is_bounded() {
        let mut serial = SerialMonitor::with_capacity(2);
        for text in ["a", "b", "c"] {
            serial.emit(text, SerialCategory::Println, 0.0);
        }
        let texts: Vec<_> = serial.events().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_flush_only_when_pending() {
        let mut serial = SerialMonitor::new();
        serial.flush(0.0);
        assert!(serial.is_empty());
        serial.print("tail");
        serial.flush(1.0);
        assert_eq!(serial.events().next().map(|e| e.category), Some(SerialCategory::Print));
    }

    #[test]
    fn test_get_output_lines() {
        let mut serial = SerialMonitor::new();
        serial.emit("Value: 3", SerialCategory::Println, 0.0);
        serial.emit("a=1\nb=", SerialCategory::Printf, 0.0);
        serial.emit("2", SerialCategory::Println, 0.0);
        serial.print("pending");
        assert_eq!(serial.get_output(), vec!["Value: 3", "a=1", "b=2", "pending"]);
    }

    #[test]
    fn test_subscribers_see_events() {
        let mut serial = SerialMonitor::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = serial.subscribe(move |event| sink.borrow_mut().push(event.text.clone()));

        serial.emit("one", SerialCategory::System, 0.0);
        serial.unsubscribe(id);
        serial.emit("two", SerialCategory::System, 0.0);

        assert_eq!(seen.borrow().as_slice(), &["one".to_string()]);
    }
}
