//! Structured pipeline diagnostics.
//!
//! The engine reports what it does as [`LogEntry`] values carrying a
//! machine-readable [`Event`] plus a human-readable message. Entries go to a
//! broadcast channel so any number of consumers can [`Diagnostics::subscribe`],
//! and are optionally echoed to stderr.
//!
//! A [`Diagnostics`] handle is passed explicitly to the engine; nothing is
//! stored on transform functions or in globals.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Channel capacity. Slow subscribers lose the oldest entries.
const CHANNEL_CAPACITY: usize = 256;

/// Severity, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// An `apply` call started on `rows` canonical rows.
    ApplyStarted { rows: usize, units: usize },
    /// A function object was registered twice; the second registration was ignored.
    DuplicateRegistration { function: String },
    /// A unit was not re-invoked because it already ran.
    UnitSkipped { unit: String },
    /// A unit ran and merged these columns.
    UnitApplied { unit: String, columns: Vec<String> },
    /// A unit failed; the apply call stops here.
    UnitFailed { unit: String, error: String },
    /// An `apply` call finished.
    ApplyFinished { rows: usize, columns: usize },
}

impl Event {
    pub fn level(&self) -> LogLevel {
        match self {
            Event::ApplyStarted { .. } => LogLevel::Info,
            Event::DuplicateRegistration { .. } | Event::UnitSkipped { .. } => LogLevel::Warning,
            Event::UnitApplied { .. } | Event::ApplyFinished { .. } => LogLevel::Success,
            Event::UnitFailed { .. } => LogLevel::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ApplyStarted { rows, units } => {
                write!(f, "Applying {} unit(s) to {} row(s)", units, rows)
            }
            Event::DuplicateRegistration { function } => {
                write!(f, "Function '{}' is already registered, skipping", function)
            }
            Event::UnitSkipped { unit } => write!(f, "'{}' already applied, skipping", unit),
            Event::UnitApplied { unit, columns } => {
                write!(f, "'{}' -> [{}]", unit, columns.join(", "))
            }
            Event::UnitFailed { unit, error } => write!(f, "'{}' failed: {}", unit, error),
            Event::ApplyFinished { rows, columns } => {
                write!(f, "Feature table: {} row(s) x {} column(s)", rows, columns)
            }
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub event: Event,
    pub message: String,
    /// Nesting depth for display
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(event: Event) -> Self {
        Self {
            level: event.level(),
            message: event.to_string(),
            event,
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Broadcasts log entries to all subscribers.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    sender: broadcast::Sender<LogEntry>,
    echo: bool,
}

impl Diagnostics {
    /// A sink that also echoes entries to stderr.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, echo: true }
    }

    /// A sink that only broadcasts.
    pub fn silent() -> Self {
        Self::new().with_echo(false)
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn log(&self, entry: LogEntry) {
        if self.echo {
            let prefix = match entry.level {
                LogLevel::Info => "   ",
                LogLevel::Success => "   ✓",
                LogLevel::Warning => "   ⚠️",
                LogLevel::Error => "   ❌",
            };
            let indent = "   ".repeat(entry.indent as usize);
            eprintln!("{}{} {}", indent, prefix, entry.message);
        }

        // No subscribers is fine
        let _ = self.sender.send(entry);
    }

    pub fn emit(&self, event: Event) {
        self.log(LogEntry::new(event));
    }

    pub fn emit_indent(&self, event: Event, indent: u8) {
        self.log(LogEntry::new(event).with_indent(indent));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently buffered in a receiver.
pub fn drain(rx: &mut broadcast::Receiver<LogEntry>) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(entry) => entries.push(entry),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_events() {
        let diagnostics = Diagnostics::silent();
        let mut rx = diagnostics.subscribe();

        diagnostics.emit(Event::UnitSkipped { unit: "HighAmount".into() });
        diagnostics.emit(Event::ApplyFinished { rows: 2, columns: 1 });

        let entries = drain(&mut rx);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Warning);
        assert!(entries[0].message.contains("HighAmount"));
        assert_eq!(entries[1].event, Event::ApplyFinished { rows: 2, columns: 1 });
    }

    #[test]
    fn test_emit_without_subscribers_does_not_panic() {
        Diagnostics::silent().emit(Event::DuplicateRegistration { function: "f".into() });
    }

    #[test]
    fn test_entry_serializes_with_event_kind() {
        let entry = LogEntry::new(Event::UnitApplied {
            unit: "Duration".into(),
            columns: vec!["Duration".into()],
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["event"]["kind"], "unit_applied");
        assert_eq!(json["indent"], 0);
    }
}
