//! Observability subsystem
//!
//! Structured JSON logs for the query lifecycle. Logging is read-only: it
//! never changes what a query returns or writes.
//!
//! ```ignore
//! use treequery::observability::{Event, EventLog};
//!
//! let log = EventLog::new(true);
//! log.emit(Event::QueryParsed, &[("statement", "SELECT"), ("path", "users")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Lifecycle event sink, silenced when disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLog {
    enabled: bool,
}

impl EventLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A log that drops every event
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log a lifecycle event with fields
    pub fn emit(&self, event: Event, fields: &[(&str, &str)]) {
        if self.enabled {
            Logger::log(event.severity(), event.as_str(), fields);
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_gate() {
        assert!(EventLog::default().is_enabled());
        assert!(!EventLog::disabled().is_enabled());
        // Disabled logs drop events without output
        EventLog::disabled().emit(Event::QueryReceived, &[("query", "select * from t")]);
    }

    #[test]
    fn test_emit_with_fields() {
        EventLog::new(true).emit(Event::PreviewReady, &[("path", "users"), ("version", "1")]);
    }
}
