//! Query lifecycle events

use std::fmt;

use super::logger::Severity;

/// Observable events of one `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Parsing
    QueryReceived,
    QueryParsed,
    QueryParseFailed,

    // Subscriptions
    SubscriptionOpened,
    SubscriptionClosed,
    SubscriptionsTornDown,
    SubqueryResolved,
    DeliveryReceived,

    // Results
    PreviewReady,
    CommitIssued,
    ExecutionFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryReceived => "QUERY_RECEIVED",
            Event::QueryParsed => "QUERY_PARSED",
            Event::QueryParseFailed => "QUERY_PARSE_FAILED",
            Event::SubscriptionOpened => "SUBSCRIPTION_OPENED",
            Event::SubscriptionClosed => "SUBSCRIPTION_CLOSED",
            Event::SubscriptionsTornDown => "SUBSCRIPTIONS_TORN_DOWN",
            Event::SubqueryResolved => "SUBQUERY_RESOLVED",
            Event::DeliveryReceived => "DELIVERY_RECEIVED",
            Event::PreviewReady => "PREVIEW_READY",
            Event::CommitIssued => "COMMIT_ISSUED",
            Event::ExecutionFailed => "EXECUTION_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::DeliveryReceived | Event::SubscriptionOpened | Event::SubscriptionClosed => {
                Severity::Trace
            }
            Event::QueryParseFailed => Severity::Warn,
            Event::ExecutionFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
