//! Metric helpers for the inbound pipeline.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking delivered messages.
pub const MESSAGES_DELIVERED: &str = "inbound_messages_delivered_total";
/// Name of the counter tracking pipeline failures.
pub const ERRORS_TOTAL: &str = "inbound_errors_total";
/// Name of the counter tracking in-flight messages released on close.
pub const DISCARDED_TOTAL: &str = "inbound_discarded_messages_total";

/// Kind of delivered message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Regular request or response.
    Message,
    /// Keepalive ping.
    Ping,
}

impl MessageKind {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::Ping => "ping",
        }
    }
}

/// Record a delivered message.
pub fn inc_messages(kind: MessageKind) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DELIVERED, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

/// Record a pipeline failure labelled with its error type.
pub fn inc_errors(error_type: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = error_type;
}

/// Record an in-flight message released without delivery.
pub fn inc_discarded() {
    #[cfg(feature = "metrics")]
    counter!(DISCARDED_TOTAL).increment(1);
}
