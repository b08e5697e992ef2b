//! Error types for the inbound pipeline.
//!
//! # Error Categories
//!
//! - [`ProtocolViolation`]: fragments arrived in an order the wire protocol forbids.
//! - [`DecodeError`]: the tokenizer rejected malformed frame bytes.
//! - [`InboundError::Handler`]: the message consumer failed.
//! - [`InboundError`]: top-level enum returned by
//!   [`InboundPipeline::handle_bytes`](crate::pipeline::InboundPipeline::handle_bytes).
//!
//! No error at this layer is retried. Callers should treat every
//! [`InboundError`] as fatal to the connection and close the pipeline.

use std::io;

use thiserror::Error;

use crate::fragment::RequestId;

/// Error raised by a message consumer.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Fragment ordering violations detected by the
/// [`Aggregator`](crate::aggregator::Aggregator).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A header arrived while another message was still being aggregated.
    #[error("header {incoming} received while message {pending} is still open")]
    HeaderAlreadyReceived {
        /// Request id of the message that was abandoned.
        pending: RequestId,
        /// Request id carried by the unexpected header.
        incoming: RequestId,
    },
    /// Content or end-of-content arrived with no open message.
    #[error("content received without header")]
    ContentWithoutHeader,
}

/// Malformed frame bytes reported by a tokenizer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame did not start with the transport marker.
    #[error("invalid frame marker: {found:02x?}")]
    InvalidMarker {
        /// Marker bytes found on the wire.
        found: [u8; 2],
    },
    /// The length prefix is negative or shorter than the fixed header.
    #[error("invalid frame length: {length}")]
    InvalidLength {
        /// Length value read from the prefix.
        length: i32,
    },
    /// The frame exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Maximum permitted frame size.
        max: usize,
    },
    /// The sender's protocol version is not supported.
    #[error("unsupported protocol version {version}, minimum compatible is {minimum}")]
    UnsupportedVersion {
        /// Version id carried by the header.
        version: u32,
        /// Minimum version this side accepts.
        minimum: u32,
    },
}

/// Errors returned while handling inbound bytes.
#[derive(Debug, Error)]
pub enum InboundError {
    /// Fragments violated the wire protocol's ordering rules.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The tokenizer rejected malformed input.
    #[error("decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// The message consumer failed.
    #[error("message handler failed: {0}")]
    Handler(#[source] HandlerError),

    /// The pipeline has already been closed.
    #[error("pipeline is closed")]
    Closed,

    /// Reading from the connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended with a partial frame or an unfinished message.
    #[error("stream ended with {pending_bytes} undigested bytes (message in flight: {in_flight})")]
    TruncatedStream {
        /// Bytes left that never formed a complete fragment.
        pending_bytes: usize,
        /// Whether a message was still being aggregated.
        in_flight: bool,
    },
}

impl InboundError {
    /// Returns true for fragment ordering violations.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool { matches!(self, Self::Protocol(_)) }

    /// Short label used for logs and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Decode(_) => "decode",
            Self::Handler(_) => "handler",
            Self::Closed => "closed",
            Self::Io(_) => "io",
            Self::TruncatedStream { .. } => "truncated",
        }
    }
}

impl From<InboundError> for io::Error {
    fn from(err: InboundError) -> Self {
        match err {
            InboundError::Io(e) => e,
            InboundError::Protocol(_) | InboundError::Decode(_) => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            InboundError::TruncatedStream { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            InboundError::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            InboundError::Handler(_) => io::Error::other(err),
        }
    }
}
