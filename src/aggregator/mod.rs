//! Reassembly of header and content fragments into complete messages.
//!
//! The [`Aggregator`] holds at most one open message per connection. A
//! [`Header`] opens it, non-empty [`ContentChunk`]s accumulate, and an empty
//! chunk (end of content) closes it: the retained chunks are presented to the
//! consumer as one [`CompositeContent`] view and released afterwards.
//!
//! ```text
//! Idle --header--> Open --content--> Open
//!   ^                |
//!   +---end/error----+
//! ```

use tracing::trace;

use crate::{
    content::{AggregatedMessage, CompositeContent},
    error::{HandlerError, InboundError, ProtocolViolation},
    fragment::{ContentChunk, Header, PING_LEN},
};

/// Message currently being aggregated.
#[derive(Debug)]
struct PendingAggregation {
    header: Header,
    chunks: Vec<ContentChunk>,
}

impl PendingAggregation {
    fn new(header: Header) -> Self {
        Self {
            header,
            chunks: Vec::new(),
        }
    }

    fn buffered_bytes(&self) -> usize { self.chunks.iter().map(ContentChunk::len).sum() }
}

/// Per-connection aggregation state.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use inbound_pipeline::{
///     Aggregator,
///     ContentChunk,
///     Header,
///     RequestId,
///     TransportStatus,
/// };
///
/// let mut aggregator = Aggregator::new();
/// let header = Header::new(RequestId::new(1), TransportStatus::REQUEST, 1);
/// aggregator.header_received(header).expect("no message open");
///
/// let mut seen = Vec::new();
/// for part in [&b"AB"[..], b"CD", b""] {
///     let chunk = ContentChunk::new(Bytes::copy_from_slice(part));
///     aggregator
///         .content_received(chunk, |msg| {
///             seen.push(msg.content().to_vec());
///             Ok(())
///         })
///         .expect("message open");
/// }
/// assert_eq!(seen, vec![b"ABCD".to_vec()]);
/// assert!(!aggregator.is_aggregating());
/// ```
#[derive(Debug, Default)]
pub struct Aggregator {
    pending: Option<PendingAggregation>,
}

impl Aggregator {
    /// Create an idle aggregator.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Open a new message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::HeaderAlreadyReceived`] if a message is
    /// already open. The open message is discarded and its chunks released,
    /// leaving the aggregator idle.
    pub fn header_received(&mut self, header: Header) -> Result<(), ProtocolViolation> {
        if let Some(stale) = self.pending.take() {
            return Err(ProtocolViolation::HeaderAlreadyReceived {
                pending: stale.header.request_id,
                incoming: header.request_id,
            });
        }
        self.pending = Some(PendingAggregation::new(header));
        Ok(())
    }

    /// Accept a content chunk for the open message.
    ///
    /// A non-empty chunk is retained. An empty chunk marks the end of content:
    /// `consumer` receives the completed message, after which every retained
    /// chunk is released and the aggregator returns to idle. Release happens
    /// whether or not `consumer` fails.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::ContentWithoutHeader`] when no message is
    /// open, or [`InboundError::Handler`] when `consumer` fails.
    pub fn content_received<F>(
        &mut self,
        chunk: ContentChunk,
        consumer: F,
    ) -> Result<(), InboundError>
    where
        F: FnOnce(AggregatedMessage<'_>) -> Result<(), HandlerError>,
    {
        // Owned from here on: the chunks drop at scope exit on every path.
        let Some(mut pending) = self.pending.take() else {
            return Err(ProtocolViolation::ContentWithoutHeader.into());
        };
        if !chunk.is_empty() {
            pending.chunks.push(chunk);
            self.pending = Some(pending);
            return Ok(());
        }

        trace!(
            request_id = %pending.header.request_id,
            chunks = pending.chunks.len(),
            bytes = pending.buffered_bytes(),
            "message aggregated"
        );
        let content = CompositeContent::new(&pending.chunks);
        consumer(AggregatedMessage::new(pending.header, content)).map_err(InboundError::Handler)
    }

    /// Deliver a ping to `consumer`. Aggregation state is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`InboundError::Handler`] when `consumer` fails.
    pub fn ping_received<F>(&mut self, ping: &[u8], consumer: F) -> Result<(), InboundError>
    where
        F: FnOnce(AggregatedMessage<'_>) -> Result<(), HandlerError>,
    {
        debug_assert_eq!(ping.len(), PING_LEN, "ping frames are {PING_LEN} bytes");
        consumer(AggregatedMessage::ping()).map_err(InboundError::Handler)
    }

    /// Whether a message is currently open.
    #[must_use]
    pub fn is_aggregating(&self) -> bool { self.pending.is_some() }

    /// Bytes retained for the open message.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.pending
            .as_ref()
            .map_or(0, PendingAggregation::buffered_bytes)
    }

    /// Release any open message without delivering it.
    ///
    /// Returns `true` if a message was discarded. Calling this on an idle
    /// aggregator is a no-op.
    pub fn dispose(&mut self) -> bool { self.pending.take().is_some() }
}
