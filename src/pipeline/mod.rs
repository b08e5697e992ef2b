//! Decode, aggregate, and dispatch loop for one connection.
//!
//! [`InboundPipeline::handle_bytes`] feeds the unconsumed part of a read
//! buffer to a [`FrameTokenizer`], forwards the resulting fragments to an
//! [`Aggregator`], and hands completed messages to a [`MessageHandler`].
//!
//! Decoding pauses at every message boundary (end of content or ping) so that
//! the fragments buffered between forwarding passes stay bounded and
//! pipelined messages are dispatched one at a time. Bytes that do not yet form
//! a fragment are left unconsumed; the caller presents them again, followed by
//! newly read bytes, on the next call.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    aggregator::Aggregator,
    connection::ConnectionId,
    content::AggregatedMessage,
    error::{HandlerError, InboundError},
    fragment::{ContentChunk, Fragment},
    metrics::{self, MessageKind},
    tokenizer::FrameTokenizer,
};

/// Receives completed messages.
///
/// Called synchronously from [`InboundPipeline::handle_bytes`]. The message
/// content borrows buffers that are released as soon as the call returns, so
/// implementations copy what they need to keep. Long-running work should be
/// handed off to another task; blocking here stalls the connection's reads.
pub trait MessageHandler: Send {
    /// Handle one completed message.
    ///
    /// # Errors
    ///
    /// Any error aborts the current `handle_bytes` call and is returned to its
    /// caller as [`InboundError::Handler`].
    fn on_message(
        &mut self,
        connection: ConnectionId,
        message: AggregatedMessage<'_>,
    ) -> Result<(), HandlerError>;
}

impl<F> MessageHandler for F
where
    F: FnMut(ConnectionId, AggregatedMessage<'_>) -> Result<(), HandlerError> + Send,
{
    fn on_message(
        &mut self,
        connection: ConnectionId,
        message: AggregatedMessage<'_>,
    ) -> Result<(), HandlerError> {
        self(connection, message)
    }
}

/// Inbound half of a connection: tokenizer, aggregator, and message handler.
///
/// One pipeline serves exactly one connection and is driven by the task that
/// reads from it; it performs no I/O and holds no locks.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use inbound_pipeline::{
///     AggregatedMessage,
///     ConnectionId,
///     HandlerError,
///     InboundPipeline,
///     TransportTokenizer,
/// };
///
/// let mut pings = 0;
/// let handler = |_: ConnectionId, msg: AggregatedMessage<'_>| -> Result<(), HandlerError> {
///     assert!(msg.is_ping());
///     pings += 1;
///     Ok(())
/// };
/// let mut pipeline = InboundPipeline::new(TransportTokenizer::new(), handler);
///
/// let input = Bytes::from_static(b"ES\xff\xff\xff\xffES\xff");
/// let consumed = pipeline
///     .handle_bytes(ConnectionId::new(1), &input)
///     .expect("valid input");
/// assert_eq!(consumed, 6);
/// drop(pipeline);
/// assert_eq!(pings, 1);
/// ```
#[derive(Debug)]
pub struct InboundPipeline<T, H> {
    tokenizer: T,
    aggregator: Aggregator,
    handler: H,
    fragments: Vec<Fragment>,
    closed: bool,
}

impl<T, H> InboundPipeline<T, H>
where
    T: FrameTokenizer,
    H: MessageHandler,
{
    /// Create a pipeline for a newly established connection.
    pub fn new(tokenizer: T, handler: H) -> Self {
        Self {
            tokenizer,
            aggregator: Aggregator::new(),
            handler,
            fragments: Vec::new(),
            closed: false,
        }
    }

    /// Decode `input` and deliver every message it completes.
    ///
    /// Returns the number of leading bytes of `input` that were consumed. The
    /// caller keeps the remainder and prepends it to the next read.
    ///
    /// # Errors
    ///
    /// Returns [`InboundError::Decode`] for malformed frames,
    /// [`InboundError::Protocol`] for misordered fragments,
    /// [`InboundError::Handler`] when the handler fails, and
    /// [`InboundError::Closed`] after [`close`](Self::close). Every error is
    /// fatal to the connection. Fragments decoded but not yet forwarded when
    /// an error occurs are released undelivered.
    pub fn handle_bytes(
        &mut self,
        connection: ConnectionId,
        input: &Bytes,
    ) -> Result<usize, InboundError> {
        if self.closed {
            return Err(InboundError::Closed);
        }
        self.fragments.clear();
        let result = self.decode_and_forward(connection, input);
        if let Err(err) = &result {
            self.fragments.clear();
            warn!(%connection, error = %err, "inbound pipeline failed");
            metrics::inc_errors(err.error_type());
        }
        result
    }

    fn decode_and_forward(
        &mut self,
        connection: ConnectionId,
        input: &Bytes,
    ) -> Result<usize, InboundError> {
        let mut consumed = 0;
        loop {
            consumed = self.decode_batch(input, consumed)?;
            if self.fragments.is_empty() {
                return Ok(consumed);
            }
            self.forward(connection)?;
        }
    }

    /// Decode until the tokenizer stalls or a message boundary is reached.
    fn decode_batch(&mut self, input: &Bytes, mut consumed: usize) -> Result<usize, InboundError> {
        while consumed < input.len() {
            let remaining = input.len() - consumed;
            let decoded = self
                .tokenizer
                .decode(&input.slice(consumed..), &mut self.fragments)?;
            debug_assert!(
                decoded <= remaining,
                "tokenizer consumed {decoded} of {remaining} bytes"
            );
            if decoded == 0 {
                break;
            }
            consumed += decoded.min(remaining);
            if self
                .fragments
                .last()
                .is_some_and(Fragment::is_message_boundary)
            {
                break;
            }
        }
        Ok(consumed)
    }

    /// Forward buffered fragments in order.
    ///
    /// Draining hands each chunk's ownership to the aggregator; whatever is
    /// left when an error returns early is dropped with the drain.
    fn forward(&mut self, connection: ConnectionId) -> Result<(), InboundError> {
        let Self {
            aggregator,
            handler,
            fragments,
            ..
        } = self;
        for fragment in fragments.drain(..) {
            match fragment {
                Fragment::Header(header) => aggregator.header_received(header)?,
                Fragment::Content(chunk) => aggregator
                    .content_received(chunk, |msg| deliver(&mut *handler, connection, msg))?,
                Fragment::EndOfContent => aggregator
                    .content_received(ContentChunk::end_of_content(), |msg| {
                        deliver(&mut *handler, connection, msg)
                    })?,
                Fragment::Ping(ping) => aggregator
                    .ping_received(&ping, |msg| deliver(&mut *handler, connection, msg))?,
            }
        }
        Ok(())
    }

    /// Release the tokenizer and any message still being aggregated.
    ///
    /// The handler is not invoked for the discarded message. Calling `close`
    /// more than once is a no-op; later calls to
    /// [`handle_bytes`](Self::handle_bytes) fail with [`InboundError::Closed`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.tokenizer.reset();
        self.fragments.clear();
        if self.aggregator.dispose() {
            debug!("discarded in-flight message on close");
            metrics::inc_discarded();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed }

    /// Whether a message is partially aggregated.
    #[must_use]
    pub fn is_aggregating(&self) -> bool { self.aggregator.is_aggregating() }

    /// Borrow the aggregator.
    #[must_use]
    pub fn aggregator(&self) -> &Aggregator { &self.aggregator }

    /// Borrow the tokenizer.
    #[must_use]
    pub fn tokenizer(&self) -> &T { &self.tokenizer }

    /// Borrow the message handler.
    #[must_use]
    pub fn handler(&self) -> &H { &self.handler }

    /// Close the pipeline and return its handler.
    #[must_use]
    pub fn into_handler(mut self) -> H {
        self.close();
        self.handler
    }
}

fn deliver<H: MessageHandler>(
    handler: &mut H,
    connection: ConnectionId,
    message: AggregatedMessage<'_>,
) -> Result<(), HandlerError> {
    let kind = if message.is_ping() {
        MessageKind::Ping
    } else {
        MessageKind::Message
    };
    handler.on_message(connection, message)?;
    metrics::inc_messages(kind);
    Ok(())
}
