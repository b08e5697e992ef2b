//! Connection identity and the read loop that drives a pipeline.
//!
//! [`read_frames`] owns the bytes a pipeline has not consumed yet and presents
//! them again, followed by newly read bytes, on the next call to
//! [`InboundPipeline::handle_bytes`].

use bytes::BytesMut;
use derive_more::{Display, From, Into};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::InboundError,
    pipeline::{InboundPipeline, MessageHandler},
    tokenizer::FrameTokenizer,
};

/// Default number of bytes requested per read.
pub const DEFAULT_READ_SIZE: usize = 64 * 1024;

/// Identifier assigned to a connection.
///
/// # Examples
///
/// ```
/// use inbound_pipeline::ConnectionId;
/// let id = ConnectionId::new(3);
/// assert_eq!(id.as_u64(), 3);
/// assert_eq!(id.to_string(), "ConnectionId(3)");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("ConnectionId({_0})")]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }
}

/// Read `reader` to completion, feeding every byte through `pipeline`.
///
/// At most `read_size` bytes are requested per read. The pipeline is closed
/// before this function returns, on success and on failure.
///
/// # Errors
///
/// Returns any error raised by the pipeline or the reader, or
/// [`InboundError::TruncatedStream`] when the stream ends inside a frame or
/// while a message is still being aggregated.
pub async fn read_frames<R, T, H>(
    reader: &mut R,
    pipeline: &mut InboundPipeline<T, H>,
    connection: ConnectionId,
    read_size: usize,
) -> Result<(), InboundError>
where
    R: AsyncRead + Unpin,
    T: FrameTokenizer,
    H: MessageHandler,
{
    let read_size = read_size.max(1);
    let result = drive(reader, pipeline, connection, read_size).await;
    pipeline.close();
    match &result {
        Ok(()) => debug!("{connection} closed cleanly"),
        Err(err) => warn!("{connection} closed after error: {err}"),
    }
    result
}

async fn drive<R, T, H>(
    reader: &mut R,
    pipeline: &mut InboundPipeline<T, H>,
    connection: ConnectionId,
    read_size: usize,
) -> Result<(), InboundError>
where
    R: AsyncRead + Unpin,
    T: FrameTokenizer,
    H: MessageHandler,
{
    let limit = u64::try_from(read_size).unwrap_or(u64::MAX);
    let mut buf = BytesMut::with_capacity(read_size);
    loop {
        buf.reserve(read_size);
        let read = (&mut *reader).take(limit).read_buf(&mut buf).await?;
        if read == 0 {
            if buf.is_empty() && !pipeline.is_aggregating() {
                return Ok(());
            }
            return Err(InboundError::TruncatedStream {
                pending_bytes: buf.len(),
                in_flight: pipeline.is_aggregating(),
            });
        }

        // Content chunks slice `input`, so the read buffer stays alive until
        // the aggregator releases them.
        let input = buf.split().freeze();
        let consumed = pipeline.handle_bytes(connection, &input)?;
        buf.extend_from_slice(&input[consumed..]);
    }
}
