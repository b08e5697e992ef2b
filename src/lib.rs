#![doc(html_root_url = "https://docs.rs/inbound-pipeline/latest")]
//! Inbound message pipeline for a binary framing protocol.
//!
//! Raw connection bytes are split into [`Fragment`]s by a [`FrameTokenizer`],
//! reassembled into complete messages by an [`Aggregator`], and handed to a
//! [`MessageHandler`] by the [`InboundPipeline`] that owns them. Message
//! content is never copied: handlers see a [`CompositeContent`] view over the
//! retained read buffers, which are released once the handler returns.

pub mod aggregator;
pub mod connection;
pub mod content;
pub mod error;
pub mod fragment;
pub mod metrics;
pub mod pipeline;
pub mod tokenizer;

#[cfg(test)]
mod test_helpers;

pub use aggregator::Aggregator;
pub use connection::{ConnectionId, DEFAULT_READ_SIZE, read_frames};
pub use content::{AggregatedMessage, CompositeContent};
pub use error::{DecodeError, HandlerError, InboundError, ProtocolViolation};
pub use fragment::{ContentChunk, Fragment, Header, PING_LEN, RequestId, TransportStatus};
pub use pipeline::{InboundPipeline, MessageHandler};
pub use tokenizer::{
    DEFAULT_MAX_FRAME_LENGTH,
    FrameTokenizer,
    TokenizerConfig,
    TransportTokenizer,
};
