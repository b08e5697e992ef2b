//! Tokenizers split raw connection bytes into [`Fragment`]s.
//!
//! [`FrameTokenizer`] is the contract the
//! [`InboundPipeline`](crate::pipeline::InboundPipeline) relies on. The crate
//! ships [`TransportTokenizer`] for the transport frame layout:
//!
//! ```text
//! +--------+-----------+------------+--------+---------+-----------------+
//! | "ES"   | length    | request id | status | version | body            |
//! | 2 B    | i32 BE    | u64 BE     | u8     | u32 BE  | length - 13 B   |
//! +--------+-----------+------------+--------+---------+-----------------+
//! ```
//!
//! A length of `-1` marks a 6-byte ping frame with no further fields.

mod config;

use bytes::{Buf, Bytes};

pub use config::{DEFAULT_MAX_FRAME_LENGTH, TokenizerConfig};

use crate::{
    error::DecodeError,
    fragment::{ContentChunk, Fragment, Header, PING_LEN, RequestId, TransportStatus},
};

/// Marker opening every transport frame.
pub const FRAME_MARKER: [u8; 2] = *b"ES";

/// Bytes of marker plus length prefix.
pub const PREFIX_LEN: usize = 6;

/// Bytes of request id, status, and version following the prefix.
pub const FIXED_HEADER_LEN: usize = 13;

/// Length value identifying a ping frame.
const PING_LENGTH: i32 = -1;

/// Splits a byte stream into an ordered sequence of fragments.
///
/// Implementations must uphold the ordering contract the aggregator relies on:
///
/// - return `Ok(0)` without emitting anything when `input` does not hold enough
///   bytes to make progress;
/// - emit content or end-of-content only while a header is open;
/// - never emit a header while another is open;
/// - emit pings as standalone fragments.
///
/// Content chunks should be zero-copy slices of `input` so that the read
/// buffer is released once every chunk referencing it has been dropped.
pub trait FrameTokenizer: Send {
    /// Decode as much of `input` as possible, appending fragments in wire
    /// order.
    ///
    /// Returns the number of bytes consumed from the start of `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when `input` contains a malformed frame.
    fn decode(
        &mut self,
        input: &Bytes,
        fragments: &mut Vec<Fragment>,
    ) -> Result<usize, DecodeError>;

    /// Drop any partially decoded frame state.
    fn reset(&mut self) {}
}

impl<T: FrameTokenizer + ?Sized> FrameTokenizer for Box<T> {
    fn decode(
        &mut self,
        input: &Bytes,
        fragments: &mut Vec<Fragment>,
    ) -> Result<usize, DecodeError> {
        (**self).decode(input, fragments)
    }

    fn reset(&mut self) { (**self).reset(); }
}

/// Streaming tokenizer for transport frames.
///
/// Body bytes are emitted as soon as they arrive, so a large message is
/// retained chunk by chunk rather than waiting for the whole frame to be
/// buffered by the caller.
#[derive(Debug, Default)]
pub struct TransportTokenizer {
    config: TokenizerConfig,
    body_remaining: usize,
}

impl TransportTokenizer {
    /// Create a tokenizer with default limits.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Create a tokenizer with explicit limits.
    #[must_use]
    pub fn with_config(config: TokenizerConfig) -> Self {
        Self {
            config,
            body_remaining: 0,
        }
    }

    /// Limits in effect.
    #[must_use]
    pub fn config(&self) -> &TokenizerConfig { &self.config }

    /// Whether a frame body is partially consumed.
    #[must_use]
    pub fn is_mid_frame(&self) -> bool { self.body_remaining > 0 }

    fn decode_content(&mut self, input: &Bytes, fragments: &mut Vec<Fragment>) -> usize {
        let take = self.body_remaining.min(input.len());
        if take == 0 {
            return 0;
        }
        fragments.push(Fragment::Content(ContentChunk::new(input.slice(..take))));
        self.body_remaining -= take;
        if self.body_remaining == 0 {
            fragments.push(Fragment::EndOfContent);
        }
        take
    }

    fn decode_header(
        &mut self,
        input: &Bytes,
        fragments: &mut Vec<Fragment>,
    ) -> Result<usize, DecodeError> {
        let Some(mut prefix) = input.get(..PREFIX_LEN) else {
            return Ok(0);
        };
        let found = [prefix.get_u8(), prefix.get_u8()];
        if found != FRAME_MARKER {
            return Err(DecodeError::InvalidMarker { found });
        }
        let length = prefix.get_i32();
        if length == PING_LENGTH {
            fragments.push(Fragment::Ping(input.slice(..PING_LEN)));
            return Ok(PING_LEN);
        }

        let body_and_header = usize::try_from(length)
            .ok()
            .filter(|len| *len >= FIXED_HEADER_LEN)
            .ok_or(DecodeError::InvalidLength { length })?;
        let frame_len = body_and_header + PREFIX_LEN;
        if frame_len > self.config.max_frame_length {
            return Err(DecodeError::FrameTooLarge {
                size: frame_len,
                max: self.config.max_frame_length,
            });
        }

        let Some(mut fixed) = input.get(PREFIX_LEN..PREFIX_LEN + FIXED_HEADER_LEN) else {
            return Ok(0);
        };
        let request_id = RequestId::new(fixed.get_u64());
        let status = TransportStatus::from_bits_retain(fixed.get_u8());
        let version = fixed.get_u32();
        let exempt = status.contains(TransportStatus::HANDSHAKE);
        if !exempt && version < self.config.min_compatible_version {
            return Err(DecodeError::UnsupportedVersion {
                version,
                minimum: self.config.min_compatible_version,
            });
        }

        fragments.push(Fragment::Header(Header::new(request_id, status, version)));
        let body_len = body_and_header - FIXED_HEADER_LEN;
        if body_len == 0 {
            fragments.push(Fragment::EndOfContent);
        } else {
            self.body_remaining = body_len;
        }
        Ok(PREFIX_LEN + FIXED_HEADER_LEN)
    }
}

impl FrameTokenizer for TransportTokenizer {
    fn decode(
        &mut self,
        input: &Bytes,
        fragments: &mut Vec<Fragment>,
    ) -> Result<usize, DecodeError> {
        if self.body_remaining > 0 {
            return Ok(self.decode_content(input, fragments));
        }
        self.decode_header(input, fragments)
    }

    fn reset(&mut self) { self.body_remaining = 0; }
}
