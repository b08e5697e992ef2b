//! Fragment types emitted by a [`FrameTokenizer`](crate::tokenizer::FrameTokenizer).
//!
//! A tokenizer turns raw connection bytes into an ordered sequence of
//! [`Fragment`]s: one [`Header`] opening a message, zero or more
//! [`ContentChunk`]s carrying body bytes, and an [`Fragment::EndOfContent`]
//! sentinel closing it. Pings travel as standalone [`Fragment::Ping`] frames.

use bytes::Bytes;
use derive_more::{Display, From, Into};

/// Size in bytes of a ping frame on the wire.
pub const PING_LEN: usize = 6;

/// Identifier correlating a request with its response.
///
/// # Examples
///
/// ```
/// use inbound_pipeline::RequestId;
/// let id = RequestId::new(7);
/// assert_eq!(id.get(), 7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct RequestId(u64);

impl RequestId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

bitflags::bitflags! {
    /// Status bits carried by every transport header.
    ///
    /// Bits this side does not know about are retained as received.
    ///
    /// # Examples
    ///
    /// ```
    /// use inbound_pipeline::TransportStatus;
    /// let status = TransportStatus::from_bits_retain(0x09);
    /// assert!(status.contains(TransportStatus::REQUEST | TransportStatus::HANDSHAKE));
    /// assert!(!status.contains(TransportStatus::COMPRESS));
    /// ```
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TransportStatus: u8 {
        /// Set on requests, clear on responses.
        const REQUEST = 1 << 0;
        /// The response carries an error.
        const ERROR = 1 << 1;
        /// The body is compressed. Decompression happens downstream.
        const COMPRESS = 1 << 2;
        /// Handshake frame; exempt from the version check.
        const HANDSHAKE = 1 << 3;
    }
}

/// Identity and metadata of one logical message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Request/response correlation identifier.
    pub request_id: RequestId,
    /// Status bits.
    pub status: TransportStatus,
    /// Protocol version id of the sender.
    pub version: u32,
}

impl Header {
    /// Construct a header.
    #[must_use]
    pub const fn new(request_id: RequestId, status: TransportStatus, version: u32) -> Self {
        Self {
            request_id,
            status,
            version,
        }
    }
}

/// Retained, reference-counted slice of message body bytes.
///
/// Chunks produced by a tokenizer usually share the allocation of the read
/// buffer they were sliced from. Dropping a chunk releases its reference; the
/// allocation is freed once every chunk and buffer handle has been released.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentChunk(Bytes);

impl ContentChunk {
    /// Wrap a buffer as a content chunk.
    #[must_use]
    pub const fn new(bytes: Bytes) -> Self { Self(bytes) }

    /// The zero-length chunk used to signal end of content.
    #[must_use]
    pub const fn end_of_content() -> Self { Self(Bytes::new()) }

    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Borrow the chunk bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &Bytes { &self.0 }
}

impl From<Bytes> for ContentChunk {
    fn from(bytes: Bytes) -> Self { Self(bytes) }
}

impl AsRef<[u8]> for ContentChunk {
    fn as_ref(&self) -> &[u8] { &self.0 }
}

/// One unit emitted by a tokenizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fragment {
    /// Start of a message.
    Header(Header),
    /// Non-empty slice of the message body.
    Content(ContentChunk),
    /// Zero-length sentinel closing the current message body.
    EndOfContent,
    /// Keepalive frame; carries the raw frame bytes.
    Ping(Bytes),
}

impl Fragment {
    /// Whether this fragment terminates a message on the wire.
    #[must_use]
    pub const fn is_message_boundary(&self) -> bool {
        matches!(self, Self::EndOfContent | Self::Ping(_))
    }
}
