//! Zero-copy view over aggregated content and the message handed to consumers.

use std::fmt;

use bytes::{Buf, Bytes, BytesMut};

use crate::fragment::{ContentChunk, Header};

/// Zero-copy concatenation of the chunks collected for one message.
///
/// The view borrows the chunks retained by the
/// [`Aggregator`](crate::aggregator::Aggregator), so it cannot outlive the
/// consumer callback it was passed to. Use [`to_bytes`](Self::to_bytes) to
/// keep the content beyond that point.
///
/// The view implements [`Buf`], allowing readers to consume the content as a
/// single contiguous stream even when it spans several chunks.
///
/// # Examples
///
/// ```
/// use bytes::{Buf, Bytes};
/// use inbound_pipeline::{CompositeContent, ContentChunk};
///
/// let chunks = [
///     ContentChunk::new(Bytes::from_static(b"AB")),
///     ContentChunk::new(Bytes::from_static(b"CD")),
/// ];
/// let mut view = CompositeContent::new(&chunks);
/// assert_eq!(view.len(), 4);
/// assert_eq!(view, b"ABCD"[..]);
/// assert_eq!(view.get_u16(), u16::from_be_bytes(*b"AB"));
/// assert_eq!(view.to_bytes(), Bytes::from_static(b"CD"));
/// ```
#[derive(Clone)]
pub struct CompositeContent<'a> {
    chunks: &'a [ContentChunk],
    offset: usize,
    remaining: usize,
}

impl<'a> CompositeContent<'a> {
    /// Build a view over `chunks` in order.
    #[must_use]
    pub fn new(chunks: &'a [ContentChunk]) -> Self {
        let remaining = chunks.iter().map(ContentChunk::len).sum();
        let mut view = Self {
            chunks,
            offset: 0,
            remaining,
        };
        view.skip_exhausted();
        view
    }

    /// An empty view.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            chunks: &[],
            offset: 0,
            remaining: 0,
        }
    }

    /// Number of unread bytes in the view.
    #[must_use]
    pub const fn len(&self) -> usize { self.remaining }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.remaining == 0 }

    /// Iterate over the unread bytes chunk by chunk.
    pub fn chunks(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        let offset = self.offset;
        let chunks: &'a [ContentChunk] = self.chunks;
        chunks
            .iter()
            .enumerate()
            .map(move |(i, chunk)| {
                let bytes: &'a [u8] = chunk.as_ref();
                if i == 0 { &bytes[offset..] } else { bytes }
            })
            .filter(|slice| !slice.is_empty())
    }

    /// Materialise the unread content as owned [`Bytes`].
    ///
    /// Content held in a single chunk is returned without copying; content
    /// spanning several chunks is copied into one buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self.chunks {
            [] => Bytes::new(),
            [only] => only.as_bytes().slice(self.offset..),
            _ => {
                let mut out = BytesMut::with_capacity(self.remaining);
                for slice in self.chunks() {
                    out.extend_from_slice(slice);
                }
                out.freeze()
            }
        }
    }

    /// Copy the unread content into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> { self.to_bytes().to_vec() }

    fn skip_exhausted(&mut self) {
        let mut chunks: &'a [ContentChunk] = self.chunks;
        while let Some((first, rest)) = chunks.split_first() {
            if self.offset < first.len() {
                break;
            }
            chunks = rest;
            self.offset = 0;
        }
        self.chunks = chunks;
    }
}

impl Default for CompositeContent<'_> {
    fn default() -> Self { Self::empty() }
}

impl Buf for CompositeContent<'_> {
    fn remaining(&self) -> usize { self.remaining }

    fn chunk(&self) -> &[u8] {
        match self.chunks.first() {
            Some(first) => &first.as_ref()[self.offset..],
            None => &[],
        }
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= self.remaining,
            "cannot advance past end of composite content: {cnt} > {}",
            self.remaining
        );
        self.remaining -= cnt;
        while cnt > 0 {
            let chunks: &[ContentChunk] = self.chunks;
            let Some((first, rest)) = chunks.split_first() else {
                break;
            };
            let available = first.len() - self.offset;
            if cnt < available {
                self.offset += cnt;
                return;
            }
            cnt -= available;
            self.chunks = rest;
            self.offset = 0;
        }
        self.skip_exhausted();
    }

    fn copy_to_bytes(&mut self, len: usize) -> Bytes {
        assert!(len <= self.remaining, "`len` greater than remaining");
        if let Some(first) = self.chunks.first()
            && len <= first.len() - self.offset
        {
            let out = first.as_bytes().slice(self.offset..self.offset + len);
            self.advance(len);
            return out;
        }
        let mut out = BytesMut::with_capacity(len);
        let mut needed = len;
        while needed > 0 {
            let chunk = self.chunk();
            let n = needed.min(chunk.len());
            out.extend_from_slice(&chunk[..n]);
            self.advance(n);
            needed -= n;
        }
        out.freeze()
    }
}

impl PartialEq<[u8]> for CompositeContent<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        if self.remaining != other.len() {
            return false;
        }
        let mut rest = other;
        self.chunks().all(|slice| {
            let (head, tail) = rest.split_at(slice.len());
            rest = tail;
            head == slice
        })
    }
}

impl PartialEq<&[u8]> for CompositeContent<'_> {
    fn eq(&self, other: &&[u8]) -> bool { *self == **other }
}

impl PartialEq for CompositeContent<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.remaining == other.remaining && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for CompositeContent<'_> {}

impl fmt::Debug for CompositeContent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeContent")
            .field("chunks", &self.chunks.len())
            .field("len", &self.remaining)
            .finish()
    }
}

/// A completed inbound message.
///
/// Regular messages carry a [`Header`] and the aggregated body. Pings carry
/// neither. The content borrows buffers owned by the aggregator and is only
/// valid for the duration of the consumer callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedMessage<'a> {
    header: Option<Header>,
    content: CompositeContent<'a>,
    is_ping: bool,
}

impl<'a> AggregatedMessage<'a> {
    /// Construct a regular message.
    #[must_use]
    pub const fn new(header: Header, content: CompositeContent<'a>) -> Self {
        Self {
            header: Some(header),
            content,
            is_ping: false,
        }
    }

    /// Construct a ping message.
    #[must_use]
    pub const fn ping() -> Self {
        Self {
            header: None,
            content: CompositeContent::empty(),
            is_ping: true,
        }
    }

    /// Header of a regular message; `None` for pings.
    #[must_use]
    pub const fn header(&self) -> Option<&Header> { self.header.as_ref() }

    /// Borrow the aggregated content.
    #[must_use]
    pub const fn content(&self) -> &CompositeContent<'a> { &self.content }

    #[must_use]
    pub const fn is_ping(&self) -> bool { self.is_ping }
}
