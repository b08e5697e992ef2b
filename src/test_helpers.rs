#![cfg(test)]
//! Test-only helpers shared by unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::{BufMut, Bytes};

use crate::{
    connection::ConnectionId,
    content::AggregatedMessage,
    error::{DecodeError, HandlerError},
    fragment::{ContentChunk, Fragment, Header, PING_LEN, RequestId, TransportStatus},
    pipeline::MessageHandler,
    tokenizer::FrameTokenizer,
};

/// Protocol version written by [`frame`].
pub const TEST_VERSION: u32 = 7;

/// Counts how many tracked allocations have been freed.
#[derive(Clone, Debug, Default)]
pub struct ReleaseTracker {
    released: Arc<AtomicUsize>,
}

struct TrackedBuffer {
    data: Vec<u8>,
    released: Arc<AtomicUsize>,
}

impl AsRef<[u8]> for TrackedBuffer {
    fn as_ref(&self) -> &[u8] { &self.data }
}

impl Drop for TrackedBuffer {
    fn drop(&mut self) { self.released.fetch_add(1, Ordering::SeqCst); }
}

impl ReleaseTracker {
    pub fn new() -> Self { Self::default() }

    /// Copy `data` into an allocation whose release is recorded.
    pub fn buffer(&self, data: &[u8]) -> Bytes {
        Bytes::from_owner(TrackedBuffer {
            data: data.to_vec(),
            released: Arc::clone(&self.released),
        })
    }

    pub fn chunk(&self, data: &[u8]) -> ContentChunk { ContentChunk::new(self.buffer(data)) }

    /// Number of tracked allocations freed so far.
    pub fn released(&self) -> usize { self.released.load(Ordering::SeqCst) }
}

pub fn header(id: u64) -> Header {
    Header::new(RequestId::new(id), TransportStatus::REQUEST, TEST_VERSION)
}

/// Encode a transport frame carrying `body`.
pub fn frame(id: u64, body: &[u8]) -> Vec<u8> {
    frame_with(id, TransportStatus::REQUEST, TEST_VERSION, body)
}

/// Encode a transport frame with explicit status and version.
pub fn frame_with(id: u64, status: TransportStatus, version: u32, body: &[u8]) -> Vec<u8> {
    let length = i32::try_from(13 + body.len()).expect("test frame fits in i32");
    let mut out = Vec::with_capacity(19 + body.len());
    out.put_slice(b"ES");
    out.put_i32(length);
    out.put_u64(id);
    out.put_u8(status.bits());
    out.put_u32(version);
    out.put_slice(body);
    out
}

/// Encode a ping frame.
pub fn ping() -> Vec<u8> {
    let mut out = Vec::with_capacity(PING_LEN);
    out.put_slice(b"ES");
    out.put_i32(-1);
    out
}

/// A delivered message copied out of the consumer callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
    pub connection: ConnectionId,
    pub header: Option<Header>,
    pub content: Vec<u8>,
    pub is_ping: bool,
}

impl Recorded {
    pub fn message(connection: u64, id: u64, content: &[u8]) -> Self {
        Self {
            connection: ConnectionId::new(connection),
            header: Some(header(id)),
            content: content.to_vec(),
            is_ping: false,
        }
    }

    pub fn ping(connection: u64) -> Self {
        Self {
            connection: ConnectionId::new(connection),
            header: None,
            content: Vec::new(),
            is_ping: true,
        }
    }
}

/// Handler that records every message and can be told to fail.
#[derive(Debug, Default)]
pub struct Recorder {
    pub messages: Vec<Recorded>,
    /// Fail when this many messages have already been recorded.
    pub fail_after: Option<usize>,
}

impl Recorder {
    pub fn failing_after(count: usize) -> Self {
        Self {
            messages: Vec::new(),
            fail_after: Some(count),
        }
    }
}

impl MessageHandler for Recorder {
    fn on_message(
        &mut self,
        connection: ConnectionId,
        message: AggregatedMessage<'_>,
    ) -> Result<(), HandlerError> {
        if self.fail_after == Some(self.messages.len()) {
            return Err("recorder asked to fail".into());
        }
        self.messages.push(Recorded {
            connection,
            header: message.header().copied(),
            content: message.content().to_vec(),
            is_ping: message.is_ping(),
        });
        Ok(())
    }
}

/// Tokenizer replaying a fixed script of `(consumed, fragments)` steps.
///
/// Each call pops one step; an exhausted script consumes nothing.
#[derive(Debug, Default)]
pub struct ScriptedTokenizer {
    steps: VecDeque<(usize, Vec<Fragment>)>,
}

impl ScriptedTokenizer {
    pub fn new(steps: impl IntoIterator<Item = (usize, Vec<Fragment>)>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }
}

impl FrameTokenizer for ScriptedTokenizer {
    fn decode(
        &mut self,
        _input: &Bytes,
        fragments: &mut Vec<Fragment>,
    ) -> Result<usize, DecodeError> {
        let Some((consumed, step)) = self.steps.pop_front() else {
            return Ok(0);
        };
        fragments.extend(step);
        Ok(consumed)
    }
}
