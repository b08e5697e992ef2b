//! Shared utilities for integration tests.
//!
//! Provides transport frame encoders, a recording [`MessageHandler`], and a
//! tracker that observes when read buffers are released.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use bytes::{BufMut, Bytes};
use inbound_pipeline::{
    AggregatedMessage,
    ConnectionId,
    HandlerError,
    MessageHandler,
    TransportStatus,
};

/// Protocol version written by [`frame`].
pub const TEST_VERSION: u32 = 7;

/// Encode a request frame carrying `body`.
pub fn frame(id: u64, body: &[u8]) -> Vec<u8> {
    frame_with(id, TransportStatus::REQUEST, TEST_VERSION, body)
}

/// Encode a frame with explicit status and version.
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
    let mut out = Vec::with_capacity(6);
    out.put_slice(b"ES");
    out.put_i32(-1);
    out
}

/// What a handler observed, copied out of the callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seen {
    Message { request_id: u64, body: Vec<u8> },
    Ping,
}

/// Handler recording every delivered message.
#[derive(Debug, Default)]
pub struct Recorder {
    pub seen: Vec<Seen>,
    pub connections: Vec<ConnectionId>,
}

impl MessageHandler for Recorder {
    fn on_message(
        &mut self,
        connection: ConnectionId,
        message: AggregatedMessage<'_>,
    ) -> Result<(), HandlerError> {
        self.connections.push(connection);
        self.seen.push(match message.header() {
            Some(header) => Seen::Message {
                request_id: header.request_id.get(),
                body: message.content().to_vec(),
            },
            None => Seen::Ping,
        });
        Ok(())
    }
}

/// Counts how many tracked read buffers have been freed.
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
    /// Copy `data` into a buffer whose release is counted.
    pub fn buffer(&self, data: &[u8]) -> Bytes {
        Bytes::from_owner(TrackedBuffer {
            data: data.to_vec(),
            released: Arc::clone(&self.released),
        })
    }

    pub fn released(&self) -> usize { self.released.load(Ordering::SeqCst) }
}
