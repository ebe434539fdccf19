//! The avatar-renderer seam.
//!
//! The core never talks to the rendering SDK directly; it hands each
//! [`AudioChunk`] to an [`AvatarSink`].  Transporting the chunk to the
//! renderer (and handling delivery failures) is the sink's own concern.

use tokio::sync::mpsc;

use super::queue::AudioChunk;

// ---------------------------------------------------------------------------
// AvatarSink trait
// ---------------------------------------------------------------------------

/// Receives reply audio one chunk at a time, in order.
///
/// Implementations must be `Send + Sync` so the sink can be shared with the
/// orchestrator task behind an `Arc<dyn AvatarSink>`.
pub trait AvatarSink: Send + Sync {
    /// Accept one chunk.  Infallible from the pipeline's point of view;
    /// sinks deal with their own transport errors.
    fn deliver(&self, chunk: AudioChunk);
}

// Compile-time assertion: Box<dyn AvatarSink> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AvatarSink>) {}
};

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Forwards chunks into an unbounded tokio channel.
///
/// This is the production boundary: whatever ships audio to the renderer
/// (a websocket task, a local player) owns the receiving half.  Send errors
/// mean the receiver is gone; the chunk is dropped with a log line, per the
/// sink contract.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AudioChunk>,
}

impl ChannelSink {
    /// Create a sink and the receiver the renderer transport should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AudioChunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AvatarSink for ChannelSink {
    fn deliver(&self, chunk: AudioChunk) {
        if self.tx.send(chunk).is_err() {
            log::warn!("avatar sink receiver dropped; discarding chunk");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
