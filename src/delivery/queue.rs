//! Chunking and the paced delivery queue.
//!
//! A synthesized reply arrives as one large buffer, but the avatar renderer
//! wants short, ordered chunks.  [`DeliveryQueue::enqueue`] splits a buffer
//! into fixed-duration [`AudioChunk`]s and appends them FIFO;
//! [`DeliveryQueue::drain`] hands them to an [`AvatarSink`] back-to-back,
//! with a single-drain-in-flight guard so a chunk can never be delivered
//! twice.
//!
//! The queue is cleared wholesale on session stop so a stopped session
//! never plays stale audio.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::audio::PcmBuffer;

use super::sink::AvatarSink;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A slice of reply audio plus its nominal playback duration.
///
/// Chunks produced from one reply are ordered; the queue preserves that
/// order end-to-end.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pcm: PcmBuffer,
    duration_ms: f64,
}

impl AudioChunk {
    /// Wrap a buffer; the duration is derived from `len / sample_rate`.
    pub fn new(pcm: PcmBuffer) -> Self {
        let duration_ms = pcm.duration_ms();
        Self { pcm, duration_ms }
    }

    /// The chunk's audio.
    pub fn pcm(&self) -> &PcmBuffer {
        &self.pcm
    }

    /// Nominal playback duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    /// Returns `true` for a zero-sample chunk (never produced by `enqueue`).
    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DeliveryQueue
// ---------------------------------------------------------------------------

/// FIFO of [`AudioChunk`]s awaiting delivery.
///
/// # Example
///
/// ```rust
/// use avatar_voice::audio::PcmBuffer;
/// use avatar_voice::delivery::DeliveryQueue;
///
/// let queue = DeliveryQueue::new();
/// // 1 s at 16 kHz chunked at 300 ms → 3 × 4 800 samples + 1 × 1 600.
/// let n = queue.enqueue(PcmBuffer::new(vec![0; 16_000], 16_000), 300);
/// assert_eq!(n, 4);
/// assert_eq!(queue.len(), 4);
/// ```
pub struct DeliveryQueue {
    chunks: Mutex<VecDeque<AudioChunk>>,
    /// Set while a drain is walking the queue.  A second `drain` call while
    /// this is set is a no-op — the guard against duplicate delivery.
    draining: AtomicBool,
}

impl DeliveryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    /// Split `buffer` into consecutive slices of `chunk_duration_ms` at the
    /// buffer's sample rate (the last slice may be shorter) and append them
    /// in order.  Returns the number of chunks appended.
    ///
    /// A duration that works out below one sample is raised to one sample,
    /// so any `chunk_duration_ms` yields forward progress.
    pub fn enqueue(&self, buffer: PcmBuffer, chunk_duration_ms: u32) -> usize {
        if buffer.is_empty() {
            return 0;
        }

        let rate = buffer.sample_rate();
        let chunk_len =
            ((rate as u64 * chunk_duration_ms as u64) / 1_000).max(1) as usize;

        let mut queue = self.chunks.lock().unwrap();
        let mut appended = 0;
        for slice in buffer.samples().chunks(chunk_len) {
            queue.push_back(AudioChunk::new(PcmBuffer::new(slice.to_vec(), rate)));
            appended += 1;
        }

        log::debug!(
            "delivery: enqueued {appended} chunk(s) of ≤{chunk_len} samples @ {rate} Hz"
        );
        appended
    }

    /// Deliver queued chunks to `sink`, head first, back-to-back.
    ///
    /// Chunks are handed over as fast as the sink accepts them; there is no
    /// real-time pacing beyond the sink's own delivery latency.  If a drain
    /// is already in flight the call returns immediately without touching
    /// the queue.
    pub fn drain(&self, sink: &dyn AvatarSink) {
        if self.draining.swap(true, Ordering::AcqRel) {
            log::debug!("delivery: drain already in flight, ignoring");
            return;
        }

        loop {
            let chunk = self.chunks.lock().unwrap().pop_front();
            match chunk {
                Some(chunk) => sink.deliver(chunk),
                None => break,
            }
        }

        self.draining.store(false, Ordering::Release);
    }

    /// Discard every queued chunk and reset the in-flight flag.  Called on
    /// session stop so stale reply audio is never delivered.
    pub fn clear(&self) {
        let dropped = {
            let mut queue = self.chunks.lock().unwrap();
            let n = queue.len();
            queue.clear();
            n
        };
        self.draining.store(false, Ordering::Release);
        if dropped > 0 {
            log::debug!("delivery: cleared {dropped} pending chunk(s)");
        }
    }

    /// Number of chunks currently queued.
    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    /// Returns `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
