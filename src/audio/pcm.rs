//! PCM buffer value type shared by every audio stage.
//!
//! [`PcmBuffer`] is an ordered sequence of signed 16-bit mono samples at a
//! known sample rate.  Buffers are produced once and then *moved* from stage
//! to stage (synthesizer → resampler → chunker); no stage holds a shared
//! reference to another stage's audio.

// ---------------------------------------------------------------------------
// PcmBuffer
// ---------------------------------------------------------------------------

/// Mono, signed 16-bit PCM audio at a known sample rate.
///
/// # Example
///
/// ```rust
/// use avatar_voice::audio::PcmBuffer;
///
/// let buf = PcmBuffer::new(vec![0_i16; 24_000], 24_000);
/// assert_eq!(buf.len(), 24_000);
/// assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Create a buffer from raw samples.
    ///
    /// # Panics
    ///
    /// Panics if `sample_rate == 0`.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "PcmBuffer sample_rate must be > 0");
        Self {
            samples,
            sample_rate,
        }
    }

    /// Convert normalised `f32` samples in `[-1.0, 1.0]` (the cpal callback
    /// format) to 16-bit PCM.  Input outside that range is clamped before
    /// scaling.
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let scaled = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
            .collect();
        Self::new(scaled, sample_rate)
    }

    /// Convert back to normalised `f32` samples (the Whisper input format).
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }

    /// Borrow the raw samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Consume the buffer and return the raw samples.
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Nominal playback duration in seconds (`len / sample_rate`).
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Nominal playback duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_secs() * 1_000.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
