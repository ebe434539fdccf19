//! Microphone capture via `cpal`.
//!
//! [`MicCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`MicCapture::start`] to begin streaming [`MicFrame`]s over an mpsc
//! channel.  The returned [`StreamHandle`] is a RAII guard; dropping it
//! stops the underlying cpal stream, which is how the pipeline coordinator
//! releases the microphone on session stop.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

// ---------------------------------------------------------------------------
// MicFrame
// ---------------------------------------------------------------------------

/// One buffer of microphone audio as delivered by the cpal callback,
/// already downmixed to mono.
///
/// Samples are `f32` in `[-1.0, 1.0]` at the device's native rate.  The
/// transcription endpointer consumes these directly.
#[derive(Debug, Clone)]
pub struct MicFrame {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this frame in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream and releases
/// the microphone.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors while acquiring or running the microphone.
///
/// On most platforms a denied microphone permission surfaces as
/// [`CaptureError::NoDevice`] or [`CaptureError::BuildStream`]; all
/// variants are treated as "microphone unavailable" by the coordinator.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device available (missing hardware or microphone permission denied)")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// downmix_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging channels.
///
/// * `channels == 1` returns the input as an owned `Vec` unchanged.
/// * `channels == 0` returns an empty vector.
///
/// # Example
///
/// ```rust
/// use avatar_voice::audio::downmix_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!(mono[0].abs() < 1e-6);
/// ```
pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// MicCapture
// ---------------------------------------------------------------------------

/// Microphone wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use avatar_voice::audio::{MicCapture, MicFrame};
///
/// let (tx, rx) = mpsc::channel::<MicFrame>();
/// let capture = MicCapture::new().unwrap();
/// let _handle = capture.start(tx).unwrap();
/// // `_handle` keeps the stream alive; drop it to release the microphone.
/// ```
pub struct MicCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl MicCapture {
    /// Create a [`MicCapture`] using the system default input device with
    /// its preferred stream configuration.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] when no input device is available (which
    /// includes denied permission on platforms that hide the device), or
    /// [`CaptureError::DefaultConfig`] when the device cannot report a
    /// default configuration.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start capturing and send mono [`MicFrame`]s to `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread; each hardware
    /// buffer is downmixed to mono and forwarded.  Send errors (receiver
    /// dropped) are ignored so the audio thread never panics.
    pub fn start(&self, tx: mpsc::Sender<MicFrame>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let frame = MicFrame {
                    samples: downmix_mono(data, channels),
                    sample_rate,
                };
                let _ = tx.send(frame);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels the device delivers before downmixing.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mic_frame_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MicFrame>();
    }

    // ---- downmix_mono ------------------------------------------------------

    #[test]
    fn downmix_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix_mono(&input, 1), input);
    }

    #[test]
    fn downmix_two_channel_averages() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5];
        let out = downmix_mono(&input, 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_four_channel() {
        let out = downmix_mono(&[0.4_f32; 4], 4);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels_is_empty() {
        assert!(downmix_mono(&[1.0_f32, 2.0], 0).is_empty());
    }
}
