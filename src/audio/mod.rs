//! Audio engine — PCM buffers, anti-alias filtering, resampling, capture.
//!
//! # Reply path (synthesizer → avatar)
//!
//! ```text
//! SpeechSynthesizer (24 kHz PcmBuffer) → resample → DeliveryQueue → AvatarSink
//! ```
//!
//! # Microphone path (user → transcriber)
//!
//! ```text
//! Microphone → cpal callback → MicFrame (mpsc) → endpointer → Whisper
//! ```
//!
//! Both paths share [`PcmBuffer`]; the reply path additionally uses
//! [`FirKernel`] + [`resample`] to reach the avatar renderer's rate.

pub mod capture;
pub mod filter;
pub mod pcm;
pub mod resample;

pub use capture::{downmix_mono, CaptureError, MicCapture, MicFrame, StreamHandle};
pub use filter::{FirKernel, KERNEL_TAPS};
pub use pcm::PcmBuffer;
pub use resample::{resample, ResampleError};
