//! Speech synthesis — the "reply audio" collaborator.
//!
//! Turns reply text into a [`PcmBuffer`](crate::audio::PcmBuffer) at the
//! synthesizer's fixed source rate (24 kHz in production).  The pipeline
//! resamples and chunks that buffer before it reaches the avatar.

pub mod synthesizer;

pub use synthesizer::{HttpSynthesizer, SpeechSynthesizer, SynthesisError};
