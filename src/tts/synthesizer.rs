//! Core `SpeechSynthesizer` trait and `HttpSynthesizer` implementation.
//!
//! `HttpSynthesizer` calls an OpenAI-compatible `/v1/audio/speech` endpoint
//! with `response_format: "pcm"` and decodes the raw signed 16-bit
//! little-endian body into a [`PcmBuffer`] at the configured source rate
//! (24 000 Hz for the OpenAI-style providers).

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::PcmBuffer;
use crate::config::TtsConfig;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Errors that can occur during speech synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// HTTP transport or connection error.
    #[error("synthesis request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("synthesis request timed out")]
    Timeout,

    /// The response body was not valid 16-bit PCM.
    #[error("failed to decode synthesized audio: {0}")]
    Decode(String),

    /// The provider returned no audio.
    #[error("synthesizer returned empty audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech providers.
///
/// Implementors must be `Send + Sync` so they can be shared behind an
/// `Arc<dyn SpeechSynthesizer>`.
///
/// # Arguments
/// * `text`     – the reply text to speak.
/// * `voice_id` – provider voice name (e.g. `"alloy"`, `"nova"`).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str)
        -> Result<PcmBuffer, SynthesisError>;
}

// ---------------------------------------------------------------------------
// HttpSynthesizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
///
/// Works with any provider that accepts the OpenAI speech request shape and
/// can return raw PCM.  All connection details (`base_url`, `api_key`,
/// `model`, `sample_rate`) come from the [`TtsConfig`] passed to
/// [`HttpSynthesizer::from_config`].
pub struct HttpSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl HttpSynthesizer {
    /// Build an `HttpSynthesizer` from application config.
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Decode a raw s16le body into samples.
    fn decode_pcm(bytes: &[u8]) -> Result<Vec<i16>, SynthesisError> {
        if bytes.len() % 2 != 0 {
            return Err(SynthesisError::Decode(format!(
                "odd byte count {} for 16-bit PCM",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<PcmBuffer, SynthesisError> {
        let url = format!("{}/v1/audio/speech", self.config.base_url);

        let body = serde_json::json!({
            "model":           self.config.model,
            "input":           text,
            "voice":           voice_id,
            "response_format": "pcm",
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let bytes = response.bytes().await?;

        let samples = Self::decode_pcm(&bytes)?;
        if samples.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        Ok(PcmBuffer::new(samples, self.config.sample_rate))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
