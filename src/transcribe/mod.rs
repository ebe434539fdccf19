//! Transcription source — the "user speech in" collaborator.
//!
//! The pipeline only sees [`TranscriberEvent`]s arriving over a channel:
//! a connect confirmation, a stream of [`TranscriptEvent`]s, and a
//! disconnect notification.  Where those events come from is behind the
//! [`TranscriptionSource`] trait; the production implementation here is
//! [`LocalTranscriber`] (microphone → endpointer → Whisper), but a remote
//! streaming provider plugs into the same seam.

pub mod endpoint;
pub mod whisper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

pub use endpoint::{EndpointConfig, UtteranceEndpointer};
pub use whisper::{LocalTranscriber, Recognition, WhisperRecognizer};

// ---------------------------------------------------------------------------
// TranscriptEvent
// ---------------------------------------------------------------------------

/// One transcription result.
///
/// Consumed exactly once by the orchestrator, which acts only on events
/// with `is_final == true` and `confidence` above its threshold.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Recognised text.
    pub text: String,
    /// `false` for interim hypotheses that may still be revised.
    pub is_final: bool,
    /// Recogniser confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// When the recogniser produced this event.
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEvent {
    /// A final event stamped now — the common case for local recognition.
    pub fn final_now(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriberEvent
// ---------------------------------------------------------------------------

/// Notifications delivered by a [`TranscriptionSource`] over its channel.
#[derive(Debug, Clone)]
pub enum TranscriberEvent {
    /// The transcription session is up; the pipeline may start listening.
    Connected,
    /// A recognition result.
    Transcript(TranscriptEvent),
    /// The transcription session ended (stop, stream loss).
    Disconnected,
}

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// Errors from the transcription collaborator.
#[derive(Debug, Clone, Error)]
pub enum TranscribeError {
    /// The transcription service could not be reached or started.
    #[error("transcription source unavailable: {0}")]
    Connectivity(String),

    /// The recognition model file was not found.
    #[error("recognition model not found: {0}")]
    ModelNotFound(String),

    /// The recognition engine failed on an utterance.
    #[error("recognition failed: {0}")]
    Engine(String),
}

// ---------------------------------------------------------------------------
// TranscriptionSource trait
// ---------------------------------------------------------------------------

/// A stream of user-speech transcripts.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn TranscriptionSource>` by the coordinator.
#[async_trait]
pub trait TranscriptionSource: Send + Sync {
    /// Open the transcription session.  On success the source emits
    /// [`TranscriberEvent::Connected`] on `events`, followed by transcript
    /// events until [`stop`](Self::stop) or stream loss, then
    /// [`TranscriberEvent::Disconnected`].
    async fn start(
        &self,
        events: mpsc::Sender<TranscriberEvent>,
    ) -> Result<(), TranscribeError>;

    /// Close the session.  Best-effort and idempotent; never blocks on
    /// in-flight recognition.
    fn stop(&self);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
