//! Pipeline coordinator — owns the session lifecycle.
//!
//! [`PipelineCoordinator`] is the only component that starts or stops the
//! orchestrator.  `start` generates the [`SessionContext`], acquires the
//! microphone, opens the transcription stream and spawns the orchestrator
//! event loop; `stop` releases the microphone, closes the stream, clears
//! the chunk queue and resets the flags.  Stop is best-effort: it never
//! fails, never panics, and does not await in-flight collaborator calls.
//!
//! The coordinator is not `Send` once a microphone is attached (the cpal
//! stream handle is platform-bound); drive it from the main task.

use std::sync::{mpsc as std_mpsc, Arc};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::{CaptureError, MicCapture, MicFrame, StreamHandle};
use crate::backend::BackendResponder;
use crate::config::AppConfig;
use crate::delivery::{AvatarSink, DeliveryQueue};
use crate::transcribe::{TranscribeError, TranscriptionSource};
use crate::tts::SpeechSynthesizer;

use super::orchestrator::{PipelineEvent, TurnOrchestrator};
use super::session::SessionContext;
use super::state::{new_shared_status, SessionStatus, SharedStatus, TurnState};

// ---------------------------------------------------------------------------
// CoordinatorError
// ---------------------------------------------------------------------------

/// Errors that can occur while starting a session.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A session is already running; stop it first.
    #[error("a session is already running")]
    AlreadyRunning,

    /// The microphone could not be acquired.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The transcription stream could not be opened.
    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
}

// ---------------------------------------------------------------------------
// ActiveSession
// ---------------------------------------------------------------------------

/// Everything that only exists while a session is running.
struct ActiveSession {
    events_tx: mpsc::Sender<PipelineEvent>,
    queue: Arc<DeliveryQueue>,
    /// Dropping this releases the microphone.
    mic_handle: Option<StreamHandle>,
}

// ---------------------------------------------------------------------------
// PipelineCoordinator
// ---------------------------------------------------------------------------

/// Composes the collaborators into a running session.
///
/// Construct with [`PipelineCoordinator::new`], optionally attach a
/// microphone with [`with_microphone`](Self::with_microphone), then call
/// [`start`](Self::start) / [`stop`](Self::stop).
pub struct PipelineCoordinator {
    config: AppConfig,
    transcriber: Arc<dyn TranscriptionSource>,
    backend: Arc<dyn BackendResponder>,
    tts: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AvatarSink>,
    status: SharedStatus,
    microphone: Option<(MicCapture, std_mpsc::Sender<MicFrame>)>,
    active: Option<ActiveSession>,
}

impl PipelineCoordinator {
    /// Wire up a coordinator from its collaborators.
    pub fn new(
        config: AppConfig,
        transcriber: Arc<dyn TranscriptionSource>,
        backend: Arc<dyn BackendResponder>,
        tts: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AvatarSink>,
    ) -> Self {
        Self {
            config,
            transcriber,
            backend,
            tts,
            sink,
            status: new_shared_status(),
            microphone: None,
            active: None,
        }
    }

    /// Attach the microphone whose frames feed the transcription source.
    ///
    /// `frames_tx` is the sending half of the channel the transcriber was
    /// built around; the capture stream is started lazily in
    /// [`start`](Self::start).
    pub fn with_microphone(
        mut self,
        capture: MicCapture,
        frames_tx: std_mpsc::Sender<MicFrame>,
    ) -> Self {
        self.microphone = Some((capture, frames_tx));
        self
    }

    /// Shared session status for display / logging.
    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    /// Returns `true` while a session is running.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    /// Start a session: fresh [`SessionContext`], microphone acquired,
    /// transcription stream opened, orchestrator spawned.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::AlreadyRunning`] when a session is active,
    /// [`CoordinatorError::Capture`] when the microphone cannot start,
    /// [`CoordinatorError::Transcribe`] when the transcription stream
    /// cannot be opened.  On error no session is left half-started.
    pub async fn start(&mut self) -> Result<(), CoordinatorError> {
        if self.active.is_some() {
            return Err(CoordinatorError::AlreadyRunning);
        }

        // ── 1. Session identity and fresh status ─────────────────────────
        let session = SessionContext::generate();
        {
            let mut st = self.status.lock().unwrap();
            *st = SessionStatus {
                session_id: Some(session.id().to_string()),
                ..SessionStatus::default()
            };
        }

        // ── 2. Microphone ────────────────────────────────────────────────
        let mic_handle = match &self.microphone {
            Some((capture, frames_tx)) => Some(capture.start(frames_tx.clone())?),
            None => None,
        };

        // ── 3. Transcription stream ──────────────────────────────────────
        let (transcriber_tx, mut transcriber_rx) = mpsc::channel(64);
        // A failed connect releases the microphone on drop of `mic_handle`.
        self.transcriber.start(transcriber_tx).await?;

        // ── 4. Event plumbing and orchestrator ───────────────────────────
        let (events_tx, events_rx) = mpsc::channel::<PipelineEvent>(64);
        let queue = Arc::new(DeliveryQueue::new());

        // Forward transcriber notifications into the single ordered event
        // stream the orchestrator consumes.
        let forward_tx = events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = transcriber_rx.recv().await {
                if forward_tx.send(event.into()).await.is_err() {
                    break;
                }
            }
        });

        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&self.status),
            session.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.tts),
            Arc::clone(&queue),
            Arc::clone(&self.sink),
            &self.config,
        );
        tokio::spawn(orchestrator.run(events_rx));

        log::info!("coordinator: session {session} started");

        self.active = Some(ActiveSession {
            events_tx,
            queue,
            mic_handle,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // stop
    // -----------------------------------------------------------------------

    /// Stop the session.  Safe to call at any point in any state; calling
    /// it with no session running is a no-op.
    ///
    /// In-flight collaborator calls are not awaited: the transcriber is
    /// told to stop, the microphone is released, the chunk queue is cleared
    /// and the flags reset.  The orchestrator task exits when it consumes
    /// the stop event.
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            log::debug!("coordinator: stop with no active session");
            return;
        };

        self.transcriber.stop();

        // Release the microphone (RAII).
        drop(active.mic_handle);

        // Discard undelivered audio now; the orchestrator repeats this when
        // the stop event reaches it.
        active.queue.clear();
        if active.events_tx.try_send(PipelineEvent::Stop).is_err() {
            log::debug!("coordinator: orchestrator already gone");
        }

        {
            let mut st = self.status.lock().unwrap();
            st.turn = TurnState::Idle;
            st.speaking = false;
        }

        log::info!("coordinator: session stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
