//! Turn-taking orchestrator — drives the transcript → reply → speech loop.
//!
//! [`TurnOrchestrator`] owns the [`SharedStatus`] and responds to
//! [`PipelineEvent`]s received over a `tokio::sync::mpsc` channel, strictly
//! in arrival order.
//!
//! # Turn flow
//!
//! ```text
//! PipelineEvent::TranscriberConnected
//!   └─▶ Idle → Listening; speak greeting (first connect only)
//!
//! PipelineEvent::Transcript(ev)
//!   └─▶ gate: state Listening, ev.is_final, ev.confidence > 0.7
//!         ├─ speaking flag set → drop event          (barge-in suppression)
//!         └─ else → backend.respond          [AwaitingReply]
//!               ├─ Ok  → synthesize → resample → enqueue → drain  [Speaking]
//!               │        then back to Listening, speaking cleared
//!               └─ Err → error surfaced, flags cleared, Listening
//!
//! PipelineEvent::Stop
//!   └─▶ clear queue, reset flags, Idle, exit loop
//! ```
//!
//! The speaking flag is cleared once the reply is enqueued and handed to
//! the sink, not when the renderer finishes playing it, so barge-in
//! suppression covers the synthesis window only.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::resample;
use crate::backend::BackendResponder;
use crate::config::AppConfig;
use crate::delivery::{AvatarSink, DeliveryQueue};
use crate::transcribe::{TranscriberEvent, TranscriptEvent};
use crate::tts::SpeechSynthesizer;

use super::session::SessionContext;
use super::state::{SharedStatus, TurnState};

/// Final transcripts at or below this confidence are ignored.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Everything that can wake the orchestrator.
///
/// External sources (the transcriber, the coordinator's stop) enqueue
/// events; the orchestrator consumes them one at a time, which is the whole
/// concurrency model — no other code path touches the turn state.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The transcription session is up.
    TranscriberConnected,
    /// The transcription session ended.
    TranscriberDisconnected,
    /// A transcription result arrived.
    Transcript(TranscriptEvent),
    /// Stop the session: clear the queue, reset flags, exit.
    Stop,
}

impl From<TranscriberEvent> for PipelineEvent {
    fn from(event: TranscriberEvent) -> Self {
        match event {
            TranscriberEvent::Connected => PipelineEvent::TranscriberConnected,
            TranscriberEvent::Disconnected => PipelineEvent::TranscriberDisconnected,
            TranscriberEvent::Transcript(ev) => PipelineEvent::Transcript(ev),
        }
    }
}

// ---------------------------------------------------------------------------
// TurnOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete conversational turn loop.
///
/// Create with [`TurnOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task.  The orchestrator is the sole writer of the turn
/// state and the speaking flag.
pub struct TurnOrchestrator {
    status: SharedStatus,
    session: SessionContext,
    backend: Arc<dyn BackendResponder>,
    tts: Arc<dyn SpeechSynthesizer>,
    queue: Arc<DeliveryQueue>,
    sink: Arc<dyn AvatarSink>,
    greeting: String,
    voice_id: String,
    avatar_rate: u32,
    chunk_ms: u32,
}

impl TurnOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `status`  — shared session status (also read by the status display).
    /// * `session` — per-session identifier for backend calls.
    /// * `backend` — chat backend collaborator.
    /// * `tts`     — speech-synthesis collaborator.
    /// * `queue`   — delivery queue shared with the coordinator (for stop-time clearing).
    /// * `sink`    — avatar audio sink.
    /// * `config`  — greeting text, voice, avatar rate and chunk duration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        status: SharedStatus,
        session: SessionContext,
        backend: Arc<dyn BackendResponder>,
        tts: Arc<dyn SpeechSynthesizer>,
        queue: Arc<DeliveryQueue>,
        sink: Arc<dyn AvatarSink>,
        config: &AppConfig,
    ) -> Self {
        Self {
            status,
            session,
            backend,
            tts,
            queue,
            sink,
            greeting: config.session.greeting.clone(),
            voice_id: config.tts.voice_id.clone(),
            avatar_rate: config.audio.avatar_sample_rate,
            chunk_ms: config.audio.chunk_duration_ms,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until a [`PipelineEvent::Stop`] arrives or the
    /// channel closes.
    ///
    /// This is an `async fn` and should be spawned as a tokio task by the
    /// coordinator.
    pub async fn run(self, mut events: mpsc::Receiver<PipelineEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::TranscriberConnected => {
                    self.handle_connected().await;
                }
                PipelineEvent::TranscriberDisconnected => {
                    self.handle_disconnected();
                }
                PipelineEvent::Transcript(ev) => {
                    self.handle_transcript(ev).await;
                }
                PipelineEvent::Stop => {
                    self.handle_stop();
                    break;
                }
            }
        }

        // Channel closed without an explicit Stop: same cleanup so the
        // session is never left gated.
        self.handle_stop();
        log::info!("orchestrator: event loop finished");
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Connect confirmation: start listening, greet once per session.
    async fn handle_connected(&self) {
        let first_connect = {
            let mut st = self.status.lock().unwrap();
            if st.turn == TurnState::Idle {
                st.turn = TurnState::Listening;
            }
            let first = !st.greeting_sent;
            st.greeting_sent = true;
            first
        };

        log::info!("pipeline: transcriber connected");

        if first_connect {
            log::debug!("pipeline: speaking session greeting");
            if let Err(message) = self.speak(&self.greeting).await {
                self.fail(message);
            }
        }
    }

    fn handle_disconnected(&self) {
        log::info!("pipeline: transcriber disconnected");
        let mut st = self.status.lock().unwrap();
        st.turn = TurnState::Idle;
    }

    /// One full turn: gate the transcript, fetch a reply, speak it.
    async fn handle_transcript(&self, ev: TranscriptEvent) {
        // ── 1. Gate ──────────────────────────────────────────────────────
        {
            let st = self.status.lock().unwrap();

            if !st.turn.accepts_transcripts() {
                log::debug!("pipeline: transcript in {:?}, dropped", st.turn);
                return;
            }
            if !ev.is_final {
                log::debug!("pipeline: interim transcript ignored");
                return;
            }
            if ev.confidence <= CONFIDENCE_THRESHOLD {
                log::debug!(
                    "pipeline: low-confidence transcript ignored ({:.2} ≤ {CONFIDENCE_THRESHOLD})",
                    ev.confidence
                );
                return;
            }
            if st.speaking {
                // Barge-in suppression: never act on user speech while the
                // system is itself speaking.
                log::info!("pipeline: barge-in suppressed: {:?}", ev.text);
                return;
            }
        }

        log::info!("pipeline: user said {:?}", ev.text);

        // ── 2. Backend reply ─────────────────────────────────────────────
        {
            let mut st = self.status.lock().unwrap();
            st.turn = TurnState::AwaitingReply;
            st.last_transcript = Some(ev.text.clone());
            st.error_message = None;
        }

        let reply = match self.backend.respond(&ev.text, self.session.id()).await {
            Ok(reply) => reply,
            Err(e) => {
                self.fail(format!("backend: {e}"));
                self.back_to_listening();
                return;
            }
        };

        log::debug!("pipeline: backend replied {reply:?}");

        // ── 3. Speak the reply ───────────────────────────────────────────
        {
            let mut st = self.status.lock().unwrap();
            st.turn = TurnState::Speaking;
            st.last_reply = Some(reply.clone());
        }

        if let Err(message) = self.speak(&reply).await {
            self.fail(message);
        }

        // ── 4. Turn complete ─────────────────────────────────────────────
        self.back_to_listening();
    }

    /// Explicit stop: discard pending audio, reset flags, go Idle.
    fn handle_stop(&self) {
        self.queue.clear();
        let mut st = self.status.lock().unwrap();
        st.turn = TurnState::Idle;
        st.speaking = false;
    }

    // -----------------------------------------------------------------------
    // Speech path
    // -----------------------------------------------------------------------

    /// Synthesize `text`, resample to the avatar rate, enqueue and drain.
    ///
    /// Raises the speaking flag for the duration and clears it when the
    /// chunks have been handed to the sink — before the renderer has played
    /// anything.
    async fn speak(&self, text: &str) -> Result<(), String> {
        {
            let mut st = self.status.lock().unwrap();
            st.speaking = true;
        }

        let pcm = self
            .tts
            .synthesize(text, &self.voice_id)
            .await
            .map_err(|e| format!("synthesis: {e}"))?;

        log::debug!(
            "pipeline: synthesized {} samples @ {} Hz",
            pcm.len(),
            pcm.sample_rate()
        );

        let resampled =
            resample(pcm, self.avatar_rate).map_err(|e| format!("resample: {e}"))?;

        self.queue.enqueue(resampled, self.chunk_ms);
        self.queue.drain(self.sink.as_ref());

        let mut st = self.status.lock().unwrap();
        st.speaking = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn back_to_listening(&self) {
        let mut st = self.status.lock().unwrap();
        st.turn = TurnState::Listening;
    }

    /// Surface a collaborator failure and make sure the pipeline is not
    /// left gated: the error is logged and shown once, the speaking flag
    /// cleared, and the next turn can proceed.
    fn fail(&self, message: String) {
        log::error!("pipeline error: {message}");
        let mut st = self.status.lock().unwrap();
        st.error_message = Some(message);
        st.speaking = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmBuffer;
    use crate::backend::BackendError;
    use crate::delivery::AudioChunk;
    use crate::pipeline::state::new_shared_status;
    use crate::tts::SynthesisError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Backend double that records every dispatched transcript.
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        replies: Mutex<Vec<Result<String, ()>>>,
    }

    impl RecordingBackend {
        /// Always replies with `reply`.
        fn ok(reply: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(vec![Ok(reply.to_string())]),
            }
        }

        /// Always fails.
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(vec![Err(())]),
            }
        }

        /// Scripted sequence; the last entry repeats.
        fn sequence(replies: Vec<Result<String, ()>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendResponder for RecordingBackend {
        async fn respond(&self, text: &str, _session_id: &str) -> Result<String, BackendError> {
            self.calls.lock().unwrap().push(text.to_string());
            let mut replies = self.replies.lock().unwrap();
            let next = if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies[0].clone()
            };
            next.map_err(|_| BackendError::Request("backend unreachable".into()))
        }
    }

    /// Synthesizer double returning a fixed-size 24 kHz buffer.
    struct FixedSynth {
        samples: usize,
        texts: Mutex<Vec<String>>,
    }

    impl FixedSynth {
        fn new(samples: usize) -> Self {
            Self {
                samples,
                texts: Mutex::new(Vec::new()),
            }
        }

        fn texts(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FixedSynth {
        async fn synthesize(
            &self,
            text: &str,
            _voice_id: &str,
        ) -> Result<PcmBuffer, SynthesisError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(PcmBuffer::new(vec![1_000; self.samples], 24_000))
        }
    }

    /// Synthesizer double that always fails.
    struct FailSynth;

    #[async_trait]
    impl SpeechSynthesizer for FailSynth {
        async fn synthesize(
            &self,
            _text: &str,
            _voice_id: &str,
        ) -> Result<PcmBuffer, SynthesisError> {
            Err(SynthesisError::Request("tts down".into()))
        }
    }

    /// Sink that records chunk lengths and the speaking flag at delivery
    /// time.
    struct ObservingSink {
        status: SharedStatus,
        delivered: Mutex<Vec<(usize, bool)>>,
    }

    impl ObservingSink {
        fn new(status: SharedStatus) -> Self {
            Self {
                status,
                delivered: Mutex::new(Vec::new()),
            }
        }

        fn chunk_lens(&self) -> Vec<usize> {
            self.delivered.lock().unwrap().iter().map(|d| d.0).collect()
        }

        fn speaking_during_delivery(&self) -> Vec<bool> {
            self.delivered.lock().unwrap().iter().map(|d| d.1).collect()
        }
    }

    impl AvatarSink for ObservingSink {
        fn deliver(&self, chunk: AudioChunk) {
            let speaking = self.status.lock().unwrap().speaking;
            self.delivered.lock().unwrap().push((chunk.len(), speaking));
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Handles to every test double wired into an orchestrator.
    struct Fixture {
        status: SharedStatus,
        backend: Arc<RecordingBackend>,
        synth: Arc<FixedSynth>,
        sink: Arc<ObservingSink>,
        queue: Arc<DeliveryQueue>,
    }

    fn fixture_with(backend: RecordingBackend) -> (Fixture, TurnOrchestrator) {
        let status = new_shared_status();
        let backend = Arc::new(backend);
        // 1 s of 24 kHz audio → 16 000 samples at the avatar rate.
        let synth = Arc::new(FixedSynth::new(24_000));
        let sink = Arc::new(ObservingSink::new(Arc::clone(&status)));
        let queue = Arc::new(DeliveryQueue::new());
        let config = AppConfig::default();

        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&status),
            SessionContext::generate(),
            Arc::clone(&backend) as Arc<dyn BackendResponder>,
            Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&queue),
            Arc::clone(&sink) as Arc<dyn AvatarSink>,
            &config,
        );

        (
            Fixture {
                status,
                backend,
                synth,
                sink,
                queue,
            },
            orchestrator,
        )
    }

    fn fixture() -> (Fixture, TurnOrchestrator) {
        fixture_with(RecordingBackend::ok("reply"))
    }

    fn transcript(text: &str, is_final: bool, confidence: f32) -> PipelineEvent {
        PipelineEvent::Transcript(TranscriptEvent {
            text: text.into(),
            is_final,
            confidence,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Queue `events`, close the channel, and run the orchestrator to
    /// completion — events are consumed strictly in order.
    async fn run_events(orchestrator: TurnOrchestrator, events: Vec<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for ev in events {
            tx.send(ev).await.unwrap();
        }
        drop(tx); // close channel so run() returns

        orchestrator.run(rx).await;
    }

    // -----------------------------------------------------------------------
    // Connection / greeting
    // -----------------------------------------------------------------------

    /// Connect must move Idle → Listening and speak the greeting once.
    #[tokio::test]
    async fn connect_starts_listening_and_greets_once() {
        let (f, orc) = fixture();
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                PipelineEvent::TranscriberConnected,
            ],
        )
        .await;

        // Greeting spoken exactly once despite two connects.
        assert_eq!(f.synth.texts(), vec!["Hello! I'm listening."]);
        // Greeting audio reached the sink.
        assert!(!f.sink.chunk_lens().is_empty());
    }

    /// The greeting is spoken before any user transcript is processed.
    #[tokio::test]
    async fn greeting_precedes_first_transcript() {
        let (f, orc) = fixture();
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("hi there", true, 0.95),
            ],
        )
        .await;

        let texts = f.synth.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "Hello! I'm listening.");
        assert_eq!(texts[1], "reply");
    }

    /// No greeting without a connect confirmation.
    #[tokio::test]
    async fn no_events_no_greeting() {
        let (f, orc) = fixture();
        run_events(orc, vec![]).await;
        assert!(f.synth.texts().is_empty());
    }

    // -----------------------------------------------------------------------
    // Transcript gating
    // -----------------------------------------------------------------------

    /// A final, high-confidence transcript runs a full turn.
    #[tokio::test]
    async fn qualifying_transcript_runs_a_full_turn() {
        let (f, orc) = fixture();
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("what's the weather", true, 0.9),
            ],
        )
        .await;

        assert_eq!(f.backend.calls(), vec!["what's the weather"]);
        let st = f.status.lock().unwrap();
        assert_eq!(st.last_transcript.as_deref(), Some("what's the weather"));
        assert_eq!(st.last_reply.as_deref(), Some("reply"));
        assert!(!st.speaking);
    }

    /// Interim transcripts never reach the backend.
    #[tokio::test]
    async fn interim_transcript_is_ignored() {
        let (f, orc) = fixture();
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("partial hyp", false, 0.99),
            ],
        )
        .await;

        assert!(f.backend.calls().is_empty());
    }

    /// Confidence at or below the threshold never reaches the backend,
    /// even when final.
    #[tokio::test]
    async fn low_confidence_transcript_is_ignored() {
        let (f, orc) = fixture();
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("mumble", true, 0.5),
                transcript("boundary", true, CONFIDENCE_THRESHOLD),
            ],
        )
        .await;

        assert!(f.backend.calls().is_empty());
    }

    /// Transcripts arriving before a connect (state Idle) are dropped.
    #[tokio::test]
    async fn transcript_before_connect_is_dropped() {
        let (f, orc) = fixture();
        run_events(orc, vec![transcript("too early", true, 0.9)]).await;
        assert!(f.backend.calls().is_empty());
    }

    /// While the speaking flag is set, a qualifying transcript is dropped
    /// without a backend dispatch.
    #[tokio::test]
    async fn barge_in_is_suppressed_while_speaking() {
        let (f, orc) = fixture();
        {
            let mut st = f.status.lock().unwrap();
            st.turn = TurnState::Listening;
            st.greeting_sent = true;
            st.speaking = true; // system is mid-reply
        }

        run_events(orc, vec![transcript("interrupt!", true, 0.99)]).await;

        assert!(f.backend.calls().is_empty());
        assert!(f.synth.texts().is_empty());
    }

    // -----------------------------------------------------------------------
    // Reply delivery
    // -----------------------------------------------------------------------

    /// 1 s of 24 kHz reply audio → 16 000 samples at 16 kHz → chunks of
    /// 4 800 + 4 800 + 4 800 + 1 600, delivered in order.
    #[tokio::test]
    async fn reply_is_resampled_chunked_and_delivered_in_order() {
        let (f, orc) = fixture();
        {
            // Skip the greeting so only reply chunks reach the sink.
            f.status.lock().unwrap().greeting_sent = true;
        }
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("tell me something", true, 0.9),
            ],
        )
        .await;

        assert_eq!(f.sink.chunk_lens(), vec![4_800, 4_800, 4_800, 1_600]);
        assert!(f.queue.is_empty());
    }

    /// The speaking flag is still set while chunks are handed to the sink
    /// and cleared right after enqueue — playback completion is never
    /// awaited.
    #[tokio::test]
    async fn speaking_flag_clears_after_enqueue_not_playback() {
        let (f, orc) = fixture();
        {
            f.status.lock().unwrap().greeting_sent = true;
        }
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("speak to me", true, 0.9),
            ],
        )
        .await;

        // During delivery the flag was up...
        assert!(f.sink.speaking_during_delivery().iter().all(|&s| s));
        // ...and it is down as soon as the turn completed, with no
        // playback-finished signal ever sent.
        assert!(!f.status.lock().unwrap().speaking);
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    /// A backend failure surfaces one error message, clears the flags and
    /// leaves the pipeline ready for the next turn.
    #[tokio::test]
    async fn backend_failure_recovers_for_the_next_turn() {
        let (f, orc) = fixture_with(RecordingBackend::sequence(vec![
            Err(()),
            Ok("second answer".into()),
        ]));
        {
            f.status.lock().unwrap().greeting_sent = true;
        }
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("first try", true, 0.9),
                transcript("second try", true, 0.9),
            ],
        )
        .await;

        // Both transcripts were dispatched — the failure did not gate the
        // pipeline.
        assert_eq!(f.backend.calls(), vec!["first try", "second try"]);
        let st = f.status.lock().unwrap();
        assert_eq!(st.last_reply.as_deref(), Some("second answer"));
        assert!(!st.speaking);
    }

    #[tokio::test]
    async fn backend_failure_sets_error_message() {
        let (f, orc) = fixture_with(RecordingBackend::failing());
        {
            f.status.lock().unwrap().greeting_sent = true;
        }
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                transcript("hello?", true, 0.9),
            ],
        )
        .await;

        let st = f.status.lock().unwrap();
        assert!(st.error_message.as_deref().unwrap().contains("backend"));
        assert!(!st.speaking);
        assert!(st.last_reply.is_none());
    }

    /// A synthesis failure must clear the speaking flag so the pipeline is
    /// not left permanently gated.
    #[tokio::test]
    async fn synthesis_failure_resets_speaking_flag() {
        let status = new_shared_status();
        let backend = Arc::new(RecordingBackend::ok("reply"));
        let sink = Arc::new(ObservingSink::new(Arc::clone(&status)));
        let queue = Arc::new(DeliveryQueue::new());
        let config = AppConfig::default();

        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&status),
            SessionContext::generate(),
            Arc::clone(&backend) as Arc<dyn BackendResponder>,
            Arc::new(FailSynth) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&queue),
            Arc::clone(&sink) as Arc<dyn AvatarSink>,
            &config,
        );

        status.lock().unwrap().greeting_sent = true;

        let (tx, rx) = mpsc::channel(4);
        tx.send(PipelineEvent::TranscriberConnected).await.unwrap();
        tx.send(transcript("say something", true, 0.9)).await.unwrap();
        drop(tx);

        orchestrator.run(rx).await;

        let st = status.lock().unwrap();
        assert!(!st.speaking);
        assert!(st.error_message.as_deref().unwrap().contains("synthesis"));
        assert!(sink.chunk_lens().is_empty());
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Stop clears pending chunks, resets the flags and idles the machine.
    #[tokio::test]
    async fn stop_clears_queue_and_resets_flags() {
        let (f, orc) = fixture();
        // Simulate stale audio waiting for delivery.
        f.queue
            .enqueue(PcmBuffer::new(vec![0; 4_800], 16_000), 300);
        {
            let mut st = f.status.lock().unwrap();
            st.turn = TurnState::Listening;
            st.speaking = true;
        }

        run_events(orc, vec![PipelineEvent::Stop]).await;

        assert!(f.queue.is_empty());
        let st = f.status.lock().unwrap();
        assert_eq!(st.turn, TurnState::Idle);
        assert!(!st.speaking);
        // Nothing was delivered: stale chunks are discarded, not played.
        assert!(f.sink.chunk_lens().is_empty());
    }

    /// Disconnect returns the machine to Idle; a later reconnect does not
    /// repeat the greeting.
    #[tokio::test]
    async fn disconnect_idles_without_regreeting_on_reconnect() {
        let (f, orc) = fixture();
        run_events(
            orc,
            vec![
                PipelineEvent::TranscriberConnected,
                PipelineEvent::TranscriberDisconnected,
                PipelineEvent::TranscriberConnected,
            ],
        )
        .await;

        assert_eq!(f.synth.texts().len(), 1);
    }
}
