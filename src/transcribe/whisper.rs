//! Local Whisper-backed transcription source.
//!
//! [`WhisperRecognizer`] wraps a `whisper_rs::WhisperContext`; a fresh
//! `WhisperState` is created for every utterance so the recogniser can be
//! shared across threads without locking.  [`LocalTranscriber`] is the
//! production [`TranscriptionSource`]: it drains microphone frames, segments
//! them with the [`UtteranceEndpointer`], downsamples each utterance to
//! 16 kHz through the core resampler, and emits one final
//! [`TranscriptEvent`] per utterance whose confidence is the mean token
//! probability Whisper reports.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{resample, MicFrame, PcmBuffer};

use super::endpoint::{EndpointConfig, UtteranceEndpointer};
use super::{TranscribeError, TranscriberEvent, TranscriptEvent, TranscriptionSource};

/// Whisper's required input rate.
const RECOGNIZER_RATE: u32 = 16_000;

/// Utterances shorter than this are skipped (Whisper hallucinates on them).
const MIN_UTTERANCE_SAMPLES: usize = 4_800; // 300 ms at 16 kHz

// ---------------------------------------------------------------------------
// Recognition
// ---------------------------------------------------------------------------

/// Output of one recognition pass.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Recognised text, trimmed.
    pub text: String,
    /// Mean token probability over all segments, in `[0.0, 1.0]`.
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

/// Whisper inference wrapper.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    language: String,
    n_threads: i32,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("language", &self.language)
            .field("n_threads", &self.n_threads)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send`/`Sync` in whisper-rs — the model weights are read-only
// after loading, and every call creates its own state.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperRecognizer {}
unsafe impl Sync for WhisperRecognizer {}

impl WhisperRecognizer {
    /// Load a GGML model from `model_path`.
    ///
    /// `language` is an ISO-639-1 code, or `"auto"` for Whisper's built-in
    /// detection.
    ///
    /// # Errors
    ///
    /// [`TranscribeError::ModelNotFound`] when the file does not exist,
    /// [`TranscribeError::Engine`] when whisper-rs fails to load it.
    pub fn load(
        model_path: impl AsRef<Path>,
        language: impl Into<String>,
        n_threads: i32,
    ) -> Result<Self, TranscribeError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(TranscribeError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            TranscribeError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| TranscribeError::Engine(e.to_string()))?;

        Ok(Self {
            ctx,
            language: language.into(),
            n_threads,
        })
    }

    /// Run one inference pass over `audio` (16 kHz mono f32).
    pub fn recognize(&self, audio: &[f32]) -> Result<Recognition, TranscribeError> {
        if audio.len() < MIN_UTTERANCE_SAMPLES {
            return Err(TranscribeError::Engine(format!(
                "utterance too short for recognition ({} samples)",
                audio.len()
            )));
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let lang: Option<&str> = if self.language == "auto" {
            None
        } else {
            Some(self.language.as_str())
        };
        params.set_language(lang);
        params.set_n_threads(self.n_threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| TranscribeError::Engine(e.to_string()))?;

        state
            .full(params, audio)
            .map_err(|e| TranscribeError::Engine(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| TranscribeError::Engine(e.to_string()))?;

        let mut text = String::new();
        let mut prob_sum = 0.0_f64;
        let mut token_count = 0_u32;

        for seg in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(seg)
                .map_err(|e| TranscribeError::Engine(format!("segment {seg}: {e}")))?;
            text.push_str(&seg_text);

            let n_tokens = state
                .full_n_tokens(seg)
                .map_err(|e| TranscribeError::Engine(e.to_string()))?;
            for tok in 0..n_tokens {
                if let Ok(p) = state.full_get_token_prob(seg, tok) {
                    prob_sum += p as f64;
                    token_count += 1;
                }
            }
        }

        let confidence = if token_count > 0 {
            (prob_sum / token_count as f64).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };

        Ok(Recognition {
            text: text.trim().to_string(),
            confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// LocalTranscriber
// ---------------------------------------------------------------------------

/// Microphone-fed [`TranscriptionSource`] running Whisper locally.
///
/// The coordinator owns the microphone (cpal stream) and hands this source
/// the receiving half of the frame channel.  `start` spawns a dedicated
/// recognition thread; `stop` asks it to wind down.  The thread also exits
/// on its own when the microphone side of the channel is dropped.
pub struct LocalTranscriber {
    recognizer: Arc<WhisperRecognizer>,
    endpoint_config: EndpointConfig,
    frames: Mutex<Option<std_mpsc::Receiver<MicFrame>>>,
    running: Arc<AtomicBool>,
}

impl LocalTranscriber {
    /// Build a transcriber around an already-loaded recogniser and the
    /// microphone frame channel.
    pub fn new(
        recognizer: Arc<WhisperRecognizer>,
        endpoint_config: EndpointConfig,
        frames: std_mpsc::Receiver<MicFrame>,
    ) -> Self {
        Self {
            recognizer,
            endpoint_config,
            frames: Mutex::new(Some(frames)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Resample one committed utterance to 16 kHz and recognise it.
    fn process_utterance(
        recognizer: &WhisperRecognizer,
        utterance: Vec<f32>,
        source_rate: u32,
    ) -> Result<TranscriptEvent, TranscribeError> {
        let pcm = PcmBuffer::from_f32(&utterance, source_rate);
        let at_16k = resample(pcm, RECOGNIZER_RATE)
            .map_err(|e| TranscribeError::Engine(e.to_string()))?;

        let recognition = recognizer.recognize(&at_16k.to_f32())?;
        Ok(TranscriptEvent::final_now(
            recognition.text,
            recognition.confidence,
        ))
    }
}

#[async_trait::async_trait]
impl TranscriptionSource for LocalTranscriber {
    async fn start(
        &self,
        events: mpsc::Sender<TranscriberEvent>,
    ) -> Result<(), TranscribeError> {
        let frames = self
            .frames
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| {
                TranscribeError::Connectivity("transcriber already started".into())
            })?;

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let recognizer = Arc::clone(&self.recognizer);
        let endpoint_config = self.endpoint_config.clone();

        std::thread::Builder::new()
            .name("transcriber".into())
            .spawn(move || {
                let _ = events.blocking_send(TranscriberEvent::Connected);

                // Built on the first frame, once the device rate is known.
                let mut endpointer: Option<UtteranceEndpointer> = None;
                let mut source_rate = 0_u32;

                while running.load(Ordering::Acquire) {
                    let frame = match frames.recv_timeout(Duration::from_millis(100)) {
                        Ok(frame) => frame,
                        Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                    };

                    let ep = endpointer.get_or_insert_with(|| {
                        source_rate = frame.sample_rate;
                        UtteranceEndpointer::new(endpoint_config.clone(), source_rate)
                    });

                    for utterance in ep.push(&frame.samples) {
                        match Self::process_utterance(&recognizer, utterance, source_rate) {
                            Ok(event) if !event.text.is_empty() => {
                                log::debug!(
                                    "transcriber: \"{}\" (confidence {:.2})",
                                    event.text,
                                    event.confidence
                                );
                                if events
                                    .blocking_send(TranscriberEvent::Transcript(event))
                                    .is_err()
                                {
                                    // Orchestrator gone; nothing left to do.
                                    running.store(false, Ordering::Release);
                                    break;
                                }
                            }
                            Ok(_) => log::debug!("transcriber: empty recognition, skipped"),
                            Err(e) => log::warn!("transcriber: utterance failed: {e}"),
                        }
                    }
                }

                // Trailing speech still buffered at shutdown gets one last pass.
                if let Some(mut ep) = endpointer {
                    if let Some(utterance) = ep.flush() {
                        match Self::process_utterance(&recognizer, utterance, source_rate) {
                            Ok(event) if !event.text.is_empty() => {
                                let _ = events.blocking_send(TranscriberEvent::Transcript(event));
                            }
                            Ok(_) => {}
                            Err(e) => log::debug!("transcriber: flush utterance failed: {e}"),
                        }
                    }
                }

                let _ = events.blocking_send(TranscriberEvent::Disconnected);
                log::info!("transcriber: recognition thread stopped");
            })
            .map_err(|e| TranscribeError::Connectivity(e.to_string()))?;

        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
