//! Streaming utterance endpointing.
//!
//! The microphone delivers a continuous sample stream; Whisper wants one
//! utterance at a time.  [`UtteranceEndpointer`] sits between the two: it
//! classifies fixed-size frames as voice or silence by RMS energy and
//! commits an utterance once the speaker has been silent for a configured
//! gap.  Utterances shorter than the minimum are discarded as noise;
//! utterances hitting the maximum are committed immediately so a stuck-open
//! microphone cannot grow the buffer without bound.

// ---------------------------------------------------------------------------
// EndpointConfig
// ---------------------------------------------------------------------------

/// Tuning for utterance detection.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// RMS amplitude above which a frame counts as voice.  `0.01` suits a
    /// quiet room; raise towards `0.05` for noisy environments.
    pub rms_threshold: f32,
    /// Analysis frame length in milliseconds.
    pub frame_ms: u32,
    /// Silence gap that ends an utterance.
    pub silence_commit_ms: u32,
    /// Utterances shorter than this are dropped as noise.
    pub min_utterance_ms: u32,
    /// Utterances reaching this length are committed immediately.
    pub max_utterance_ms: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            rms_threshold: 0.01,
            frame_ms: 30,
            silence_commit_ms: 800,
            min_utterance_ms: 300,
            max_utterance_ms: 15_000,
        }
    }
}

// ---------------------------------------------------------------------------
// UtteranceEndpointer
// ---------------------------------------------------------------------------

/// Frame-by-frame voice/silence segmenter.
///
/// # Example
///
/// ```rust
/// use avatar_voice::transcribe::{EndpointConfig, UtteranceEndpointer};
///
/// let mut ep = UtteranceEndpointer::new(EndpointConfig::default(), 16_000);
///
/// // 500 ms of speech followed by a full second of silence.
/// let mut committed = ep.push(&vec![0.5_f32; 8_000]);
/// committed.extend(ep.push(&vec![0.0_f32; 16_000]));
///
/// assert_eq!(committed.len(), 1);
/// ```
pub struct UtteranceEndpointer {
    config: EndpointConfig,
    sample_rate: u32,
    frame_len: usize,
    /// Samples waiting to fill the next whole frame.
    pending: Vec<f32>,
    /// Samples of the utterance currently being collected (voice frames
    /// plus the silence tail up to the commit gap).
    utterance: Vec<f32>,
    in_speech: bool,
    silence_frames: usize,
    /// Voice frames in the current utterance; the minimum-length check uses
    /// this, not the buffer length, so a silence tail cannot promote a blip
    /// into a valid utterance.
    voiced_frames: usize,
}

impl UtteranceEndpointer {
    /// Create an endpointer for a stream at `sample_rate` Hz.
    ///
    /// # Panics
    ///
    /// Panics if `sample_rate == 0` or the configured frame length works
    /// out to zero samples.
    pub fn new(config: EndpointConfig, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "endpointer sample_rate must be > 0");
        let frame_len = (sample_rate as u64 * config.frame_ms as u64 / 1_000) as usize;
        assert!(frame_len > 0, "endpointer frame_ms too small for this rate");

        Self {
            config,
            sample_rate,
            frame_len,
            pending: Vec::new(),
            utterance: Vec::new(),
            in_speech: false,
            silence_frames: 0,
            voiced_frames: 0,
        }
    }

    /// Feed captured samples; returns every utterance committed by this
    /// call (usually zero or one).
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        let mut committed = Vec::new();
        while self.pending.len() >= self.frame_len {
            let frame: Vec<f32> = self.pending.drain(..self.frame_len).collect();
            if let Some(utterance) = self.process_frame(&frame) {
                committed.push(utterance);
            }
        }
        committed
    }

    /// Commit whatever is currently buffered, if it qualifies.  Called on
    /// session stop so a trailing utterance is not lost.
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        self.pending.clear();
        self.commit()
    }

    fn process_frame(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        let is_voice = rms(frame) > self.config.rms_threshold;

        match (self.in_speech, is_voice) {
            (false, false) => None,
            (false, true) => {
                self.in_speech = true;
                self.silence_frames = 0;
                self.voiced_frames = 1;
                self.utterance.extend_from_slice(frame);
                None
            }
            (true, true) => {
                self.silence_frames = 0;
                self.voiced_frames += 1;
                self.utterance.extend_from_slice(frame);
                self.maybe_commit_max()
            }
            (true, false) => {
                self.silence_frames += 1;
                self.utterance.extend_from_slice(frame);

                let silence_ms = self.silence_frames as f64 * self.config.frame_ms as f64;
                if silence_ms >= self.config.silence_commit_ms as f64 {
                    self.commit()
                } else {
                    None
                }
            }
        }
    }

    fn maybe_commit_max(&mut self) -> Option<Vec<f32>> {
        if self.duration_ms(self.utterance.len()) >= self.config.max_utterance_ms as f64 {
            log::warn!("endpointer: max utterance length reached, committing");
            self.commit()
        } else {
            None
        }
    }

    fn commit(&mut self) -> Option<Vec<f32>> {
        self.in_speech = false;
        self.silence_frames = 0;
        let voiced_ms = self.voiced_frames as f64 * self.config.frame_ms as f64;
        self.voiced_frames = 0;
        let utterance = std::mem::take(&mut self.utterance);

        if voiced_ms < self.config.min_utterance_ms as f64 {
            if !utterance.is_empty() {
                log::debug!("endpointer: dropping sub-minimum utterance ({voiced_ms:.0} ms voiced)");
            }
            return None;
        }
        Some(utterance)
    }

    fn duration_ms(&self, samples: usize) -> f64 {
        samples as f64 * 1_000.0 / self.sample_rate as f64
    }
}

/// Root-mean-square amplitude of a frame.
fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn endpointer() -> UtteranceEndpointer {
        UtteranceEndpointer::new(EndpointConfig::default(), 16_000)
    }

    fn voice(ms: usize) -> Vec<f32> {
        vec![0.5_f32; 16 * ms]
    }

    fn silence(ms: usize) -> Vec<f32> {
        vec![0.0_f32; 16 * ms]
    }

    #[test]
    fn silence_alone_commits_nothing() {
        let mut ep = endpointer();
        assert!(ep.push(&silence(2_000)).is_empty());
    }

    #[test]
    fn speech_then_gap_commits_one_utterance() {
        let mut ep = endpointer();
        assert!(ep.push(&voice(500)).is_empty());

        let committed = ep.push(&silence(1_000));
        assert_eq!(committed.len(), 1);
        // Utterance includes the speech plus the silence tail up to the gap.
        let dur_ms = committed[0].len() as f64 / 16.0;
        assert!(dur_ms >= 500.0, "utterance too short: {dur_ms} ms");
    }

    #[test]
    fn short_blip_is_discarded() {
        let mut ep = endpointer();
        // 60 ms of noise, well below the 300 ms minimum.
        ep.push(&voice(60));
        let committed = ep.push(&silence(1_000));
        assert!(committed.is_empty());
    }

    #[test]
    fn two_utterances_commit_separately() {
        let mut ep = endpointer();
        let mut total = Vec::new();
        total.extend(ep.push(&voice(400)));
        total.extend(ep.push(&silence(1_000)));
        total.extend(ep.push(&voice(400)));
        total.extend(ep.push(&silence(1_000)));
        assert_eq!(total.len(), 2);
    }

    #[test]
    fn max_length_commits_mid_speech() {
        let config = EndpointConfig {
            max_utterance_ms: 1_000,
            ..EndpointConfig::default()
        };
        let mut ep = UtteranceEndpointer::new(config, 16_000);

        // 3 s of continuous speech must be force-committed along the way.
        let committed = ep.push(&voice(3_000));
        assert!(!committed.is_empty());
    }

    #[test]
    fn flush_commits_trailing_speech() {
        let mut ep = endpointer();
        ep.push(&voice(500));
        let flushed = ep.flush();
        assert!(flushed.is_some());
    }

    #[test]
    fn flush_discards_sub_minimum_audio() {
        let mut ep = endpointer();
        ep.push(&voice(60));
        assert!(ep.flush().is_none());
    }

    #[test]
    fn flush_on_idle_returns_none() {
        let mut ep = endpointer();
        assert!(ep.flush().is_none());
    }

    #[test]
    fn partial_frames_accumulate_across_pushes() {
        let mut ep = endpointer();
        // Feed 500 ms of speech 100 samples at a time.
        let speech = voice(500);
        for slice in speech.chunks(100) {
            assert!(ep.push(slice).is_empty());
        }
        let committed = ep.push(&silence(1_000));
        assert_eq!(committed.len(), 1);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 480]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    #[should_panic(expected = "sample_rate must be > 0")]
    fn zero_rate_panics() {
        let _ = UtteranceEndpointer::new(EndpointConfig::default(), 0);
    }
}
