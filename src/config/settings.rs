//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::transcribe::EndpointConfig;

use super::AppPaths;

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Settings for the chat backend collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the chat endpoint (no trailing slash).
    pub base_url: String,
    /// API key — `None` for local backends that need no authentication.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a reply before timing out.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-synthesis collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of an OpenAI-compatible speech endpoint.
    pub base_url: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// TTS model identifier (e.g. `"tts-1"`).
    pub model: String,
    /// Provider voice name (e.g. `"alloy"`, `"nova"`).
    pub voice_id: String,
    /// Sample rate of the provider's raw PCM output in Hz.
    ///
    /// The OpenAI-style `response_format: "pcm"` is 24 000 Hz.
    pub sample_rate: u32,
    /// Maximum seconds to wait for synthesis before timing out.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "tts-1".into(),
            voice_id: "alloy".into(),
            sample_rate: 24_000,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for the reply audio path (resampling + chunking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate the avatar renderer consumes, in Hz.  Must not exceed
    /// the synthesizer rate (upsampling is unsupported).
    pub avatar_sample_rate: u32,
    /// Duration of each delivered chunk in milliseconds.
    pub chunk_duration_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            avatar_sample_rate: 16_000,
            chunk_duration_ms: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscribeConfig
// ---------------------------------------------------------------------------

/// Settings for local speech recognition and utterance endpointing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeConfig {
    /// GGML model name / file stem (e.g. `"ggml-base.en"`).
    pub model: String,
    /// Speech language as an ISO-639-1 code, or `"auto"`.
    pub language: String,
    /// Inference threads for Whisper.
    pub n_threads: i32,
    /// RMS amplitude above which a frame counts as voice.
    pub rms_threshold: f32,
    /// Silence gap in milliseconds that ends an utterance.
    pub silence_commit_ms: u32,
    /// Utterances shorter than this are dropped as noise.
    pub min_utterance_ms: u32,
    /// Utterances reaching this length are committed immediately.
    pub max_utterance_ms: u32,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        let endpoint = EndpointConfig::default();
        Self {
            model: "ggml-base.en".into(),
            language: "en".into(),
            n_threads: 4,
            rms_threshold: endpoint.rms_threshold,
            silence_commit_ms: endpoint.silence_commit_ms,
            min_utterance_ms: endpoint.min_utterance_ms,
            max_utterance_ms: endpoint.max_utterance_ms,
        }
    }
}

impl TranscribeConfig {
    /// Endpointer tuning derived from these settings.
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            rms_threshold: self.rms_threshold,
            silence_commit_ms: self.silence_commit_ms,
            min_utterance_ms: self.min_utterance_ms,
            max_utterance_ms: self.max_utterance_ms,
            ..EndpointConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Per-session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Spoken once when the transcription session first connects.
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello! I'm listening.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use avatar_voice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat backend settings.
    pub backend: BackendConfig,
    /// Speech synthesis settings.
    pub tts: TtsConfig,
    /// Reply audio path settings.
    pub audio: AudioConfig,
    /// Local recognition / endpointing settings.
    pub transcribe: TranscribeConfig,
    /// Session behaviour settings.
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        // BackendConfig
        assert_eq!(original.backend.base_url, loaded.backend.base_url);
        assert_eq!(original.backend.api_key, loaded.backend.api_key);
        assert_eq!(original.backend.timeout_secs, loaded.backend.timeout_secs);

        // TtsConfig
        assert_eq!(original.tts.base_url, loaded.tts.base_url);
        assert_eq!(original.tts.model, loaded.tts.model);
        assert_eq!(original.tts.voice_id, loaded.tts.voice_id);
        assert_eq!(original.tts.sample_rate, loaded.tts.sample_rate);

        // AudioConfig
        assert_eq!(
            original.audio.avatar_sample_rate,
            loaded.audio.avatar_sample_rate
        );
        assert_eq!(
            original.audio.chunk_duration_ms,
            loaded.audio.chunk_duration_ms
        );

        // TranscribeConfig
        assert_eq!(original.transcribe.model, loaded.transcribe.model);
        assert_eq!(original.transcribe.language, loaded.transcribe.language);
        assert_eq!(
            original.transcribe.silence_commit_ms,
            loaded.transcribe.silence_commit_ms
        );

        // SessionConfig
        assert_eq!(original.session.greeting, loaded.session.greeting);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.backend.base_url, default.backend.base_url);
        assert_eq!(config.tts.sample_rate, default.tts.sample_rate);
        assert_eq!(
            config.audio.avatar_sample_rate,
            default.audio.avatar_sample_rate
        );
        assert_eq!(config.session.greeting, default.session.greeting);
    }

    /// Verify the defaults the pipeline depends on.
    #[test]
    fn default_values_are_coherent() {
        let cfg = AppConfig::default();

        // The avatar rate must not exceed the synthesizer rate, or every
        // reply would fail with an unsupported-upsample error.
        assert!(cfg.audio.avatar_sample_rate <= cfg.tts.sample_rate);

        assert_eq!(cfg.tts.sample_rate, 24_000);
        assert_eq!(cfg.audio.avatar_sample_rate, 16_000);
        assert_eq!(cfg.audio.chunk_duration_ms, 300);
        assert_eq!(cfg.tts.voice_id, "alloy");
        assert!(!cfg.session.greeting.is_empty());
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.backend.base_url = "https://chat.example.com".into();
        cfg.backend.api_key = Some("sk-test".into());
        cfg.tts.voice_id = "nova".into();
        cfg.audio.chunk_duration_ms = 200;
        cfg.transcribe.language = "de".into();
        cfg.session.greeting = "Guten Tag!".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.backend.base_url, "https://chat.example.com");
        assert_eq!(loaded.backend.api_key, Some("sk-test".into()));
        assert_eq!(loaded.tts.voice_id, "nova");
        assert_eq!(loaded.audio.chunk_duration_ms, 200);
        assert_eq!(loaded.transcribe.language, "de");
        assert_eq!(loaded.session.greeting, "Guten Tag!");
    }

    #[test]
    fn endpoint_config_mirrors_transcribe_settings() {
        let mut cfg = TranscribeConfig::default();
        cfg.rms_threshold = 0.03;
        cfg.silence_commit_ms = 600;

        let ep = cfg.endpoint_config();
        assert!((ep.rms_threshold - 0.03).abs() < 1e-7);
        assert_eq!(ep.silence_commit_ms, 600);
        assert_eq!(ep.min_utterance_ms, cfg.min_utterance_ms);
    }
}
