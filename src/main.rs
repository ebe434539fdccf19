//! Application entry point — avatar voice client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Load the Whisper recognition model.
//! 4. Acquire the default microphone.
//! 5. Build the collaborators (backend responder, speech synthesizer,
//!    local transcriber, avatar sink).
//! 6. Start the [`PipelineCoordinator`] and run until Ctrl-C.

use std::sync::{mpsc as std_mpsc, Arc};

use anyhow::Context;

use avatar_voice::{
    audio::{MicCapture, MicFrame},
    backend::HttpResponder,
    config::{AppConfig, AppPaths},
    delivery::ChannelSink,
    pipeline::PipelineCoordinator,
    transcribe::{LocalTranscriber, WhisperRecognizer},
    tts::HttpSynthesizer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("avatar-voice starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Recognition model
    let model_path = AppPaths::new()
        .models_dir
        .join(format!("{}.bin", config.transcribe.model));

    let recognizer = WhisperRecognizer::load(
        &model_path,
        config.transcribe.language.clone(),
        config.transcribe.n_threads,
    )
    .with_context(|| {
        format!(
            "could not load recognition model {} — download a GGML model into {}",
            model_path.display(),
            AppPaths::new().models_dir.display()
        )
    })?;
    log::info!("recognition model loaded: {}", model_path.display());

    // 4. Microphone
    let capture = MicCapture::new().context("microphone unavailable")?;
    log::info!(
        "microphone ready ({} Hz, {} ch)",
        capture.sample_rate(),
        capture.channels()
    );
    let (frames_tx, frames_rx) = std_mpsc::channel::<MicFrame>();

    // 5. Collaborators
    let transcriber = Arc::new(LocalTranscriber::new(
        Arc::new(recognizer),
        config.transcribe.endpoint_config(),
        frames_rx,
    ));
    let backend = Arc::new(HttpResponder::from_config(&config.backend));
    let tts = Arc::new(HttpSynthesizer::from_config(&config.tts));

    // The renderer transport drains the sink channel; until a real avatar
    // client is attached, delivered chunks are just accounted for in the
    // log.
    let (sink, mut chunks_rx) = ChannelSink::new();
    tokio::spawn(async move {
        let mut delivered = 0_u64;
        while let Some(chunk) = chunks_rx.recv().await {
            delivered += 1;
            log::debug!(
                "renderer: chunk {delivered} ({} samples, {:.0} ms)",
                chunk.len(),
                chunk.duration_ms()
            );
        }
    });

    // 6. Run the session until Ctrl-C
    let mut coordinator = PipelineCoordinator::new(
        config,
        transcriber,
        backend,
        tts,
        Arc::new(sink),
    )
    .with_microphone(capture, frames_tx);

    coordinator.start().await.context("failed to start session")?;
    log::info!("session running — press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("signal handler")?;
    log::info!("shutting down");
    coordinator.stop();

    Ok(())
}
