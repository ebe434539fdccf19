//! The real-time speech turn-taking pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ PipelineCoordinator  (session lifecycle, SessionContext)    │
//! │                                                             │
//! │  TranscriptionSource ──events──▶ TurnOrchestrator           │
//! │                                    │  gate: final,          │
//! │                                    │  confidence, barge-in  │
//! │                                    ▼                        │
//! │  BackendResponder ──reply──▶ SpeechSynthesizer              │
//! │                                    │ 24 kHz PcmBuffer       │
//! │                                    ▼                        │
//! │  resample ──▶ DeliveryQueue ──chunks──▶ AvatarSink          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows one direction per turn; control flows back only through the
//! [`SharedStatus`] flags that gate whether a new turn may begin.

pub mod coordinator;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use coordinator::{CoordinatorError, PipelineCoordinator};
pub use orchestrator::{PipelineEvent, TurnOrchestrator, CONFIDENCE_THRESHOLD};
pub use session::SessionContext;
pub use state::{new_shared_status, SessionStatus, SharedStatus, TurnState};
