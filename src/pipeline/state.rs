//! Turn-taking state machine and shared session status.
//!
//! [`TurnState`] drives the orchestrator's state machine.  [`SessionStatus`]
//! is the snapshot other parts of the process (status display, logging) may
//! read via [`SharedStatus`]; only the orchestrator and coordinator write
//! it.
//!
//! The speaking flag lives beside the state, not inside it: `Speaking` is
//! where the machine is in the turn, while `speaking` gates barge-in and is
//! also raised for the greeting, which never enters the reply states.

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// States of the turn-taking machine.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──transcriber connected──▶ Listening
/// Listening ──final transcript, confidence > 0.7, not speaking──▶ AwaitingReply
/// AwaitingReply ──backend reply──▶ Speaking
/// Speaking ──synthesis + enqueue complete──▶ Listening
/// any state ──stop / transcriber disconnect──▶ Idle
/// ```
///
/// While `speaking` is set a qualifying transcript is dropped, never
/// queued: the system refuses to process user speech while it is itself
/// speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No transcription session is connected.
    Idle,

    /// Connected and waiting for a final user transcript.
    Listening,

    /// A transcript was dispatched; waiting for the backend reply.
    AwaitingReply,

    /// Reply received; synthesis and enqueue are in progress.
    Speaking,
}

impl TurnState {
    /// Returns `true` when a new user transcript would be considered at all.
    ///
    /// ```
    /// use avatar_voice::pipeline::TurnState;
    ///
    /// assert!(TurnState::Listening.accepts_transcripts());
    /// assert!(!TurnState::Idle.accepts_transcripts());
    /// assert!(!TurnState::AwaitingReply.accepts_transcripts());
    /// assert!(!TurnState::Speaking.accepts_transcripts());
    /// ```
    pub fn accepts_transcripts(&self) -> bool {
        matches!(self, TurnState::Listening)
    }

    /// A short human-readable label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            TurnState::Idle => "Idle",
            TurnState::Listening => "Listening",
            TurnState::AwaitingReply => "Thinking",
            TurnState::Speaking => "Speaking",
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        TurnState::Idle
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Shared snapshot of the running session.
///
/// Held behind [`SharedStatus`] (`Arc<Mutex<SessionStatus>>`).  The
/// orchestrator mutates it; anything else only reads.
#[derive(Debug, Default)]
pub struct SessionStatus {
    /// Current turn-taking state.
    pub turn: TurnState,

    /// Set while a reply (or the greeting) is being synthesized and
    /// enqueued.  Gates barge-in: qualifying transcripts are dropped while
    /// this is `true`.  Cleared when enqueue completes, not when the sink
    /// finishes playback.
    pub speaking: bool,

    /// Whether the one-per-session greeting has been spoken.
    pub greeting_sent: bool,

    /// Identifier of the active session, `None` before the first start.
    pub session_id: Option<String>,

    /// The most recent user transcript acted upon.
    pub last_transcript: Option<String>,

    /// The most recent backend reply.
    pub last_reply: Option<String>,

    /// User-visible message for the most recent collaborator failure.
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// SharedStatus
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionStatus`].
///
/// Cheap to clone (`Arc` clone).  Lock for a short critical section; do
/// **not** hold the lock across `.await` points.
pub type SharedStatus = Arc<Mutex<SessionStatus>>;

/// Construct a new [`SharedStatus`] wrapping a default [`SessionStatus`].
pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(SessionStatus::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
