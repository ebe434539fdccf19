//! Chat backend — the "text reply" collaborator.
//!
//! The pipeline hands the backend a user transcript and the session id and
//! gets reply text back.  Everything behind that exchange (prompting,
//! retrieval, model choice) belongs to the backend service, not this
//! client.

pub mod responder;

pub use responder::{BackendError, BackendResponder, HttpResponder};
