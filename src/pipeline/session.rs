//! Per-session identity.
//!
//! One [`SessionContext`] is constructed by the coordinator at session
//! start and threaded through every backend call.  It is a plain value —
//! deliberately not a module-level singleton — so two sessions can never
//! share an identifier by accident.

use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// Opaque per-session identifier.
///
/// ```rust
/// use avatar_voice::pipeline::SessionContext;
///
/// let a = SessionContext::generate();
/// let b = SessionContext::generate();
/// assert_ne!(a.id(), b.id());
/// assert!(a.id().starts_with("sess_"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    id: String,
}

impl SessionContext {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self {
            id: format!("sess_{}", Uuid::new_v4().simple()),
        }
    }

    /// The identifier sent with every backend call.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let ids: Vec<String> = (0..100)
            .map(|_| SessionContext::generate().id().to_string())
            .collect();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn id_has_session_prefix() {
        assert!(SessionContext::generate().id().starts_with("sess_"));
    }

    #[test]
    fn display_matches_id() {
        let ctx = SessionContext::generate();
        assert_eq!(ctx.to_string(), ctx.id());
    }
}
