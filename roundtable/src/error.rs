//! Coordination error types.
//!
//! Every failure the coordination layer can surface is represented here.
//! Duplicate registration and terminated-session sends are always fatal to
//! the current session, never silently swallowed.

use thiserror::Error;

/// Result type alias for coordination operations.
pub type CoordinationResult<T> = Result<T, CoordinationError>;

/// Errors from registry, session, and coordinator operations.
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// A participant with this name is already registered.
    #[error("participant '{name}' is already registered")]
    DuplicateParticipant { name: String },

    /// A referenced participant is not in the registry.
    #[error("participant '{name}' not found in registry")]
    ParticipantNotFound { name: String },

    /// The session has terminated; no further sends are permitted.
    #[error("session {session_id} is terminated; no further messages accepted")]
    SessionTerminated { session_id: String },

    /// Attempted state transition violates the turn-state graph.
    #[error("illegal turn-state transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    /// A session cannot run against a registry with no participants.
    #[error("participant registry is empty")]
    EmptyRegistry,

    /// A participant's responder returned an error during dispatch.
    #[error("dispatch to '{participant}' failed: {source}")]
    DispatchFailed {
        participant: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CoordinationError {
    /// Create a duplicate-participant error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateParticipant { name: name.into() }
    }

    /// Create a participant-not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ParticipantNotFound { name: name.into() }
    }

    /// Create a session-terminated error.
    pub fn terminated(session_id: impl Into<String>) -> Self {
        Self::SessionTerminated {
            session_id: session_id.into(),
        }
    }

    /// Create a dispatch-failed error.
    pub fn dispatch(participant: impl Into<String>, source: anyhow::Error) -> Self {
        Self::DispatchFailed {
            participant: participant.into(),
            source,
        }
    }
}
