//! Participants and their reply capability.
//!
//! A [`Participant`] is identity plus capability metadata; the actual
//! message handling lives behind the [`Responder`] trait so the coordinator
//! never knows whether a reply comes from a model call, a human at a
//! terminal, or a scripted test double.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::Transcript;

/// How a participant produces input: prompted externally, or on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Replies originate from an external source (e.g. a human); a reply
    /// from an interactive participant counts as fresh outside input.
    Interactive,
    /// Replies are generated without external input and count against the
    /// participant's reply budget, if one is configured.
    Automatic,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::Automatic => write!(f, "automatic"),
        }
    }
}

/// The opaque message-handling capability of a participant.
///
/// Implementations receive the transcript so far and produce the next
/// reply. Calls may block indefinitely (model inference, a human typing);
/// the coordinator owns cancellation, so implementations do not need their
/// own timeouts.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a reply to the conversation so far.
    async fn respond(&self, transcript: &Transcript) -> anyhow::Result<String>;
}

/// A registered conversation participant.
///
/// Immutable for the lifetime of a session: identity, capability tag, and
/// budget are fixed at construction.
#[derive(Clone)]
pub struct Participant {
    name: String,
    mode: InputMode,
    reply_budget: Option<u32>,
    responder: Arc<dyn Responder>,
}

impl Participant {
    /// Create a participant with no reply budget.
    pub fn new(name: impl Into<String>, mode: InputMode, responder: Arc<dyn Responder>) -> Self {
        Self {
            name: name.into(),
            mode,
            reply_budget: None,
            responder,
        }
    }

    /// Bound the number of consecutive automatic replies this participant
    /// may produce before the session requires external input.
    pub fn with_reply_budget(mut self, max_auto_replies: u32) -> Self {
        self.reply_budget = Some(max_auto_replies);
        self
    }

    /// Unique participant name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability tag.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Whether replies from this participant count as external input.
    pub fn is_interactive(&self) -> bool {
        self.mode == InputMode::Interactive
    }

    /// Configured auto-reply budget, if any.
    pub fn reply_budget(&self) -> Option<u32> {
        self.reply_budget
    }

    /// The reply capability.
    pub fn responder(&self) -> &Arc<dyn Responder> {
        &self.responder
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("reply_budget", &self.reply_budget)
            .finish()
    }
}
