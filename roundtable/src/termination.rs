//! Termination predicates.
//!
//! A predicate inspects each newly appended message and decides whether
//! the session is finished. Predicates are checked on every append,
//! including the seed message, so a conversation can end before anyone
//! is ever dispatched.

use crate::message::Message;

/// Decides whether a just-appended message ends the session.
pub trait TerminationPredicate: Send + Sync {
    fn should_terminate(&self, latest: &Message) -> bool;
}

/// Ends the session when a sentinel token appears in a message.
///
/// Matching is a case-insensitive substring test, so `"done!"`,
/// `"DONE!"`, and `"We are Done! Thanks all."` all terminate under the
/// default token.
#[derive(Debug, Clone)]
pub struct SentinelTermination {
    token: String,
}

impl SentinelTermination {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Default for SentinelTermination {
    fn default() -> Self {
        Self::new("DONE!")
    }
}

impl TerminationPredicate for SentinelTermination {
    fn should_terminate(&self, latest: &Message) -> bool {
        latest
            .content
            .to_lowercase()
            .contains(&self.token.to_lowercase())
    }
}

/// Never terminates; sessions end on the round cap alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTerminate;

impl TerminationPredicate for NeverTerminate {
    fn should_terminate(&self, _latest: &Message) -> bool {
        false
    }
}
