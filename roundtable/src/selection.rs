//! Speaker-selection policies.
//!
//! The coordinator asks a [`SpeakerSelector`] who takes the next turn.
//! Two policies are provided:
//!
//! - [`RoundRobinSelector`]: deterministic cyclic order over registration
//!   order, never re-selecting the current speaker (with two or more
//!   participants). The default, and the one tests rely on.
//! - [`CriterionSelector`]: delegates the choice to an external
//!   [`SpeakerJudge`] (typically model-backed). When the judge errs,
//!   abstains, or names someone outside the candidate set, the selector
//!   falls back to round-robin for that turn: a single deterministic
//!   fallback, never a retry loop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::message::Transcript;
use crate::registry::ParticipantRegistry;

/// Outcome of a selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The named participant speaks next.
    Chosen(String),
    /// No participant could be chosen (empty registry).
    Undecided,
}

/// Policy choosing the next speaker for a turn.
#[async_trait]
pub trait SpeakerSelector: Send + Sync {
    /// Policy name for logging.
    fn name(&self) -> &'static str;

    /// Choose the next speaker.
    ///
    /// `current` is the sender of the latest transcript message, when that
    /// sender is a registered participant.
    async fn select(
        &self,
        transcript: &Transcript,
        registry: &ParticipantRegistry,
        current: Option<&str>,
    ) -> Selection;
}

/// External judgment call used by [`CriterionSelector`].
///
/// Implementations answer: which candidate is best suited to respond to
/// the conversation so far? `Ok(None)` means the judge cannot decide.
#[async_trait]
pub trait SpeakerJudge: Send + Sync {
    async fn judge(
        &self,
        transcript: &Transcript,
        candidates: &[&str],
    ) -> anyhow::Result<Option<String>>;
}

/// Deterministic cyclic successor in registration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinSelector;

impl RoundRobinSelector {
    fn next(&self, registry: &ParticipantRegistry, current: Option<&str>) -> Selection {
        let roster = registry.all();
        if roster.is_empty() {
            return Selection::Undecided;
        }
        let idx = match current.and_then(|c| registry.position(c)) {
            Some(i) => (i + 1) % roster.len(),
            // Unknown or external current speaker: start at the head.
            None => 0,
        };
        Selection::Chosen(roster[idx].name().to_string())
    }
}

#[async_trait]
impl SpeakerSelector for RoundRobinSelector {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    async fn select(
        &self,
        _transcript: &Transcript,
        registry: &ParticipantRegistry,
        current: Option<&str>,
    ) -> Selection {
        self.next(registry, current)
    }
}

/// Delegates the choice to an external judgment, with round-robin fallback.
pub struct CriterionSelector {
    judge: Arc<dyn SpeakerJudge>,
    fallback: RoundRobinSelector,
}

impl CriterionSelector {
    pub fn new(judge: Arc<dyn SpeakerJudge>) -> Self {
        Self {
            judge,
            fallback: RoundRobinSelector,
        }
    }
}

#[async_trait]
impl SpeakerSelector for CriterionSelector {
    fn name(&self) -> &'static str {
        "criterion"
    }

    async fn select(
        &self,
        transcript: &Transcript,
        registry: &ParticipantRegistry,
        current: Option<&str>,
    ) -> Selection {
        // Candidates: everyone but the current speaker, in registry order.
        let candidates: Vec<&str> = registry
            .names()
            .into_iter()
            .filter(|n| Some(*n) != current)
            .collect();
        if candidates.is_empty() {
            return self.fallback.select(transcript, registry, current).await;
        }

        match self.judge.judge(transcript, &candidates).await {
            Ok(Some(name)) if candidates.contains(&name.as_str()) => {
                debug!(speaker = %name, "criterion judge chose next speaker");
                Selection::Chosen(name)
            }
            Ok(Some(name)) => {
                warn!(
                    speaker = %name,
                    "criterion judge named a non-candidate; falling back to round-robin"
                );
                self.fallback.select(transcript, registry, current).await
            }
            Ok(None) => {
                warn!("criterion judge abstained; falling back to round-robin");
                self.fallback.select(transcript, registry, current).await
            }
            Err(e) => {
                warn!(error = %e, "criterion judge failed; falling back to round-robin");
                self.fallback.select(transcript, registry, current).await
            }
        }
    }
}
