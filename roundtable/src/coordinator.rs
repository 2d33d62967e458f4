//! The turn coordinator drives one session to completion.
//!
//! One call to [`TurnCoordinator::run`] owns the whole lifecycle of a
//! session: seed the transcript with the entry participant's message, then
//! loop select → dispatch → append → check until a stop condition fires.
//! Stop conditions are ranked; the first to fire wins:
//!
//! 1. cancellation (checked at the top of every turn and while a dispatch
//!    is in flight)
//! 2. the round cap, checked before selection
//! 3. the selected speaker's exhausted auto-reply budget
//! 4. the termination predicate, checked after every append (the seed
//!    message included)
//!
//! All four produce a normal [`SessionOutcome`]. The only failure paths
//! are structural (empty registry, unknown entry participant, reused
//! terminated session) or a responder error, which is fatal to the
//! session: the coordinator never retries or skips a failed speaker.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoordinationError, CoordinationResult};
use crate::registry::ParticipantRegistry;
use crate::selection::{Selection, SpeakerSelector};
use crate::session::{Session, TerminationReason, TurnState};
use crate::termination::TerminationPredicate;

/// Coordinator-level settings, fixed for the coordinator's lifetime.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Participant whose message seeds each session.
    pub entry_participant: String,
    /// Default round cap for sessions created via
    /// [`TurnCoordinator::start_session`].
    pub max_rounds: u32,
}

impl CoordinatorConfig {
    pub fn new(entry_participant: impl Into<String>, max_rounds: u32) -> Self {
        Self {
            entry_participant: entry_participant.into(),
            max_rounds,
        }
    }
}

/// How a completed session ended.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub reason: TerminationReason,
    /// Completed rounds (replies produced after the seed message).
    pub rounds: u32,
    /// Total transcript length, seed included.
    pub messages: usize,
}

impl SessionOutcome {
    /// One-line human-readable summary for logs and CLI output.
    pub fn summary_line(&self) -> String {
        format!(
            "session {} ended: {} ({} round(s), {} message(s))",
            self.session_id, self.reason, self.rounds, self.messages
        )
    }
}

/// Drives sessions over a fixed roster with pluggable selection and
/// termination policies.
pub struct TurnCoordinator {
    registry: ParticipantRegistry,
    selector: Box<dyn SpeakerSelector>,
    termination: Box<dyn TerminationPredicate>,
    config: CoordinatorConfig,
}

impl TurnCoordinator {
    pub fn new(
        registry: ParticipantRegistry,
        selector: Box<dyn SpeakerSelector>,
        termination: Box<dyn TerminationPredicate>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry,
            selector,
            termination,
            config,
        }
    }

    /// The roster this coordinator runs sessions over.
    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// Create a fresh session with the coordinator's default round cap.
    pub fn start_session(&self) -> Session {
        Session::new(self.config.max_rounds)
    }

    /// Run one session to completion.
    ///
    /// Seeds the transcript with `initial_message` from the configured
    /// entry participant, then loops turns until a stop condition fires.
    /// The round cap used is the session's own (`Session::max_rounds`),
    /// so callers may run sessions with caps other than the coordinator
    /// default.
    ///
    /// Cancelling `cancel` ends the session at the next turn boundary, or
    /// immediately if a dispatch is in flight; the partial transcript up
    /// to that point is preserved and the outcome reason is `Cancelled`.
    pub async fn run(
        &self,
        session: &mut Session,
        initial_message: &str,
        cancel: &CancellationToken,
    ) -> CoordinationResult<SessionOutcome> {
        if self.registry.is_empty() {
            return Err(CoordinationError::EmptyRegistry);
        }
        // Fail fast on a misconfigured entry participant.
        let entry = self.registry.find(&self.config.entry_participant)?;
        let entry_name = entry.name().to_string();
        if session.is_terminated() {
            return Err(CoordinationError::terminated(session.id().to_string()));
        }

        info!(
            session_id = %session.id(),
            entry = %entry_name,
            max_rounds = session.max_rounds(),
            participants = self.registry.len(),
            selector = self.selector.name(),
            "session started"
        );

        // Seed the transcript. The seed does not count as a round and does
        // not touch auto-reply budgets, but the termination predicate still
        // sees it.
        session.send(&entry_name, initial_message)?;
        if let Some(reason) = self.check_latest(session, &entry_name) {
            return self.finish(session, reason);
        }

        loop {
            if cancel.is_cancelled() {
                info!(session_id = %session.id(), "session cancelled at turn boundary");
                return self.finish(session, TerminationReason::Cancelled);
            }
            if session.rounds_exhausted() {
                return self.finish(
                    session,
                    TerminationReason::RoundLimit {
                        limit: session.max_rounds(),
                    },
                );
            }

            // The current speaker is the latest sender, when registered.
            let current = session
                .transcript()
                .latest()
                .map(|m| m.sender.clone())
                .filter(|s| self.registry.contains(s));
            let chosen = match self
                .selector
                .select(session.transcript(), &self.registry, current.as_deref())
                .await
            {
                Selection::Chosen(name) => name,
                Selection::Undecided => return Err(CoordinationError::EmptyRegistry),
            };
            let speaker = self.registry.find(&chosen)?;

            // Budget gate, applied at selection time.
            if let Some(budget) = speaker.reply_budget() {
                let used = session.auto_reply_count(speaker.name());
                if !speaker.is_interactive() && used >= budget {
                    warn!(
                        session_id = %session.id(),
                        participant = %speaker.name(),
                        budget,
                        "auto-reply budget exhausted"
                    );
                    return self.finish(
                        session,
                        TerminationReason::BudgetExhausted {
                            participant: speaker.name().to_string(),
                        },
                    );
                }
            }

            session.advance(TurnState::Dispatching, Some(speaker.name()))?;
            debug!(
                session_id = %session.id(),
                speaker = %speaker.name(),
                round = session.round(),
                "dispatching turn"
            );

            // Suspend here for as long as the responder takes; the
            // cancellation token is the only way to interrupt it.
            let dispatched: Option<anyhow::Result<String>> = tokio::select! {
                _ = cancel.cancelled() => None,
                result = speaker.responder().respond(session.transcript()) => Some(result),
            };

            let reply = match dispatched {
                None => {
                    info!(
                        session_id = %session.id(),
                        speaker = %speaker.name(),
                        "session cancelled mid-dispatch"
                    );
                    return self.finish(session, TerminationReason::Cancelled);
                }
                Some(Err(e)) => {
                    let speaker_name = speaker.name().to_string();
                    // Leave the session unusable; a failed dispatch has no
                    // recovery path within the same session.
                    session.advance(TurnState::Terminated, Some("dispatch failed"))?;
                    return Err(CoordinationError::dispatch(speaker_name, e));
                }
                Some(Ok(text)) => text,
            };

            session.advance(TurnState::AwaitingReply, None)?;
            let speaker_name = speaker.name().to_string();
            let interactive = speaker.is_interactive();

            session.send(&speaker_name, &reply)?;
            let round = session.complete_round();

            if interactive {
                // Fresh outside input renews every participant's budget.
                session.reset_auto_replies();
            } else {
                session.note_auto_reply(&speaker_name);
            }

            info!(
                session_id = %session.id(),
                speaker = %speaker_name,
                round,
                "turn complete"
            );

            if let Some(reason) = self.check_latest(session, &speaker_name) {
                return self.finish(session, reason);
            }

            session.advance(TurnState::AwaitingSpeaker, None)?;
        }
    }

    /// Apply the termination predicate to the latest message.
    fn check_latest(&self, session: &Session, speaker: &str) -> Option<TerminationReason> {
        let latest = session.transcript().latest()?;
        if self.termination.should_terminate(latest) {
            Some(TerminationReason::Sentinel {
                speaker: speaker.to_string(),
            })
        } else {
            None
        }
    }

    /// Terminate the session and build its outcome.
    fn finish(
        &self,
        session: &mut Session,
        reason: TerminationReason,
    ) -> CoordinationResult<SessionOutcome> {
        session.terminate(reason.clone())?;
        let outcome = SessionOutcome {
            session_id: session.id(),
            reason,
            rounds: session.round(),
            messages: session.transcript().len(),
        };
        info!(session_id = %session.id(), "{}", outcome.summary_line());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::message::Transcript;
    use crate::participant::test_support::{
        FailingResponder, HangingResponder, ScriptedResponder,
    };
    use crate::participant::{InputMode, Participant};
    use crate::selection::{RoundRobinSelector, SpeakerJudge};
    use crate::termination::{NeverTerminate, SentinelTermination};

    fn auto(name: &str, responder: Arc<ScriptedResponder>) -> Participant {
        Participant::new(name, InputMode::Automatic, responder)
    }

    fn coordinator(
        registry: ParticipantRegistry,
        termination: Box<dyn crate::termination::TerminationPredicate>,
        entry: &str,
        max_rounds: u32,
    ) -> TurnCoordinator {
        TurnCoordinator::new(
            registry,
            Box::new(RoundRobinSelector),
            termination,
            CoordinatorConfig::new(entry, max_rounds),
        )
    }

    #[tokio::test]
    async fn test_round_robin_rotation_order() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["from a"]))).unwrap();
        registry.register(auto("b", ScriptedResponder::new(&["from b"]))).unwrap();
        registry.register(auto("c", ScriptedResponder::new(&["from c"]))).unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 5);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        // Seed from a, then rotation resumes after a.
        assert_eq!(
            session.transcript().speakers(),
            vec!["a", "b", "c", "a", "b", "c"]
        );
        assert_eq!(outcome.rounds, 5);
        assert!(matches!(outcome.reason, TerminationReason::RoundLimit { limit: 5 }));
    }

    #[tokio::test]
    async fn test_single_participant_speaks_with_itself() {
        let solo = ScriptedResponder::new(&["thinking aloud"]);
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("solo", solo.clone())).unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "solo", 3);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            session.transcript().speakers(),
            vec!["solo", "solo", "solo", "solo"]
        );
        assert_eq!(outcome.rounds, 3);
        assert_eq!(solo.call_count(), 3);
    }

    #[tokio::test]
    async fn test_sentinel_stops_further_dispatch() {
        let b = ScriptedResponder::new(&["analysis complete. DONE!"]);
        let c = ScriptedResponder::new(&["never reached"]);
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["from a"]))).unwrap();
        registry.register(auto("b", b.clone())).unwrap();
        registry.register(auto("c", c.clone())).unwrap();

        let coord = coordinator(registry, Box::new(SentinelTermination::default()), "a", 10);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "question", &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(
            outcome.reason,
            TerminationReason::Sentinel { ref speaker } if speaker == "b"
        ));
        assert_eq!(b.call_count(), 1);
        // Nobody is dispatched after the sentinel lands.
        assert_eq!(c.call_count(), 0);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_sentinel_in_seed_terminates_before_any_dispatch() {
        let b = ScriptedResponder::new(&["from b"]);
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["from a"]))).unwrap();
        registry.register(auto("b", b.clone())).unwrap();

        let coord = coordinator(registry, Box::new(SentinelTermination::default()), "a", 10);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "nothing to discuss. DONE!", &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(
            outcome.reason,
            TerminationReason::Sentinel { ref speaker } if speaker == "a"
        ));
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.messages, 1);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_round_cap_bounds_transcript_length() {
        for cap in [1u32, 2, 4] {
            let mut registry = ParticipantRegistry::new();
            registry.register(auto("a", ScriptedResponder::new(&["a says"]))).unwrap();
            registry.register(auto("b", ScriptedResponder::new(&["b says"]))).unwrap();

            let coord = coordinator(registry, Box::new(NeverTerminate), "a", cap);
            let mut session = coord.start_session();
            let outcome = coord
                .run(&mut session, "seed", &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(outcome.rounds, cap);
            assert_eq!(session.transcript().len() as u32, cap + 1);
        }
    }

    #[tokio::test]
    async fn test_budget_exhaustion_terminates_session() {
        let b = ScriptedResponder::new(&["b reply"]);
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();
        registry
            .register(auto("b", b.clone()).with_reply_budget(1))
            .unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 20);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        // b replies once, a replies once, then b's second selection trips
        // the budget gate before dispatch.
        assert!(matches!(
            outcome.reason,
            TerminationReason::BudgetExhausted { ref participant } if participant == "b"
        ));
        assert_eq!(b.call_count(), 1);
        assert_eq!(outcome.rounds, 2);
    }

    #[tokio::test]
    async fn test_interactive_reply_renews_all_budgets() {
        let b = ScriptedResponder::new(&["b reply"]);
        let mut registry = ParticipantRegistry::new();
        registry
            .register(Participant::new(
                "a",
                InputMode::Interactive,
                ScriptedResponder::new(&["operator input"]),
            ))
            .unwrap();
        registry
            .register(auto("b", b.clone()).with_reply_budget(1))
            .unwrap();
        registry.register(auto("c", ScriptedResponder::new(&["c reply"]))).unwrap();

        // Rotation a → b → c → a → b → c: b is selected a second time only
        // after a's interactive turn cleared its counter.
        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 6);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome.reason, TerminationReason::RoundLimit { .. }));
        assert_eq!(b.call_count(), 2);
        assert_eq!(
            session.transcript().speakers(),
            vec!["a", "b", "c", "a", "b", "c", "a"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_fatal() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();
        registry
            .register(Participant::new(
                "broken",
                InputMode::Automatic,
                Arc::new(FailingResponder),
            ))
            .unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 10);
        let mut session = coord.start_session();
        let err = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoordinationError::DispatchFailed { ref participant, .. } if participant == "broken"
        ));
        // The session is unusable afterwards, with no normal outcome.
        assert!(session.is_terminated());
        assert!(session.termination().is_none());
        assert!(session.send("a", "late").is_err());
    }

    #[tokio::test]
    async fn test_precancelled_token_ends_before_dispatch() {
        let b = ScriptedResponder::new(&["b reply"]);
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();
        registry.register(auto("b", b.clone())).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 10);
        let mut session = coord.start_session();
        let outcome = coord.run(&mut session, "seed", &cancel).await.unwrap();

        assert!(matches!(outcome.reason, TerminationReason::Cancelled));
        assert_eq!(outcome.messages, 1);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_in_flight_dispatch() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();
        registry
            .register(Participant::new(
                "stuck",
                InputMode::Automatic,
                Arc::new(HangingResponder),
            ))
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 10);
        let mut session = coord.start_session();
        let outcome = coord.run(&mut session, "seed", &cancel).await.unwrap();

        assert!(matches!(outcome.reason, TerminationReason::Cancelled));
        // Partial transcript preserved: the seed landed, the hung reply never did.
        assert_eq!(session.transcript().speakers(), vec!["a"]);
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn test_terminated_transcript_never_grows() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();
        registry.register(auto("b", ScriptedResponder::new(&["b reply"]))).unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 2);
        let mut session = coord.start_session();
        coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        let len_at_termination = session.transcript().len();
        assert!(session.send("a", "postscript").is_err());
        assert_eq!(session.transcript().len(), len_at_termination);

        // A terminated session cannot be re-run either.
        let err = coord
            .run(&mut session, "again", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::SessionTerminated { .. }));
    }

    #[tokio::test]
    async fn test_empty_registry_rejected() {
        let coord = coordinator(
            ParticipantRegistry::new(),
            Box::new(NeverTerminate),
            "a",
            5,
        );
        let mut session = coord.start_session();
        let err = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::EmptyRegistry));
    }

    #[tokio::test]
    async fn test_unknown_entry_participant_rejected() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "ghost", 5);
        let mut session = coord.start_session();
        let err = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinationError::ParticipantNotFound { ref name } if name == "ghost"
        ));
        // Nothing was seeded.
        assert!(session.transcript().is_empty());
    }

    struct PreferJudge(&'static str);

    #[async_trait]
    impl SpeakerJudge for PreferJudge {
        async fn judge(
            &self,
            _transcript: &Transcript,
            _candidates: &[&str],
        ) -> anyhow::Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    #[tokio::test]
    async fn test_criterion_selection_with_fallback() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();
        registry.register(auto("b", ScriptedResponder::new(&["b reply"]))).unwrap();
        registry.register(auto("c", ScriptedResponder::new(&["c reply"]))).unwrap();

        // Judge always wants c. When c itself just spoke, c is not a
        // candidate and the round-robin fallback picks c's successor a.
        let coord = TurnCoordinator::new(
            registry,
            Box::new(crate::selection::CriterionSelector::new(Arc::new(
                PreferJudge("c"),
            ))),
            Box::new(NeverTerminate),
            CoordinatorConfig::new("a", 4),
        );
        let mut session = coord.start_session();
        coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            session.transcript().speakers(),
            vec!["a", "c", "a", "c", "a"]
        );
    }

    #[tokio::test]
    async fn test_outcome_summary_line() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 1);
        let mut session = coord.start_session();
        let outcome = coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        let line = outcome.summary_line();
        assert!(line.contains("round limit (1) reached"));
        assert!(line.contains("1 round(s)"));
        assert!(line.contains("2 message(s)"));
    }

    #[tokio::test]
    async fn test_transition_log_ends_terminated() {
        let mut registry = ParticipantRegistry::new();
        registry.register(auto("a", ScriptedResponder::new(&["a reply"]))).unwrap();

        let coord = coordinator(registry, Box::new(NeverTerminate), "a", 1);
        let mut session = coord.start_session();
        coord
            .run(&mut session, "seed", &CancellationToken::new())
            .await
            .unwrap();

        let last = session.transitions().last().unwrap();
        assert_eq!(last.to, TurnState::Terminated);
    }
}
