//! Session state and the turn-state machine.
//!
//! A [`Session`] owns one conversation: its transcript, its position in the
//! turn-state graph, the round counter, and the per-participant auto-reply
//! counters. The coordinator calls [`Session::advance`] to move between
//! states; each call validates the transition against the legal edge set
//! and records it in the transition log, so a finished session can be
//! audited or replayed offline.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoordinationError, CoordinationResult};
use crate::message::Transcript;

/// The set of states one turn cycle moves through.
///
/// Every session starts at `AwaitingSpeaker` and ends at `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Choosing the next speaker.
    AwaitingSpeaker,
    /// A responder has been invoked; its reply is in flight.
    Dispatching,
    /// The reply arrived; it is being appended and checked.
    AwaitingReply,
    /// The session is over; terminal state.
    Terminated,
}

impl TurnState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingSpeaker => write!(f, "AwaitingSpeaker"),
            Self::Dispatching => write!(f, "Dispatching"),
            Self::AwaitingReply => write!(f, "AwaitingReply"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Legal transitions between turn states.
///
/// The transition table encodes the valid edges in the state graph:
/// ```text
/// AwaitingSpeaker → Dispatching
/// Dispatching     → AwaitingReply
/// AwaitingReply   → AwaitingSpeaker
/// ```
/// plus `Terminated` reachable from every non-terminal state.
fn is_legal_transition(from: TurnState, to: TurnState) -> bool {
    use TurnState::*;

    // Any non-terminal state can terminate.
    if to == Terminated && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (AwaitingSpeaker, Dispatching)
            | (Dispatching, AwaitingReply)
            | (AwaitingReply, AwaitingSpeaker)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state transitioned from.
    pub from: TurnState,
    /// The state transitioned to.
    pub to: TurnState,
    /// Round number at the time of transition.
    pub round: u32,
    /// Milliseconds since the session was created.
    pub elapsed_ms: u64,
    /// Optional context about why this transition happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Why a session reached `Terminated`.
///
/// Every variant is an expected outcome, not an error; a session that
/// terminates for any of these reasons completed normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The configured round cap was reached.
    RoundLimit { limit: u32 },
    /// A message matched the sentinel predicate.
    Sentinel { speaker: String },
    /// A participant exhausted its consecutive auto-reply budget.
    BudgetExhausted { participant: String },
    /// The caller cancelled the session mid-dispatch.
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundLimit { limit } => write!(f, "round limit ({limit}) reached"),
            Self::Sentinel { speaker } => write!(f, "sentinel received from '{speaker}'"),
            Self::BudgetExhausted { participant } => {
                write!(f, "auto-reply budget exhausted for '{participant}'")
            }
            Self::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

/// One conversation: transcript, turn state, round and budget counters.
///
/// The session enforces two hard rules itself, independent of any
/// coordinator driving it: no message may be appended after termination,
/// and no transition may leave the legal edge set.
pub struct Session {
    id: Uuid,
    transcript: Transcript,
    state: TurnState,
    round: u32,
    max_rounds: u32,
    auto_replies: HashMap<String, u32>,
    termination: Option<TerminationReason>,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Session {
    /// Create a new session starting at `AwaitingSpeaker` with the given
    /// round cap.
    pub fn new(max_rounds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: Transcript::new(),
            state: TurnState::AwaitingSpeaker,
            round: 0,
            max_rounds,
            auto_replies: HashMap::new(),
            termination: None,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    /// Unique session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current turn state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Completed rounds (reply messages appended so far).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Configured round cap.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// The message history.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Why the session terminated, once it has.
    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    /// Whether the session is in its terminal state.
    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the round cap has been reached.
    pub fn rounds_exhausted(&self) -> bool {
        self.round >= self.max_rounds
    }

    /// Append a message to the transcript.
    ///
    /// Returns the assigned sequence number, or
    /// [`CoordinationError::SessionTerminated`] if the session has already
    /// terminated; a terminated transcript never grows.
    pub fn send(&mut self, sender: &str, content: &str) -> CoordinationResult<u64> {
        if self.is_terminated() {
            return Err(CoordinationError::terminated(self.id.to_string()));
        }
        Ok(self.transcript.append(sender, content))
    }

    /// Attempt to advance to the next turn state.
    ///
    /// Returns [`CoordinationError::IllegalTransition`] if the edge is not
    /// in the legal set.
    pub fn advance(&mut self, to: TurnState, reason: Option<&str>) -> CoordinationResult<()> {
        if !is_legal_transition(self.state, to) {
            return Err(CoordinationError::IllegalTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }

        let record = TransitionRecord {
            from: self.state,
            to,
            round: self.round,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            session_id = %self.id,
            from = %self.state,
            to = %to,
            round = self.round,
            "turn-state transition"
        );

        self.transitions.push(record);
        self.state = to;
        Ok(())
    }

    /// Terminate the session, recording why.
    ///
    /// Always legal from non-terminal states; fails if already terminated.
    pub fn terminate(&mut self, reason: TerminationReason) -> CoordinationResult<()> {
        self.advance(TurnState::Terminated, Some(&reason.to_string()))?;
        self.termination = Some(reason);
        Ok(())
    }

    /// Count one completed round (a reply appended to the transcript).
    ///
    /// Returns the new round number.
    pub fn complete_round(&mut self) -> u32 {
        self.round += 1;
        self.round
    }

    /// Count one consecutive automatic reply for the named participant.
    ///
    /// Returns the participant's new consecutive count.
    pub fn note_auto_reply(&mut self, name: &str) -> u32 {
        let count = self.auto_replies.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Consecutive automatic replies the named participant has produced
    /// since the last external input.
    pub fn auto_reply_count(&self, name: &str) -> u32 {
        self.auto_replies.get(name).copied().unwrap_or(0)
    }

    /// Clear every consecutive auto-reply counter.
    ///
    /// Called when an interactive participant speaks: fresh outside input
    /// renews everyone's budget, not just the speaker's.
    pub fn reset_auto_replies(&mut self) {
        self.auto_replies.clear();
    }

    /// The full transition log.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// One-line summary of the session's history.
    pub fn summary(&self) -> String {
        format!(
            "session {}: {} after {} round(s), {} message(s), {} transition(s)",
            self.id,
            self.state,
            self.round,
            self.transcript.len(),
            self.transitions.len(),
        )
    }
}
