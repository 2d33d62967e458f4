//! Turn-taking coordination for multi-participant sessions.
//!
//! This library provides the machinery for running a bounded, auditable
//! group conversation among heterogeneous participants:
//!
//! - [`ParticipantRegistry`]: ordered roster of uniquely named participants
//! - [`Transcript`]: append-only message history owned by one [`Session`]
//! - Speaker selection policies: deterministic [`RoundRobinSelector`] and
//!   judgment-delegating [`CriterionSelector`]
//! - Termination detection: sentinel-token predicates plus a hard round cap
//! - [`TurnCoordinator`]: the state machine that drives one session
//!   (select, dispatch, append, check) until a stop condition fires
//!
//! Participants are opaque: anything implementing [`Responder`] can take a
//! turn. Replies may take arbitrarily long; the coordinator suspends at the
//! dispatch point and honors a caller-supplied cancellation token there.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut registry = ParticipantRegistry::new();
//! registry.register(Participant::new("analyst", InputMode::Automatic, responder))?;
//!
//! let coordinator = TurnCoordinator::new(
//!     registry,
//!     Box::new(RoundRobinSelector),
//!     Box::new(SentinelTermination::default()),
//!     CoordinatorConfig::new("user_proxy", 5),
//! );
//!
//! let mut session = Session::new(5);
//! let outcome = coordinator.run(&mut session, "What changed?", &cancel).await?;
//! ```

pub mod coordinator;
pub mod error;
pub mod message;
pub mod participant;
pub mod registry;
pub mod selection;
pub mod session;
pub mod termination;

pub use coordinator::{CoordinatorConfig, SessionOutcome, TurnCoordinator};
pub use error::{CoordinationError, CoordinationResult};
pub use message::{Message, Transcript};
pub use participant::{InputMode, Participant, Responder};
pub use registry::ParticipantRegistry;
pub use selection::{CriterionSelector, RoundRobinSelector, Selection, SpeakerJudge, SpeakerSelector};
pub use session::{Session, TerminationReason, TransitionRecord, TurnState};
pub use termination::{NeverTerminate, SentinelTermination, TerminationPredicate};
