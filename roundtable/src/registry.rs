//! Participant registry.
//!
//! Holds the roster for a session. Names are unique; registration order is
//! preserved and defines the default round-robin order.

use crate::error::{CoordinationError, CoordinationResult};
use crate::participant::Participant;

/// Ordered set of uniquely named participants.
#[derive(Clone, Debug, Default)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl ParticipantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant.
    ///
    /// Fails with [`CoordinationError::DuplicateParticipant`] if a
    /// participant with the same name is already present.
    pub fn register(&mut self, participant: Participant) -> CoordinationResult<()> {
        if self.contains(participant.name()) {
            return Err(CoordinationError::duplicate(participant.name()));
        }
        tracing::debug!(name = participant.name(), mode = %participant.mode(), "participant registered");
        self.participants.push(participant);
        Ok(())
    }

    /// All participants in registration order.
    pub fn all(&self) -> &[Participant] {
        &self.participants
    }

    /// Find a participant by name.
    pub fn find(&self, name: &str) -> CoordinationResult<&Participant> {
        self.participants
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| CoordinationError::not_found(name))
    }

    /// Whether a participant with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p.name() == name)
    }

    /// Position of a participant in registration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.name() == name)
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participant names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.name()).collect()
    }
}
