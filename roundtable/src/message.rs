//! Message and transcript types.
//!
//! A [`Transcript`] is the append-only record of one session's exchange.
//! Insertion order is significant; sequence numbers are assigned at append
//! time and never reused. The owning [`crate::Session`] is the only writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One utterance in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Name of the participant that produced this message.
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Position in the transcript, starting at 0.
    pub seq: u64,
    /// Wall-clock time the message was appended.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Whether this message was sent by the named participant.
    pub fn is_from(&self, name: &str) -> bool {
        self.sender == name
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.seq, self.sender, self.content)
    }
}

/// Append-only ordered message history.
///
/// There is deliberately no API for removing or editing messages; a
/// transcript only ever grows while its session is live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning the next sequence number.
    ///
    /// Returns the assigned sequence number.
    pub fn append(&mut self, sender: &str, content: &str) -> u64 {
        let seq = self.messages.len() as u64;
        self.messages.push(Message {
            sender: sender.to_string(),
            content: content.to_string(),
            seq,
            sent_at: Utc::now(),
        });
        seq
    }

    /// All messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recently appended message, if any.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The last `n` messages (fewer if the transcript is shorter).
    pub fn tail(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Names of senders in speaking order (entry message included).
    pub fn speakers(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.sender.clone()).collect()
    }
}
