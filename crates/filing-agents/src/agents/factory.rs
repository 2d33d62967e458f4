//! Cast construction.
//!
//! One factory builds the whole filing-analysis cast in canonical order,
//! so every session sees the same roster and the same round-robin
//! rotation. The entry participant is the only one whose shape varies:
//! interactive console by default, budgeted automatic stand-in in
//! auto-mode, retrieval-augmented whenever a knowledge store is present.

use std::sync::Arc;

use async_trait::async_trait;
use roundtable::{
    InputMode, Participant, ParticipantRegistry, Responder, SpeakerJudge, Transcript,
};
use tracing::info;

use crate::agents::chat::ChatClient;
use crate::agents::prompts;
use crate::agents::responders::{ChatResponder, ConsoleResponder, RetrievalAugmented};
use crate::config::{ConfigError, LlmConfig};
use crate::store::SharedStore;

/// Canonical participant names, in registration (round-robin) order.
pub const ENTRY: &str = "user_proxy";
pub const ANALYST: &str = "analyst";
pub const WEB_SEARCH: &str = "web_search";
pub const TABLE_READER: &str = "table_reader";
pub const SUMMARIZER: &str = "summarizer";

/// Auto-reply budget for the table reader.
const TABLE_READER_BUDGET: u32 = 1;
/// Completion cap for table reconstruction replies.
const TABLE_READER_MAX_TOKENS: u32 = 2048;
/// Auto-reply budget for the entry stand-in in auto-mode.
const AUTO_ENTRY_BUDGET: u32 = 3;

pub struct ParticipantFactory {
    llm: LlmConfig,
}

impl ParticipantFactory {
    pub fn new(llm: LlmConfig) -> Self {
        Self { llm }
    }

    /// Build the full cast: entry, analyst, web_search, table_reader,
    /// summarizer.
    pub fn registry(
        &self,
        store: Option<SharedStore>,
        auto_mode: bool,
    ) -> Result<ParticipantRegistry, ConfigError> {
        let client = ChatClient::new(&self.llm)?;

        let entry_inner: Arc<dyn Responder> = if auto_mode {
            Arc::new(ChatResponder::new(client.clone(), prompts::ENTRY, ENTRY))
        } else {
            Arc::new(ConsoleResponder::new())
        };
        let entry_responder: Arc<dyn Responder> = match store {
            Some(store) => Arc::new(RetrievalAugmented::new(store, entry_inner)),
            None => entry_inner,
        };
        let entry = if auto_mode {
            Participant::new(ENTRY, InputMode::Automatic, entry_responder)
                .with_reply_budget(AUTO_ENTRY_BUDGET)
        } else {
            Participant::new(ENTRY, InputMode::Interactive, entry_responder)
        };

        let cast = vec![
            entry,
            Participant::new(
                ANALYST,
                InputMode::Automatic,
                Arc::new(ChatResponder::new(client.clone(), prompts::ANALYST, ANALYST)),
            ),
            Participant::new(
                WEB_SEARCH,
                InputMode::Automatic,
                Arc::new(ChatResponder::new(
                    client.clone(),
                    prompts::WEB_SEARCH,
                    WEB_SEARCH,
                )),
            ),
            Participant::new(
                TABLE_READER,
                InputMode::Automatic,
                Arc::new(ChatResponder::new(
                    client.clone().with_max_tokens(TABLE_READER_MAX_TOKENS),
                    prompts::TABLE_READER,
                    TABLE_READER,
                )),
            )
            .with_reply_budget(TABLE_READER_BUDGET),
            Participant::new(
                SUMMARIZER,
                InputMode::Automatic,
                Arc::new(ChatResponder::new(client, prompts::SUMMARIZER, SUMMARIZER)),
            ),
        ];

        let mut registry = ParticipantRegistry::new();
        for participant in cast {
            registry
                .register(participant)
                .map_err(|e| ConfigError::Invalid {
                    detail: e.to_string(),
                })?;
        }
        info!(participants = registry.len(), auto_mode, "cast registered");
        Ok(registry)
    }

    /// LLM judge for criterion-based speaker selection.
    pub fn judge(&self) -> Result<LlmJudge, ConfigError> {
        Ok(LlmJudge {
            client: ChatClient::new(&self.llm)?,
        })
    }
}

/// Asks the model for the next speaker. Replies that are `NONE` or not in
/// the candidate list count as abstaining, which sends the selector to its
/// round-robin fallback.
pub struct LlmJudge {
    client: ChatClient,
}

#[async_trait]
impl SpeakerJudge for LlmJudge {
    async fn judge(
        &self,
        transcript: &Transcript,
        candidates: &[&str],
    ) -> anyhow::Result<Option<String>> {
        let mut messages: Vec<(String, String)> = transcript
            .messages()
            .iter()
            .map(|m| ("user".to_string(), format!("{}: {}", m.sender, m.content)))
            .collect();
        messages.push((
            "user".to_string(),
            format!(
                "Candidates: {}. Reply with exactly one name, or NONE.",
                candidates.join(", ")
            ),
        ));

        let reply = self.client.complete(prompts::JUDGE, &messages).await?;
        let name = reply.trim();
        if name.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        Ok(candidates
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name))
            .map(|c| c.to_string()))
    }
}
