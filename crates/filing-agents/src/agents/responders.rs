//! Responder implementations for the filing cast.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use roundtable::{Responder, Transcript};
use tracing::warn;

use crate::agents::chat::ChatClient;
use crate::store::{KnowledgeStore, SharedStore, StoreAnswer};

/// Sender name for retrieved document context injected into a transcript
/// view. Not a registered participant.
pub const CONTEXT_SENDER: &str = "document_context";

/// LLM-backed responder speaking as one named participant.
pub struct ChatResponder {
    client: ChatClient,
    system_prompt: String,
    speaker_name: String,
}

impl ChatResponder {
    pub fn new(client: ChatClient, system_prompt: &str, speaker_name: &str) -> Self {
        Self {
            client,
            system_prompt: system_prompt.to_string(),
            speaker_name: speaker_name.to_string(),
        }
    }
}

/// Project a transcript onto chat-completion messages from one speaker's
/// point of view: own messages become `assistant` turns, everyone else's
/// become `user` turns tagged with the sender name.
fn flatten(transcript: &Transcript, own_name: &str) -> Vec<(String, String)> {
    transcript
        .messages()
        .iter()
        .map(|m| {
            if m.is_from(own_name) {
                ("assistant".to_string(), m.content.clone())
            } else {
                ("user".to_string(), format!("{}: {}", m.sender, m.content))
            }
        })
        .collect()
}

#[async_trait]
impl Responder for ChatResponder {
    async fn respond(&self, transcript: &Transcript) -> anyhow::Result<String> {
        let messages = flatten(transcript, &self.speaker_name);
        let reply = self.client.complete(&self.system_prompt, &messages).await?;
        Ok(reply.trim().to_string())
    }
}

/// Decorator that looks the latest message up in the knowledge store and
/// hands `inner` a transcript view with the cited context prepended.
///
/// A store failure never blocks the turn: the decorator logs a warning and
/// degrades to the bare inner responder.
pub struct RetrievalAugmented {
    store: SharedStore,
    inner: Arc<dyn Responder>,
}

impl RetrievalAugmented {
    pub fn new(store: SharedStore, inner: Arc<dyn Responder>) -> Self {
        Self { store, inner }
    }

    fn with_context(transcript: &Transcript, answer: &StoreAnswer) -> Transcript {
        let citation = if answer.sources.is_empty() {
            answer.text.clone()
        } else {
            format!("{}\n(sources: {})", answer.text, answer.sources.join(", "))
        };
        let mut augmented = Transcript::new();
        augmented.append(CONTEXT_SENDER, &citation);
        for message in transcript.messages() {
            augmented.append(&message.sender, &message.content);
        }
        augmented
    }
}

#[async_trait]
impl Responder for RetrievalAugmented {
    async fn respond(&self, transcript: &Transcript) -> anyhow::Result<String> {
        let question = match transcript.latest() {
            Some(latest) => latest.content.clone(),
            None => return self.inner.respond(transcript).await,
        };

        // Read lock held only for the query itself.
        let lookup = {
            let store = self.store.read().await;
            store.query(&question).await
        };

        match lookup {
            Ok(answer) => {
                let augmented = Self::with_context(transcript, &answer);
                self.inner.respond(&augmented).await
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed; responding without document context");
                self.inner.respond(transcript).await
            }
        }
    }
}

/// Human at a terminal. Prints the latest message, then prompts; stdin is
/// read on the blocking pool so the runtime stays responsive.
pub struct ConsoleResponder {
    prompt: String,
}

impl ConsoleResponder {
    pub fn new() -> Self {
        Self {
            prompt: "you> ".to_string(),
        }
    }
}

impl Default for ConsoleResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for ConsoleResponder {
    async fn respond(&self, transcript: &Transcript) -> anyhow::Result<String> {
        if let Some(latest) = transcript.latest() {
            println!("\n{}: {}", latest.sender, latest.content);
        }
        let prompt = self.prompt.clone();
        let line = tokio::task::spawn_blocking(move || -> io::Result<String> {
            print!("{}", prompt);
            io::stdout().flush()?;
            let mut buf = String::new();
            io::stdin().read_line(&mut buf)?;
            Ok(buf.trim().to_string())
        })
        .await??;
        Ok(line)
    }
}
