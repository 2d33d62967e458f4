//! The filing-analysis cast: chat plumbing, prompts, responders, factory.

pub mod chat;
pub mod factory;
pub mod prompts;
pub mod responders;

pub use chat::ChatClient;
pub use factory::{LlmJudge, ParticipantFactory};
pub use responders::{ChatResponder, ConsoleResponder, RetrievalAugmented};
