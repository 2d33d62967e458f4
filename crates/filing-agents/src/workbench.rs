//! Interactive analysis surface.
//!
//! `Workbench` is the state a UI collaborator holds between user actions:
//! the loaded document, the shared knowledge store, the current cast, and
//! the chat log. It is an explicit value handed to whoever drives it; every
//! failure comes back as an error value so the surface can render it inline
//! and keep running.

use std::path::Path;

use roundtable::{
    CoordinatorConfig, ParticipantRegistry, RoundRobinSelector, SentinelTermination,
    SessionOutcome, TurnCoordinator,
};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{AppConfig, ConfigError};
use crate::ingest::{IngestError, IngestPipeline};
use crate::store::{KnowledgeStore, SharedStore, StoreError};

/// Errors surfaced to the workbench's UI.
#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Coordination(#[from] roundtable::CoordinationError),

    #[error("workbench is not ready: {detail}")]
    NotReady { detail: String },
}

/// Builds the participant cast. The first registered participant is the
/// session entry point.
pub trait CastBuilder: Send + Sync {
    fn build(
        &self,
        store: Option<SharedStore>,
        auto_mode: bool,
    ) -> Result<ParticipantRegistry, ConfigError>;
}

impl CastBuilder for crate::agents::ParticipantFactory {
    fn build(
        &self,
        store: Option<SharedStore>,
        auto_mode: bool,
    ) -> Result<ParticipantRegistry, ConfigError> {
        self.registry(store, auto_mode)
    }
}

/// Result of loading a document into the workbench.
#[derive(Debug, Clone)]
pub struct UploadReport {
    /// Records extracted from the document.
    pub records: usize,
    /// Whether the knowledge store was reloaded with them.
    pub store_initialized: bool,
}

/// One entry in the workbench chat log.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Snapshot of workbench readiness.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WorkbenchStatus {
    pub document_loaded: bool,
    pub participants_ready: bool,
    pub sessions_run: u32,
}

pub struct Workbench {
    config: AppConfig,
    pipeline: IngestPipeline,
    cast: Box<dyn CastBuilder>,
    store: Option<SharedStore>,
    registry: Option<ParticipantRegistry>,
    chat_log: Vec<ChatEntry>,
    document_records: usize,
    sessions_run: u32,
    auto_mode: bool,
    max_rounds: u32,
}

impl Workbench {
    pub fn new(
        config: AppConfig,
        pipeline: IngestPipeline,
        cast: Box<dyn CastBuilder>,
        store: Option<SharedStore>,
        auto_mode: bool,
        max_rounds: u32,
    ) -> Self {
        Self {
            config,
            pipeline,
            cast,
            store,
            registry: None,
            chat_log: Vec::new(),
            document_records: 0,
            sessions_run: 0,
            auto_mode,
            max_rounds,
        }
    }

    /// Load a document: forced re-ingestion into the configured scratch
    /// paths, store reload, cast rebuild.
    pub async fn upload_document(&mut self, source: &Path) -> Result<UploadReport, WorkbenchError> {
        let records = self.pipeline.ingest(
            source,
            &self.config.paths.output_path,
            &self.config.paths.image_dir,
            true,
        )?;
        self.document_records = records.len();

        let store_initialized = match &self.store {
            Some(store) => {
                store.write().await.initialize(&records).await?;
                true
            }
            None => false,
        };

        self.registry = Some(self.cast.build(self.store.clone(), self.auto_mode)?);
        info!(
            records = records.len(),
            store_initialized, "document loaded into workbench"
        );
        Ok(UploadReport {
            records: records.len(),
            store_initialized,
        })
    }

    /// Run one coordinated session seeded with `text`.
    ///
    /// Builds the cast on first use if no document has been uploaded, so
    /// the workbench still answers (without retrieval context) in degraded
    /// setups.
    pub async fn submit(&mut self, text: &str) -> Result<SessionOutcome, WorkbenchError> {
        let registry = match &self.registry {
            Some(registry) => registry.clone(),
            None => {
                let built = self.cast.build(self.store.clone(), self.auto_mode)?;
                self.registry = Some(built.clone());
                built
            }
        };
        let entry = match registry.names().first() {
            Some(name) => name.to_string(),
            None => {
                return Err(WorkbenchError::NotReady {
                    detail: "participant cast is empty".into(),
                })
            }
        };

        let coordinator = TurnCoordinator::new(
            registry,
            Box::new(RoundRobinSelector),
            Box::new(SentinelTermination::default()),
            CoordinatorConfig::new(entry.clone(), self.max_rounds),
        );
        let mut session = coordinator.start_session();
        let cancel = CancellationToken::new();
        let outcome = coordinator.run(&mut session, text, &cancel).await?;

        self.chat_log.push(ChatEntry {
            role: ChatRole::User,
            text: text.to_string(),
        });
        let reply = session
            .transcript()
            .messages()
            .iter()
            .rev()
            .find(|m| !m.is_from(&entry))
            .map(|m| m.content.clone())
            .unwrap_or_else(|| outcome.summary_line());
        self.chat_log.push(ChatEntry {
            role: ChatRole::Assistant,
            text: reply,
        });

        self.sessions_run += 1;
        Ok(outcome)
    }

    pub fn chat_log(&self) -> &[ChatEntry] {
        &self.chat_log
    }

    pub fn status(&self) -> WorkbenchStatus {
        WorkbenchStatus {
            document_loaded: self.document_records > 0,
            participants_ready: self.registry.is_some(),
            sessions_run: self.sessions_run,
        }
    }
}
