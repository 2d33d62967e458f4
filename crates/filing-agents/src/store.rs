//! Knowledge-store adapter.
//!
//! `GraphStore` fronts a graph database's HTTP API: one status probe at
//! connect time, one bulk load at initialization, one request per query.
//! The adapter does not retry and sets no internal timeout; callers impose
//! deadlines and decide what a failure means. Shared access goes through
//! [`SharedStore`], an `RwLock` taken for write only during initialization.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::StoreCredentials;
use crate::ingest::IngestedRecord;

/// Errors from the knowledge-store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store endpoint could not be reached or refused the credentials.
    #[error("knowledge store unreachable: {detail}")]
    Connection { detail: String },

    /// The records handed to `initialize` are not loadable.
    #[error("invalid records for store initialization: {detail}")]
    Validation { detail: String },

    /// The store rejected the bulk load.
    #[error("store initialization failed (status {status}): {detail}")]
    InitFailed { status: u16, detail: String },

    #[error("store query failed: {detail}")]
    QueryFailed { detail: String },

    /// `query` was called before a successful `initialize`.
    #[error("knowledge store has not been initialized")]
    NotInitialized,
}

/// An answer from the store, citing the ingested elements it drew on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreAnswer {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Backing store for retrieval-augmented participants.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Replace the store's content with `records`. Exclusive.
    async fn initialize(&mut self, records: &[IngestedRecord]) -> Result<(), StoreError>;

    /// Answer `question` from the loaded content.
    async fn query(&self, question: &str) -> Result<StoreAnswer, StoreError>;

    /// Identifier for logs.
    fn name(&self) -> &str;
}

/// Shared handle: readers query concurrently, initialization takes the
/// write half.
pub type SharedStore = Arc<RwLock<dyn KnowledgeStore>>;

pub fn into_shared<S: KnowledgeStore + 'static>(store: S) -> SharedStore {
    Arc::new(RwLock::new(store))
}

/// Map a graph-database connection URI onto the HTTP API endpoint.
///
/// Driver-style schemes (`bolt://`, `neo4j://`) address the binary
/// protocol port; the HTTP API lives on its own port, so only the scheme
/// and host survive. Secure variants keep TLS. A bare host defaults to
/// plain HTTP.
fn http_endpoint(credentials: &StoreCredentials) -> String {
    let host = credentials.host.as_str();
    let (scheme, bare) = if let Some(rest) = host.strip_prefix("neo4j+s://") {
        ("https", rest)
    } else if let Some(rest) = host.strip_prefix("bolt+s://") {
        ("https", rest)
    } else if let Some(rest) = host.strip_prefix("neo4j://") {
        ("http", rest)
    } else if let Some(rest) = host.strip_prefix("bolt://") {
        ("http", rest)
    } else if let Some(rest) = host.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = host.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("http", host)
    };
    format!("{}://{}:{}", scheme, bare, credentials.port)
}

/// HTTP-backed graph store.
pub struct GraphStore {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    database: String,
    embedding_model: String,
    initialized: bool,
}

impl GraphStore {
    /// Connect and verify the endpoint answers the status probe.
    pub async fn connect(
        credentials: &StoreCredentials,
        embedding_model: &str,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            StoreError::Connection {
                detail: e.to_string(),
            }
        })?;

        let store = Self {
            client,
            base_url: http_endpoint(credentials),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            database: credentials.database.clone(),
            embedding_model: embedding_model.to_string(),
            initialized: false,
        };
        store.probe().await?;
        info!(
            endpoint = %store.base_url,
            database = %store.database,
            "connected to knowledge store"
        );
        Ok(store)
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let url = format!("{}/db/{}/status", self.base_url, self.database);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| StoreError::Connection {
                detail: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Connection {
                detail: format!("status probe returned {}: {}", status, body),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for GraphStore {
    async fn initialize(&mut self, records: &[IngestedRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Err(StoreError::Validation {
                detail: "no records to load".into(),
            });
        }
        if let Some(index) = records.iter().position(|r| r.metadata.labels.is_empty()) {
            return Err(StoreError::Validation {
                detail: format!("record {} has no labels", index),
            });
        }

        let url = format!("{}/db/{}/init", self.base_url, self.database);
        let body = serde_json::json!({
            "records": records,
            "embedding_model": self.embedding_model,
        });
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Connection {
                detail: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::InitFailed { status, detail });
        }

        self.initialized = true;
        info!(
            count = records.len(),
            database = %self.database,
            "knowledge store initialized"
        );
        Ok(())
    }

    async fn query(&self, question: &str) -> Result<StoreAnswer, StoreError> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }

        let url = format!("{}/db/{}/query", self.base_url, self.database);
        let body = serde_json::json!({ "question": question });
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::QueryFailed {
                detail: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::QueryFailed {
                detail: format!("{}: {}", status, detail),
            });
        }

        let answer: StoreAnswer = response.json().await.map_err(|e| StoreError::QueryFailed {
            detail: e.to_string(),
        })?;
        debug!(sources = answer.sources.len(), "store answered");
        Ok(answer)
    }

    fn name(&self) -> &str {
        "graph-store"
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// In-memory store for tests: records what it was given, answers from
    /// a canned response, optionally fails. Logs are `Arc`s so tests keep a
    /// handle after the store disappears behind a [`SharedStore`].
    pub struct MockStore {
        pub loaded: Arc<Mutex<Vec<IngestedRecord>>>,
        pub answer: Option<StoreAnswer>,
        pub fail_query: bool,
        pub queries: Arc<Mutex<Vec<String>>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self {
                loaded: Arc::new(Mutex::new(Vec::new())),
                answer: None,
                fail_query: false,
                queries: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn with_answer(mut self, text: &str, sources: &[&str]) -> Self {
            self.answer = Some(StoreAnswer {
                text: text.to_string(),
                sources: sources.iter().map(|s| s.to_string()).collect(),
            });
            self
        }

        pub fn failing() -> Self {
            Self {
                fail_query: true,
                ..Self::new()
            }
        }

        pub fn loaded_log(&self) -> Arc<Mutex<Vec<IngestedRecord>>> {
            Arc::clone(&self.loaded)
        }

        pub fn query_log(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.queries)
        }
    }

    #[async_trait]
    impl KnowledgeStore for MockStore {
        async fn initialize(&mut self, records: &[IngestedRecord]) -> Result<(), StoreError> {
            if records.is_empty() {
                return Err(StoreError::Validation {
                    detail: "no records to load".into(),
                });
            }
            *self.loaded.lock().unwrap() = records.to_vec();
            Ok(())
        }

        async fn query(&self, question: &str) -> Result<StoreAnswer, StoreError> {
            self.queries.lock().unwrap().push(question.to_string());
            if self.fail_query {
                return Err(StoreError::QueryFailed {
                    detail: "mock failure".into(),
                });
            }
            self.answer.clone().ok_or(StoreError::NotInitialized)
        }

        fn name(&self) -> &str {
            "mock-store"
        }
    }

    fn credentials(host: &str) -> StoreCredentials {
        StoreCredentials {
            host: host.to_string(),
            port: 7474,
            username: "neo4j".to_string(),
            password: "secret".to_string(),
            database: "neo4j".to_string(),
        }
    }

    #[test]
    fn test_endpoint_from_bolt_uri() {
        assert_eq!(
            http_endpoint(&credentials("bolt://localhost")),
            "http://localhost:7474"
        );
    }

    #[test]
    fn test_endpoint_from_neo4j_uris() {
        assert_eq!(
            http_endpoint(&credentials("neo4j://graph.internal")),
            "http://graph.internal:7474"
        );
        assert_eq!(
            http_endpoint(&credentials("neo4j+s://graph.example.com")),
            "https://graph.example.com:7474"
        );
    }

    #[test]
    fn test_endpoint_from_bare_host() {
        assert_eq!(
            http_endpoint(&credentials("localhost")),
            "http://localhost:7474"
        );
    }

    #[test]
    fn test_endpoint_keeps_explicit_http_scheme() {
        assert_eq!(
            http_endpoint(&credentials("https://graph.example.com")),
            "https://graph.example.com:7474"
        );
    }

    fn offline_store() -> GraphStore {
        GraphStore {
            client: reqwest::Client::new(),
            base_url: "http://localhost:7474".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            initialized: false,
        }
    }

    #[tokio::test]
    async fn test_initialize_rejects_empty_records() {
        let mut store = offline_store();
        let err = store.initialize(&[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_initialize_rejects_unlabeled_records() {
        let mut store = offline_store();
        let mut record = IngestedRecord::from_raw(&json!({ "text": "hello" })).unwrap();
        record.metadata.labels.clear();
        let err = store.initialize(&[record]).await.unwrap_err();
        match err {
            StoreError::Validation { detail } => assert!(detail.contains("labels")),
            other => panic!("expected Validation, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_query_before_initialize_is_rejected() {
        let store = offline_store();
        let err = store.query("what was revenue?").await.unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized));
    }
}
