//! Application configuration, assembled from environment variables.
//!
//! Every knob has a default; a fresh checkout runs against a local store
//! and the standard OpenAI endpoint with no configuration at all (an API
//! key being the one thing that cannot be defaulted).

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors surfaced at startup or cast construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// LLM-backed participants cannot be built without an API key.
    #[error("no LLM API key configured (set FILING_LLM_API_KEY or OPENAI_API_KEY)")]
    MissingApiKey,

    /// An environment variable holds a value that cannot be used.
    #[error("invalid configuration: {detail}")]
    Invalid { detail: String },
}

/// Knowledge-store connection settings.
///
/// `host` may carry a graph-database scheme (`bolt://`, `neo4j://`,
/// `neo4j+s://`); the store adapter normalizes it to HTTP when building
/// endpoint URLs.
#[derive(Debug, Clone)]
pub struct StoreCredentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl StoreCredentials {
    fn from_env() -> Result<Self, ConfigError> {
        let port_raw =
            std::env::var("FILING_STORE_PORT").unwrap_or_else(|_| "7687".into());
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            detail: format!("FILING_STORE_PORT '{port_raw}' is not a valid port"),
        })?;

        Ok(Self {
            host: std::env::var("FILING_STORE_HOST")
                .unwrap_or_else(|_| "bolt://localhost".into()),
            port,
            username: std::env::var("FILING_STORE_USERNAME").unwrap_or_else(|_| "neo4j".into()),
            password: std::env::var("FILING_STORE_PASSWORD").unwrap_or_default(),
            database: std::env::var("FILING_STORE_DATABASE").unwrap_or_else(|_| "neo4j".into()),
        })
    }
}

/// Chat-completion endpoint settings shared by all LLM participants.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (no trailing `/chat/completions`).
    pub base_url: String,
    /// Bearer token; absent means LLM participants cannot be built.
    pub api_key: Option<String>,
    pub model: String,
    /// Embedding model the knowledge store indexes records with.
    pub embedding_model: String,
    pub temperature: f32,
}

impl LlmConfig {
    fn from_env() -> Self {
        Self {
            base_url: std::env::var("FILING_LLM_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: std::env::var("FILING_LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            model: std::env::var("FILING_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            embedding_model: std::env::var("FILING_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".into()),
            temperature: 0.7,
        }
    }

    /// The API key, or [`ConfigError::MissingApiKey`].
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

/// Default filesystem locations for ingestion inputs and outputs.
#[derive(Debug, Clone)]
pub struct PathDefaults {
    /// Document to ingest.
    pub source_path: PathBuf,
    /// Normalized-records JSON written by the pipeline.
    pub output_path: PathBuf,
    /// Directory for extracted page/table images.
    pub image_dir: PathBuf,
}

impl PathDefaults {
    fn from_env() -> Self {
        Self {
            source_path: std::env::var("FILING_SOURCE_PATH")
                .unwrap_or_else(|_| "input_files/filing.pdf".into())
                .into(),
            output_path: std::env::var("FILING_OUTPUT_PATH")
                .unwrap_or_else(|_| "parsed/elements.json".into())
                .into(),
            image_dir: std::env::var("FILING_IMAGE_DIR")
                .unwrap_or_else(|_| "parsed/images".into())
                .into(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreCredentials,
    pub llm: LlmConfig,
    pub paths: PathDefaults,
}

impl AppConfig {
    /// Read the whole configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: StoreCredentials::from_env()?,
            llm: LlmConfig::from_env(),
            paths: PathDefaults::from_env(),
        })
    }
}
