//! Bridge to the external document-partitioning CLI.
//!
//! Extraction itself is an opaque collaborator: the pipeline shells out to
//! a partitioning binary and consumes its JSON output. The binary name is
//! read from `FILING_PARTITIONER_BIN`, defaulting to
//! `unstructured-partition`. Tests supply their own [`Partitioner`]
//! implementations instead of the real CLI.

use std::fmt;
use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Extraction strategy passed through to the partitioner.
///
/// Strategies trade fidelity for robustness: `HiRes` does full layout
/// analysis, `Fast` skips it, `OcrOnly` rasterizes and OCRs every page,
/// `Auto` lets the partitioner decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    HiRes,
    Fast,
    OcrOnly,
    Auto,
}

impl ExtractionStrategy {
    /// The fallback ladder starting from a preferred strategy.
    ///
    /// Always `[preferred, Fast, OcrOnly, Auto]` with duplicates removed,
    /// so preferring `Fast` yields a three-rung ladder.
    pub fn ordered(preferred: Self) -> Vec<Self> {
        let mut ladder = vec![preferred];
        for next in [Self::Fast, Self::OcrOnly, Self::Auto] {
            if !ladder.contains(&next) {
                ladder.push(next);
            }
        }
        ladder
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HiRes => write!(f, "hi_res"),
            Self::Fast => write!(f, "fast"),
            Self::OcrOnly => write!(f, "ocr_only"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Errors from a single partitioning attempt.
#[derive(Error, Debug)]
pub enum PartitionError {
    /// The partitioner binary could not be launched at all.
    #[error("failed to launch partitioner '{bin}': {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    /// The partitioner ran and reported failure.
    #[error("partitioner failed with strategy {strategy}: {stderr}")]
    Failed {
        strategy: ExtractionStrategy,
        stderr: String,
    },

    /// The partitioner succeeded but its output was not a JSON array.
    #[error("partitioner produced malformed output: {detail}")]
    Malformed { detail: String },
}

/// One extraction attempt against a source document.
///
/// Implementations must be cheap to call repeatedly; the pipeline walks
/// the strategy ladder by calling `partition` once per rung.
pub trait Partitioner: Send + Sync {
    fn partition(
        &self,
        source: &Path,
        strategy: ExtractionStrategy,
        image_dir: &Path,
    ) -> Result<Vec<serde_json::Value>, PartitionError>;
}

/// Shells out to the partitioning CLI and parses its stdout.
pub struct CommandPartitioner {
    bin: String,
    languages: Vec<String>,
}

impl CommandPartitioner {
    /// Binary name from `FILING_PARTITIONER_BIN`, languages defaulting to
    /// English.
    pub fn from_env() -> Self {
        let bin = std::env::var("FILING_PARTITIONER_BIN")
            .unwrap_or_else(|_| "unstructured-partition".into());
        Self::new(bin)
    }

    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            languages: vec!["eng".to_string()],
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }
}

impl Partitioner for CommandPartitioner {
    fn partition(
        &self,
        source: &Path,
        strategy: ExtractionStrategy,
        image_dir: &Path,
    ) -> Result<Vec<serde_json::Value>, PartitionError> {
        let strategy_arg = strategy.to_string();
        let languages = self.languages.join(",");
        debug!(bin = %self.bin, strategy = %strategy, source = %source.display(), "invoking partitioner");

        let output = Command::new(&self.bin)
            .arg("partition")
            .arg("--input")
            .arg(source)
            .arg("--strategy")
            .arg(&strategy_arg)
            .arg("--languages")
            .arg(&languages)
            .arg("--images-dir")
            .arg(image_dir)
            .arg("--json")
            .output()
            .map_err(|e| PartitionError::Spawn {
                bin: self.bin.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(PartitionError::Failed {
                strategy,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str::<Vec<serde_json::Value>>(stdout.trim()).map_err(|e| {
            PartitionError::Malformed {
                detail: e.to_string(),
            }
        })
    }
}
