//! Normalized ingestion records.
//!
//! Raw partitioner elements arrive as loosely shaped JSON. Normalization
//! flattens them into the one shape the knowledge store accepts; the same
//! shape is what the pipeline persists, so a written output file can be
//! handed to the store verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store-facing metadata attached to each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Graph labels. Never empty; defaults to `["Document"]`.
    pub labels: Vec<String>,
    /// Element id carried over from the raw element, when present.
    pub element_id: Option<String>,
    /// The raw element's own metadata object, preserved wholesale.
    #[serde(default)]
    pub original_metadata: Map<String, Value>,
}

/// One normalized element of an ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedRecord {
    /// Extracted text. Always present; empty when the element had none.
    pub text: String,
    pub metadata: RecordMetadata,
}

impl IngestedRecord {
    /// Normalize one raw element.
    ///
    /// Returns `None` for anything that is not a JSON object; such
    /// elements are dropped silently.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;

        let text = obj
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let element_id = obj
            .get("element_id")
            .and_then(Value::as_str)
            .map(String::from);
        let original_metadata = obj
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Some(Self {
            text,
            metadata: RecordMetadata {
                labels: vec!["Document".to_string()],
                element_id,
                original_metadata,
            },
        })
    }
}

/// Normalize a batch of raw elements, dropping everything non-object.
pub fn normalize_elements(raw: &[Value]) -> Vec<IngestedRecord> {
    raw.iter().filter_map(IngestedRecord::from_raw).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_element_normalized() {
        let raw = json!({
            "type": "NarrativeText",
            "element_id": "abc-123",
            "text": "Revenue was 38,000.",
            "metadata": { "page_number": 4, "filetype": "application/pdf" }
        });

        let record = IngestedRecord::from_raw(&raw).unwrap();
        assert_eq!(record.text, "Revenue was 38,000.");
        assert_eq!(record.metadata.labels, vec!["Document"]);
        assert_eq!(record.metadata.element_id.as_deref(), Some("abc-123"));
        assert_eq!(
            record.metadata.original_metadata.get("page_number"),
            Some(&json!(4))
        );
    }

    #[test]
    fn test_missing_text_becomes_empty() {
        let raw = json!({ "element_id": "img-1", "metadata": {} });
        let record = IngestedRecord::from_raw(&raw).unwrap();
        assert_eq!(record.text, "");
        assert_eq!(record.metadata.labels, vec!["Document"]);
    }

    #[test]
    fn test_non_object_elements_dropped() {
        let raw = vec![
            json!("just a string"),
            json!(42),
            json!(null),
            json!({ "text": "kept" }),
            json!(["nested", "array"]),
        ];
        let records = normalize_elements(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "kept");
    }

    #[test]
    fn test_persisted_shape_roundtrip() {
        let raw = vec![json!({
            "text": "Table contents",
            "element_id": "tbl-7",
            "metadata": { "page_number": 2 }
        })];
        let records = normalize_elements(&raw);

        let json = serde_json::to_string_pretty(&records).unwrap();
        let restored: Vec<IngestedRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].metadata.element_id.as_deref(), Some("tbl-7"));
        assert_eq!(
            restored[0].metadata.original_metadata.get("page_number"),
            Some(&json!(2))
        );
    }
}
