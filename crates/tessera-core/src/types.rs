//! Domain types
//!
//! Documents enter the system as [`DocumentInput`] (validated once at the
//! ingestion boundary) and are read back as [`Document`]. Every index
//! produces [`QueryResult`] projections, which are never persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TesseraError, TesseraResult};

/// Predicate of the self-link created for every stored document
pub const SELF_LINK_PREDICATE: &str = "is_document";

/// Embedding lifecycle of a stored document
///
/// `pending -> processing -> {completed, failed}`. Nothing moves back to
/// `pending` except a re-insert of the document; a `processing` row left by
/// an interrupted drain is claimed again once its lease expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStatus {
    /// Stored, waiting for a drain pass
    Pending,
    /// Claimed by a drain pass
    Processing,
    /// Vector computed (or nothing to embed)
    Completed,
    /// Embedding failed; terminal until re-inserted
    Failed,
}

impl EmbeddingStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EmbeddingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingStatus {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(TesseraError::PermanentStorage(format!(
                "unknown embedding status '{other}'"
            ))),
        }
    }
}

/// A document as handed to ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    /// Caller-assigned primary key
    pub id: String,
    /// Text to embed and index; may be empty
    #[serde(default)]
    pub content: String,
    /// Everything else, stored opaquely
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DocumentInput {
    /// Create a document with no metadata
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Map::new(),
        }
    }

    /// Builder-style: replace metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder-style: add one metadata entry
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validate an open key-value document
    ///
    /// `id` must be a non-empty string; `content`, when present and not
    /// null, must be a string. All other keys become metadata.
    pub fn from_map(mut map: Map<String, Value>) -> TesseraResult<Self> {
        let id = match map.remove("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(Value::String(_)) => {
                return Err(TesseraError::Validation("document id is empty".into()))
            }
            Some(other) => {
                return Err(TesseraError::Validation(format!(
                    "document id must be a string, got {}",
                    json_type(&other)
                )))
            }
            None => return Err(TesseraError::Validation("document has no id".into())),
        };

        let content = match map.remove("content") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(content)) => content,
            Some(other) => {
                return Err(TesseraError::Validation(format!(
                    "content of document '{id}' must be a string, got {}",
                    json_type(&other)
                )))
            }
        };

        Ok(Self {
            id,
            content,
            metadata: map,
        })
    }

    /// Validate a JSON value that should be an object
    pub fn from_value(value: Value) -> TesseraResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(TesseraError::Validation(format!(
                "document must be an object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Re-check an already-constructed input
    pub fn validate(&self) -> TesseraResult<()> {
        if self.id.trim().is_empty() {
            return Err(TesseraError::Validation("document id is empty".into()));
        }
        Ok(())
    }

    /// Whether there is anything to embed
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary key
    pub id: String,
    /// Document text
    pub content: String,
    /// Opaque metadata
    pub metadata: Map<String, Value>,
    /// Embedding, once computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Embedding lifecycle state
    pub status: EmbeddingStatus,
    /// Bumped on every upsert of this id
    pub revision: i64,
    /// Why embedding failed, for `failed` documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// First insert
    pub created_at: DateTime<Utc>,
    /// Last upsert or status change
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Project into a scored query result
    pub fn into_result(self, score: f64) -> QueryResult {
        QueryResult {
            id: self.id,
            content: self.content,
            metadata: self.metadata,
            score,
        }
    }
}

/// A directed labelled edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    /// Source node
    pub subject: String,
    /// Edge label
    pub predicate: String,
    /// Target node
    pub object: String,
    /// When the edge was first linked
    pub created_at: DateTime<Utc>,
}

impl Triple {
    /// Whether this edge matches `(subject, predicate, object)`
    pub fn matches(&self, subject: &str, predicate: &str, object: &str) -> bool {
        self.subject == subject && self.predicate == predicate && self.object == object
    }
}

/// A scored search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Document id
    pub id: String,
    /// Document text
    pub content: String,
    /// Document metadata
    pub metadata: Map<String, Value>,
    /// Relevance; higher is better
    pub score: f64,
}

/// Retrieval strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Dense-vector similarity only
    Vector,
    /// Keyword matching only
    Fulltext,
    /// Seed-and-expand over the triple store
    Graph,
    /// Weighted fusion of vector and full-text
    #[default]
    Hybrid,
}

impl RetrievalMode {
    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Fulltext => "fulltext",
            Self::Graph => "graph",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMode {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "fulltext" => Ok(Self::Fulltext),
            "graph" => Ok(Self::Graph),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(TesseraError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn from_map_splits_metadata() {
        let input = DocumentInput::from_map(object(json!({
            "id": "doc1",
            "content": "Eino is great",
            "source": "wiki",
            "page": 3
        })))
        .unwrap();

        assert_eq!(input.id, "doc1");
        assert_eq!(input.content, "Eino is great");
        assert_eq!(input.metadata.len(), 2);
        assert_eq!(input.metadata["source"], json!("wiki"));
        assert!(!input.metadata.contains_key("id"));
    }

    #[test]
    fn from_map_allows_missing_or_null_content() {
        let missing = DocumentInput::from_map(object(json!({"id": "a"}))).unwrap();
        let null = DocumentInput::from_map(object(json!({"id": "b", "content": null}))).unwrap();
        assert!(!missing.has_content());
        assert!(!null.has_content());
    }

    #[test]
    fn from_map_rejects_bad_ids() {
        for doc in [
            json!({"content": "x"}),
            json!({"id": "", "content": "x"}),
            json!({"id": "   "}),
            json!({"id": 42}),
        ] {
            let err = DocumentInput::from_map(object(doc.clone())).unwrap_err();
            assert!(matches!(err, TesseraError::Validation(_)), "{doc}");
        }
    }

    #[test]
    fn from_map_rejects_non_string_content() {
        let err =
            DocumentInput::from_map(object(json!({"id": "a", "content": ["x"]}))).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn from_value_requires_object() {
        assert!(DocumentInput::from_value(json!("doc")).is_err());
        assert!(DocumentInput::from_value(json!({"id": "x"})).is_ok());
    }

    #[test]
    fn retrieval_mode_parsing() {
        assert_eq!("vector".parse::<RetrievalMode>().unwrap(), RetrievalMode::Vector);
        assert_eq!("FullText".parse::<RetrievalMode>().unwrap(), RetrievalMode::Fulltext);
        assert_eq!(" graph ".parse::<RetrievalMode>().unwrap(), RetrievalMode::Graph);
        assert_eq!(RetrievalMode::default(), RetrievalMode::Hybrid);

        let err = "semantic".parse::<RetrievalMode>().unwrap_err();
        assert!(matches!(err, TesseraError::UnknownMode(m) if m == "semantic"));
    }

    #[test]
    fn status_round_trips_through_storage_strings() {
        for status in [
            EmbeddingStatus::Pending,
            EmbeddingStatus::Processing,
            EmbeddingStatus::Completed,
            EmbeddingStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<EmbeddingStatus>().unwrap(), status);
        }
    }
}
