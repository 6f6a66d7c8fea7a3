//! Search hits and the metadata recorded for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Candidate fields for the document body, in priority order.
pub const CONTENT_FIELDS: &[&str] = &["content", "text", "chunk"];

/// Candidate fields for the document id, in priority order.
pub const ID_FIELDS: &[&str] = &["id", "chunk_id"];

/// Candidate fields for the source file, in priority order.
pub const FILEPATH_FIELDS: &[&str] = &["filepath", "filename", "metadata_storage_name"];

const TITLE_FIELD: &str = "title";
const URL_FIELD: &str = "url";
const SCORE_FIELD: &str = "@search.score";
const RERANKER_SCORE_FIELD: &str = "@search.rerankerScore";

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    /// Body text used to build the judge context.
    pub content: String,
    /// Backend relevance score.
    pub score: Option<f64>,
    /// Semantic reranker score (hybrid mode).
    pub reranker_score: Option<f64>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub filepath: Option<String>,
    pub url: Option<String>,
    /// All fields as returned by the backend.
    pub fields: Map<String, Value>,
}

impl RetrievedDocument {
    /// Build a document from the raw field mapping of a hit.
    ///
    /// When no body field is present, the whole mapping serialized as
    /// JSON stands in for the body.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let content = first_text(&fields, CONTENT_FIELDS)
            .unwrap_or_else(|| Value::Object(fields.clone()).to_string());

        Self {
            content,
            score: fields.get(SCORE_FIELD).and_then(Value::as_f64),
            reranker_score: fields.get(RERANKER_SCORE_FIELD).and_then(Value::as_f64),
            id: first_text(&fields, ID_FIELDS),
            title: first_text(&fields, &[TITLE_FIELD]),
            filepath: first_text(&fields, FILEPATH_FIELDS),
            url: first_text(&fields, &[URL_FIELD]),
            fields,
        }
    }

    /// Summary stored alongside an evaluation record.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            search_score: self.score,
            reranker_score: self.reranker_score,
            id: self.id.clone(),
            filepath: self.filepath.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
        }
    }

    /// Names of the fields the backend returned.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

/// Per-document metadata written into results. Absent values are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub search_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reranker_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filepath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
}

/// First candidate field holding a non-empty string or a number.
fn first_text(fields: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|name| fields.get(*name))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
