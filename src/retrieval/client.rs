//! Azure AI Search REST client.

use crate::config::SearchConfig;
use crate::credential::Credential;
use crate::error::{EvalError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A search request in the shape the REST API expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,
    pub top: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vector_queries: Vec<VectorQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_configuration: Option<String>,
}

impl SearchRequest {
    /// Full-text search for `text`, returning at most `top` hits.
    pub fn text(text: impl Into<String>, top: usize) -> Self {
        Self {
            search: text.into(),
            top,
            ..Default::default()
        }
    }

    /// Restrict hits with an OData filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Add a nearest-neighbour vector query.
    pub fn with_vector(mut self, query: VectorQuery) -> Self {
        self.vector_queries.push(query);
        self
    }

    /// Rerank with the named semantic configuration.
    pub fn with_semantic(mut self, configuration: impl Into<String>) -> Self {
        self.query_type = Some("semantic".to_string());
        self.semantic_configuration = Some(configuration.into());
        self
    }
}

/// Vector similarity query against one vector field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorQuery {
    pub kind: String,
    pub vector: Vec<f32>,
    pub fields: String,
    pub k: usize,
}

impl VectorQuery {
    pub fn new(vector: Vec<f32>, fields: impl Into<String>, k: usize) -> Self {
        Self {
            kind: "vector".to_string(),
            vector,
            fields: fields.into(),
            k,
        }
    }
}

/// Anything that can answer a [`SearchRequest`] with ranked field mappings.
#[allow(async_fn_in_trait)]
pub trait SearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Map<String, Value>>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for one search index.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    index: String,
    api_version: String,
    credential: Credential,
}

impl SearchClient {
    pub fn new(config: &SearchConfig, credential: Credential) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            index: config.index.clone(),
            api_version: config.api_version.clone(),
            credential,
        }
    }

    /// Get the search URL for the index.
    fn url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.index,
            self.api_version
        )
    }
}

impl SearchBackend for SearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Map<String, Value>>> {
        let builder = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .json(request);

        let response = self.credential.authorize(builder).await?.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(EvalError::Search(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(EvalError::Search(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| EvalError::Search(format!("Failed to parse search response: {}", e)))?;

        Ok(parsed.value)
    }
}
