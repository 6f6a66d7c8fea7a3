//! Query embeddings for hybrid retrieval.

use crate::config::OpenAiConfig;
use crate::credential::Credential;
use crate::error::{EvalError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Converts text into a vector for vector search.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Request structure for the embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response structure from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Azure OpenAI embeddings client.
///
/// Sends a single-text batch per call. No caching and no retries: a
/// failure surfaces to the caller, which skips the current query.
#[derive(Clone)]
pub struct AzureOpenAiEmbedder {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    dimensions: usize,
    credential: Credential,
}

impl AzureOpenAiEmbedder {
    /// Create an embedder for `deployment`, expecting vectors of `dimensions`.
    pub fn new(
        config: &OpenAiConfig,
        deployment: impl Into<String>,
        dimensions: usize,
        credential: Credential,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            deployment: deployment.into(),
            api_version: config.api_version.clone(),
            dimensions,
            credential,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    /// Pull the single vector out of a response and check its length.
    fn single_vector(&self, response: EmbeddingResponse) -> Result<Vec<f32>> {
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EvalError::Embedding("Empty response from embeddings API".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(EvalError::Embedding(format!(
                "Expected {} dimensions from '{}', got {}",
                self.dimensions,
                self.deployment,
                embedding.len()
            )));
        }

        Ok(embedding)
    }
}

impl Embedder for AzureOpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.deployment,
            input: vec![text],
        };

        let builder = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .json(&request);

        let start = std::time::Instant::now();
        let response = self
            .credential
            .authorize(builder)
            .await?
            .send()
            .await
            .map_err(|e| EvalError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(EvalError::Embedding(format!(
                "Embeddings API error {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EvalError::Embedding(format!("Failed to parse response: {}", e)))?;

        log::debug!("Embedding call took {:?}", start.elapsed());
        self.single_vector(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(dimensions: usize) -> AzureOpenAiEmbedder {
        let config = OpenAiConfig {
            endpoint: "https://res.openai.azure.com".to_string(),
            ..Default::default()
        };
        AzureOpenAiEmbedder::new(
            &config,
            "text-embedding-3-large",
            dimensions,
            Credential::ApiKey("k".to_string()),
        )
    }

    #[test]
    fn test_url_construction() {
        assert_eq!(
            embedder(3072).url(),
            "https://res.openai.azure.com/openai/deployments/text-embedding-3-large/embeddings?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_string(&EmbeddingRequest {
            model: "m",
            input: vec!["hello"],
        })
        .unwrap();
        assert_eq!(body, r#"{"model":"m","input":["hello"]}"#);
    }

    #[test]
    fn test_single_vector_checks_dimensions() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#).unwrap();
        assert_eq!(embedder(3).single_vector(response).unwrap().len(), 3);

        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.1, 0.2]}]}"#).unwrap();
        assert!(embedder(3).single_vector(response).is_err());
    }

    #[test]
    fn test_single_vector_rejects_empty_response() {
        let response: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(
            embedder(3).single_vector(response),
            Err(EvalError::Embedding(_))
        ));
    }
}
