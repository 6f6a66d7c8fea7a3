//! Keyword and hybrid document retrieval.

use super::client::{SearchBackend, SearchRequest, VectorQuery};
use super::document::RetrievedDocument;
use crate::config::{RetrievalMode, SearchConfig};
use crate::error::{EvalError, Result};

/// Issues queries against a search backend in the configured mode.
pub struct Retriever<S> {
    backend: S,
    mode: RetrievalMode,
    vector_field: String,
    vector_k: usize,
    semantic_configuration: Option<String>,
}

impl<S: SearchBackend> Retriever<S> {
    pub fn new(backend: S, mode: RetrievalMode, config: &SearchConfig) -> Self {
        Self {
            backend,
            mode,
            vector_field: config.vector_field.clone(),
            vector_k: config.vector_k,
            semantic_configuration: config.semantic_configuration.clone(),
        }
    }

    /// Retrieval mode this retriever runs in.
    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    /// The underlying search backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Build the backend request for a query.
    ///
    /// Hybrid mode needs the query embedding; keyword mode ignores it.
    pub fn build_request(
        &self,
        query: &str,
        top_k: usize,
        embedding: Option<Vec<f32>>,
    ) -> Result<SearchRequest> {
        let request = SearchRequest::text(query, top_k);

        match self.mode {
            RetrievalMode::Keyword => Ok(request),
            RetrievalMode::Hybrid => {
                let vector = embedding.ok_or_else(|| {
                    EvalError::Embedding("hybrid retrieval requires a query embedding".to_string())
                })?;
                let mut request =
                    request.with_vector(VectorQuery::new(vector, &self.vector_field, self.vector_k));
                if let Some(name) = &self.semantic_configuration {
                    request = request.with_semantic(name);
                }
                Ok(request)
            }
        }
    }

    /// Retrieve at most `top_k` documents for a query, best first.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        embedding: Option<Vec<f32>>,
    ) -> Result<Vec<RetrievedDocument>> {
        let request = self.build_request(query, top_k, embedding)?;
        let hits = self.backend.search(&request).await?;

        Ok(hits
            .into_iter()
            .take(top_k)
            .map(RetrievedDocument::from_fields)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};
    use std::cell::RefCell;

    /// Backend returning a fixed hit list and remembering requests.
    struct FakeBackend {
        hits: Vec<Value>,
        requests: RefCell<Vec<SearchRequest>>,
    }

    impl FakeBackend {
        fn new(hits: Vec<Value>) -> Self {
            Self {
                hits,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl SearchBackend for FakeBackend {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<Map<String, Value>>> {
            self.requests.borrow_mut().push(request.clone());
            Ok(self
                .hits
                .iter()
                .filter_map(|h| h.as_object().cloned())
                .collect())
        }
    }

    fn hybrid_config() -> SearchConfig {
        SearchConfig {
            semantic_configuration: Some("sem".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_keyword_retrieval() {
        let backend = FakeBackend::new(vec![
            json!({"content": "first", "@search.score": 2.0}),
            json!({"text": "second", "@search.score": 1.0}),
        ]);
        let retriever = Retriever::new(backend, RetrievalMode::Keyword, &SearchConfig::default());

        let docs = tokio_test::block_on(retriever.retrieve("q", 3, None)).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "first");
        assert_eq!(docs[1].content, "second");

        let requests = retriever.backend().requests.borrow();
        assert_eq!(requests[0], SearchRequest::text("q", 3));
    }

    #[test]
    fn test_hybrid_request_shape() {
        let retriever = Retriever::new(FakeBackend::new(vec![]), RetrievalMode::Hybrid, &hybrid_config());

        let request = retriever.build_request("q", 3, Some(vec![0.1; 4])).unwrap();
        assert_eq!(request.top, 3);
        assert_eq!(request.vector_queries.len(), 1);
        assert_eq!(request.vector_queries[0].k, 50);
        assert_eq!(request.vector_queries[0].fields, "text_vector");
        assert_eq!(request.query_type.as_deref(), Some("semantic"));
        assert_eq!(request.semantic_configuration.as_deref(), Some("sem"));
    }

    #[test]
    fn test_hybrid_requires_embedding() {
        let retriever = Retriever::new(FakeBackend::new(vec![]), RetrievalMode::Hybrid, &hybrid_config());
        assert!(matches!(
            retriever.build_request("q", 3, None),
            Err(EvalError::Embedding(_))
        ));
    }

    #[test]
    fn test_hybrid_truncates_to_top_k() {
        let hits = (0..10).map(|i| json!({"content": format!("doc {}", i)})).collect();
        let retriever = Retriever::new(FakeBackend::new(hits), RetrievalMode::Hybrid, &hybrid_config());

        let docs = tokio_test::block_on(retriever.retrieve("q", 3, Some(vec![0.0; 4]))).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[2].content, "doc 2");
    }
}
