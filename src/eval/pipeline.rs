//! The evaluation pipeline: retrieve, assemble, judge, record.

use super::judge::{JudgeBackend, invoke_judge};
use crate::config::{EvalConfig, RetrievalMode};
use crate::context::{self, ContextMode};
use crate::embeddings::Embedder;
use crate::results::{EvaluationRecord, RunResults};
use crate::retrieval::{Retriever, SearchBackend};

/// Queries evaluated when none are given on the command line.
pub const DEFAULT_QUERIES: &[&str] = &[
    "What are the benefits of SharePoint?",
    "How do I create a communication site?",
];

/// Per-run knobs the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub debug_context: bool,
}

impl From<&EvalConfig> for PipelineSettings {
    fn from(config: &EvalConfig) -> Self {
        Self {
            top_k: config.top_k(),
            debug_context: config.debug_context(),
        }
    }
}

/// Evaluates queries one at a time, in order.
pub struct Pipeline<S, E, J> {
    retriever: Retriever<S>,
    embedder: Option<E>,
    judge: J,
    settings: PipelineSettings,
}

impl<S, E, J> Pipeline<S, E, J>
where
    S: SearchBackend,
    E: Embedder,
    J: JudgeBackend,
{
    /// `embedder` is only consulted in hybrid mode.
    pub fn new(
        retriever: Retriever<S>,
        embedder: Option<E>,
        judge: J,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            retriever,
            embedder,
            judge,
            settings,
        }
    }

    /// Evaluate every query and collect the records.
    pub async fn run<Q: AsRef<str>>(&self, queries: &[Q]) -> RunResults {
        log::info!(
            "Starting {} evaluation of {} queries...",
            self.retriever.mode(),
            queries.len()
        );

        let mut results = RunResults::new();
        for query in queries {
            if let Some(record) = self.evaluate_query(query.as_ref()).await {
                results.push(record);
            }
        }
        results
    }

    /// Evaluate one query. `None` means the query was skipped.
    pub async fn evaluate_query(&self, query: &str) -> Option<EvaluationRecord> {
        log::info!("Processing Query: {}", query);

        let embedding = match self.retriever.mode() {
            RetrievalMode::Keyword => None,
            RetrievalMode::Hybrid => {
                let Some(embedder) = &self.embedder else {
                    log::warn!("  No embedder configured for hybrid retrieval. Skipping query.");
                    return None;
                };
                match embedder.embed(query).await {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        log::warn!("  Embedding failed ({}). Skipping query.", e);
                        return None;
                    }
                }
            }
        };

        let docs = match self
            .retriever
            .retrieve(query, self.settings.top_k, embedding)
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                log::warn!("  Error processing query: {}", e);
                return None;
            }
        };

        let clean = context::assemble(&docs, ContextMode::Clean);
        if context::is_blank(&clean) {
            log::warn!("  No documents found.");
            return None;
        }

        log::info!(
            "  > Retrieved {} docs. Context length: {} chars.",
            docs.len(),
            clean.chars().count()
        );
        if clean.contains("cs-1.png") {
            log::warn!("  > Found 'cs-1.png' in retrieved context!");
        }

        let debug = self
            .settings
            .debug_context
            .then(|| context::assemble(&docs, ContextMode::Debug));

        let outcome = invoke_judge(&self.judge, query, &clean).await;
        if let Some(score) = outcome.score {
            log::info!("  > Score: {}", score);
        } else if !outcome.succeeded() {
            log::warn!(
                "  > Judge failed after {} attempts; recording without a score.",
                outcome.attempts.len()
            );
        }

        Some(EvaluationRecord {
            query: query.to_string(),
            score: outcome.score,
            reason: outcome.reason,
            retrieved_context_preview: context::preview(&clean),
            full_retrieved_context: debug,
            retrieved_chunks: docs.iter().map(|d| d.metadata()).collect(),
        })
    }
}
