//! Search Eval - retrieval-quality evaluation for a hosted search index.
//!
//! For each query the evaluator retrieves documents from an Azure AI Search
//! index, joins them into a context, and asks an LLM judge on Azure OpenAI
//! to rate how well that context answers the query on a 0-5 scale.
//!
//! # Quick Start
//!
//! ```no_run
//! use search_eval::{
//!     config::Config,
//!     credential::{COGNITIVE_SERVICES_SCOPE, Credential, SEARCH_SCOPE},
//!     embeddings::AzureOpenAiEmbedder,
//!     eval::{DEFAULT_QUERIES, Pipeline, PipelineSettings, RetrievalJudge},
//!     llm::LlmClient,
//!     retrieval::{Retriever, SearchClient},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let search = SearchClient::new(
//!         &config.search,
//!         Credential::from_configured_key(config.search.api_key.as_deref(), SEARCH_SCOPE),
//!     );
//!     let retriever = Retriever::new(search, config.eval.mode, &config.search);
//!
//!     let judge = RetrievalJudge::new(LlmClient::new(
//!         config.openai.clone(),
//!         Credential::delegated(COGNITIVE_SERVICES_SCOPE),
//!     ));
//!
//!     let pipeline = Pipeline::new(
//!         retriever,
//!         None::<AzureOpenAiEmbedder>,
//!         judge,
//!         PipelineSettings::from(&config.eval),
//!     );
//!
//!     let results = pipeline.run(DEFAULT_QUERIES).await;
//!     results.print_summary();
//!     results.save(&config.eval.output_path())?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **credential**: key or delegated-identity authentication
//! - **retrieval**: search client and keyword/hybrid retriever
//! - **embeddings**: query embeddings for hybrid retrieval
//! - **context**: context assembly and sanitization
//! - **eval**: judge invocation and the evaluation pipeline
//! - **results**: evaluation records, run summary, JSON output
//! - **convert**: JSON to CSV conversion
//! - **inspect**: chunk lookup by id

pub mod config;
pub mod context;
pub mod convert;
pub mod credential;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod inspect;
pub mod llm;
pub mod results;
pub mod retrieval;

// Re-export commonly used types
pub use config::{Config, RetrievalMode};
pub use error::{EvalError, Result};
pub use eval::{Pipeline, PipelineSettings};
pub use results::{EvaluationRecord, RunResults};
pub use retrieval::RetrievedDocument;
