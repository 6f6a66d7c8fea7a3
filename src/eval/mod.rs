//! Retrieval-quality evaluation.
//!
//! This module provides:
//! - The LLM-as-judge invoker with its direct/conversation fallback
//! - The pipeline that turns each query into an evaluation record

pub mod judge;
pub mod pipeline;

pub use judge::{
    CallStrategy, Conversation, JudgeAttempt, JudgeBackend, JudgeOutcome, RetrievalJudge,
    invoke_judge,
};
pub use pipeline::{DEFAULT_QUERIES, Pipeline, PipelineSettings};
