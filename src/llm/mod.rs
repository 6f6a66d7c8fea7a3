//! LLM integration module.
//!
//! Provides the Azure OpenAI chat client and the prompts used by the
//! retrieval judge.

mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;
