//! Azure OpenAI chat-completions client.
//!
//! Requests go to a named deployment and are authorized through a
//! [`Credential`], either a static key or a delegated bearer token.

use crate::config::OpenAiConfig;
use crate::credential::Credential;
use crate::error::{EvalError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    // Null when the response was filtered
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Azure OpenAI error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage (if available).
    pub usage: Option<TokenUsage>,
}

#[derive(Debug)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Azure OpenAI chat client bound to one deployment.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: OpenAiConfig,
    credential: Credential,
}

impl LlmClient {
    /// Create a client using the given credential.
    pub fn new(config: OpenAiConfig, credential: Credential) -> Self {
        Self {
            client: Client::new(),
            config,
            credential,
        }
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            base, self.config.deployment, self.config.api_version
        )
    }

    /// Send a chat completion request.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request);

        let response = self.credential.authorize(builder).await?.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(EvalError::LlmApi(format!(
                    "API error ({}{}): {}",
                    status,
                    api_error
                        .error
                        .code
                        .map(|c| format!(", {}", c))
                        .unwrap_or_default(),
                    api_error.error.message
                )));
            }
            return Err(EvalError::LlmApi(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EvalError::LlmApi("No choices in response".to_string()))?;

        let content = choice.message.content.ok_or_else(|| {
            EvalError::LlmApi(format!(
                "Response has no content (finish reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        Ok(LlmResponse {
            content,
            finish_reason: choice.finish_reason,
            usage: completion.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    /// Convenience method: single user message with optional system prompt.
    pub async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::new();

        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(user));

        let response = self.chat(messages).await?;
        Ok(response.content)
    }

    /// Test connectivity to the deployment.
    pub async fn test_connection(&self) -> Result<String> {
        let response = self.chat(vec![Message::user("Hello")]).await?;
        if let Some(usage) = &response.usage {
            log::debug!(
                "Connection check used {} tokens ({} prompt, {} completion)",
                usage.total_tokens,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let sys = Message::system("You are helpful.");
        let user = Message::user("Hello!");

        assert_eq!(sys.role, Role::System);
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_endpoint_construction() {
        let config = OpenAiConfig {
            endpoint: "https://res.openai.azure.com/".to_string(),
            deployment: "gpt-4o".to_string(),
            ..Default::default()
        };
        let client = LlmClient::new(config, Credential::ApiKey("k".to_string()));
        assert_eq!(
            client.endpoint(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_filtered_response_parses_with_null_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"content_filter"}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
