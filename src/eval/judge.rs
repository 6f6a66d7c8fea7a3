//! LLM-as-judge scoring of retrieved context.
//!
//! The judge is called in the direct query + context form first. If that
//! fails for any reason, the conversation form is tried once. Each attempt
//! is recorded in the outcome.

use crate::error::{EvalError, Result};
use crate::llm::{LlmClient, Message, Prompts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result keys that may carry the score, in priority order.
pub const SCORE_KEYS: &[&str] = &["retrieval", "gpt_retrieval"];

/// Result keys that may carry the rationale, in priority order.
pub const REASON_KEYS: &[&str] = &["retrieval_reason", "gpt_retrieval_reason"];

/// Upper bound of the judge's scale.
pub const MAX_SCORE: f64 = 5.0;

/// Conversation-shaped judge input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub context: String,
}

impl Conversation {
    /// One user turn asking `query`, grounded on `context`.
    pub fn single_turn(query: &str, context: &str) -> Self {
        Self {
            messages: vec![Message::user(query)],
            context: context.to_string(),
        }
    }
}

/// A judge that can be called in either convention.
#[allow(async_fn_in_trait)]
pub trait JudgeBackend {
    /// Score `context` for `query`.
    async fn evaluate(&self, query: &str, context: &str) -> Result<Map<String, Value>>;

    /// Score the conversation's context for its last user turn.
    async fn evaluate_conversation(&self, conversation: &Conversation) -> Result<Map<String, Value>>;
}

/// Calling convention used for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStrategy {
    Direct,
    Conversation,
}

/// One call made to the judge.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeAttempt {
    pub strategy: CallStrategy,
    /// Error message if the call failed.
    pub error: Option<String>,
}

impl JudgeAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What the judge said about one query.
#[derive(Debug, Clone, Default)]
pub struct JudgeOutcome {
    /// Score in [0, 5], absent when the judge failed or gave none.
    pub score: Option<f64>,
    pub reason: Option<String>,
    pub attempts: Vec<JudgeAttempt>,
}

impl JudgeOutcome {
    /// Whether any attempt succeeded.
    pub fn succeeded(&self) -> bool {
        self.attempts.iter().any(JudgeAttempt::succeeded)
    }
}

/// Run the direct call, falling back to the conversation form once.
pub async fn invoke_judge<J: JudgeBackend>(judge: &J, query: &str, context: &str) -> JudgeOutcome {
    let mut outcome = JudgeOutcome::default();

    let result = match judge.evaluate(query, context).await {
        Ok(result) => {
            outcome.attempts.push(JudgeAttempt {
                strategy: CallStrategy::Direct,
                error: None,
            });
            Some(result)
        }
        Err(e) => {
            log::warn!("Direct judge call failed ({}). Trying conversation format...", e);
            outcome.attempts.push(JudgeAttempt {
                strategy: CallStrategy::Direct,
                error: Some(e.to_string()),
            });

            let conversation = Conversation::single_turn(query, context);
            match judge.evaluate_conversation(&conversation).await {
                Ok(result) => {
                    outcome.attempts.push(JudgeAttempt {
                        strategy: CallStrategy::Conversation,
                        error: None,
                    });
                    Some(result)
                }
                Err(e) => {
                    log::warn!("Conversation judge call failed: {}", e);
                    outcome.attempts.push(JudgeAttempt {
                        strategy: CallStrategy::Conversation,
                        error: Some(e.to_string()),
                    });
                    None
                }
            }
        }
    };

    if let Some(result) = result {
        outcome.score = extract_score(&result);
        outcome.reason = extract_reason(&result);
        if outcome.score.is_none() {
            log::warn!("Score is None. Raw result: {}", Value::Object(result));
        }
    }

    outcome
}

/// First present score key, as a number in [0, 5].
pub fn extract_score(result: &Map<String, Value>) -> Option<f64> {
    let value = first_present(result, SCORE_KEYS)?;

    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match score {
        Some(s) if s.is_finite() && (0.0..=MAX_SCORE).contains(&s) => Some(s),
        _ => {
            log::warn!("Ignoring judge score outside 0-{}: {}", MAX_SCORE, value);
            None
        }
    }
}

/// First present reason key, as text.
pub fn extract_reason(result: &Map<String, Value>) -> Option<String> {
    first_present(result, REASON_KEYS).map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn first_present<'a>(result: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| result.get(*key))
        .find(|value| !value.is_null())
}

/// Retrieval judge backed by an Azure OpenAI chat deployment.
pub struct RetrievalJudge {
    client: LlmClient,
}

impl RetrievalJudge {
    /// Create a new judge with the given LLM client.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// Parse the judge's reply into a result mapping.
    fn parse_response(response: &str) -> Result<Map<String, Value>> {
        let json_str = Self::extract_json(response);

        let value: Value = serde_json::from_str(&json_str).map_err(|e| {
            EvalError::LlmParse(format!(
                "Failed to parse judge response: {}. Response: {}",
                e, response
            ))
        })?;

        match value {
            Value::Object(map) => Ok(map),
            other => Err(EvalError::LlmParse(format!(
                "Judge response is not a JSON object: {}",
                other
            ))),
        }
    }

    /// Extract JSON from response.
    fn extract_json(response: &str) -> String {
        let response = response.trim();

        if response.starts_with("```") {
            if let Some(end) = response.rfind("```") {
                let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
                if end > start {
                    return response[start..end].trim().to_string();
                }
            }
        }

        if let Some(start) = response.find('{') {
            if let Some(end) = response.rfind('}') {
                if end > start {
                    return response[start..=end].to_string();
                }
            }
        }

        response.to_string()
    }
}

impl JudgeBackend for RetrievalJudge {
    async fn evaluate(&self, query: &str, context: &str) -> Result<Map<String, Value>> {
        let prompt = Prompts::retrieval_direct(query, context);
        let response = self
            .client
            .complete(Some(Prompts::retrieval_system()), &prompt)
            .await?;
        Self::parse_response(&response)
    }

    async fn evaluate_conversation(&self, conversation: &Conversation) -> Result<Map<String, Value>> {
        let mut messages = vec![
            Message::system(Prompts::retrieval_system()),
            Message::system(Prompts::retrieval_conversation_context(&conversation.context)),
        ];
        messages.extend(conversation.messages.iter().cloned());
        messages.push(Message::user(Prompts::retrieval_conversation_instruction()));

        let response = self.client.chat(messages).await?;
        Self::parse_response(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    /// Judge with scripted results for each convention.
    struct ScriptedJudge {
        direct: Option<Value>,
        conversation: Option<Value>,
        direct_calls: Cell<usize>,
        conversation_calls: Cell<usize>,
    }

    impl ScriptedJudge {
        fn new(direct: Option<Value>, conversation: Option<Value>) -> Self {
            Self {
                direct,
                conversation,
                direct_calls: Cell::new(0),
                conversation_calls: Cell::new(0),
            }
        }
    }

    impl JudgeBackend for ScriptedJudge {
        async fn evaluate(&self, _query: &str, _context: &str) -> Result<Map<String, Value>> {
            self.direct_calls.set(self.direct_calls.get() + 1);
            self.direct
                .clone()
                .map(map)
                .ok_or_else(|| EvalError::LlmApi("direct rejected".to_string()))
        }

        async fn evaluate_conversation(&self, conversation: &Conversation) -> Result<Map<String, Value>> {
            self.conversation_calls.set(self.conversation_calls.get() + 1);
            assert_eq!(conversation.messages.len(), 1);
            self.conversation
                .clone()
                .map(map)
                .ok_or_else(|| EvalError::LlmApi("conversation rejected".to_string()))
        }
    }

    #[test]
    fn test_direct_success_skips_fallback() {
        let judge = ScriptedJudge::new(Some(json!({"retrieval": 4, "retrieval_reason": "good"})), None);
        let outcome = tokio_test::block_on(invoke_judge(&judge, "q", "ctx"));

        assert_eq!(outcome.score, Some(4.0));
        assert_eq!(outcome.reason.as_deref(), Some("good"));
        assert_eq!(judge.conversation_calls.get(), 0);
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.attempts[0].succeeded());
    }

    #[test]
    fn test_fallback_attempted_exactly_once() {
        let judge = ScriptedJudge::new(None, Some(json!({"gpt_retrieval": 3.0})));
        let outcome = tokio_test::block_on(invoke_judge(&judge, "q", "ctx"));

        assert_eq!(judge.direct_calls.get(), 1);
        assert_eq!(judge.conversation_calls.get(), 1);
        assert_eq!(outcome.score, Some(3.0));
        assert_eq!(
            outcome.attempts.iter().map(|a| (a.strategy, a.succeeded())).collect::<Vec<_>>(),
            vec![(CallStrategy::Direct, false), (CallStrategy::Conversation, true)]
        );
    }

    #[test]
    fn test_both_fail_gives_absent_score() {
        let judge = ScriptedJudge::new(None, None);
        let outcome = tokio_test::block_on(invoke_judge(&judge, "q", "ctx"));

        assert_eq!(judge.conversation_calls.get(), 1);
        assert!(outcome.score.is_none());
        assert!(outcome.reason.is_none());
        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn test_score_key_priority() {
        let result = map(json!({"gpt_retrieval": 2, "retrieval": 5}));
        assert_eq!(extract_score(&result), Some(5.0));

        let result = map(json!({"retrieval": null, "gpt_retrieval": 2}));
        assert_eq!(extract_score(&result), Some(2.0));

        let result = map(json!({"retrieval": 0}));
        assert_eq!(extract_score(&result), Some(0.0));
    }

    #[test]
    fn test_score_accepts_numeric_string() {
        assert_eq!(extract_score(&map(json!({"retrieval": "4.5"}))), Some(4.5));
    }

    #[test]
    fn test_out_of_range_score_is_absent() {
        assert_eq!(extract_score(&map(json!({"retrieval": 7}))), None);
        assert_eq!(extract_score(&map(json!({"retrieval": -1}))), None);
        assert_eq!(extract_score(&map(json!({"retrieval": "high"}))), None);
        assert_eq!(extract_score(&map(json!({}))), None);
    }

    #[test]
    fn test_reason_key_priority() {
        let result = map(json!({"gpt_retrieval_reason": "b", "retrieval_reason": "a"}));
        assert_eq!(extract_reason(&result).as_deref(), Some("a"));

        let result = map(json!({"gpt_retrieval_reason": "b"}));
        assert_eq!(extract_reason(&result).as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_response_with_code_fence() {
        let response = "```json\n{\"retrieval\": 4, \"retrieval_reason\": \"ok\"}\n```";
        let result = RetrievalJudge::parse_response(response).unwrap();
        assert_eq!(result["retrieval"], 4);
    }

    #[test]
    fn test_parse_response_rejects_non_object() {
        assert!(RetrievalJudge::parse_response("[1, 2]").is_err());
        assert!(RetrievalJudge::parse_response("no json here").is_err());
    }
}
