//! LLM prompts for the retrieval judge.

/// Collection of prompts used to score retrieved context.
pub struct Prompts;

impl Prompts {
    /// System prompt shared by both calling conventions.
    pub fn retrieval_system() -> &'static str {
        r#"You are an expert in evaluating the quality of a list of CONTEXT chunks retrieved from a search index for a given QUERY.

Rate how relevant and useful the CONTEXT is for answering the QUERY on a scale from 0 to 5:
- 5: the context contains all information needed to fully answer the query, with the most relevant chunks first
- 4: the context is relevant and mostly sufficient, with minor gaps or ordering issues
- 3: the context is partially relevant; some needed information is missing
- 2: the context is mostly irrelevant, with only small useful fragments
- 1: the context is irrelevant but on a related topic
- 0: the context is empty or entirely unrelated

Respond in JSON format:
{
    "retrieval": <0-5>,
    "retrieval_reason": "<brief explanation>"
}

Respond with only the JSON, no other text."#
    }

    /// Single user message for the direct query + context form.
    pub fn retrieval_direct(query: &str, context: &str) -> String {
        format!(
            r#"QUERY:
{}

CONTEXT:
{}

Evaluate the CONTEXT for the QUERY."#,
            query, context
        )
    }

    /// Context message that precedes the conversation in the conversation form.
    pub fn retrieval_conversation_context(context: &str) -> String {
        format!(
            r#"The following CONTEXT was retrieved for the user's last question:

{}"#,
            context
        )
    }

    /// Closing instruction appended after the conversation turns.
    pub fn retrieval_conversation_instruction() -> &'static str {
        "Evaluate the CONTEXT above for the user's last question in this conversation."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_are_not_empty() {
        assert!(!Prompts::retrieval_system().is_empty());
        assert!(!Prompts::retrieval_conversation_instruction().is_empty());
    }

    #[test]
    fn test_direct_prompt_contains_inputs() {
        let prompt = Prompts::retrieval_direct("what is X?", "X is a thing.");
        assert!(prompt.contains("what is X?"));
        assert!(prompt.contains("X is a thing."));
    }

    #[test]
    fn test_system_prompt_names_output_keys() {
        let prompt = Prompts::retrieval_system();
        assert!(prompt.contains("\"retrieval\""));
        assert!(prompt.contains("\"retrieval_reason\""));
    }
}
