//! Builds the message list sent to the model.
//!
//! A reply is kept short unless the user asks for depth. Detection is a plain
//! case-insensitive phrase match, so "don't explain in detail" still counts as
//! a request for detail and "elaborate please" does not. Both misses are
//! accepted: the worst outcome is a longer or shorter answer than wanted.

use std::fmt;

/// Phrases that switch to detailed mode, checked in this order.
const DETAIL_PHRASES: &[&str] = &[
    "explain in detail",
    "in detail",
    "deep explanation",
    "detailed explanation",
    "long answer",
    "full explanation",
    "in depth",
    "step by step",
];

const CONCISE_INSTRUCTION: &str =
    "Answer concisely in no more than 6 sentences. Skip preamble and do not repeat the question.";

const DETAILED_INSTRUCTION: &str =
    "The user asked for a detailed answer. Answer in depth, with structure and examples where useful.";

/// Requested reply length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Concise,
    Detailed,
}

/// Role of a prompt entry. `System` never comes from a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

/// A validated inbound message together with its detected mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub user_text: String,
    pub response_mode: ResponseMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Text was empty or whitespace only.
    InvalidInput,
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::InvalidInput => write!(f, "message text is empty"),
        }
    }
}

impl std::error::Error for PromptError {}

/// Return the first pattern contained in `text`, ignoring case.
pub fn match_phrase(text: &str, patterns: &[&'static str]) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    patterns.iter().copied().find(|p| lowered.contains(p))
}

pub fn detect_mode(text: &str) -> ResponseMode {
    match match_phrase(text, DETAIL_PHRASES) {
        Some(_) => ResponseMode::Detailed,
        None => ResponseMode::Concise,
    }
}

impl ChatRequest {
    /// Trim and classify `raw`. Fails on blank input.
    pub fn new(raw: &str) -> Result<Self, PromptError> {
        let user_text = raw.trim();
        if user_text.is_empty() {
            return Err(PromptError::InvalidInput);
        }
        Ok(Self {
            user_text: user_text.to_string(),
            response_mode: detect_mode(user_text),
        })
    }

    pub fn messages(&self) -> Vec<PromptMessage> {
        let instruction = match self.response_mode {
            ResponseMode::Concise => CONCISE_INSTRUCTION,
            ResponseMode::Detailed => DETAILED_INSTRUCTION,
        };
        vec![
            PromptMessage {
                role: PromptRole::System,
                content: instruction.to_string(),
            },
            PromptMessage {
                role: PromptRole::User,
                content: self.user_text.clone(),
            },
        ]
    }
}

/// Compose the prompt for a single user message.
pub fn compose(user_text: &str) -> Result<Vec<PromptMessage>, PromptError> {
    ChatRequest::new(user_text).map(|req| req.messages())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_phrase_selects_detailed() {
        assert_eq!(detect_mode("explain in detail how TCP works"), ResponseMode::Detailed);
        assert_eq!(detect_mode("I want a long answer"), ResponseMode::Detailed);
        assert_eq!(detect_mode("give me the full explanation"), ResponseMode::Detailed);
        assert_eq!(detect_mode("deep explanation of monads"), ResponseMode::Detailed);
    }

    #[test]
    fn test_plain_question_is_concise() {
        assert_eq!(detect_mode("what is 2+2"), ResponseMode::Concise);
    }

    #[test]
    fn test_detection_ignores_case() {
        assert_eq!(detect_mode("EXPLAIN IN DETAIL please"), ResponseMode::Detailed);
        assert_eq!(detect_mode("Long Answer wanted"), ResponseMode::Detailed);
    }

    #[test]
    fn test_negated_phrase_still_matches() {
        // Accepted false positive of substring matching.
        assert_eq!(detect_mode("don't explain in detail"), ResponseMode::Detailed);
    }

    #[test]
    fn test_match_phrase_returns_first_in_order() {
        assert_eq!(
            match_phrase("explain in detail, long answer", DETAIL_PHRASES),
            Some("explain in detail")
        );
        assert_eq!(match_phrase("hello", DETAIL_PHRASES), None);
    }

    #[test]
    fn test_concise_prompt_limits_sentences() {
        let messages = compose("what is rust").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, PromptRole::System);
        assert!(messages[0].content.contains("6 sentences"));
        assert_eq!(messages[1].role, PromptRole::User);
        assert_eq!(messages[1].content, "what is rust");
    }

    #[test]
    fn test_detailed_prompt_has_no_limit() {
        let messages = compose("explain in detail what rust is").unwrap();
        assert!(!messages[0].content.contains("6 sentences"));
        assert!(messages[0].content.contains("in depth"));
    }

    #[test]
    fn test_user_text_is_last_and_trimmed() {
        let messages = compose("  hello there \n").unwrap();
        let last = messages.last().unwrap();
        assert_eq!(last.role, PromptRole::User);
        assert_eq!(last.content, "hello there");
    }

    #[test]
    fn test_blank_input_rejected() {
        assert_eq!(compose(""), Err(PromptError::InvalidInput));
        assert_eq!(compose("   \n\t"), Err(PromptError::InvalidInput));
    }
}
