//! Gemini API client for text completions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chatbot::prompt::{PromptMessage, PromptRole};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

/// Failure talking to the completion API.
#[derive(Debug)]
pub enum ProviderError {
    Http(String),
    Api(String),
    Parse(String),
    Blocked(String),
    Empty,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Http(e) => write!(f, "HTTP error: {e}"),
            ProviderError::Api(e) => write!(f, "API error: {e}"),
            ProviderError::Parse(e) => write!(f, "Parse error: {e}"),
            ProviderError::Blocked(reason) => write!(f, "Prompt blocked: {reason}"),
            ProviderError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for ProviderError {}

fn build_request(messages: &[PromptMessage]) -> GenerateRequest {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        let part = Part {
            text: message.content.clone(),
        };
        match message.role {
            PromptRole::System => system.push(part),
            PromptRole::User => contents.push(Content {
                role: Some("user"),
                parts: vec![part],
            }),
            PromptRole::Assistant => contents.push(Content {
                role: Some("model"),
                parts: vec![part],
            }),
        }
    }

    GenerateRequest {
        system_instruction: (!system.is_empty()).then_some(Content {
            role: None,
            parts: system,
        }),
        contents,
    }
}

fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(ProviderError::Api(error.message));
    }

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Blocked(reason));
    }

    let content = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .ok_or(ProviderError::Empty)?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

    if text.trim().is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(text)
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { api_key, model, client })
    }

    /// Send one non-streaming completion request and return the reply text.
    pub async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError> {
        let request = build_request(messages);
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(format!("failed to read response: {e}")))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(ProviderError::Api(format!("{status}: {body}")));
        }

        extract_text(&body)
    }
}
