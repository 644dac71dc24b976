//! HTTP adapter for the external chat-completion endpoint.
//!
//! Wire format: `POST {messages: [{role, content}...]}`, answered with
//! `{choices: [{message: {content}} | {content} | {text}]}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::CompletionError;
use super::types::*;

// =============================================================================
// TRAIT
// =============================================================================

/// Trait for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, CompletionError>;
}

// =============================================================================
// CLIENT
// =============================================================================

/// Reply used when the endpoint answers 2xx but no choice carries any text.
pub const UNREADABLE_REPLY: &str = "Sorry, I couldn't understand that.";

/// Maximum allowed response body length (1MB).
const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

/// Maximum allowed input characters across all messages.
const MAX_INPUT_CHARS: usize = 500_000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for a `/api/chat`-style completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: Option<String>,
    timeout: Duration,
}

impl CompletionClient {
    /// Create for an endpoint URL with default settings.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CompletionError> {
        Self::with_config(endpoint, DEFAULT_TIMEOUT, None, None)
    }

    /// Create from environment variables.
    ///
    /// `SURVEY_CHAT_URL` is required; `SURVEY_CHAT_API_KEY`, `SURVEY_CHAT_MODEL` and
    /// `SURVEY_CHAT_TIMEOUT_SECONDS` are optional.
    pub fn from_env() -> Result<Self, CompletionError> {
        let endpoint = std::env::var("SURVEY_CHAT_URL")
            .map_err(|_| CompletionError::config("SURVEY_CHAT_URL not set"))?;

        let timeout = std::env::var("SURVEY_CHAT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let api_key = std::env::var("SURVEY_CHAT_API_KEY").ok();
        let model = std::env::var("SURVEY_CHAT_MODEL").ok();

        Self::with_config(endpoint, timeout, api_key, model)
    }

    /// Create with custom configuration.
    pub fn with_config(
        endpoint: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self, CompletionError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(CompletionError::config("empty completion endpoint"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            let auth_value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| CompletionError::config("Invalid API key format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| CompletionError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            model,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Extract request ID from response headers.
    fn extract_request_id(headers: &HeaderMap) -> Option<String> {
        headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    fn map_send_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Http(e)
        }
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct CompletionApiRequest<'a> {
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionApiResponse {
    choices: Option<Vec<ApiChoice>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: Option<ChoiceMessage>,
    content: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ApiChoice {
    /// `message.content`, then `content`, then `text`; first non-blank wins.
    fn into_text(self) -> Option<String> {
        [self.message.and_then(|m| m.content), self.content, self.text]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
    }
}

/// Pull a readable message out of `{"error": "..."}` or `{"error": {"message": "..."}}`.
fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

/// Read assistant text from a completion response body.
pub(crate) fn parse_reply(body: &str) -> Result<String, CompletionError> {
    let parsed: CompletionApiResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::invalid_response(format!("Invalid JSON: {e}")))?;

    if let Some(error) = parsed.error.filter(|e| !e.is_null()) {
        return Err(CompletionError::invalid_response(error_message(&error)));
    }

    let text = parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(ApiChoice::into_text);

    Ok(text.unwrap_or_else(|| UNREADABLE_REPLY.to_string()))
}

// =============================================================================
// CHAT PROVIDER IMPL
// =============================================================================

#[async_trait]
impl ChatProvider for CompletionClient {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        let total_chars: usize = req.messages.iter().map(|m| m.content.len()).sum();
        if total_chars > MAX_INPUT_CHARS {
            return Err(CompletionError::invalid_request(format!(
                "Input too large: {total_chars} chars (max {MAX_INPUT_CHARS})"
            )));
        }

        let start = Instant::now();

        let api_req = CompletionApiRequest {
            messages: &req.messages,
            model: req.model.as_deref().or(self.model.as_deref()),
            temperature: req.temperature,
        };

        let mut response = self
            .client
            .post(&self.endpoint)
            .json(&api_req)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let request_id = Self::extract_request_id(response.headers());

        // Stream response to enforce size limit
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_send_error(e))? {
            let new_len = bytes.len() + chunk.len();
            if new_len > MAX_RESPONSE_LEN {
                return Err(CompletionError::invalid_response(format!(
                    "Response too large: {new_len} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&bytes).to_string();

        if !status.is_success() {
            let message = serde_json::from_str::<CompletionApiResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .map(|e| error_message(&e))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(CompletionError::status(status.as_u16(), message, request_id));
        }

        let content = parse_reply(&body)?;

        Ok(ChatResponse {
            content,
            latency: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reply_prefers_message_content() {
        let body = r#"{"choices": [{"message": {"content": "  hi  "}, "text": "nope"}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "hi");
    }

    #[test]
    fn parse_reply_falls_back_to_content_then_text() {
        let body = r#"{"choices": [{"message": {"content": "  "}, "content": "from content"}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "from content");

        let body = r#"{"choices": [{"text": "from text"}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "from text");
    }

    #[test]
    fn parse_reply_uses_apology_when_empty() {
        assert_eq!(parse_reply(r#"{"choices": []}"#).unwrap(), UNREADABLE_REPLY);
        assert_eq!(parse_reply("{}").unwrap(), UNREADABLE_REPLY);
    }

    #[test]
    fn parse_reply_surfaces_error_field() {
        let err = parse_reply(r#"{"error": {"message": "bad token"}}"#).unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(m) if m == "bad token"));
    }
}
