//! Anthropic Claude generator

use super::types::{Generation, GenerationRequest, TurnRole, Usage};
use super::{GenerationError, Generator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MAX_TOKENS: u32 = 200;
/// Stands in for the student when the dialogue opens with a tutor line
const SESSION_START: &str = "[session start]";

/// Anthropic model variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnthropicModel {
    #[default]
    Claude35Haiku,
    Claude4Sonnet,
}

impl AnthropicModel {
    pub fn api_name(self) -> &'static str {
        match self {
            AnthropicModel::Claude35Haiku => "claude-3-5-haiku-20241022",
            AnthropicModel::Claude4Sonnet => "claude-sonnet-4-20250514",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            AnthropicModel::Claude35Haiku => "claude-3.5-haiku",
            AnthropicModel::Claude4Sonnet => "claude-4-sonnet",
        }
    }

    /// Look up a model by short id or API name
    pub fn from_id(id: &str) -> Option<Self> {
        [AnthropicModel::Claude35Haiku, AnthropicModel::Claude4Sonnet]
            .into_iter()
            .find(|m| m.model_id() == id || m.api_name() == id)
    }
}

/// Anthropic generator implementation
pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    model: AnthropicModel,
    base_url: String,
}

impl AnthropicGenerator {
    pub fn new(
        api_key: String,
        model: AnthropicModel,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: API_URL.to_string(),
        })
    }

    fn translate_request(&self, request: &GenerationRequest) -> AnthropicRequest {
        let mut messages: Vec<AnthropicMessage> = Vec::new();
        let turns = request
            .prior_turns
            .iter()
            .map(|t| (t.role, t.text.as_str()))
            .chain(std::iter::once((TurnRole::Student, request.directive.as_str())));

        for (role, text) in turns {
            let role = match role {
                TurnRole::Student => "user",
                TurnRole::Tutor => "assistant",
            };
            if messages.is_empty() && role == "assistant" {
                messages.push(AnthropicMessage::text("user", SESSION_START));
            }
            // The API requires alternating roles; merge consecutive lines
            match messages.last_mut() {
                Some(last) if last.role == role => {
                    if let Some(AnthropicContentBlock::Text { text: existing }) =
                        last.content.last_mut()
                    {
                        existing.push_str("\n\n");
                        existing.push_str(text);
                    }
                }
                _ => messages.push(AnthropicMessage::text(role, text)),
            }
        }

        AnthropicRequest {
            model: self.model.api_name().to_string(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: vec![AnthropicSystemBlock {
                r#type: "text".to_string(),
                text: request.system.clone(),
            }],
            messages,
        }
    }

    fn normalize_response(resp: AnthropicResponse) -> Result<Generation, GenerationError> {
        let text = resp
            .content
            .into_iter()
            .map(|AnthropicContentBlock::Text { text }| text)
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::malformed(format!(
                "Empty reply (stop_reason: {})",
                resp.stop_reason.as_deref().unwrap_or("none")
            )));
        }

        Ok(Generation {
            text: text.to_string(),
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
        })
    }

    pub(super) fn normalize_body(body: &str) -> Result<Generation, GenerationError> {
        let response: AnthropicResponse = serde_json::from_str(body).map_err(|e| {
            GenerationError::malformed(format!("Failed to parse response: {e} - body: {body}"))
        })?;
        Self::normalize_response(response)
    }

    #[cfg(test)]
    pub(super) fn translated_json(&self, request: &GenerationRequest) -> serde_json::Value {
        serde_json::to_value(self.translate_request(request)).unwrap()
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> GenerationError {
        match status.as_u16() {
            401 | 403 => GenerationError::auth(format!("Authentication failed: {body}")),
            429 => {
                let mut err = GenerationError::rate_limit(format!("Rate limited: {body}"));
                if let Some(retry_after) = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|parsed| parsed.get("error")?.get("retry_after")?.as_f64())
                {
                    err = err.with_retry_after(Duration::from_secs_f64(retry_after));
                }
                err
            }
            400 => GenerationError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => GenerationError::server_error(format!("Server error: {body}")),
            _ => GenerationError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    GenerationError::network(format!("Connection failed: {e}"))
                } else {
                    GenerationError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        Self::normalize_body(&body)
    }

    fn model_id(&self) -> &str {
        self.model.model_id()
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: Vec<AnthropicSystemBlock>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    r#type: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

impl AnthropicMessage {
    fn text(role: &'static str, text: &str) -> Self {
        Self {
            role,
            content: vec![AnthropicContentBlock::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
