//! OpenAI-compatible `/chat/completions` client.
//!
//! Any endpoint speaking the chat-completions wire format works through
//! `LLM_BASE_URL`. The system instruction goes in as the leading `system`
//! message.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::config::LlmTimeouts;
use super::types::{Generation, GenerationRequest, LlmError};

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the reqwest client cannot be built.
    pub fn new(base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: GenerationRequest<'_>,
    ) -> Result<Generation, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_request(model, request);

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }

        parse_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<CcMessage<'a>>,
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn build_request<'a>(model: &'a str, request: GenerationRequest<'a>) -> CcRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !request.system.trim().is_empty() {
        messages.push(CcMessage { role: "system", content: request.system });
    }
    messages.push(CcMessage { role: "user", content: request.prompt });
    CcRequest { model, temperature: request.temperature, messages }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

fn parse_response(json_text: &str) -> Result<Generation, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let usage = root.get("usage");
    let input_tokens = usage
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let output_tokens = usage
        .and_then(|u| u.get("completion_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };

    let text = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    Ok(Generation { text, model, input_tokens, output_tokens })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
