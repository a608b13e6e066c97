//! LLM types — provider-neutral request/response types and errors.
//!
//! Shared by the Gemini and `OpenAI` clients. The chat controller only ever
//! sees [`Generation`] and [`LlmError`].


// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// No response arrived within the configured deadline.
    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// A single-turn generation request: one free-text prompt shaped by a fixed
/// system instruction.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
}

/// Response from a generation call.
///
/// `text` is `None` when the provider answered but carried no text (safety
/// block, empty candidate list, tool-only output).
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: Option<String>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Generation {
    /// Returns the reply text, treating whitespace-only output as absent.
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// =============================================================================
// LLM GENERATE TRAIT
// =============================================================================

/// Provider-neutral async trait for text generation. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmGenerate: Send + Sync {
    /// Send one generation request to the provider.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the API key is absent, the request fails,
    /// or the response is malformed.
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
