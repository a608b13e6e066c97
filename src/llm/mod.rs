//! LLM — provider adapter behind the chat consultant.
//!
//! DESIGN
//! ======
//! `LlmClient` dispatches to Gemini (default) or an OpenAI-compatible
//! endpoint based on [`LlmConfig::provider`]. The API key is optional at
//! construction: a client without one still builds, and every call fails
//! with [`LlmError::MissingApiKey`] so the site can run without the chat
//! credential.

pub mod config;
pub mod gemini;
pub mod openai;
pub mod types;

use config::{LlmConfig, LlmProviderKind};
pub use types::LlmGenerate;
use types::{Generation, GenerationRequest, LlmError};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to either Gemini or `OpenAI`.
pub struct LlmClient {
    inner: LlmProvider,
    api_key: Option<String>,
    api_key_env: String,
    model: String,
}

enum LlmProvider {
    Gemini(gemini::GeminiClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = match config.provider {
            LlmProviderKind::Gemini => {
                LlmProvider::Gemini(gemini::GeminiClient::new(config.base_url, config.timeouts)?)
            }
            LlmProviderKind::OpenAi => {
                LlmProvider::OpenAi(openai::OpenAiClient::new(config.base_url, config.timeouts)?)
            }
        };
        Ok(Self { inner, api_key: config.api_key, api_key_env: config.api_key_env, model: config.model })
    }

    /// Return the configured model name (e.g. `"gemini-2.5-flash"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key was resolved at startup.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait::async_trait]
impl LlmGenerate for LlmClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, LlmError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(LlmError::MissingApiKey { var: self.api_key_env.clone() });
        };
        match &self.inner {
            LlmProvider::Gemini(c) => c.generate(api_key, &self.model, request).await,
            LlmProvider::OpenAi(c) => c.generate(api_key, &self.model, request).await,
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
