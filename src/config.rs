//! Site configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Everything the controllers need is resolved once at startup into
//! [`SiteConfig`] and handed to each controller at construction. Parsing
//! goes through a key lookup closure so tests can feed a map instead of the
//! process environment.

use std::time::Duration;

use reqwest::Url;

use crate::llm::config::LlmConfig;
use crate::llm::types::LlmError;

pub const DEFAULT_LEAD_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LEAD_MAX_ATTEMPTS: u32 = 1;
pub const DEFAULT_LEAD_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_LEAD_SIMULATED_DELAY_MS: u64 = 1500;
pub const DEFAULT_CHAT_REPLY_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid LEAD_WEBHOOK_URL '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },
    #[error("unknown CHAT_FAILURE_POLICY: {0} (expected 'silent' or 'notice')")]
    UnknownFailurePolicy(String),
    #[error("{var} must be at least 1 second")]
    ZeroTimeout { var: &'static str },
    #[error("LEAD_SIMULATED_DELAY_MS ({delay:?}) must be shorter than LEAD_REQUEST_TIMEOUT_SECS ({timeout:?})")]
    SimulatedDelayExceedsTimeout { delay: Duration, timeout: Duration },
    #[error(transparent)]
    Llm(#[from] LlmError),
}

// =============================================================================
// TYPES
// =============================================================================

/// Bounded retry applied around each lead submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; never below 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// One attempt, no retry.
    #[must_use]
    pub fn single() -> Self {
        Self { max_attempts: 1, backoff: Duration::ZERO }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_LEAD_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_LEAD_RETRY_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadConfig {
    /// `None` selects the simulated submission path.
    pub webhook_url: Option<Url>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub simulated_delay: Duration,
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            request_timeout: Duration::from_secs(DEFAULT_LEAD_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            simulated_delay: Duration::from_millis(DEFAULT_LEAD_SIMULATED_DELAY_MS),
        }
    }
}

/// What the transcript shows when a generation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatFailurePolicy {
    /// Log only; the transcript is left untouched.
    #[default]
    Silent,
    /// Log and append a generic technical-error reply.
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatConfig {
    pub temperature: f32,
    pub reply_timeout: Duration,
    pub failure_policy: ChatFailurePolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: crate::llm::config::DEFAULT_TEMPERATURE,
            reply_timeout: Duration::from_secs(DEFAULT_CHAT_REPLY_TIMEOUT_SECS),
            failure_policy: ChatFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub lead: LeadConfig,
    pub chat: ChatConfig,
    pub llm: LlmConfig,
}

impl SiteConfig {
    /// Build the full site config from environment variables.
    ///
    /// Lead form (all optional):
    /// - `LEAD_WEBHOOK_URL`: absent or blank selects the simulated path
    /// - `LEAD_REQUEST_TIMEOUT_SECS`: default 15
    /// - `LEAD_MAX_ATTEMPTS`: default 1
    /// - `LEAD_RETRY_BACKOFF_MS`: default 500
    /// - `LEAD_SIMULATED_DELAY_MS`: default 1500
    ///
    /// Chat (all optional):
    /// - `CHAT_FAILURE_POLICY`: `silent` (default) or `notice`
    /// - `CHAT_REPLY_TIMEOUT_SECS`: default 60
    ///
    /// LLM variables are documented on [`LlmConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a malformed webhook URL, a zero timeout,
    /// a simulated delay that would not fit in the lead timeout, an unknown
    /// failure policy or invalid LLM settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SiteConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`SiteConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let llm = LlmConfig::from_lookup(&lookup)?;
        let lead = parse_lead(&lookup)?;
        let chat = ChatConfig {
            temperature: llm.temperature,
            reply_timeout: parse_timeout_secs(&lookup, "CHAT_REPLY_TIMEOUT_SECS", DEFAULT_CHAT_REPLY_TIMEOUT_SECS)?,
            failure_policy: parse_failure_policy(lookup("CHAT_FAILURE_POLICY").as_deref())?,
        };
        Ok(Self { lead, chat, llm })
    }
}

fn parse_lead(lookup: &impl Fn(&str) -> Option<String>) -> Result<LeadConfig, ConfigError> {
    let webhook_url = match lookup("LEAD_WEBHOOK_URL").filter(|v| !v.trim().is_empty()) {
        None => None,
        Some(raw) => {
            let url = Url::parse(raw.trim())
                .map_err(|e| ConfigError::InvalidWebhookUrl { url: raw.clone(), reason: e.to_string() })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidWebhookUrl {
                    url: raw,
                    reason: "scheme must be http or https".into(),
                });
            }
            Some(url)
        }
    };

    let max_attempts = parse_or(lookup("LEAD_MAX_ATTEMPTS"), DEFAULT_LEAD_MAX_ATTEMPTS).max(1);
    let request_timeout = parse_timeout_secs(lookup, "LEAD_REQUEST_TIMEOUT_SECS", DEFAULT_LEAD_REQUEST_TIMEOUT_SECS)?;
    let simulated_delay =
        Duration::from_millis(parse_or(lookup("LEAD_SIMULATED_DELAY_MS"), DEFAULT_LEAD_SIMULATED_DELAY_MS));

    // The simulated transport runs under the same per-attempt timeout.
    if webhook_url.is_none() && simulated_delay >= request_timeout {
        return Err(ConfigError::SimulatedDelayExceedsTimeout { delay: simulated_delay, timeout: request_timeout });
    }

    Ok(LeadConfig {
        webhook_url,
        request_timeout,
        retry: RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(parse_or(lookup("LEAD_RETRY_BACKOFF_MS"), DEFAULT_LEAD_RETRY_BACKOFF_MS)),
        },
        simulated_delay,
    })
}

fn parse_timeout_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match parse_or(lookup(var), default) {
        0 => Err(ConfigError::ZeroTimeout { var }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_failure_policy(raw: Option<&str>) -> Result<ChatFailurePolicy, ConfigError> {
    match raw.unwrap_or("silent") {
        "silent" => Ok(ChatFailurePolicy::Silent),
        "notice" => Ok(ChatFailurePolicy::Notice),
        other => Err(ConfigError::UnknownFailurePolicy(other.to_string())),
    }
}

/// Parse an optional raw value, falling back to `default` when absent or malformed.
pub(crate) fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
