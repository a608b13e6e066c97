//! Lead delivery — webhook POST or the simulated fallback.
//!
//! DESIGN
//! ======
//! [`LeadTransport`] is the seam the form controller calls once per attempt.
//! [`transport_from_config`] picks the real [`WebhookClient`] whenever a URL
//! is configured; [`SimulatedTransport`] is only reachable without one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::info;

use super::LeadFields;
use crate::config::LeadConfig;

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("webhook request failed: {0}")]
    Request(String),
    #[error("webhook returned status {status}")]
    Status { status: u16 },
    #[error("webhook timed out after {after:?}")]
    Timeout { after: Duration },
}

impl LeadError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout { .. } | Self::Status { status: 429 | 500..=599 })
    }
}

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// Delivers one lead. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LeadTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`LeadError`] on transport failure or a non-success status.
    async fn deliver(&self, lead: &LeadFields) -> Result<(), LeadError>;
}

/// Build the transport the config asks for.
///
/// # Errors
///
/// Returns [`LeadError::HttpClientBuild`] if the webhook HTTP client fails to build.
pub fn transport_from_config(config: &LeadConfig) -> Result<Arc<dyn LeadTransport>, LeadError> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookClient::new(url.clone())?)),
        None => Ok(Arc::new(SimulatedTransport::new(config.simulated_delay))),
    }
}

// =============================================================================
// WEBHOOK CLIENT
// =============================================================================

pub struct WebhookClient {
    http: reqwest::Client,
    url: Url,
}

impl WebhookClient {
    /// # Errors
    ///
    /// Returns [`LeadError::HttpClientBuild`] if the reqwest client cannot be built.
    pub fn new(url: Url) -> Result<Self, LeadError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl LeadTransport for WebhookClient {
    async fn deliver(&self, lead: &LeadFields) -> Result<(), LeadError> {
        // `.json` sets `Content-Type: application/json`.
        let response = self
            .http
            .post(self.url.clone())
            .json(lead)
            .send()
            .await
            .map_err(|e| LeadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadError::Status { status: status.as_u16() });
        }
        Ok(())
    }
}

// =============================================================================
// SIMULATED TRANSPORT
// =============================================================================

/// Stand-in used when no webhook is configured: waits, then succeeds.
pub struct SimulatedTransport {
    delay: Duration,
}

impl SimulatedTransport {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl LeadTransport for SimulatedTransport {
    async fn deliver(&self, lead: &LeadFields) -> Result<(), LeadError> {
        info!(service = %lead.service, delay = ?self.delay, "no webhook configured; simulating lead delivery");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "webhook_test.rs"]
mod tests;
