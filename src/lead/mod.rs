//! Lead form — field state and the submission lifecycle.
//!
//! DESIGN
//! ======
//! `LeadFormController` owns a [`FormState`] behind a short-held mutex and a
//! [`LeadTransport`]. A submit flips the status to `Submitting` under the
//! lock before the outbound call, so a second submit from anywhere sees the
//! flag and is refused. The lock is never held across an `.await`.
//!
//! ```text
//!   Idle ──submit──► Submitting ──ok──► Success ──dismiss──► Idle (reset)
//!    ▲                    │
//!    └──edit── Error ◄────┘ err / timeout
//!              └──submit (retry)──► Submitting
//! ```

pub mod webhook;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{LeadConfig, RetryPolicy};
use crate::site;
pub use webhook::{LeadError, LeadTransport};

// =============================================================================
// TYPES
// =============================================================================

/// One of the five form inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    Name,
    Email,
    Phone,
    Service,
    Message,
}

impl LeadField {
    pub const ALL: [Self; 5] = [Self::Name, Self::Email, Self::Phone, Self::Service, Self::Message];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Service => "service",
            Self::Message => "message",
        }
    }
}

/// The five form values. Serializes to exactly the webhook body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub message: String,
}

impl Default for LeadFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            service: site::default_service().id.to_string(),
            message: String::new(),
        }
    }
}

impl LeadFields {
    #[must_use]
    pub fn get(&self, field: LeadField) -> &str {
        match field {
            LeadField::Name => &self.name,
            LeadField::Email => &self.email,
            LeadField::Phone => &self.phone,
            LeadField::Service => &self.service,
            LeadField::Message => &self.message,
        }
    }

    fn slot(&mut self, field: LeadField) -> &mut String {
        match field {
            LeadField::Name => &mut self.name,
            LeadField::Email => &mut self.email,
            LeadField::Phone => &mut self.phone,
            LeadField::Service => &mut self.service,
            LeadField::Message => &mut self.message,
        }
    }

    /// First field (in form order) holding the empty string.
    #[must_use]
    pub fn first_missing(&self) -> Option<LeadField> {
        LeadField::ALL.into_iter().find(|f| self.get(*f).is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadStatus {
    #[default]
    Idle,
    Submitting,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormState {
    pub fields: LeadFields,
    pub status: LeadStatus,
}

/// Why a submit was turned away without any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    MissingField(LeadField),
    InFlight,
    AwaitingDismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    Error,
    Refused(Refusal),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct LeadFormController {
    state: Mutex<FormState>,
    transport: Arc<dyn LeadTransport>,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl LeadFormController {
    #[must_use]
    pub fn new(transport: Arc<dyn LeadTransport>, request_timeout: Duration, retry: RetryPolicy) -> Self {
        Self { state: Mutex::new(FormState::default()), transport, request_timeout, retry }
    }

    /// Build a controller with the transport selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::HttpClientBuild`] if the webhook client fails to build.
    pub fn from_config(config: &LeadConfig) -> Result<Self, LeadError> {
        let transport = webhook::transport_from_config(config)?;
        Ok(Self::new(transport, config.request_timeout, config.retry))
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> FormState {
        self.lock().clone()
    }

    #[must_use]
    pub fn status(&self) -> LeadStatus {
        self.lock().status
    }

    /// Whether the submit control should be enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        matches!(self.status(), LeadStatus::Idle | LeadStatus::Error)
    }

    /// Apply a field edit. Returns `false` when the edit was ignored.
    ///
    /// Edits are ignored while the success confirmation is showing, and
    /// `Service` only accepts identifiers from the service catalog. An edit
    /// in `Error` returns the form to `Idle`; an edit in `Submitting` keeps
    /// the status.
    pub fn edit(&self, field: LeadField, value: impl Into<String>) -> bool {
        let value = value.into();
        if field == LeadField::Service && site::find_service(&value).is_none() {
            debug!(service = %value, "unknown service id ignored");
            return false;
        }

        let mut state = self.lock();
        if state.status == LeadStatus::Success {
            return false;
        }
        *state.fields.slot(field) = value;
        if state.status == LeadStatus::Error {
            state.status = LeadStatus::Idle;
        }
        true
    }

    /// Select a service from the catalog.
    pub fn select_service(&self, id: &str) -> bool {
        self.edit(LeadField::Service, id)
    }

    /// Submit the current fields.
    ///
    /// Refused without a network call when any field is empty, a submission
    /// is already in flight, or the previous success is not yet dismissed.
    /// Otherwise the transport is called (with timeout and the configured
    /// retry policy) and the status settles on `Success` or `Error`. Fields
    /// are left untouched either way. Dropping the returned future mid-call
    /// settles the status on `Error`.
    pub async fn submit(&self) -> SubmitOutcome {
        let lead = {
            let mut state = self.lock();
            match state.status {
                LeadStatus::Submitting => return SubmitOutcome::Refused(Refusal::InFlight),
                LeadStatus::Success => return SubmitOutcome::Refused(Refusal::AwaitingDismiss),
                LeadStatus::Idle | LeadStatus::Error => {}
            }
            if let Some(field) = state.fields.first_missing() {
                debug!(field = field.as_str(), "lead submit refused: required field empty");
                return SubmitOutcome::Refused(Refusal::MissingField(field));
            }
            state.status = LeadStatus::Submitting;
            state.fields.clone()
        };

        let mut guard = SubmittingGuard { state: &self.state, armed: true };
        let result = self.deliver_with_retry(&lead).await;
        guard.armed = false;

        let mut state = self.lock();
        match result {
            Ok(()) => {
                info!(service = %lead.service, "lead submitted");
                state.status = LeadStatus::Success;
                SubmitOutcome::Success
            }
            Err(e) => {
                error!(error = %e, "lead submission failed");
                state.status = LeadStatus::Error;
                SubmitOutcome::Error
            }
        }
    }

    /// Acknowledge the success confirmation and reset the form.
    /// Returns `false` (and does nothing) outside `Success`.
    pub fn dismiss(&self) -> bool {
        let mut state = self.lock();
        if state.status != LeadStatus::Success {
            return false;
        }
        *state = FormState::default();
        true
    }

    async fn deliver_with_retry(&self, lead: &LeadFields) -> Result<(), LeadError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.request_timeout, self.transport.deliver(lead)).await {
                Ok(result) => result,
                Err(_) => Err(LeadError::Timeout { after: self.request_timeout }),
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts && e.retryable() => {
                    warn!(error = %e, attempt, max_attempts, "lead delivery failed; retrying");
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Settles a `Submitting` form on `Error` when the submit future is dropped
/// before the delivery result comes back.
struct SubmittingGuard<'a> {
    state: &'a Mutex<FormState>,
    armed: bool,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.status == LeadStatus::Submitting {
            warn!("lead submission cancelled before completion");
            state.status = LeadStatus::Error;
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
