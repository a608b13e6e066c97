//! Chat consultant — transcript, visibility and the send/reply loop.
//!
//! DESIGN
//! ======
//! `ChatSessionController` keeps a [`ChatSessionState`] behind a short-held
//! mutex. `send_message` appends the user message and raises `pending`
//! under the lock, releases it for the generation call, then settles the
//! reply. The `pending` flag is the single-flight gate: while it is up,
//! further sends are no-ops, so two exchanges never interleave.
//!
//! Failed generations are logged. By default nothing is added to the
//! transcript; [`ChatFailurePolicy::Notice`] appends a generic notice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::config::{ChatConfig, ChatFailurePolicy};
use crate::llm::LlmGenerate;
use crate::llm::types::{GenerationRequest, LlmError};
use crate::site;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSessionState {
    pub transcript: Vec<ChatMessage>,
    pub pending: bool,
    pub open: bool,
    pub draft: String,
}

impl ChatSessionState {
    /// A closed session holding only the greeting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transcript: vec![ChatMessage {
                role: Role::Assistant,
                text: site::CHAT_GREETING.to_string(),
                created_at: OffsetDateTime::now_utc(),
            }],
            pending: false,
            open: false,
            draft: String::new(),
        }
    }

    /// Append a message, clamping its timestamp so the transcript never goes
    /// backwards in time.
    fn push(&mut self, role: Role, text: String) {
        let now = OffsetDateTime::now_utc();
        let created_at = match self.transcript.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        self.transcript.push(ChatMessage { role, text, created_at });
    }
}

impl Default for ChatSessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    /// Text was empty or whitespace only.
    Empty,
    /// A reply is still outstanding.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// An assistant reply was appended.
    Replied,
    /// Generation failed; see [`ChatFailurePolicy`] for the transcript effect.
    Failed,
    /// Nothing happened.
    Rejected(SendRejection),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct ChatSessionController {
    state: Mutex<ChatSessionState>,
    generator: Arc<dyn LlmGenerate>,
    config: ChatConfig,
    system_instruction: String,
}

impl ChatSessionController {
    #[must_use]
    pub fn new(generator: Arc<dyn LlmGenerate>, config: ChatConfig) -> Self {
        Self {
            state: Mutex::new(ChatSessionState::new()),
            generator,
            config,
            system_instruction: site::SYSTEM_INSTRUCTION.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatSessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> ChatSessionState {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Flip visibility. Returns the new value.
    pub fn toggle_open(&self) -> bool {
        let mut state = self.lock();
        state.open = !state.open;
        state.open
    }

    pub fn set_open(&self, open: bool) {
        self.lock().open = open;
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.lock().draft = text.into();
    }

    /// Whether the send control should be enabled.
    #[must_use]
    pub fn can_send(&self) -> bool {
        let state = self.lock();
        !state.pending && !state.draft.trim().is_empty()
    }

    /// Send whatever is in the draft.
    pub async fn send_draft(&self) -> SendOutcome {
        let draft = self.lock().draft.clone();
        self.send_message(&draft).await
    }

    /// Send `text` as the user's next message.
    ///
    /// No-op when `text` is blank or a reply is outstanding. Otherwise the
    /// untrimmed text is appended, the draft cleared, and one generation
    /// request issued with the fixed system instruction. Dropping the
    /// returned future mid-call lowers `pending` and leaves the user message
    /// without a reply.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        {
            let mut state = self.lock();
            if text.trim().is_empty() {
                return SendOutcome::Rejected(SendRejection::Empty);
            }
            if state.pending {
                debug!("chat send ignored: reply pending");
                return SendOutcome::Rejected(SendRejection::Pending);
            }
            state.push(Role::User, text.to_string());
            state.draft.clear();
            state.pending = true;
        }

        let mut guard = PendingGuard { state: &self.state, armed: true };
        let request = GenerationRequest {
            system: &self.system_instruction,
            prompt: text,
            temperature: self.config.temperature,
        };
        let result = match tokio::time::timeout(self.config.reply_timeout, self.generator.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout { secs: self.config.reply_timeout.as_secs() }),
        };
        guard.armed = false;

        let mut state = self.lock();
        state.pending = false;
        match result {
            Ok(generation) => {
                let reply = generation.reply().unwrap_or(site::CHAT_APOLOGY).to_string();
                debug!(model = %generation.model, output_tokens = generation.output_tokens, "chat reply received");
                state.push(Role::Assistant, reply);
                SendOutcome::Replied
            }
            Err(e) => {
                error!(error = %e, "chat generation failed");
                if self.config.failure_policy == ChatFailurePolicy::Notice {
                    state.push(Role::Assistant, site::CHAT_FAILURE_NOTICE.to_string());
                }
                SendOutcome::Failed
            }
        }
    }
}

/// Lowers `pending` when the send future is dropped before the reply lands.
struct PendingGuard<'a> {
    state: &'a Mutex<ChatSessionState>,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("chat send cancelled before a reply arrived");
            self.state.lock().unwrap_or_else(PoisonError::into_inner).pending = false;
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
