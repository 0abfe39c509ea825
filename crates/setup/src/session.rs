//! Pure state machine for credential validation sessions. No I/O.

use secrecy::Secret;

/// Lifecycle states of a validation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Testing,
    Success,
    Error,
}

/// At most one live session per client, owned by the credential validator.
///
/// Every entry into `Testing` (and every reset) bumps the epoch; an async
/// probe result carries the epoch it was started under and is discarded when
/// it no longer matches, which is how superseded sessions are orphaned
/// without aborting their in-flight probes.
#[derive(Debug, Default)]
pub struct ValidationSession {
    state: SessionStateInner,
    epoch: u64,
}

#[derive(Debug, Default)]
enum SessionStateInner {
    #[default]
    Idle,
    Testing {
        provider_id: String,
        candidate_secret: Option<Secret<String>>,
    },
    Success {
        provider_id: String,
    },
    Error {
        provider_id: String,
        message: String,
    },
}

/// Serializable view of a session, for status queries and progress events.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ValidationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match self.state {
            SessionStateInner::Idle => SessionState::Idle,
            SessionStateInner::Testing { .. } => SessionState::Testing,
            SessionStateInner::Success { .. } => SessionState::Success,
            SessionStateInner::Error { .. } => SessionState::Error,
        }
    }

    pub fn provider_id(&self) -> Option<&str> {
        match &self.state {
            SessionStateInner::Idle => None,
            SessionStateInner::Testing { provider_id, .. }
            | SessionStateInner::Success { provider_id }
            | SessionStateInner::Error { provider_id, .. } => Some(provider_id),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionStateInner::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn has_candidate_secret(&self) -> bool {
        matches!(
            &self.state,
            SessionStateInner::Testing {
                candidate_secret: Some(_),
                ..
            }
        )
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            provider_id: self.provider_id().map(String::from),
            error_message: self.error_message().map(String::from),
        }
    }

    /// Enter `Testing`. Any prior session is superseded: the epoch bump
    /// orphans its in-flight probe. Returns the epoch the new probe must
    /// present to commit its result.
    pub fn begin(&mut self, provider_id: String, candidate_secret: Option<Secret<String>>) -> u64 {
        self.state = SessionStateInner::Testing {
            provider_id,
            candidate_secret,
        };
        self.epoch += 1;
        self.epoch
    }

    /// Reject without ever entering `Testing` (e.g. missing secret).
    pub fn reject(&mut self, provider_id: String, message: String) -> u64 {
        self.state = SessionStateInner::Error {
            provider_id,
            message,
        };
        self.epoch += 1;
        self.epoch
    }

    fn testing_provider(&self, epoch: u64) -> Option<String> {
        if epoch != self.epoch {
            return None;
        }
        match &self.state {
            SessionStateInner::Testing { provider_id, .. } => Some(provider_id.clone()),
            _ => None,
        }
    }

    /// Probe success for `epoch`. Stale epochs and non-`Testing` states are
    /// ignored; returns whether the transition happened.
    pub fn succeed(&mut self, epoch: u64) -> bool {
        let Some(provider_id) = self.testing_provider(epoch) else {
            return false;
        };
        self.state = SessionStateInner::Success { provider_id };
        true
    }

    /// Probe failure for `epoch`. Same staleness rules as [`succeed`].
    ///
    /// [`succeed`]: Self::succeed
    pub fn fail(&mut self, epoch: u64, message: String) -> bool {
        let Some(provider_id) = self.testing_provider(epoch) else {
            return false;
        };
        self.state = SessionStateInner::Error {
            provider_id,
            message,
        };
        true
    }

    /// Return to `Idle`, discarding the candidate secret. Valid from any
    /// state; performs no writes.
    pub fn reset(&mut self) {
        self.state = SessionStateInner::Idle;
        self.epoch += 1;
    }

    /// Auto-reset from a terminal state; ignored when the epoch has moved on
    /// (a newer session or an explicit cancel already happened).
    pub fn reset_if_epoch(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        if !matches!(self.state(), SessionState::Success | SessionState::Error) {
            return false;
        }
        self.reset();
        true
    }
}
