//! Test-then-commit activation of provider credentials.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

use {
    concord_common::{alias::canonical_provider_id, providers},
    concord_settings::{SettingsPatch, SettingsRepository},
};

use crate::{
    error::ValidationError,
    overrides::OverrideStore,
    probe::{ProbeRequest, ProviderProbe},
    session::{SessionSnapshot, SessionState, ValidationSession},
};

/// How long a terminal session lingers before returning to idle on its own.
const AUTO_RESET_DELAY: Duration = Duration::from_secs(5);

/// Where the validator reports after committing (or failing to commit) a
/// validated credential. The live service re-merges the effective catalog
/// and broadcasts from here; tests record the calls.
#[async_trait]
pub trait ActivationSink: Send + Sync {
    /// The override and settings writes are done; consumers should re-merge.
    async fn credential_activated(&self, provider_id: &str);

    /// A persistence step failed after a successful validation. Non-fatal:
    /// surfaced to the user, not rolled back.
    async fn persistence_failed(&self, provider_id: &str, error: &str);
}

/// Orchestrates validation sessions: at most one live session per client,
/// probes run as background tasks, and persistent writes happen only on the
/// transition into `Success`.
#[derive(Clone)]
pub struct CredentialValidator {
    session: Arc<Mutex<ValidationSession>>,
    probe: Arc<dyn ProviderProbe>,
    overrides: OverrideStore,
    settings: SettingsRepository,
    sink: Arc<dyn ActivationSink>,
    auto_reset: Duration,
}

impl CredentialValidator {
    pub fn new(
        probe: Arc<dyn ProviderProbe>,
        overrides: OverrideStore,
        settings: SettingsRepository,
        sink: Arc<dyn ActivationSink>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(ValidationSession::new())),
            probe,
            overrides,
            settings,
            sink,
            auto_reset: AUTO_RESET_DELAY,
        }
    }

    /// Shorten the terminal-state linger (tests).
    pub fn with_auto_reset(mut self, delay: Duration) -> Self {
        self.auto_reset = delay;
        self
    }

    fn lock_session(&self) -> MutexGuard<'_, ValidationSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> SessionSnapshot {
        self.lock_session().snapshot()
    }

    /// Start validating a credential for `provider_id`.
    ///
    /// Providers outside the keyless set are rejected up front when the
    /// candidate is empty, without ever entering `Testing`. A session already
    /// in flight is superseded: its probe result no longer matches the
    /// session epoch and is discarded when it eventually resolves.
    pub fn start(
        &self,
        provider_id: &str,
        candidate_secret: Option<Secret<String>>,
    ) -> Result<(), ValidationError> {
        self.start_with_endpoint(provider_id, candidate_secret, None)
    }

    pub fn start_with_endpoint(
        &self,
        provider_id: &str,
        candidate_secret: Option<Secret<String>>,
        base_url: Option<String>,
    ) -> Result<(), ValidationError> {
        let provider_id = canonical_provider_id(provider_id);

        let secret_missing = candidate_secret
            .as_ref()
            .is_none_or(|s| s.expose_secret().trim().is_empty());
        if secret_missing && !providers::is_keyless(&provider_id) {
            let error = ValidationError::MissingSecret;
            let epoch = {
                let mut session = self.lock_session();
                session.reject(provider_id.clone(), error.to_string())
            };
            info!(provider = %provider_id, "credential validation rejected before probe");
            self.schedule_auto_reset(epoch);
            return Err(error);
        }

        let epoch = {
            let mut session = self.lock_session();
            if session.state() == SessionState::Testing {
                info!(
                    superseded = ?session.provider_id(),
                    provider = %provider_id,
                    "superseding in-flight validation session"
                );
            }
            session.begin(provider_id.clone(), candidate_secret.clone())
        };
        info!(provider = %provider_id, "credential validation started");

        let request = ProbeRequest {
            provider_id,
            secret: candidate_secret,
            base_url,
        };
        let validator = self.clone();
        tokio::spawn(async move {
            let result = validator.probe.probe(&request).await;
            validator
                .finish_probe(epoch, &request.provider_id, result)
                .await;
        });

        Ok(())
    }

    /// Return to idle from any state, discarding the candidate secret. No
    /// writes; an in-flight probe keeps running but its result is orphaned.
    pub fn cancel(&self) {
        self.lock_session().reset();
        info!("validation session cancelled");
    }

    async fn finish_probe(
        &self,
        epoch: u64,
        provider_id: &str,
        result: Result<(), ValidationError>,
    ) {
        // Re-check the session before committing anything: a newer session
        // (different provider or a cancel) orphans this result.
        let committed = {
            let mut session = self.lock_session();
            if session.provider_id() != Some(provider_id) {
                info!(provider = %provider_id, "discarding probe result for superseded session");
                return;
            }
            match &result {
                Ok(()) => session.succeed(epoch),
                Err(error) => session.fail(epoch, error.to_string()),
            }
        };
        if !committed {
            info!(provider = %provider_id, "discarding stale probe result");
            return;
        }

        match result {
            Ok(()) => self.commit_activation(provider_id).await,
            Err(error) => {
                info!(provider = %provider_id, error = %error, "credential validation failed");
            },
        }
        self.schedule_auto_reset(epoch);
    }

    /// Success-path writes, in fixed order: override, settings patch,
    /// re-merge notification. Each step is awaited before the next, so a
    /// reader never observes the settings write without the override write.
    async fn commit_activation(&self, provider_id: &str) {
        if let Err(error) = self.overrides.set(provider_id, true) {
            warn!(
                provider = %provider_id,
                error = %error,
                "failed to persist credential override"
            );
            self.sink.persistence_failed(provider_id, &error).await;
            return;
        }
        info!(provider = %provider_id, "recorded credential override");

        let patch = SettingsPatch {
            default_provider: Some(provider_id.to_string()),
            ..Default::default()
        };
        match self.settings.save_patch(&patch).await {
            Ok(_) => info!(provider = %provider_id, "default provider updated"),
            Err(error) => {
                // Known drift window: the override is durable but the server
                // missed the settings write. Surfaced, not rolled back; the
                // next successful save converges.
                warn!(
                    provider = %provider_id,
                    error = %error,
                    "settings patch failed after successful validation"
                );
                self.sink
                    .persistence_failed(provider_id, &error.to_string())
                    .await;
            },
        }

        self.sink.credential_activated(provider_id).await;
    }

    fn schedule_auto_reset(&self, epoch: u64) {
        let session = Arc::clone(&self.session);
        let delay = self.auto_reset;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
            if session.reset_if_epoch(epoch) {
                debug!("validation session auto-reset to idle");
            }
        });
    }
}
