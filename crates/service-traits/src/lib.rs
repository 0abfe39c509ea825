//! Service trait interfaces for the settings engine.
//!
//! Each trait has a `Noop` implementation that returns empty/default
//! responses, allowing a host shell to run before the engine is wired in.

use std::sync::Arc;

use {async_trait::async_trait, serde_json::Value};

/// Error type returned by service methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

pub type ServiceResult<T = Value> = Result<T, ServiceError>;

// ── Catalog ─────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// The current effective catalog: merged with local overrides, never
    /// empty once a live engine is wired in.
    async fn effective(&self) -> ServiceResult;
    /// Fetch the remote catalog, swap the cache, and return the new
    /// effective catalog.
    async fn refresh(&self) -> ServiceResult;
}

pub struct NoopCatalogService;

#[async_trait]
impl CatalogService for NoopCatalogService {
    async fn effective(&self) -> ServiceResult {
        Ok(serde_json::json!([]))
    }

    async fn refresh(&self) -> ServiceResult {
        Err("catalog service not configured".into())
    }
}

// ── Settings ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait SettingsService: Send + Sync {
    async fn get(&self) -> ServiceResult;
    /// Apply a partial settings update; `params` carries only the fields to
    /// change.
    async fn save_patch(&self, params: Value) -> ServiceResult;
    /// The resolved default selection: `"auto"` or a provider/model pair.
    async fn default_selection(&self) -> ServiceResult;
}

pub struct NoopSettingsService;

#[async_trait]
impl SettingsService for NoopSettingsService {
    async fn get(&self) -> ServiceResult {
        Ok(serde_json::json!({}))
    }

    async fn save_patch(&self, _params: Value) -> ServiceResult {
        Err("settings service not configured".into())
    }

    async fn default_selection(&self) -> ServiceResult {
        Ok(serde_json::json!("auto"))
    }
}

// ── Provider setup ──────────────────────────────────────────────────────────

#[async_trait]
pub trait ProviderSetupService: Send + Sync {
    /// Providers available for setup, with their merged configured flags.
    async fn available(&self) -> ServiceResult;
    /// Begin validating a candidate credential.
    async fn start_validation(&self, params: Value) -> ServiceResult;
    /// Return the session to idle, discarding the candidate.
    async fn cancel_validation(&self) -> ServiceResult;
    async fn validation_status(&self) -> ServiceResult;
    /// Remove a recorded credential override (explicit user action).
    async fn remove_override(&self, params: Value) -> ServiceResult;
}

pub struct NoopProviderSetupService;

#[async_trait]
impl ProviderSetupService for NoopProviderSetupService {
    async fn available(&self) -> ServiceResult {
        Ok(serde_json::json!([]))
    }

    async fn start_validation(&self, _params: Value) -> ServiceResult {
        Err("provider setup service not configured".into())
    }

    async fn cancel_validation(&self) -> ServiceResult {
        Ok(serde_json::json!({ "ok": true }))
    }

    async fn validation_status(&self) -> ServiceResult {
        Ok(serde_json::json!({ "state": "idle" }))
    }

    async fn remove_override(&self, _params: Value) -> ServiceResult {
        Err("provider setup service not configured".into())
    }
}

// ── Aggregate ───────────────────────────────────────────────────────────────

/// The services a host consumes, defaulting to the Noop set.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<dyn CatalogService>,
    pub settings: Arc<dyn SettingsService>,
    pub provider_setup: Arc<dyn ProviderSetupService>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            catalog: Arc::new(NoopCatalogService),
            settings: Arc::new(NoopSettingsService),
            provider_setup: Arc::new(NoopProviderSetupService),
        }
    }
}
