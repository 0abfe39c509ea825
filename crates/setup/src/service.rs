//! Live service facade wiring the engine behind the service traits.

use std::sync::Arc;

use {
    async_trait::async_trait,
    secrecy::Secret,
    serde_json::{Map, Value},
    tokio::sync::{OnceCell, RwLock},
    tracing::{info, warn},
};

use {
    concord_catalog::{
        model::CatalogEntry,
        reconcile::effective_catalog,
        remote::CatalogClient,
    },
    concord_common::providers,
    concord_service_traits::{
        CatalogService, ProviderSetupService, ServiceResult, SettingsService,
    },
    concord_settings::{SettingsPatch, SettingsRepository, resolve_default},
};

use crate::{
    overrides::OverrideStore,
    probe::{HttpProbe, ProviderProbe},
    validator::{ActivationSink, CredentialValidator},
};

/// Callback for publishing events to connected clients.
///
/// The host wires this up to its transport (WebSocket broadcast, channel,
/// test collector) so this crate doesn't depend on the host's internals.
#[async_trait]
pub trait SetupBroadcaster: Send + Sync {
    async fn broadcast(&self, topic: &str, payload: Value);
}

/// Shared engine state: the last-known-good catalog, the override store, and
/// the broadcaster seam. The validator reports back through this as its
/// [`ActivationSink`].
struct EngineState {
    catalog_cache: RwLock<Vec<CatalogEntry>>,
    overrides: OverrideStore,
    broadcaster: OnceCell<Arc<dyn SetupBroadcaster>>,
}

impl EngineState {
    fn merged(&self, fetched: Option<Vec<CatalogEntry>>, last_good: &[CatalogEntry]) -> Vec<CatalogEntry> {
        effective_catalog(
            fetched,
            last_good,
            &self.overrides.list_configured(),
            &providers::always_configured(),
        )
    }

    async fn merged_from_cache(&self) -> Vec<CatalogEntry> {
        let cache = self.catalog_cache.read().await;
        self.merged(None, &cache)
    }

    async fn broadcast(&self, topic: &str, payload: Value) {
        if let Some(broadcaster) = self.broadcaster.get() {
            broadcaster.broadcast(topic, payload).await;
        }
    }

    async fn broadcast_catalog(&self) {
        let merged = self.merged_from_cache().await;
        let payload = serde_json::to_value(&merged).unwrap_or_default();
        self.broadcast("catalog.updated", payload).await;
    }
}

#[async_trait]
impl ActivationSink for EngineState {
    async fn credential_activated(&self, provider_id: &str) {
        info!(provider = %provider_id, "credential activated, re-merging catalog");
        self.broadcast(
            "providers.activated",
            serde_json::json!({ "provider": provider_id }),
        )
        .await;
        self.broadcast_catalog().await;
    }

    async fn persistence_failed(&self, provider_id: &str, error: &str) {
        self.broadcast(
            "settings.save_failed",
            serde_json::json!({ "provider": provider_id, "error": error }),
        )
        .await;
    }
}

/// The engine behind the settings surface: catalog refresh and merge,
/// settings reads and patches, and credential validation sessions.
pub struct LiveSetupService {
    catalog_client: CatalogClient,
    state: Arc<EngineState>,
    settings: SettingsRepository,
    validator: CredentialValidator,
}

impl LiveSetupService {
    pub fn new(catalog_base: &str, settings: SettingsRepository) -> Self {
        Self::with_parts(
            CatalogClient::new(catalog_base),
            OverrideStore::new(),
            settings,
            Arc::new(HttpProbe),
        )
    }

    pub fn with_parts(
        catalog_client: CatalogClient,
        overrides: OverrideStore,
        settings: SettingsRepository,
        probe: Arc<dyn ProviderProbe>,
    ) -> Self {
        let state = Arc::new(EngineState {
            catalog_cache: RwLock::new(Vec::new()),
            overrides: overrides.clone(),
            broadcaster: OnceCell::new(),
        });
        let validator = CredentialValidator::new(
            probe,
            overrides,
            settings.clone(),
            Arc::clone(&state) as Arc<dyn ActivationSink>,
        );
        Self {
            catalog_client,
            state,
            settings,
            validator,
        }
    }

    /// Set the broadcaster so validation and catalog changes publish live
    /// events to the UI.
    pub fn set_broadcaster(&self, broadcaster: Arc<dyn SetupBroadcaster>) {
        let _ = self.state.broadcaster.set(broadcaster);
    }

    pub fn validator(&self) -> &CredentialValidator {
        &self.validator
    }

    fn catalog_json(merged: &[CatalogEntry]) -> ServiceResult {
        let entries: Vec<Value> = merged
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mut value = serde_json::to_value(entry).unwrap_or_default();
                if let Some(object) = value.as_object_mut() {
                    object.insert("uiOrder".into(), serde_json::json!(idx));
                }
                value
            })
            .collect();
        Ok(Value::Array(entries))
    }
}

#[async_trait]
impl CatalogService for LiveSetupService {
    async fn effective(&self) -> ServiceResult {
        let merged = self.state.merged_from_cache().await;
        Self::catalog_json(&merged)
    }

    async fn refresh(&self) -> ServiceResult {
        let fetched = match self.catalog_client.fetch_catalog().await {
            Ok(entries) => {
                let mut cache = self.state.catalog_cache.write().await;
                *cache = entries.clone();
                info!(providers = entries.len(), "catalog refreshed");
                Some(entries)
            },
            Err(error) => {
                // Keep the last-known-good catalog; the merge below falls
                // back to the built-in entry when there has never been one.
                warn!(error = %error, "catalog refresh failed, keeping last known good");
                None
            },
        };

        let merged = {
            let cache = self.state.catalog_cache.read().await;
            self.state.merged(fetched, &cache)
        };
        self.state.broadcast_catalog().await;
        Self::catalog_json(&merged)
    }
}

#[async_trait]
impl SettingsService for LiveSetupService {
    async fn get(&self) -> ServiceResult {
        Ok(serde_json::to_value(self.settings.snapshot())?)
    }

    async fn save_patch(&self, params: Value) -> ServiceResult {
        let patch: SettingsPatch = serde_json::from_value(params)?;
        let merged = self
            .settings
            .save_patch(&patch)
            .await
            .map_err(|e| e.to_string())?;
        Ok(serde_json::to_value(merged)?)
    }

    async fn default_selection(&self) -> ServiceResult {
        use concord_settings::DefaultSelection;

        let selection = resolve_default(&self.settings.snapshot());
        Ok(match selection {
            DefaultSelection::Auto => serde_json::json!("auto"),
            DefaultSelection::Pinned {
                provider_id,
                model_id,
            } => serde_json::json!({
                "providerId": provider_id,
                "modelId": model_id,
            }),
        })
    }
}

#[async_trait]
impl ProviderSetupService for LiveSetupService {
    async fn available(&self) -> ServiceResult {
        self.effective().await
    }

    async fn start_validation(&self, params: Value) -> ServiceResult {
        let provider = params
            .get("provider")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing 'provider' parameter".to_string())?;
        let secret = params
            .get("secret")
            .and_then(Value::as_str)
            .map(|s| Secret::new(s.to_string()));
        let base_url = params
            .get("baseUrl")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(ToString::to_string);
        let request_id = params
            .get("requestId")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut progress = Map::new();
        progress.insert("provider".into(), Value::String(provider.to_string()));
        progress.insert("requestId".into(), Value::String(request_id.clone()));

        match self
            .validator
            .start_with_endpoint(provider, secret, base_url)
        {
            Ok(()) => {
                progress.insert("phase".into(), Value::String("testing".into()));
                self.state
                    .broadcast("providers.validate.progress", Value::Object(progress))
                    .await;
                Ok(serde_json::json!({ "ok": true, "requestId": request_id }))
            },
            Err(error) => {
                progress.insert("phase".into(), Value::String("error".into()));
                progress.insert("message".into(), Value::String(error.to_string()));
                self.state
                    .broadcast("providers.validate.progress", Value::Object(progress))
                    .await;
                Ok(serde_json::json!({
                    "ok": false,
                    "requestId": request_id,
                    "error": error.to_string(),
                }))
            },
        }
    }

    async fn cancel_validation(&self) -> ServiceResult {
        self.validator.cancel();
        Ok(serde_json::json!({ "ok": true }))
    }

    async fn validation_status(&self) -> ServiceResult {
        Ok(serde_json::to_value(self.validator.status())?)
    }

    async fn remove_override(&self, params: Value) -> ServiceResult {
        let provider = params
            .get("provider")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing 'provider' parameter".to_string())?;

        self.state.overrides.remove(provider)?;
        info!(provider, "removed credential override");
        self.state.broadcast_catalog().await;
        Ok(serde_json::json!({ "ok": true }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ValidationError;
    use crate::probe::ProbeRequest;

    #[derive(Default)]
    struct RecordingBroadcaster {
        events: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingBroadcaster {
        fn topics(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(topic, _)| topic.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SetupBroadcaster for RecordingBroadcaster {
        async fn broadcast(&self, topic: &str, payload: Value) {
            self.events
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
        }
    }

    struct AlwaysOkProbe;

    #[async_trait]
    impl ProviderProbe for AlwaysOkProbe {
        async fn probe(&self, _request: &ProbeRequest) -> Result<(), ValidationError> {
            Ok(())
        }
    }

    fn service_with(
        catalog_base: &str,
        dir: &tempfile::TempDir,
    ) -> (LiveSetupService, Arc<RecordingBroadcaster>) {
        let service = LiveSetupService::with_parts(
            CatalogClient::new(catalog_base),
            OverrideStore::with_path(dir.path().join("credential_overrides.json")),
            SettingsRepository::detached(dir.path().join("settings_cache.json")),
            Arc::new(AlwaysOkProbe),
        );
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        service.set_broadcaster(Arc::clone(&broadcaster) as Arc<dyn SetupBroadcaster>);
        (service, broadcaster)
    }

    const CATALOG_BODY: &str = r#"[
        {"providerId": "openai", "displayName": "OpenAI", "configured": true},
        {"providerId": "ollama", "displayName": "Ollama", "configured": false,
         "configNote": "Start the Ollama daemon."}
    ]"#;

    #[tokio::test]
    async fn refresh_merges_overrides_into_fetched_catalog() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/providers/catalog")
            .with_status(200)
            .with_body(CATALOG_BODY)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with(&server.url(), &dir);
        service.state.overrides.set("ollama", true).unwrap();

        let catalog = service.refresh().await.unwrap();
        let entries = catalog.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e["configured"] == true));
        assert_eq!(entries[0]["uiOrder"], 0);
    }

    #[tokio::test]
    async fn refresh_failure_falls_back_and_never_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with("http://127.0.0.1:1", &dir);

        let catalog = service.refresh().await.unwrap();
        let entries = catalog.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["providerId"], "anthropic");
    }

    #[tokio::test]
    async fn refresh_failure_keeps_last_known_good() {
        let mut server = mockito::Server::new_async().await;
        let good = server
            .mock("GET", "/api/providers/catalog")
            .with_status(200)
            .with_body(CATALOG_BODY)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with(&server.url(), &dir);

        service.refresh().await.unwrap();
        good.remove_async().await;
        let _bad = server
            .mock("GET", "/api/providers/catalog")
            .with_status(503)
            .create_async()
            .await;

        let catalog = service.refresh().await.unwrap();
        let entries = catalog.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["providerId"], "openai");
    }

    #[tokio::test]
    async fn save_patch_round_trips_through_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with("http://127.0.0.1:1", &dir);

        let merged = service
            .save_patch(serde_json::json!({ "temperature": 0.5 }))
            .await
            .unwrap();
        assert_eq!(merged["temperature"], 0.5);

        let selection = service.default_selection().await.unwrap();
        assert_eq!(selection, serde_json::json!("auto"));
    }

    #[tokio::test]
    async fn start_validation_requires_provider_param() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with("http://127.0.0.1:1", &dir);
        assert!(
            service
                .start_validation(serde_json::json!({}))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn missing_secret_reports_error_without_failing_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let (service, broadcaster) = service_with("http://127.0.0.1:1", &dir);

        let result = service
            .start_validation(serde_json::json!({ "provider": "anthropic" }))
            .await
            .unwrap();
        assert_eq!(result["ok"], false);
        assert_eq!(result["error"], "secret required");
        assert!(
            broadcaster
                .topics()
                .contains(&"providers.validate.progress".to_string())
        );
    }

    #[tokio::test]
    async fn successful_validation_broadcasts_activation_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let (service, broadcaster) = service_with("http://127.0.0.1:1", &dir);

        let result = service
            .start_validation(serde_json::json!({
                "provider": "anthropic",
                "secret": "sk-abc",
            }))
            .await
            .unwrap();
        assert_eq!(result["ok"], true);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while !broadcaster
            .topics()
            .contains(&"providers.activated".to_string())
        {
            assert!(std::time::Instant::now() < deadline, "activation never fired");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(broadcaster.topics().contains(&"catalog.updated".to_string()));

        // The re-merged catalog now shows the provider as configured even
        // though the remote was never reachable.
        let catalog = service.effective().await.unwrap();
        let entries = catalog.as_array().unwrap();
        assert!(
            entries
                .iter()
                .any(|e| e["providerId"] == "anthropic" && e["configured"] == true)
        );
    }

    #[tokio::test]
    async fn remove_override_reverts_the_merged_flag() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/providers/catalog")
            .with_status(200)
            .with_body(CATALOG_BODY)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with(&server.url(), &dir);
        service.state.overrides.set("ollama", true).unwrap();
        service.refresh().await.unwrap();

        service
            .remove_override(serde_json::json!({ "provider": "ollama" }))
            .await
            .unwrap();

        let catalog = service.effective().await.unwrap();
        let ollama = catalog
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["providerId"] == "ollama")
            .cloned()
            .unwrap();
        assert_eq!(ollama["configured"], false);
        assert_eq!(ollama["configNote"], "Start the Ollama daemon.");
    }

    #[tokio::test]
    async fn validation_status_is_serializable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _broadcaster) = service_with("http://127.0.0.1:1", &dir);

        let status = service.validation_status().await.unwrap();
        assert_eq!(status["state"], "idle");

        service.cancel_validation().await.unwrap();
        let status = service.validation_status().await.unwrap();
        assert_eq!(status["state"], "idle");
    }
}
