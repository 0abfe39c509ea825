//! Durable settings store: a remote PATCH endpoint plus an optimistic
//! in-memory echo and a device-scoped cache blob.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, info, warn};

use concord_catalog::remote::shared_http_client;

use crate::{
    error::PersistenceError,
    schema::{EffectiveSettings, SettingsPatch},
};

/// Settings store with partial-patch semantics.
///
/// Saves apply to the in-memory echo and the local cache blob first, then
/// PATCH only the set fields to the remote; the server merges into the
/// stored document and returns the result. A remote failure does not roll
/// the echo back — the drift is surfaced to the caller and converges on the
/// next successful save.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    http: reqwest::Client,
    remote_base: Option<String>,
    cache_path: PathBuf,
    echo: Arc<Mutex<EffectiveSettings>>,
}

impl SettingsRepository {
    /// Repository backed by the remote settings endpoint, with the cache
    /// blob in the user config dir.
    pub fn new(remote_base: impl Into<String>) -> Self {
        let cache_path = concord_common::paths::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config/concord"))
            .join("settings_cache.json");
        Self::with_paths(Some(remote_base.into()), cache_path)
    }

    /// Detached repository: no remote, local cache only. Used offline and in
    /// tests.
    pub fn detached(cache_path: PathBuf) -> Self {
        Self::with_paths(None, cache_path)
    }

    /// Repository with an explicit cache location (tests, portable installs).
    pub fn with_remote(remote_base: impl Into<String>, cache_path: PathBuf) -> Self {
        Self::with_paths(Some(remote_base.into()), cache_path)
    }

    fn with_paths(remote_base: Option<String>, cache_path: PathBuf) -> Self {
        Self {
            http: shared_http_client().clone(),
            remote_base: remote_base.map(|base| base.trim_end_matches('/').to_string()),
            cache_path,
            echo: Arc::new(Mutex::new(EffectiveSettings::default())),
        }
    }

    fn lock_echo(&self) -> MutexGuard<'_, EffectiveSettings> {
        self.echo.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current in-memory settings.
    pub fn snapshot(&self) -> EffectiveSettings {
        self.lock_echo().clone()
    }

    fn read_cache(path: &PathBuf) -> Option<EffectiveSettings> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %error, "failed to read settings cache");
                }
                return None;
            },
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "settings cache is invalid JSON and will be ignored");
                None
            },
        }
    }

    /// Write atomically via temp file + rename so readers never observe
    /// partially-written JSON. Best-effort: failures are logged, not fatal.
    fn write_cache(&self, settings: &EffectiveSettings) {
        let result = (|| -> Result<(), String> {
            if let Some(parent) = self.cache_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            let data = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            let temp_path = self.cache_path.with_extension(format!("json.tmp.{nanos}"));
            std::fs::write(&temp_path, &data).map_err(|e| e.to_string())?;
            std::fs::rename(&temp_path, &self.cache_path).map_err(|e| e.to_string())
        })();

        if let Err(error) = result {
            warn!(path = %self.cache_path.display(), error = %error, "failed to persist settings cache");
        }
    }

    async fn fetch_remote(&self, base: &str) -> Result<EffectiveSettings, PersistenceError> {
        let url = format!("{base}/api/settings");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Status {
                status: status.as_u16(),
            });
        }
        let raw = response.text().await?;
        serde_json::from_str(&raw).map_err(|e| PersistenceError::Decode(e.to_string()))
    }

    /// Load the settings document: remote first, cache blob as fallback.
    pub async fn load(&self) -> EffectiveSettings {
        if let Some(base) = self.remote_base.clone() {
            match self.fetch_remote(&base).await {
                Ok(settings) => {
                    *self.lock_echo() = settings.clone();
                    self.write_cache(&settings);
                    return settings;
                },
                Err(error) => {
                    warn!(error = %error, "failed to load remote settings, falling back to cache");
                },
            }
        }

        let cached = Self::read_cache(&self.cache_path).unwrap_or_default();
        *self.lock_echo() = cached.clone();
        cached
    }

    /// Save a partial update.
    ///
    /// The echo and the cache blob update optimistically before the remote
    /// PATCH; a remote failure leaves them in place and is surfaced to the
    /// caller as a non-fatal [`PersistenceError`].
    pub async fn save_patch(
        &self,
        patch: &SettingsPatch,
    ) -> Result<EffectiveSettings, PersistenceError> {
        if patch.is_empty() {
            return Ok(self.snapshot());
        }

        let optimistic = {
            let mut echo = self.lock_echo();
            patch.apply(&mut echo);
            echo.clone()
        };
        self.write_cache(&optimistic);

        let Some(base) = self.remote_base.clone() else {
            debug!("settings repository is detached, patch applied locally");
            return Ok(optimistic);
        };

        let url = format!("{base}/api/settings");
        let response = self.http.patch(&url).json(patch).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Status {
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let merged: EffectiveSettings =
            serde_json::from_str(&raw).map_err(|e| PersistenceError::Decode(e.to_string()))?;

        *self.lock_echo() = merged.clone();
        self.write_cache(&merged);
        info!("saved settings patch");
        Ok(merged)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CustomModelConfig;

    fn temp_repo(dir: &tempfile::TempDir) -> SettingsRepository {
        SettingsRepository::detached(dir.path().join("settings_cache.json"))
    }

    #[tokio::test]
    async fn detached_patch_applies_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let repo = temp_repo(&dir);

        let patch = SettingsPatch {
            default_provider: Some("ollama".into()),
            default_model_id: Some("ollama::llama3.2".into()),
            ..Default::default()
        };
        let saved = repo.save_patch(&patch).await.unwrap();
        assert_eq!(saved.default_provider.as_deref(), Some("ollama"));

        // A fresh repository over the same cache path sees the write.
        let reloaded = temp_repo(&dir).load().await;
        assert_eq!(reloaded.default_model_id.as_deref(), Some("ollama::llama3.2"));
    }

    #[tokio::test]
    async fn concurrent_disjoint_patches_both_survive() {
        let dir = tempfile::tempdir().unwrap();
        let repo = temp_repo(&dir);

        let temperature_patch = SettingsPatch {
            temperature: Some(0.9),
            ..Default::default()
        };
        let models_patch = SettingsPatch {
            custom_models: Some(vec![CustomModelConfig {
                id: "local::phi-4".into(),
                provider_id: "local".into(),
                base_url: None,
                context_window_tokens: 16_384,
            }]),
            ..Default::default()
        };

        let (a, b) = tokio::join!(
            repo.save_patch(&temperature_patch),
            repo.save_patch(&models_patch)
        );
        a.unwrap();
        b.unwrap();

        let settings = repo.snapshot();
        assert_eq!(settings.temperature, 0.9);
        assert_eq!(settings.custom_models.len(), 1);
    }

    #[tokio::test]
    async fn remote_patch_sends_only_set_fields_and_adopts_merge() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("PATCH", "/api/settings")
            .match_body(mockito::Matcher::JsonString(
                r#"{"temperature": 0.9}"#.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"defaultProvider": "openai", "defaultModelId": "openai::gpt-5",
                    "modelPreset": "balanced", "temperature": 0.9, "maxTokens": 4096,
                    "customModels": []}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let repo =
            SettingsRepository::with_remote(server.url(), dir.path().join("settings_cache.json"));

        let patch = SettingsPatch {
            temperature: Some(0.9),
            ..Default::default()
        };
        let merged = repo.save_patch(&patch).await.unwrap();

        // The server-side merge is adopted wholesale.
        assert_eq!(merged.default_provider.as_deref(), Some("openai"));
        assert_eq!(repo.snapshot().temperature, 0.9);
    }

    #[tokio::test]
    async fn remote_failure_keeps_optimistic_echo() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("PATCH", "/api/settings")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let repo =
            SettingsRepository::with_remote(server.url(), dir.path().join("settings_cache.json"));

        let patch = SettingsPatch {
            max_tokens: Some(32_000),
            ..Default::default()
        };
        let result = repo.save_patch(&patch).await;
        assert!(matches!(result, Err(PersistenceError::Status { status: 500 })));

        // Documented drift: the echo keeps the optimistic value.
        assert_eq!(repo.snapshot().max_tokens, 32_000);
    }

    #[tokio::test]
    async fn load_falls_back_to_cache_when_remote_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("settings_cache.json");
        std::fs::write(
            &cache_path,
            r#"{"defaultProvider": "groq", "defaultModelId": "groq::llama-3.3-70b"}"#,
        )
        .unwrap();

        let repo = SettingsRepository::with_remote("http://127.0.0.1:1", cache_path);
        let settings = repo.load().await;
        assert_eq!(settings.default_provider.as_deref(), Some("groq"));
    }

    #[tokio::test]
    async fn invalid_cache_reads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("settings_cache.json");
        std::fs::write(&cache_path, "{ not json").unwrap();

        let repo = SettingsRepository::detached(cache_path);
        let settings = repo.load().await;
        assert_eq!(settings, EffectiveSettings::default());
    }

    #[tokio::test]
    async fn empty_patch_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let repo = temp_repo(&dir);
        let before = repo.snapshot();
        let after = repo.save_patch(&SettingsPatch::default()).await.unwrap();
        assert_eq!(before, after);
    }
}
