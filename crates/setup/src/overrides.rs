//! Persistent credential-presence flags, one per provider.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::warn;

use concord_common::{alias::canonical_provider_id, paths};

/// File-backed map of provider id → credential present, at
/// `<config-dir>/credential_overrides.json`.
///
/// Records presence only — the secret itself never lands here. Keys are
/// alias-normalized on every read and write, so a flag recorded under a
/// vendor-specific id is found under the catalog id too. Writes are
/// synchronous and durable across reloads.
#[derive(Debug, Clone)]
pub struct OverrideStore {
    inner: Arc<Mutex<OverrideStoreInner>>,
}

#[derive(Debug)]
struct OverrideStoreInner {
    path: PathBuf,
}

impl Default for OverrideStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideStore {
    pub fn new() -> Self {
        let path = paths::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config/concord"))
            .join("credential_overrides.json");
        Self::with_path(path)
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OverrideStoreInner { path })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OverrideStoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load_map(path: &PathBuf) -> BTreeMap<String, bool> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "failed to read credential override store"
                    );
                }
                return BTreeMap::new();
            },
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(_) => {
                warn!(
                    path = %path.display(),
                    "credential override store is invalid JSON and will be ignored"
                );
                BTreeMap::new()
            },
        }
    }

    /// Write atomically via temp file + rename so readers never observe
    /// partially-written JSON.
    fn save_map(path: &PathBuf, map: &BTreeMap<String, bool>) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                warn!(
                    path = %parent.display(),
                    error = %error,
                    "failed to create credential override store directory"
                );
                error.to_string()
            })?;
        }

        let data = serde_json::to_string_pretty(map).map_err(|e| e.to_string())?;
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("json.tmp.{nanos}"));
        std::fs::write(&temp_path, &data).map_err(|error| {
            warn!(
                path = %temp_path.display(),
                error = %error,
                "failed to write credential override store temp file"
            );
            error.to_string()
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600));
        }

        std::fs::rename(&temp_path, path).map_err(|error| {
            warn!(
                temp_path = %temp_path.display(),
                path = %path.display(),
                error = %error,
                "failed to atomically replace credential override store"
            );
            error.to_string()
        })
    }

    /// Whether a credential is recorded for the provider.
    pub fn get(&self, provider_id: &str) -> bool {
        let canonical = canonical_provider_id(provider_id);
        let guard = self.lock();
        Self::load_map(&guard.path)
            .get(&canonical)
            .copied()
            .unwrap_or(false)
    }

    /// Record or clear credential presence.
    pub fn set(&self, provider_id: &str, present: bool) -> Result<(), String> {
        let canonical = canonical_provider_id(provider_id);
        let guard = self.lock();
        let mut map = Self::load_map(&guard.path);
        if present {
            map.insert(canonical, true);
        } else {
            map.remove(&canonical);
        }
        Self::save_map(&guard.path, &map)
    }

    /// Remove the override entirely (explicit user action).
    pub fn remove(&self, provider_id: &str) -> Result<(), String> {
        self.set(provider_id, false)
    }

    /// All providers with a recorded credential, alias-normalized.
    pub fn list_configured(&self) -> BTreeSet<String> {
        let guard = self.lock();
        Self::load_map(&guard.path)
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(id, _)| canonical_provider_id(&id))
            .collect()
    }
}
