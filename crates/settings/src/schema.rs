//! The settings document and its patch companion.

/// Model quality preset used when the user has not pinned a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreset {
    Fast,
    #[default]
    Balanced,
    Quality,
}

/// A user-declared model the catalog does not list.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomModelConfig {
    pub id: String,
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_context_window")]
    pub context_window_tokens: u32,
}

fn default_context_window() -> u32 {
    8_192
}

/// The authoritative settings document.
///
/// Loaded once at startup, mutated by every save, and persisted via patch
/// semantics — never full-object overwrite.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectiveSettings {
    /// Unset together with `default_model_id` means "auto": the router
    /// decides.
    pub default_provider: Option<String>,
    pub default_model_id: Option<String>,
    pub model_preset: ModelPreset,
    pub temperature: f32,
    pub max_tokens: u32,
    pub embedding_model_id: Option<String>,
    pub custom_models: Vec<CustomModelConfig>,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self {
            default_provider: None,
            default_model_id: None,
            model_preset: ModelPreset::Balanced,
            temperature: 0.7,
            max_tokens: 4_096,
            embedding_model_id: None,
            custom_models: Vec::new(),
        }
    }
}

/// A partial settings update.
///
/// Only `Some` fields serialize and only those fields touch existing state,
/// so concurrent patches to disjoint fields merge instead of overwriting
/// each other — "last write wins" holds at field level, never object level.
/// An empty string clears an optional field (back to "auto" for the default
/// selection).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_preset: Option<ModelPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_models: Option<Vec<CustomModelConfig>>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply to a document, field by field.
    pub fn apply(&self, settings: &mut EffectiveSettings) {
        if let Some(provider) = &self.default_provider {
            settings.default_provider = (!provider.is_empty()).then(|| provider.clone());
        }
        if let Some(model) = &self.default_model_id {
            settings.default_model_id = (!model.is_empty()).then(|| model.clone());
        }
        if let Some(preset) = self.model_preset {
            settings.model_preset = preset;
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = max_tokens;
        }
        if let Some(embedding) = &self.embedding_model_id {
            settings.embedding_model_id = (!embedding.is_empty()).then(|| embedding.clone());
        }
        if let Some(custom) = &self.custom_models {
            settings.custom_models = custom.clone();
        }
    }
}
