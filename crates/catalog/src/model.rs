//! Catalog wire types.

use std::collections::BTreeSet;

/// One provider group as reported by the catalog service.
///
/// Produced fresh on every fetch and replaced wholesale by the next one;
/// never patched in place.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub provider_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub configured: bool,
    /// What the user still has to do before the provider is usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_note: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

/// A model offered by a provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub provider_id: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    pub context_window_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub recommended: bool,
}
