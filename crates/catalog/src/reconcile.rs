//! Pure reconciliation of remote catalog truth with local credential
//! overrides.

use std::collections::BTreeSet;

use concord_common::{alias::canonical_provider_id, providers};

use crate::model::{CatalogEntry, ModelDescriptor};

/// Merge remote provider groups with locally recorded credential overrides.
///
/// Remote `configured = true` always wins and is never downgraded. A remote
/// `false` flips to `true` when the alias-normalized provider id is present
/// in `overrides` or `always_configured`; the config note is cleared in that
/// case since nothing is left for the user to do. Inputs are never mutated
/// and the output is freshly allocated, so the result is idempotent over
/// unchanged inputs and safe to hand to concurrent consumers.
pub fn merge(
    remote: &[CatalogEntry],
    overrides: &BTreeSet<String>,
    always_configured: &BTreeSet<String>,
) -> Vec<CatalogEntry> {
    remote
        .iter()
        .map(|entry| {
            if entry.configured {
                return entry.clone();
            }

            let canonical = canonical_provider_id(&entry.provider_id);
            let known_locally = overrides
                .iter()
                .chain(always_configured.iter())
                .any(|id| canonical_provider_id(id) == canonical);
            if !known_locally {
                return entry.clone();
            }

            let mut flipped = entry.clone();
            flipped.configured = true;
            flipped.config_note = None;
            flipped
        })
        .collect()
}

/// The single built-in entry substituted when the catalog service has never
/// answered, so consumers always see at least one provider.
pub fn fallback_catalog() -> Vec<CatalogEntry> {
    let provider = providers::FALLBACK_PROVIDER;
    vec![CatalogEntry {
        provider_id: provider.name.to_string(),
        display_name: provider.display_name.to_string(),
        icon: Some(provider.icon.to_string()),
        configured: false,
        config_note: Some("Catalog service unreachable; add an API key to get started.".into()),
        models: vec![ModelDescriptor {
            id: format!("{}::claude-sonnet-4", provider.name),
            provider_id: provider.name.to_string(),
            capabilities: BTreeSet::from(["chat".to_string(), "tools".to_string()]),
            context_window_tokens: 200_000,
            description: None,
            recommended: true,
        }],
    }]
}

/// The never-empty guarantee: the fetch result, else the last known good
/// catalog, else the built-in fallback — then merged with local overrides.
pub fn effective_catalog(
    fetched: Option<Vec<CatalogEntry>>,
    last_good: &[CatalogEntry],
    overrides: &BTreeSet<String>,
    always_configured: &BTreeSet<String>,
) -> Vec<CatalogEntry> {
    let remote = match fetched {
        Some(entries) if !entries.is_empty() => entries,
        _ if !last_good.is_empty() => last_good.to_vec(),
        _ => fallback_catalog(),
    };
    merge(&remote, overrides, always_configured)
}
