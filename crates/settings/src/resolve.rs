//! Default provider/model selection.

use concord_common::alias::{canonical_provider_id, same_provider};

use concord_catalog::model::CatalogEntry;

use crate::schema::EffectiveSettings;

/// The resolved default selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultSelection {
    /// No pinned model; the router decides.
    Auto,
    /// The user's pinned provider/model pair.
    Pinned {
        provider_id: String,
        model_id: String,
    },
}

/// Resolve the active selection from the settings document.
///
/// A pinned pair is returned as stored even when the current catalog does
/// not list the provider: a slow or partial catalog refresh must not
/// silently reset user intent. Whether the pair is actually usable right now
/// is the deliberately separate [`selection_available`] query.
pub fn resolve_default(settings: &EffectiveSettings) -> DefaultSelection {
    let Some(model_id) = settings
        .default_model_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
    else {
        return DefaultSelection::Auto;
    };

    let provider_id = match settings
        .default_provider
        .as_deref()
        .filter(|id| !id.trim().is_empty())
    {
        Some(provider) => canonical_provider_id(provider),
        // Recover the provider from the `provider::model` namespace; an
        // un-namespaced model id without a stored provider is "auto" rather
        // than a fabricated pair.
        None => match model_id.split_once("::") {
            Some((namespace, _)) if !namespace.trim().is_empty() => {
                canonical_provider_id(namespace)
            },
            _ => return DefaultSelection::Auto,
        },
    };

    DefaultSelection::Pinned {
        provider_id,
        model_id: model_id.to_string(),
    }
}

/// Whether a pinned selection is present in the effective catalog. `Auto`
/// is always available.
pub fn selection_available(selection: &DefaultSelection, catalog: &[CatalogEntry]) -> bool {
    match selection {
        DefaultSelection::Auto => true,
        DefaultSelection::Pinned {
            provider_id,
            model_id,
        } => catalog.iter().any(|entry| {
            same_provider(&entry.provider_id, provider_id)
                && entry.models.iter().any(|model| model.id == *model_id)
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use concord_catalog::model::ModelDescriptor;

    fn settings(provider: Option<&str>, model: Option<&str>) -> EffectiveSettings {
        EffectiveSettings {
            default_provider: provider.map(String::from),
            default_model_id: model.map(String::from),
            ..Default::default()
        }
    }

    fn catalog_with(provider_id: &str, model_id: &str) -> Vec<CatalogEntry> {
        vec![CatalogEntry {
            provider_id: provider_id.to_string(),
            display_name: provider_id.to_string(),
            icon: None,
            configured: true,
            config_note: None,
            models: vec![ModelDescriptor {
                id: model_id.to_string(),
                provider_id: provider_id.to_string(),
                capabilities: Default::default(),
                context_window_tokens: 128_000,
                description: None,
                recommended: false,
            }],
        }]
    }

    #[test]
    fn unset_model_resolves_to_auto() {
        assert_eq!(resolve_default(&settings(None, None)), DefaultSelection::Auto);
        // A stored provider without a model is still auto.
        assert_eq!(
            resolve_default(&settings(Some("openai"), None)),
            DefaultSelection::Auto
        );
    }

    #[test]
    fn pinned_pair_is_returned_as_stored() {
        let resolved = resolve_default(&settings(Some("openai"), Some("openai::gpt-5")));
        assert_eq!(resolved, DefaultSelection::Pinned {
            provider_id: "openai".into(),
            model_id: "openai::gpt-5".into(),
        });
    }

    #[test]
    fn pinned_pair_survives_catalog_omission() {
        // The provider is not in the catalog at all; the selection still
        // resolves, it is just not available.
        let resolved = resolve_default(&settings(Some("venice"), Some("venice::llama-3.3")));
        assert!(matches!(resolved, DefaultSelection::Pinned { .. }));
        assert!(!selection_available(
            &resolved,
            &catalog_with("openai", "openai::gpt-5")
        ));
    }

    #[test]
    fn provider_recovered_from_model_namespace() {
        let resolved = resolve_default(&settings(None, Some("ollama::llama3.2")));
        assert_eq!(resolved, DefaultSelection::Pinned {
            provider_id: "ollama".into(),
            model_id: "ollama::llama3.2".into(),
        });
    }

    #[test]
    fn unnamespaced_model_without_provider_is_auto() {
        assert_eq!(
            resolve_default(&settings(None, Some("gpt-5"))),
            DefaultSelection::Auto
        );
    }

    #[test]
    fn provider_id_is_alias_normalized() {
        let resolved = resolve_default(&settings(Some("google"), Some("gemini::gemini-2.5-pro")));
        assert_eq!(resolved, DefaultSelection::Pinned {
            provider_id: "gemini".into(),
            model_id: "gemini::gemini-2.5-pro".into(),
        });
    }

    #[test]
    fn availability_checks_catalog_membership() {
        let resolved = resolve_default(&settings(Some("openai"), Some("openai::gpt-5")));
        assert!(selection_available(
            &resolved,
            &catalog_with("openai", "openai::gpt-5")
        ));
        assert!(!selection_available(
            &resolved,
            &catalog_with("openai", "openai::gpt-4o")
        ));
        assert!(selection_available(&DefaultSelection::Auto, &[]));
    }
}
