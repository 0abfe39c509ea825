//! Static definitions of the providers the client knows how to set up.

use std::collections::BTreeSet;

use crate::alias::canonical_provider_id;

/// A provider the setup flow can offer, independent of what the remote
/// catalog currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownProvider {
    pub name: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
    /// Default endpoint for probes (for providers with a fixed public API).
    pub default_base_url: Option<&'static str>,
    /// Whether the provider works without an API key (local daemons and the
    /// built-in router).
    pub keyless: bool,
}

/// Substituted when the catalog service has never answered.
pub const FALLBACK_PROVIDER: KnownProvider = KnownProvider {
    name: "anthropic",
    display_name: "Anthropic",
    icon: "anthropic",
    default_base_url: Some("https://api.anthropic.com"),
    keyless: false,
};

/// Providers treated as configured regardless of catalog or overrides.
const ALWAYS_CONFIGURED: &[&str] = &["builtin"];

pub fn known_providers() -> Vec<KnownProvider> {
    vec![
        FALLBACK_PROVIDER,
        KnownProvider {
            name: "openai",
            display_name: "OpenAI",
            icon: "openai",
            default_base_url: Some("https://api.openai.com/v1"),
            keyless: false,
        },
        KnownProvider {
            name: "gemini",
            display_name: "Google Gemini",
            icon: "gemini",
            default_base_url: Some("https://generativelanguage.googleapis.com/v1beta"),
            keyless: false,
        },
        KnownProvider {
            name: "groq",
            display_name: "Groq",
            icon: "groq",
            default_base_url: Some("https://api.groq.com/openai/v1"),
            keyless: false,
        },
        KnownProvider {
            name: "mistral",
            display_name: "Mistral",
            icon: "mistral",
            default_base_url: Some("https://api.mistral.ai/v1"),
            keyless: false,
        },
        KnownProvider {
            name: "xai",
            display_name: "xAI (Grok)",
            icon: "xai",
            default_base_url: Some("https://api.x.ai/v1"),
            keyless: false,
        },
        KnownProvider {
            name: "openrouter",
            display_name: "OpenRouter",
            icon: "openrouter",
            default_base_url: Some("https://openrouter.ai/api/v1"),
            keyless: false,
        },
        KnownProvider {
            name: "ollama",
            display_name: "Ollama",
            icon: "ollama",
            default_base_url: Some("http://localhost:11434"),
            keyless: true,
        },
        KnownProvider {
            name: "builtin",
            display_name: "Built-in Router",
            icon: "builtin",
            default_base_url: None,
            keyless: true,
        },
    ]
}

/// Look up a known provider by alias-normalized id.
pub fn find_known(provider_id: &str) -> Option<KnownProvider> {
    let canonical = canonical_provider_id(provider_id);
    known_providers().into_iter().find(|p| p.name == canonical)
}

/// Whether the provider validates without a secret (local daemons and the
/// built-in router). Unknown providers are assumed to require one.
pub fn is_keyless(provider_id: &str) -> bool {
    find_known(provider_id).is_some_and(|p| p.keyless)
}

/// The fixed always-configured set, alias-normalized.
pub fn always_configured() -> BTreeSet<String> {
    ALWAYS_CONFIGURED
        .iter()
        .map(|id| canonical_provider_id(id))
        .collect()
}
