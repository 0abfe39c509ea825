//! Canonical provider id normalization.
//!
//! The same logical provider can be reachable under different string ids in
//! different subsystems (the catalog service, stored settings, onboarding
//! choices). Every comparison of provider ids goes through
//! [`canonical_provider_id`]; extend the table here instead of special-casing
//! id strings at call sites.

use std::{collections::HashMap, sync::LazyLock};

/// Vendor-specific or legacy ids mapped onto their catalog ids.
static PROVIDER_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("google", "gemini"),
        ("google-gemini", "gemini"),
        ("claude", "anthropic"),
        ("grok", "xai"),
        ("ollama-openai", "ollama"),
    ])
});

/// Normalize a provider id: trim, lowercase, resolve aliases.
pub fn canonical_provider_id(raw: &str) -> String {
    let normalized = raw.trim().to_ascii_lowercase();
    match PROVIDER_ALIASES.get(normalized.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => normalized,
    }
}

/// Whether two ids refer to the same underlying provider.
pub fn same_provider(a: &str, b: &str) -> bool {
    canonical_provider_id(a) == canonical_provider_id(b)
}
