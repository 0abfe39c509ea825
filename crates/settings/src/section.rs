//! Settings surface sections as a closed enum.
//!
//! Hosts route deep links and persisted tab state through these variants
//! instead of free-form strings, so adding a section is a compile-time
//! checked change: every `match` below has to handle it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSection {
    Providers,
    Models,
    Agents,
    Integrations,
    Billing,
    Advanced,
}

impl SettingsSection {
    pub const ALL: [Self; 6] = [
        Self::Providers,
        Self::Models,
        Self::Agents,
        Self::Integrations,
        Self::Billing,
        Self::Advanced,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Providers => "providers",
            Self::Models => "models",
            Self::Agents => "agents",
            Self::Integrations => "integrations",
            Self::Billing => "billing",
            Self::Advanced => "advanced",
        }
    }

    /// Parse a slug. Unknown slugs are `None`, never a panic.
    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim();
        Self::ALL.into_iter().find(|section| section.slug() == slug)
    }
}
