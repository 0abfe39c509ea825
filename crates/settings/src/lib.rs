//! User settings: the durable document, patch semantics, and the default
//! provider/model selection.

pub mod error;
pub mod repository;
pub mod resolve;
pub mod schema;
pub mod section;

pub use {
    error::PersistenceError,
    repository::SettingsRepository,
    resolve::{DefaultSelection, resolve_default, selection_available},
    schema::{CustomModelConfig, EffectiveSettings, ModelPreset, SettingsPatch},
    section::SettingsSection,
};
