//! Shared building blocks for the concord engine: provider id aliasing, the
//! known-provider table, config paths, and telemetry setup.

pub mod alias;
pub mod paths;
pub mod providers;
pub mod telemetry;

pub use {
    alias::{canonical_provider_id, same_provider},
    providers::{KnownProvider, always_configured, is_keyless, known_providers},
};
