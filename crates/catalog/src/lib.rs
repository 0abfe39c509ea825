//! Provider catalog: remote fetch, reconciliation with local credential
//! overrides, and the never-empty fallback.

pub mod error;
pub mod model;
pub mod reconcile;
pub mod remote;

pub use {
    error::CatalogError,
    model::{CatalogEntry, ModelDescriptor},
    reconcile::{effective_catalog, fallback_catalog, merge},
    remote::{CatalogClient, shared_http_client},
};
