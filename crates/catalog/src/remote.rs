//! Client for the remote provider catalog endpoint.

use tracing::debug;

use crate::{error::CatalogError, model::CatalogEntry};

/// Shared HTTP client for catalog and settings traffic.
///
/// Everything that doesn't need custom redirect/proxy settings reuses this
/// client to share connection pools, DNS cache, and TLS sessions.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}

/// Fetches the provider/model catalog and per-provider configured status.
///
/// Holds no state beyond the HTTP client: retries are the caller's decision,
/// and on failure the caller keeps its last-known-good catalog rather than
/// treating the result as empty.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: shared_http_client().clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// One round trip against the catalog endpoint. A success replaces the
    /// prior catalog wholesale.
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = format!("{}/api/providers/catalog", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(&raw).map_err(|e| CatalogError::Decode(e.to_string()))?;

        debug!(providers = entries.len(), "fetched provider catalog");
        Ok(entries)
    }
}
