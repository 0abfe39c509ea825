use thiserror::Error;

/// Failure fetching or decoding the remote provider catalog.
///
/// Never fatal: callers substitute the last-known-good catalog, or the
/// built-in fallback entry when no fetch has ever succeeded.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("invalid catalog payload: {0}")]
    Decode(String),
}
