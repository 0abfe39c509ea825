use thiserror::Error;

/// A settings save or load failed.
///
/// Surfaced as a non-fatal notification: the in-memory document is not
/// rolled back, leaving a client/server drift until the next successful
/// save.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("settings request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("settings endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("invalid settings payload: {0}")]
    Decode(String),

    #[error("settings storage failed: {0}")]
    Storage(String),
}
