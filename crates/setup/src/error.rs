use thiserror::Error;

/// A credential validation failure.
///
/// Always recoverable: the session surfaces the message and the user retries
/// `start`. Validation failures never touch the override store or the
/// settings document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("secret required")]
    MissingSecret,

    #[error("provider rejected the credential: {0}")]
    ProviderRejected(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("local service not detected")]
    LocalServiceNotDetected,
}
