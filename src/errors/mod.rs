use thiserror::Error;

/// Typed error hierarchy for replygate.
///
/// Use at module boundaries (gateway handlers, outbound dispatch, config
/// validation). Internal/leaf functions can continue using `anyhow::Result` —
/// the `Internal` variant allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum ReplygateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook rejected: {0}")]
    Rejected(String),

    #[error("Outbound dispatch failed: {message}")]
    Dispatch { message: String, retryable: bool },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReplygateError {
    /// Whether this error is transient and the operation could be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Dispatch { retryable, .. } => *retryable,
            Self::Internal(_) => true,
            Self::Config(_) | Self::Rejected(_) => false,
        }
    }
}
