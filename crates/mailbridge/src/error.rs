//! Error types for send/receive orchestration.

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Client error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header or body encoding failed.
    #[error(transparent)]
    Mime(#[from] mailbridge_mime::Error),

    /// A message cannot be sent without a from-address.
    #[error("No sender address configured")]
    MissingFrom,

    /// Failure reported by the underlying session collaborator.
    ///
    /// Connect, authenticate, fetch and send failures are propagated
    /// unchanged through this variant.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Creates a transport error from a message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
