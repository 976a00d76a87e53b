//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Character set label not recognized by the transcoding layer.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Text cannot be represented in the configured charset.
    ///
    /// A header carrying a mis-encoded name would corrupt the message,
    /// so this is a hard failure rather than a silent drop.
    #[error("Text not representable in charset {charset}")]
    Unencodable {
        /// The charset that rejected the text.
        charset: String,
    },

    /// Invalid encoded-word or quoted-printable input.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
