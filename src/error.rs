//! Error types for roadvoice

use thiserror::Error;

/// Result type alias for roadvoice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio resource error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reported by [`crate::chat::ChatClient::send_message`]
///
/// Each variant is a kind the session maps to one fixed spoken sentence;
/// the payload is a diagnostic for logs only and is never spoken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// No API key is configured
    #[error("API key is not configured")]
    CredentialMissing,

    /// The endpoint rejected the API key (401/403)
    #[error("API key rejected: {0}")]
    CredentialInvalid(String),

    /// The endpoint returned 429
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The endpoint returned a 5xx status
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The request timed out at the transport level
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection or name resolution failed
    #[error("no connectivity: {0}")]
    NoConnectivity(String),

    /// A 2xx response body could not be parsed
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A well-formed response carried no answer text
    #[error("empty response from the service")]
    EmptyResponse,

    /// Anything else, including non-429 4xx statuses
    #[error("chat request failed: {0}")]
    Unknown(String),
}
