use thiserror::Error;

/// Error produced by the remote call adapter. `status` is the HTTP-like
/// status from the platform; `status == 0` marks a network-level failure
/// where the request never completed. `code` is the platform sub-code
/// (e.g. 20429 for request-rate exceeded).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("remote error (status {status}, code {code:?}): {message}")]
pub struct RemoteError {
    pub status: u16,
    pub code: Option<u32>,
    pub message: String,
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            code: None,
            message: message.into(),
        }
    }
}

/// Result of one remote operation, before retry handling
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Error type for the flex resource client
#[derive(Error, Debug)]
pub enum FlexClientError {
    /// Caller passed malformed input to a wrapper. Fails fast and is never
    /// routed through the retry policy.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure building the HTTP transport itself (TLS setup, bad base URL).
    /// Distinct from remote-call failures, which stay inside the envelope.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FlexClientError>;
