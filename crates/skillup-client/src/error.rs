//! Client error types.

use thiserror::Error;

/// Errors from talking to the skillup backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The backend answered with a non-success status.
    ///
    /// `message` comes from the body's `message` or `error` field, falling
    /// back to `HTTP error! status: N`.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The test stream reported an error envelope.
    #[error("{0}")]
    Stream(String),

    /// A success response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// An operation needs a user id and none is configured.
    #[error("no user id configured (set `uid` in skillup.toml or SKILLUP_UID)")]
    MissingUid,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Builder(String),
}

impl ClientError {
    /// Error for a non-success status with no usable body message.
    pub fn status(status: u16) -> Self {
        ClientError::Api {
            status,
            message: format!("HTTP error! status: {status}"),
        }
    }

    /// Retrying the same request will not help.
    pub fn is_permanent(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Timeout(_) | ClientError::Stream(_) => false,
            ClientError::Api { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            ClientError::Decode(_) | ClientError::MissingUid | ClientError::Builder(_) => true,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout_secs)
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
