//! Errors returned by channel handlers.

use crate::backend::BackendError;

/// Why an inbound webhook call was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    /// Body did not decode into the vendor's payload shape.
    #[error("unable to parse request JSON: {0}")]
    Decode(#[from] serde_json::Error),
    /// Payload decoded but an entry failed a field check.
    #[error("{0}")]
    Validation(String),
    /// The backend refused a message; the batch is abandoned.
    #[error("unable to write message: {0}")]
    Persistence(#[source] BackendError),
}

impl ReceiveError {
    pub fn validation(message: impl std::fmt::Display) -> Self {
        Self::Validation(message.to_string())
    }

    /// True when the sender of the request is at fault (maps to a 4xx response).
    pub fn is_request_error(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }
}

/// Why a send could not even be attempted. Per-segment failures are not errors; they
/// are recorded in the returned status.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("missing '{key}' config for {channel_type} channel")]
    MissingConfig {
        key: &'static str,
        channel_type: String,
    },
    #[error("unable to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
