//! Error taxonomy for every storage operation.
//!
//! DESIGN
//! ======
//! Callers decide what to do with a failure by matching on the variant:
//! local failures (`QuotaExceeded`, `Io`, `Serialization`) mean the data
//! did not land anywhere, remote failures (`RemoteUnavailable`, `Remote`,
//! `MalformedResponse`, `RateLimited`) mean the local store is still an
//! option, and `ValidationFailed` means the input must be fixed first.

use crate::remote::rate_limit::RateLimitError;

/// Errors produced by local store, remote client, and orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing the value would push local storage past its byte quota.
    #[error("local storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    /// A value could not be serialized or a stored document could not be parsed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The local storage directory could not be read or written.
    #[error("local storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The remote API could not be reached (connect, timeout, body read).
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote API answered with a non-success status.
    #[error("remote returned {status} {status_text}: {body}")]
    Remote { status: u16, status_text: String, body: String },

    /// The remote API answered 2xx with a body that is not the expected JSON.
    #[error("remote response malformed: {0}")]
    MalformedResponse(String),

    /// The per-user request window is full; no request was sent.
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    /// Input failed a field check before anything was stored.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// No record with the given id exists in the consulted backends.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation needs a signed-in user profile.
    #[error("no signed-in user")]
    NotAuthenticated,

    /// A backup document is missing required fields or has the wrong shape.
    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    /// CSV rendering failed.
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl StorageError {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "E_QUOTA_EXCEEDED",
            Self::Serialization(_) => "E_SERIALIZATION",
            Self::Io(_) => "E_IO",
            Self::RemoteUnavailable(_) => "E_REMOTE_UNAVAILABLE",
            Self::Remote { .. } => "E_REMOTE",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
            Self::RateLimited(_) => "E_RATE_LIMITED",
            Self::ValidationFailed(_) => "E_VALIDATION",
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::InvalidBackup(_) => "E_INVALID_BACKUP",
            Self::Export(_) => "E_EXPORT",
        }
    }

    /// True when the failure came from the remote leg, so the local store
    /// can take over the same operation.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::Remote { .. } | Self::MalformedResponse(_) | Self::RateLimited(_)
        )
    }

    /// True when retrying the same request later could succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::RateLimited(_) | Self::Remote { status: 429 | 500..=599, .. }
        )
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
