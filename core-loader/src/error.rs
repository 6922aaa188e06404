//! # Loader Error Types
//!
//! Error taxonomy for the resource cache. Variants are `Clone` because a
//! coalesced operation settles once and every joined caller receives the
//! same error value.

use thiserror::Error;

/// Errors surfaced by the sample loader.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// The origin answered with a status other than success or 304.
    #[error("Network error: {status} {status_text}")]
    Network { status: u16, status_text: String },

    /// The exchange failed below the HTTP layer (DNS, refused connection,
    /// broken stream). No status code exists for these.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The caller's cancellation signal fired.
    #[error("Operation aborted")]
    Aborted,

    /// The decoding service rejected the payload.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The persistent store failed. Write-side failures are caught inside
    /// the fetch pipeline and never reach callers; read-side failures
    /// degrade to a network fetch.
    #[error("Store error: {0}")]
    Store(String),

    /// A 304 response arrived with no stored body on record and the
    /// recovery fetch also failed. `status` is 0 when the recovery attempt
    /// died below the HTTP layer.
    #[error("Cache inconsistency: recovery fetch failed with status {status} ({reason})")]
    Consistency { status: u16, reason: String },

    /// Should not occur in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoaderError {
    /// Stable classification string surfaced in `on_error` callbacks and
    /// `LoadingEvent::Failed`.
    pub fn error_type(&self) -> &'static str {
        match self {
            LoaderError::Network { .. } | LoaderError::Transport(_) => "network",
            LoaderError::Aborted => "abort",
            LoaderError::Decode(_) => "decode",
            LoaderError::Store(_) => "store",
            LoaderError::Consistency { .. } => "consistency",
            LoaderError::Internal(_) => "internal",
        }
    }

    /// Returns `true` if this error came from a cancellation signal.
    pub fn is_abort(&self) -> bool {
        matches!(self, LoaderError::Aborted)
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            LoaderError::Network { .. } | LoaderError::Transport(_)
        )
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
