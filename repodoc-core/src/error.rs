//! Error taxonomy for the documentation pipeline.
//!
//! Which variants abort a run depends on where they surface: an
//! [`DocgenError::AuthenticationFailed`] or a listing failure ends the run, while
//! the same [`DocgenError::NetworkFailure`] raised for a single file or a single
//! repository is logged and skipped by the enclosing loop.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T, E = DocgenError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DocgenError {
    #[error("no access token configured")]
    MissingCredential,

    /// The identity check did not return a success status. 401, 403 and 5xx are
    /// deliberately folded together; the status is kept for diagnostics only.
    #[error("authentication failed{}", status_suffix(.status))]
    AuthenticationFailed { status: Option<u16> },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to decode {context}: {reason}")]
    DecodingFailed { context: String, reason: String },

    #[error("request to {url} failed{}: {reason}", status_suffix(.status))]
    NetworkFailure {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("generation cancelled")]
    Cancelled,

    #[error("failed to serialise documentation database: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocgenError {
    pub(crate) fn decoding(context: impl Into<String>, reason: impl ToString) -> Self {
        DocgenError::DecodingFailed {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            DocgenError::AuthenticationFailed { status }
            | DocgenError::NetworkFailure { status, .. } => *status,
            _ => None,
        }
    }

    /// Per-file errors that extraction skips over rather than propagating.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DocgenError::FileNotFound { .. }
                | DocgenError::DecodingFailed { .. }
                | DocgenError::NetworkFailure { .. }
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}
