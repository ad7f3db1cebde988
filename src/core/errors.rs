/*!
 * Error Types
 * Crate-level error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

pub use crate::core::sync::HandoffError;
pub use crate::dispatch::DispatchFailure;

/// Result type using the unified error
pub type SyncResult<T> = Result<T, SyncError>;

/// Unified error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum SyncError {
    #[error("Dispatch error: {0}")]
    #[diagnostic(transparent)]
    Dispatch(#[from] DispatchFailure),

    #[error("Handoff error: {0}")]
    #[diagnostic(
        code(handoff::misuse),
        help("Each channel carries one value. Use a fresh channel or reset() after consuming.")
    )]
    Handoff(#[from] HandoffError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(sync::configuration_error),
        help("Invalid configuration. Review the KERNEL_SYNC_* environment variables.")
    )]
    Configuration(String),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(sync::internal_error),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(String),
}

impl From<String> for SyncError {
    fn from(msg: String) -> Self {
        SyncError::Internal(msg)
    }
}

impl From<&str> for SyncError {
    fn from(msg: &str) -> Self {
        SyncError::Internal(msg.to_string())
    }
}
