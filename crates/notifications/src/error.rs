//! Notification error types.

use domain::DomainError;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur while applying a change and fanning it out.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The lifecycle change itself was rejected or failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A notification could not be persisted.
    #[error("Notification store error: {0}")]
    Store(#[from] StoreError),

    /// An event payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotifyError>;
