use common::OrderId;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The id does not resolve to a live (non-tombstoned) row.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The row changed since the caller read it.
    #[error("Concurrency conflict for order {order_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// A stored value could not be mapped back onto the model.
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    /// A value does not fit its database column.
    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: u32 },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn order_not_found(id: OrderId) -> Self {
        StoreError::NotFound {
            entity: "order",
            id: id.as_i64(),
        }
    }
}

impl From<common::ParseEnumError> for StoreError {
    fn from(err: common::ParseEnumError) -> Self {
        StoreError::InvalidRecord(err.to_string())
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
