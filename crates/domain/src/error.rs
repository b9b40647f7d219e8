//! Domain error types.

use common::OrderId;
use order_store::{StoreError, Version};
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request was rejected before anything was written.
    #[error("Invalid request: {0}")]
    Order(#[from] OrderError),

    /// The order does not exist or has been soft-deleted.
    #[error("Order {0} not found")]
    NotFound(OrderId),

    /// The order changed since the caller (or the engine) read it.
    #[error("Order {order_id} was modified concurrently: expected version {expected}, found {actual}")]
    Conflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// An error occurred in the order store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, DomainError::Order(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: "order",
                id,
            } => DomainError::NotFound(OrderId::new(id)),
            StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            } => DomainError::Conflict {
                order_id,
                expected,
                actual,
            },
            other => DomainError::Store(other),
        }
    }
}
