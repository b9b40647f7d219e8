//! Order lifecycle: placement, transitions and their validation.

mod commands;
mod engine;
mod number;
mod transition;

pub use commands::{
    MAX_ESTIMATED_MINUTES, MAX_LINE_QUANTITY, OrderPatch, PlaceOrder, PlaceOrderLine,
};
pub use engine::{LifecycleEngine, TransitionOutcome};
pub use number::{generate_order_number, is_order_number};
pub use transition::plan_transition;

use common::{CourierId, Money, OrderState};
use thiserror::Error;

/// Reasons a placement or a patch is rejected as an invalid request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// Order has no lines.
    #[error("Order has no lines")]
    NoLines,

    #[error(
        "Line {line}: invalid quantity {quantity} (must be between 1 and {max})",
        max = MAX_LINE_QUANTITY
    )]
    InvalidQuantity { line: usize, quantity: u32 },

    #[error("Line {line}: invalid unit price {price} (must be greater than 0)")]
    InvalidPrice { line: usize, price: Money },

    /// A line must reference either a menu item or a product, not both.
    #[error("Line {line}: must reference exactly one menu item or product")]
    AmbiguousItem { line: usize },

    #[error("No fields to update")]
    EmptyPatch,

    /// Line amounts do not fit the money range.
    #[error("Order total is too large")]
    TotalOverflow,

    #[error(
        "Invalid estimate of {minutes} minutes (must be between 1 and {max})",
        max = MAX_ESTIMATED_MINUTES
    )]
    InvalidEstimate { minutes: u32 },

    #[error("Cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderState, to: OrderState },

    #[error("Courier {0} does not exist")]
    UnknownCourier(CourierId),
}
