//! Domain layer for restaurant orders.
//!
//! This crate provides:
//! - Order placement with validation and frozen totals
//! - The lifecycle engine applying guarded state transitions
//! - Human-readable order number generation

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    LifecycleEngine, MAX_ESTIMATED_MINUTES, MAX_LINE_QUANTITY, OrderError, OrderPatch, PlaceOrder,
    PlaceOrderLine, TransitionOutcome, generate_order_number, is_order_number, plan_transition,
};
