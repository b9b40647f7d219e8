//! Notification fan-out for order lifecycle changes.
//!
//! The dispatcher persists in-app notifications and emits live events to
//! rooms; the coordinator chains the lifecycle engine to it.

pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod report;

pub use coordinator::OrderCoordinator;
pub use dispatcher::NotificationDispatcher;
pub use error::{NotifyError, Result};
pub use report::{Delivery, DispatchReport};
