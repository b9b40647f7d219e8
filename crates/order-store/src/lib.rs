//! Order store: the persisted source of truth for orders, their line items,
//! in-app notifications and courier staffing flags.
//!
//! Every default read excludes soft-deleted orders (`deleted_at IS NULL`).

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    Courier, DashboardStats, DeliveryAddress, NewNotification, NewOrder, NewOrderLine,
    Notification, NotificationCategory, Order, OrderChanges, OrderLine, Version,
};
pub use postgres::PostgresStore;
pub use query::OrderQuery;
pub use store::{Backend, CourierStore, NotificationStore, OrderStore};
