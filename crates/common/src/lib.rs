//! Shared types used across the order system crates.
//!
//! - Identifiers for orders, users, couriers and notifications
//! - Session roles
//! - [`Money`] in integer cents
//! - Order and delivery state enums, including the order state allow-list

pub mod money;
pub mod state;
pub mod types;

pub use money::{Money, ParseMoneyError};
pub use state::{DeliveryState, DeliveryType, OrderState, ParseEnumError};
pub use types::{CourierId, NotificationId, OrderId, OrderLineId, Role, UserId};
