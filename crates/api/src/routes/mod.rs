//! HTTP route handlers.

pub mod admin;
pub mod couriers;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod ws;
