use async_trait::async_trait;
use chrono::NaiveDate;
use common::{CourierId, NotificationId, OrderId, UserId};

use crate::{
    Courier, DashboardStats, NewNotification, NewOrder, Notification, Order, OrderChanges,
    OrderQuery, Result, Version,
};

/// Persistence for orders and their line items.
///
/// All implementations must be thread-safe (Send + Sync). Reads never return
/// soft-deleted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order together with all of its lines.
    ///
    /// The order row and the line rows are written atomically: either all of
    /// them are committed or none are. Returns the rehydrated order at
    /// [`Version::first`].
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads a live order by identity.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists live orders matching a query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Applies `changes` if the stored row is still at `expected_version`.
    ///
    /// Fails with `NotFound` when the order is missing or tombstoned and with
    /// `ConcurrencyConflict` when another writer got there first. On success
    /// the version is bumped and the rehydrated order is returned.
    async fn update_order(
        &self,
        id: OrderId,
        changes: OrderChanges,
        expected_version: Version,
    ) -> Result<Order>;

    /// Sets the tombstone timestamp. Fails with `NotFound` if the order is
    /// missing or already deleted.
    async fn soft_delete_order(&self, id: OrderId) -> Result<()>;

    /// Clears the tombstone timestamp and returns the live order again.
    async fn restore_order(&self, id: OrderId) -> Result<Order>;

    /// Dashboard figures for the given UTC day.
    async fn dashboard_stats(&self, day: NaiveDate) -> Result<DashboardStats>;
}

/// Persistence for the in-app notification inbox.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification>;

    /// Lists a recipient's notifications, newest first.
    async fn list_notifications(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>>;

    /// Marks one of the recipient's notifications as read.
    ///
    /// Fails with `NotFound` if the id does not belong to the recipient.
    async fn mark_notification_read(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<Notification>;

    async fn unread_count(&self, recipient: UserId) -> Result<i64>;
}

/// Persistence for courier records and staffing flags.
#[async_trait]
pub trait CourierStore: Send + Sync {
    /// Creates the courier or replaces every field of an existing one.
    async fn upsert_courier(&self, courier: Courier) -> Result<Courier>;

    async fn get_courier(&self, id: CourierId) -> Result<Option<Courier>>;

    async fn list_couriers(&self) -> Result<Vec<Courier>>;

    /// Updates whichever flags are given.
    async fn set_courier_status(
        &self,
        id: CourierId,
        available: Option<bool>,
        on_duty: Option<bool>,
    ) -> Result<Courier>;
}

/// Everything the application needs from one persistence backend.
pub trait Backend: OrderStore + NotificationStore + CourierStore + Clone + 'static {}

impl<T> Backend for T where T: OrderStore + NotificationStore + CourierStore + Clone + 'static {}
