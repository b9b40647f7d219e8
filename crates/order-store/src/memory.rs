use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{CourierId, NotificationId, OrderId, OrderLineId, OrderState, UserId};
use tokio::sync::RwLock;

use crate::{
    Courier, CourierStore, DashboardStats, NewNotification, NewOrder, Notification,
    NotificationStore, Order, OrderChanges, OrderLine, OrderQuery, OrderStore, Result,
    StoreError, Version,
};

#[derive(Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    notifications: BTreeMap<NotificationId, Notification>,
    couriers: BTreeMap<CourierId, Courier>,
    last_order_id: i64,
    last_line_id: i64,
    last_notification_id: i64,
}

impl Tables {
    /// Returns a copy of a live order with joined display fields filled in.
    fn hydrate(&self, order: &Order) -> Order {
        let mut order = order.clone();
        order.courier_name = order
            .courier_id
            .and_then(|id| self.couriers.get(&id))
            .map(Courier::display_name);
        order
    }

    fn live_order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id).filter(|o| !o.is_deleted())
    }
}

/// In-memory order store.
///
/// Keeps every table behind one lock so multi-row writes are atomic, and
/// provides the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of order rows, including soft-deleted ones.
    pub async fn order_row_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;

        tables.last_order_id += 1;
        let id = OrderId::new(tables.last_order_id);

        let mut lines = Vec::with_capacity(new.lines.len());
        for line in new.lines {
            tables.last_line_id += 1;
            lines.push(OrderLine {
                id: OrderLineId::new(tables.last_line_id),
                order_id: id,
                menu_item_id: line.menu_item_id,
                product_id: line.product_id,
                name: line.name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
                notes: line.notes,
            });
        }

        let now = Utc::now();
        let order = Order {
            id,
            order_number: new.order_number,
            customer_id: new.customer_id,
            delivery_type: new.delivery_type,
            address: new.address,
            contact_name: new.contact_name,
            contact_phone: new.contact_phone,
            description: new.description,
            payment_method: new.payment_method,
            total: new.total,
            order_state: OrderState::default(),
            delivery_state: Default::default(),
            courier_id: None,
            courier_name: None,
            estimated_minutes: None,
            version: Version::first(),
            created_at: now,
            updated_at: now,
            delivered_at: None,
            deleted_at: None,
            lines,
        };
        tables.orders.insert(id, order.clone());

        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.live_order(id).map(|o| tables.hydrate(o)))
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<&Order> = tables
            .orders
            .values()
            .filter(|o| {
                if o.is_deleted() {
                    return false;
                }
                if let Some(customer) = query.customer_id
                    && o.customer_id != Some(customer)
                {
                    return false;
                }
                if let Some(courier) = query.courier_id
                    && o.courier_id != Some(courier)
                {
                    return false;
                }
                if let Some(state) = query.order_state
                    && o.order_state != state
                {
                    return false;
                }
                if let Some(delivery_type) = query.delivery_type
                    && o.delivery_type != delivery_type
                {
                    return false;
                }
                true
            })
            .collect();

        // Newest first; ids break ties between orders created in the same instant.
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(orders
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.effective_limit())
            .map(|o| tables.hydrate(o))
            .collect())
    }

    async fn update_order(
        &self,
        id: OrderId,
        changes: OrderChanges,
        expected_version: Version,
    ) -> Result<Order> {
        let mut tables = self.tables.write().await;

        let order = tables
            .orders
            .get_mut(&id)
            .filter(|o| !o.is_deleted())
            .ok_or_else(|| StoreError::order_not_found(id))?;

        if order.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_id: id,
                expected: expected_version,
                actual: order.version,
            });
        }

        changes.apply_to(order);
        order.version = order.version.next();
        order.updated_at = Utc::now();

        let order = order.clone();
        Ok(tables.hydrate(&order))
    }

    async fn soft_delete_order(&self, id: OrderId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .filter(|o| !o.is_deleted())
            .ok_or_else(|| StoreError::order_not_found(id))?;

        let now = Utc::now();
        order.deleted_at = Some(now);
        order.updated_at = now;
        Ok(())
    }

    async fn restore_order(&self, id: OrderId) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::order_not_found(id))?;

        order.deleted_at = None;
        order.updated_at = Utc::now();

        let order = order.clone();
        Ok(tables.hydrate(&order))
    }

    async fn dashboard_stats(&self, day: NaiveDate) -> Result<DashboardStats> {
        let tables = self.tables.read().await;
        let mut stats = DashboardStats::default();

        for order in tables.orders.values().filter(|o| !o.is_deleted()) {
            let today = order.created_at.date_naive() == day;
            if today {
                stats.orders_today += 1;
                if order.order_state != OrderState::Cancelled {
                    stats.sales_today += order.total;
                }
                if order.order_state == OrderState::Delivered {
                    stats.delivered_today += 1;
                }
            }
            if order.order_state.is_pending() {
                stats.pending += 1;
            }
            if order.order_state == OrderState::EnRoute {
                stats.en_route += 1;
            }
        }
        stats.active_couriers = tables.couriers.values().filter(|c| c.is_active()).count() as i64;

        Ok(stats)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, new: NewNotification) -> Result<Notification> {
        let mut tables = self.tables.write().await;
        tables.last_notification_id += 1;
        let notification = Notification {
            id: NotificationId::new(tables.last_notification_id),
            recipient: new.recipient,
            category: new.category,
            title: new.title,
            message: new.message,
            read: false,
            created_at: Utc::now(),
        };
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .rev()
            .filter(|n| n.recipient == recipient && !(unread_only && n.read))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<Notification> {
        let mut tables = self.tables.write().await;
        let notification = tables
            .notifications
            .get_mut(&id)
            .filter(|n| n.recipient == recipient)
            .ok_or(StoreError::NotFound {
                entity: "notification",
                id: id.as_i64(),
            })?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn unread_count(&self, recipient: UserId) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.recipient == recipient && !n.read)
            .count() as i64)
    }
}

#[async_trait]
impl CourierStore for InMemoryStore {
    async fn upsert_courier(&self, courier: Courier) -> Result<Courier> {
        let mut tables = self.tables.write().await;
        tables.couriers.insert(courier.id, courier.clone());
        Ok(courier)
    }

    async fn get_courier(&self, id: CourierId) -> Result<Option<Courier>> {
        Ok(self.tables.read().await.couriers.get(&id).cloned())
    }

    async fn list_couriers(&self) -> Result<Vec<Courier>> {
        Ok(self.tables.read().await.couriers.values().cloned().collect())
    }

    async fn set_courier_status(
        &self,
        id: CourierId,
        available: Option<bool>,
        on_duty: Option<bool>,
    ) -> Result<Courier> {
        let mut tables = self.tables.write().await;
        let courier = tables.couriers.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "courier",
            id: id.as_i64(),
        })?;
        if let Some(available) = available {
            courier.available = available;
        }
        if let Some(on_duty) = on_duty {
            courier.on_duty = on_duty;
        }
        Ok(courier.clone())
    }
}
