//! Turns one lifecycle change into durable notifications and live events.

use common::{CourierId, OrderId, UserId};
use order_store::{NewNotification, Notification, NotificationStore, Order};
use realtime::{Event, EventKind, LocationUpdate, Publisher, Room};
use serde_json::json;

use crate::error::Result;
use crate::report::DispatchReport;

/// Fans lifecycle changes out to customers, couriers and administrators.
///
/// Store-then-notify: every notification row is written before the matching
/// live event is emitted, and a failed write aborts the dispatch. Live
/// events are best-effort.
pub struct NotificationDispatcher<N, P> {
    store: N,
    publisher: P,
}

impl<N: NotificationStore, P: Publisher> NotificationDispatcher<N, P> {
    pub fn new(store: N, publisher: P) -> Self {
        Self { store, publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    fn emit(&self, report: &mut DispatchReport, room: Room, event: Event) {
        let kind = event.event;
        let delivered = self.publisher.emit(room, event);
        report.record(room, kind, delivered);
    }

    /// Persists a notification, then pushes it to the recipient's room.
    async fn persist_and_push(
        &self,
        report: &mut DispatchReport,
        notification: NewNotification,
    ) -> Result<Notification> {
        let notification = self.store.insert_notification(notification).await?;
        metrics::counter!("notifications_persisted_total").increment(1);
        report.notifications.push(notification.id);

        let event = Event::from_payload(EventKind::NotificationNew, &notification)?;
        self.emit(report, Room::User(notification.recipient), event);
        Ok(notification)
    }

    fn order_event(kind: EventKind, order: &Order) -> Result<Event> {
        Ok(Event::new(
            kind,
            json!({
                "order_id": order.id,
                "order_number": order.order_number,
                "order_state": order.order_state,
                "delivery_state": order.delivery_state,
                "customer_id": order.customer_id,
                "courier_id": order.courier_id,
                "order": serde_json::to_value(order)?,
            }),
        ))
    }

    /// A new order was placed.
    #[tracing::instrument(skip_all, fields(order_id = %order.id))]
    pub fn order_created(&self, order: &Order) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        self.emit(
            &mut report,
            Room::ADMINS,
            Self::order_event(EventKind::OrderNew, order)?,
        );
        Ok(report)
    }

    /// An order was transitioned; `previous_courier` is the courier read
    /// before the write.
    #[tracing::instrument(skip_all, fields(order_id = %order.id))]
    pub async fn order_updated(
        &self,
        order: &Order,
        previous_courier: Option<CourierId>,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        let updated = Self::order_event(EventKind::OrderUpdated, order)?;

        if let Some(customer) = order.customer_id {
            let notification = NewNotification::order(
                customer,
                "Order status updated",
                format!(
                    "Your order {} is now {}",
                    order.order_number, order.order_state
                ),
            );
            self.persist_and_push(&mut report, notification).await?;
            self.emit(&mut report, Room::User(customer), updated.clone());
        }

        let newly_assigned = order
            .courier_id
            .filter(|courier| previous_courier != Some(*courier));

        match (newly_assigned, order.courier_id) {
            (Some(courier), _) => {
                let notification = NewNotification::order(
                    courier.as_user(),
                    "New order assigned",
                    format!("Order {} has been assigned to you", order.order_number),
                );
                self.persist_and_push(&mut report, notification).await?;
                self.emit(
                    &mut report,
                    Room::User(courier.as_user()),
                    Self::order_event(EventKind::OrderAssigned, order)?,
                );
                self.emit(
                    &mut report,
                    Room::ADMINS,
                    Self::order_event(EventKind::OrderCourierAssigned, order)?,
                );
            }
            (None, Some(courier)) => {
                self.emit(&mut report, Room::User(courier.as_user()), updated.clone());
            }
            (None, None) => {}
        }

        self.emit(&mut report, Room::ADMINS, updated);

        tracing::debug!(
            notifications = report.notifications.len(),
            delivered = report.total_delivered(),
            "order update dispatched"
        );
        Ok(report)
    }

    /// An order was soft-deleted.
    pub fn order_deleted(&self, order_id: OrderId) -> DispatchReport {
        let mut report = DispatchReport::default();
        self.emit(
            &mut report,
            Room::ADMINS,
            Event::new(
                EventKind::OrderUpdated,
                json!({ "order_id": order_id, "deleted": true }),
            ),
        );
        report
    }

    /// A soft-deleted order was restored.
    pub fn order_restored(&self, order: &Order) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        self.emit(
            &mut report,
            Room::ADMINS,
            Self::order_event(EventKind::OrderUpdated, order)?,
        );
        Ok(report)
    }

    /// Relays a courier's position to the order's customer and the admins.
    pub fn courier_location(
        &self,
        order: &Order,
        courier: CourierId,
        update: &LocationUpdate,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let event = Event::new(
            EventKind::CourierLocation,
            json!({
                "order_id": order.id,
                "courier_id": courier,
                "lat": update.lat,
                "lng": update.lng,
            }),
        );

        if let Some(customer) = order.customer_id {
            self.emit(&mut report, Room::User(customer), event.clone());
        }
        self.emit(&mut report, Room::ADMINS, event);
        report
    }

    /// Sends a direct notification to one user.
    #[tracing::instrument(skip(self, title, message))]
    pub async fn notify_user(
        &self,
        recipient: UserId,
        title: String,
        message: String,
    ) -> Result<(Notification, DispatchReport)> {
        let mut report = DispatchReport::default();
        let notification = NewNotification {
            recipient,
            category: order_store::NotificationCategory::System,
            title,
            message,
        };
        let notification = self.persist_and_push(&mut report, notification).await?;
        Ok((notification, report))
    }
}
