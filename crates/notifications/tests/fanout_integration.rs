//! Integration tests for lifecycle fan-out.
//!
//! These tests wire the coordinator to the in-memory store and a live room
//! hub, then check which rooms receive which events and which notifications
//! are persisted.

use async_trait::async_trait;
use common::{CourierId, DeliveryType, Money, NotificationId, OrderId, OrderState, Role, UserId};
use domain::{DomainError, OrderPatch, PlaceOrder, PlaceOrderLine};
use notifications::{NotificationDispatcher, NotifyError, OrderCoordinator};
use order_store::{
    Courier, CourierStore, DeliveryAddress, InMemoryStore, NewNotification, Notification,
    NotificationStore, OrderStore, StoreError,
};
use realtime::{Connection, EventKind, LocationUpdate, Room, RoomHub};

const CUSTOMER: UserId = UserId::new(5);
const COURIER: CourierId = CourierId::new(7);

async fn setup() -> (OrderCoordinator<InMemoryStore, RoomHub>, RoomHub) {
    let store = InMemoryStore::new();
    store
        .upsert_courier(Courier {
            id: COURIER,
            first_name: "Pedro".to_string(),
            last_name: "Paz".to_string(),
            phone: "555-0199".to_string(),
            available: true,
            on_duty: true,
        })
        .await
        .unwrap();
    let hub = RoomHub::new();
    (OrderCoordinator::new(store, hub.clone()), hub)
}

fn connect(hub: &RoomHub, user: UserId, role: Role) -> Connection {
    let mut conn = hub.connect();
    for room in Room::memberships(user, role) {
        conn.join(room);
    }
    conn
}

fn drain(conn: &mut Connection) -> Vec<EventKind> {
    let mut events = Vec::new();
    while let Some(event) = conn.try_recv() {
        events.push(event.event);
    }
    events
}

fn two_item_delivery() -> PlaceOrder {
    PlaceOrder {
        delivery_type: DeliveryType::Delivery,
        address: DeliveryAddress {
            city_id: Some(1),
            municipality_id: Some(2),
            street: Some("Calle 8".to_string()),
            residence: Some("Casa 3".to_string()),
        },
        contact_name: "Luisa".to_string(),
        contact_phone: "555-0101".to_string(),
        description: None,
        payment_method: "Cash".to_string(),
        lines: vec![
            PlaceOrderLine::menu_item(1, "Pizza", 1, Money::from_cents(1250)),
            PlaceOrderLine::menu_item(2, "Burger", 2, Money::from_cents(950)),
        ],
    }
}

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn place_then_assign_courier() {
        let (coordinator, hub) = setup().await;
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);
        let mut customer = connect(&hub, CUSTOMER, Role::Customer);
        let mut courier = connect(&hub, COURIER.as_user(), Role::Courier);

        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();
        assert_eq!(order.total, Money::from_cents(3150));
        assert_eq!(drain(&mut admin), vec![EventKind::OrderNew]);
        assert!(drain(&mut customer).is_empty());

        let (outcome, report) = coordinator
            .transition(order.id, OrderPatch::new().assign_courier(COURIER))
            .await
            .unwrap();

        assert_eq!(outcome.order.order_state, OrderState::Preparing);
        assert_eq!(
            drain(&mut courier),
            vec![EventKind::NotificationNew, EventKind::OrderAssigned]
        );
        assert_eq!(
            drain(&mut admin),
            vec![EventKind::OrderCourierAssigned, EventKind::OrderUpdated]
        );
        assert_eq!(
            drain(&mut customer),
            vec![EventKind::NotificationNew, EventKind::OrderUpdated]
        );
        assert_eq!(report.notifications.len(), 2);
    }

    #[tokio::test]
    async fn events_carry_order_fields() {
        let (coordinator, hub) = setup().await;
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);

        let (order, _) = coordinator
            .place_order(two_item_delivery(), None)
            .await
            .unwrap();

        let event = admin.recv().await.unwrap();
        assert_eq!(event.event, EventKind::OrderNew);
        assert_eq!(event.data["order_id"], order.id.as_i64());
        assert_eq!(event.data["order_state"], "Ordered");
        assert_eq!(event.data["order"]["order_number"], order.order_number);
    }
}

mod dispatch_rules {
    use super::*;

    #[tokio::test]
    async fn customer_is_notified_with_state_message() {
        let (coordinator, _hub) = setup().await;
        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();

        coordinator
            .transition(
                order.id,
                OrderPatch::new().order_state(OrderState::Preparing),
            )
            .await
            .unwrap();

        let inbox = coordinator
            .store()
            .list_notifications(CUSTOMER, false, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "Order status updated");
        assert_eq!(
            inbox[0].message,
            format!("Your order {} is now Preparing", order.order_number)
        );
    }

    #[tokio::test]
    async fn guest_order_notifies_admins_only() {
        let (coordinator, hub) = setup().await;
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);
        let (order, _) = coordinator
            .place_order(two_item_delivery(), None)
            .await
            .unwrap();
        drain(&mut admin);

        let (_, report) = coordinator
            .transition(order.id, OrderPatch::new().estimated_minutes(30))
            .await
            .unwrap();

        assert!(report.notifications.is_empty());
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(drain(&mut admin), vec![EventKind::OrderUpdated]);
    }

    #[tokio::test]
    async fn already_assigned_courier_gets_plain_update() {
        let (coordinator, hub) = setup().await;
        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();
        coordinator
            .transition(order.id, OrderPatch::new().assign_courier(COURIER))
            .await
            .unwrap();
        let mut courier = connect(&hub, COURIER.as_user(), Role::Courier);

        let (_, report) = coordinator
            .transition(
                order.id,
                OrderPatch::new().order_state(OrderState::ReadyForPickup),
            )
            .await
            .unwrap();

        assert_eq!(drain(&mut courier), vec![EventKind::OrderUpdated]);
        assert!(!report.emitted(Room::ADMINS, EventKind::OrderCourierAssigned));
        assert_eq!(report.notifications.len(), 1);
    }

    #[tokio::test]
    async fn undelivered_events_still_persist_notifications() {
        let (coordinator, _hub) = setup().await;
        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();

        let (_, report) = coordinator
            .transition(order.id, OrderPatch::new().assign_courier(COURIER))
            .await
            .unwrap();

        assert_eq!(report.total_delivered(), 0);
        assert_eq!(
            coordinator
                .store()
                .unread_count(COURIER.as_user())
                .await
                .unwrap(),
            1
        );
        assert_eq!(coordinator.store().unread_count(CUSTOMER).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_transition_dispatches_nothing() {
        let (coordinator, hub) = setup().await;
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);
        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();
        drain(&mut admin);

        let result = coordinator.transition(order.id, OrderPatch::new()).await;

        assert!(matches!(
            result,
            Err(NotifyError::Domain(DomainError::Order(_)))
        ));
        assert!(drain(&mut admin).is_empty());
        assert_eq!(coordinator.store().unread_count(CUSTOMER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn soft_delete_and_restore_notify_admins() {
        let (coordinator, hub) = setup().await;
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);
        let (order, _) = coordinator
            .place_order(two_item_delivery(), None)
            .await
            .unwrap();
        drain(&mut admin);

        coordinator.soft_delete(order.id).await.unwrap();
        let deleted = admin.recv().await.unwrap();
        assert_eq!(deleted.event, EventKind::OrderUpdated);
        assert_eq!(deleted.data["deleted"], true);

        coordinator.restore(order.id).await.unwrap();
        assert_eq!(drain(&mut admin), vec![EventKind::OrderUpdated]);
    }
}

mod courier_location {
    use super::*;

    #[tokio::test]
    async fn assigned_courier_location_reaches_customer_and_admins() {
        let (coordinator, hub) = setup().await;
        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();
        coordinator
            .transition(order.id, OrderPatch::new().assign_courier(COURIER))
            .await
            .unwrap();
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);
        let mut customer = connect(&hub, CUSTOMER, Role::Customer);

        let report = coordinator
            .relay_courier_location(
                COURIER,
                LocationUpdate {
                    order_id: order.id,
                    lat: 10.49,
                    lng: -66.88,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.total_delivered(), 2);
        let event = customer.recv().await.unwrap();
        assert_eq!(event.event, EventKind::CourierLocation);
        assert_eq!(event.data["lat"], 10.49);
        assert_eq!(drain(&mut admin), vec![EventKind::CourierLocation]);
    }

    #[tokio::test]
    async fn other_couriers_are_ignored() {
        let (coordinator, hub) = setup().await;
        let (order, _) = coordinator
            .place_order(two_item_delivery(), Some(CUSTOMER))
            .await
            .unwrap();
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);

        let report = coordinator
            .relay_courier_location(
                CourierId::new(8),
                LocationUpdate {
                    order_id: order.id,
                    lat: 0.0,
                    lng: 0.0,
                },
            )
            .await
            .unwrap();

        assert!(report.is_none());
        assert!(drain(&mut admin).is_empty());

        let unknown = coordinator
            .relay_courier_location(
                COURIER,
                LocationUpdate {
                    order_id: OrderId::new(999),
                    lat: 0.0,
                    lng: 0.0,
                },
            )
            .await
            .unwrap();
        assert!(unknown.is_none());
    }
}

mod persistence_failure {
    use super::*;

    /// Notification store whose writes always fail.
    struct FailingStore;

    #[async_trait]
    impl NotificationStore for FailingStore {
        async fn insert_notification(
            &self,
            _notification: NewNotification,
        ) -> order_store::Result<Notification> {
            Err(StoreError::InvalidRecord("disk full".to_string()))
        }

        async fn list_notifications(
            &self,
            _recipient: UserId,
            _unread_only: bool,
            _limit: usize,
        ) -> order_store::Result<Vec<Notification>> {
            Ok(Vec::new())
        }

        async fn mark_notification_read(
            &self,
            _recipient: UserId,
            id: NotificationId,
        ) -> order_store::Result<Notification> {
            Err(StoreError::NotFound {
                entity: "notification",
                id: id.as_i64(),
            })
        }

        async fn unread_count(&self, _recipient: UserId) -> order_store::Result<i64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn failed_write_aborts_before_live_emit() {
        let store = InMemoryStore::new();
        let hub = RoomHub::new();
        let mut customer = connect(&hub, CUSTOMER, Role::Customer);
        let mut admin = connect(&hub, UserId::new(1), Role::Admin);

        let order = store
            .insert_order(
                two_item_delivery()
                    .into_new_order("ORD-X-AAAAAAAA".to_string(), Some(CUSTOMER))
                    .unwrap(),
            )
            .await
            .unwrap();

        let dispatcher = NotificationDispatcher::new(FailingStore, hub.clone());
        let result = dispatcher.order_updated(&order, None).await;

        assert!(matches!(result, Err(NotifyError::Store(_))));
        assert!(drain(&mut customer).is_empty());
        assert!(drain(&mut admin).is_empty());
    }

    #[tokio::test]
    async fn direct_notification_is_persisted_and_pushed() {
        let store = InMemoryStore::new();
        let hub = RoomHub::new();
        let mut customer = connect(&hub, CUSTOMER, Role::Customer);
        let dispatcher = NotificationDispatcher::new(store.clone(), hub);

        let (notification, report) = dispatcher
            .notify_user(CUSTOMER, "Promo".to_string(), "2x1 today".to_string())
            .await
            .unwrap();

        assert_eq!(report.notifications, vec![notification.id]);
        let event = customer.recv().await.unwrap();
        assert_eq!(event.event, EventKind::NotificationNew);
        assert_eq!(event.data["title"], "Promo");
        assert_eq!(store.unread_count(CUSTOMER).await.unwrap(), 1);
    }
}
