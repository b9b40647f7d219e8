//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the tables before
//! each test, so they are serialized. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CourierId, DeliveryType, Money, OrderState, UserId};
use order_store::{
    Courier, CourierStore, DeliveryAddress, NewNotification, NewOrder, NewOrderLine,
    NotificationStore, OrderChanges, OrderQuery, OrderStore, PostgresStore, StoreError, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_orders.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_lines, orders, notifications, couriers RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn sample_order(number: &str, customer: Option<i64>) -> NewOrder {
    NewOrder {
        order_number: number.to_string(),
        customer_id: customer.map(UserId::new),
        delivery_type: DeliveryType::Delivery,
        address: DeliveryAddress {
            city_id: Some(1),
            municipality_id: Some(2),
            street: Some("Calle 8".to_string()),
            residence: Some("Casa azul".to_string()),
        },
        contact_name: "Luisa".to_string(),
        contact_phone: "555-0101".to_string(),
        description: Some("Ring twice".to_string()),
        payment_method: "Cash".to_string(),
        total: Money::from_cents(3150),
        lines: vec![
            NewOrderLine {
                menu_item_id: Some(1),
                product_id: None,
                name: "Pizza".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(1250),
                subtotal: Money::from_cents(1250),
                notes: None,
            },
            NewOrderLine {
                menu_item_id: None,
                product_id: Some(9),
                name: "Soda".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(950),
                subtotal: Money::from_cents(1900),
                notes: Some("cold".to_string()),
            },
        ],
    }
}

fn courier(id: i64) -> Courier {
    Courier {
        id: CourierId::new(id),
        first_name: "Pedro".to_string(),
        last_name: "Paz".to_string(),
        phone: "555-0199".to_string(),
        available: true,
        on_duty: true,
    }
}

#[tokio::test]
#[serial]
async fn insert_and_read_back_order_with_lines() {
    let store = get_test_store().await;

    let order = store
        .insert_order(sample_order("ORD-PG-1", Some(5)))
        .await
        .unwrap();

    assert_eq!(order.version, Version::first());
    assert_eq!(order.order_state, OrderState::Ordered);
    assert_eq!(order.total, Money::from_cents(3150));
    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.lines[1].quantity, 2);
    assert_eq!(order.lines[1].notes.as_deref(), Some("cold"));

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded, order);
}

#[tokio::test]
#[serial]
async fn duplicate_order_number_leaves_no_partial_rows() {
    let store = get_test_store().await;
    store
        .insert_order(sample_order("ORD-PG-DUP", None))
        .await
        .unwrap();

    let result = store.insert_order(sample_order("ORD-PG-DUP", None)).await;
    assert!(matches!(result, Err(StoreError::Database(_))));

    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_lines")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(lines, 2);
}

#[tokio::test]
#[serial]
async fn update_guards_on_version() {
    let store = get_test_store().await;
    store.upsert_courier(courier(7)).await.unwrap();
    let order = store
        .insert_order(sample_order("ORD-PG-2", Some(5)))
        .await
        .unwrap();

    let updated = store
        .update_order(
            order.id,
            OrderChanges {
                order_state: Some(OrderState::Preparing),
                courier_id: Some(Some(CourierId::new(7))),
                estimated_minutes: Some(30),
                ..Default::default()
            },
            Version::first(),
        )
        .await
        .unwrap();
    assert_eq!(updated.version, Version::new(2));
    assert_eq!(updated.courier_name.as_deref(), Some("Pedro Paz"));
    assert_eq!(updated.estimated_minutes, Some(30));

    let stale = store
        .update_order(
            order.id,
            OrderChanges {
                order_state: Some(OrderState::Cancelled),
                ..Default::default()
            },
            Version::first(),
        )
        .await;
    assert!(matches!(
        stale,
        Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(2)
    ));

    let cleared = store
        .update_order(
            order.id,
            OrderChanges {
                courier_id: Some(None),
                delivered_at: Some(Utc::now()),
                ..Default::default()
            },
            Version::new(2),
        )
        .await
        .unwrap();
    assert!(cleared.courier_id.is_none());
    assert!(cleared.courier_name.is_none());
    assert!(cleared.delivered_at.is_some());
}

#[tokio::test]
#[serial]
async fn soft_delete_and_restore() {
    let store = get_test_store().await;
    let order = store
        .insert_order(sample_order("ORD-PG-3", Some(5)))
        .await
        .unwrap();

    store.soft_delete_order(order.id).await.unwrap();
    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert!(
        store
            .list_orders(OrderQuery::new())
            .await
            .unwrap()
            .is_empty()
    );

    let update = store
        .update_order(
            order.id,
            OrderChanges {
                estimated_minutes: Some(5),
                ..Default::default()
            },
            Version::first(),
        )
        .await;
    assert!(matches!(update, Err(StoreError::NotFound { .. })));

    let restored = store.restore_order(order.id).await.unwrap();
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.lines.len(), 2);
}

#[tokio::test]
#[serial]
async fn list_filters_by_customer_and_paginates() {
    let store = get_test_store().await;
    for (i, customer) in [1, 2, 1, 1].into_iter().enumerate() {
        store
            .insert_order(sample_order(&format!("ORD-PG-L{i}"), Some(customer)))
            .await
            .unwrap();
    }

    let mine = store
        .list_orders(OrderQuery::for_customer(UserId::new(1)))
        .await
        .unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|o| o.lines.len() == 2));
    assert!(mine.windows(2).all(|w| w[0].id > w[1].id));

    let page = store
        .list_orders(OrderQuery::for_customer(UserId::new(1)).limit(2).offset(2))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
#[serial]
async fn dashboard_stats_aggregate_today() {
    let store = get_test_store().await;
    store.upsert_courier(courier(1)).await.unwrap();

    let a = store
        .insert_order(sample_order("ORD-PG-S1", None))
        .await
        .unwrap();
    store
        .insert_order(sample_order("ORD-PG-S2", None))
        .await
        .unwrap();
    store
        .update_order(
            a.id,
            OrderChanges {
                order_state: Some(OrderState::Cancelled),
                ..Default::default()
            },
            Version::first(),
        )
        .await
        .unwrap();

    let stats = store
        .dashboard_stats(Utc::now().date_naive())
        .await
        .unwrap();
    assert_eq!(stats.orders_today, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.sales_today, Money::from_cents(3150));
    assert_eq!(stats.active_couriers, 1);
}

#[tokio::test]
#[serial]
async fn notifications_round_trip() {
    let store = get_test_store().await;
    let user = UserId::new(3);

    let n = store
        .insert_notification(NewNotification::order(user, "Hello", "World"))
        .await
        .unwrap();
    assert!(!n.read);
    assert_eq!(store.unread_count(user).await.unwrap(), 1);

    let read = store.mark_notification_read(user, n.id).await.unwrap();
    assert!(read.read);
    assert_eq!(store.unread_count(user).await.unwrap(), 0);
    assert!(
        store
            .list_notifications(user, true, 10)
            .await
            .unwrap()
            .is_empty()
    );

    let other = store.mark_notification_read(UserId::new(4), n.id).await;
    assert!(matches!(other, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn courier_status_is_partially_updated() {
    let store = get_test_store().await;
    store.upsert_courier(courier(2)).await.unwrap();

    let updated = store
        .set_courier_status(CourierId::new(2), Some(false), None)
        .await
        .unwrap();
    assert!(!updated.available);
    assert!(updated.on_duty);
    assert_eq!(store.list_couriers().await.unwrap().len(), 1);
}
