use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{CourierId, Money, NotificationId, OrderId, OrderLineId, UserId};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    Courier, CourierStore, DashboardStats, DeliveryAddress, NewNotification, NewOrder,
    Notification, NotificationStore, Order, OrderChanges, OrderLine, OrderQuery, OrderStore,
    Result, StoreError, Version,
};

const ORDER_COLUMNS: &str = r#"
    o.id, o.order_number, o.customer_id, o.delivery_type, o.city_id, o.municipality_id,
    o.street, o.residence, o.contact_name, o.contact_phone, o.description, o.payment_method,
    o.total_cents, o.order_state, o.delivery_state, o.courier_id,
    c.first_name || ' ' || c.last_name AS courier_name,
    o.estimated_minutes, o.version, o.created_at, o.updated_at, o.delivered_at, o.deleted_at
"#;

const ORDER_FROM: &str = "FROM orders o LEFT JOIN couriers c ON c.id = o.courier_id";

/// Converts a count to an `INTEGER` column value without wrapping.
fn int_column(field: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange { field, value })
}

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let estimated_minutes: Option<i32> = row.try_get("estimated_minutes")?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            order_number: row.try_get("order_number")?,
            customer_id: row.try_get::<Option<i64>, _>("customer_id")?.map(UserId::new),
            delivery_type: row.try_get::<String, _>("delivery_type")?.parse()?,
            address: DeliveryAddress {
                city_id: row.try_get("city_id")?,
                municipality_id: row.try_get("municipality_id")?,
                street: row.try_get("street")?,
                residence: row.try_get("residence")?,
            },
            contact_name: row.try_get("contact_name")?,
            contact_phone: row.try_get("contact_phone")?,
            description: row.try_get("description")?,
            payment_method: row.try_get("payment_method")?,
            total: Money::from_cents(row.try_get("total_cents")?),
            order_state: row.try_get::<String, _>("order_state")?.parse()?,
            delivery_state: row.try_get::<String, _>("delivery_state")?.parse()?,
            courier_id: row.try_get::<Option<i64>, _>("courier_id")?.map(CourierId::new),
            courier_name: row.try_get("courier_name")?,
            estimated_minutes: estimated_minutes.map(|m| m.max(0) as u32),
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            delivered_at: row.try_get("delivered_at")?,
            deleted_at: row.try_get("deleted_at")?,
            lines: Vec::new(),
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLine> {
        let quantity: i32 = row.try_get("quantity")?;

        Ok(OrderLine {
            id: OrderLineId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            menu_item_id: row.try_get("menu_item_id")?,
            product_id: row.try_get("product_id")?,
            name: row.try_get("name")?,
            quantity: quantity.max(0) as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            notes: row.try_get("notes")?,
        })
    }

    fn row_to_notification(row: &PgRow) -> Result<Notification> {
        Ok(Notification {
            id: NotificationId::new(row.try_get("id")?),
            recipient: UserId::new(row.try_get("recipient_id")?),
            category: row.try_get::<String, _>("category")?.parse()?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            read: row.try_get("read")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_courier(row: &PgRow) -> Result<Courier> {
        Ok(Courier {
            id: CourierId::new(row.try_get("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            available: row.try_get("available")?,
            on_duty: row.try_get("on_duty")?,
        })
    }

    /// Attaches line items to already loaded orders with a single query.
    async fn attach_lines(conn: &mut PgConnection, orders: &mut [Order]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, menu_item_id, product_id, name, quantity,
                   unit_price_cents, subtotal_cents, notes
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let line = Self::row_to_line(row)?;
            by_order.entry(line.order_id).or_default().push(line);
        }
        for order in orders.iter_mut() {
            order.lines = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Loads one order with lines, tombstoned rows included.
    async fn fetch_order(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} {ORDER_FROM} WHERE o.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut orders = vec![Self::row_to_order(&row)?];
        Self::attach_lines(conn, &mut orders).await?;
        Ok(orders.pop())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                order_number, customer_id, delivery_type, city_id, municipality_id, street,
                residence, contact_name, contact_phone, description, payment_method, total_cents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&new.order_number)
        .bind(new.customer_id.map(|c| c.as_i64()))
        .bind(new.delivery_type.as_str())
        .bind(new.address.city_id)
        .bind(new.address.municipality_id)
        .bind(&new.address.street)
        .bind(&new.address.residence)
        .bind(&new.contact_name)
        .bind(&new.contact_phone)
        .bind(&new.description)
        .bind(&new.payment_method)
        .bind(new.total.cents())
        .fetch_one(&mut *tx)
        .await?;

        for line in &new.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    order_id, menu_item_id, product_id, name, quantity,
                    unit_price_cents, subtotal_cents, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(id)
            .bind(line.menu_item_id)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(int_column("quantity", line.quantity)?)
            .bind(line.unit_price.cents())
            .bind(line.subtotal.cents())
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        let order = Self::fetch_order(&mut *tx, OrderId::new(id))
            .await?
            .ok_or_else(|| StoreError::order_not_found(OrderId::new(id)))?;

        tx.commit().await?;
        tracing::debug!(order_id = id, lines = order.lines.len(), "order inserted");
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::fetch_order(&mut *conn, id)
            .await?
            .filter(|o| !o.is_deleted()))
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} {ORDER_FROM} WHERE o.deleted_at IS NULL");
        let mut param_count = 0;

        // Build dynamic query
        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND o.customer_id = ${param_count}"));
        }
        if query.courier_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND o.courier_id = ${param_count}"));
        }
        if query.order_state.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND o.order_state = ${param_count}"));
        }
        if query.delivery_type.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND o.delivery_type = ${param_count}"));
        }

        sql.push_str(" ORDER BY o.created_at DESC, o.id DESC");
        sql.push_str(&format!(
            " LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        ));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(customer) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer.as_i64());
        }
        if let Some(courier) = query.courier_id {
            sqlx_query = sqlx_query.bind(courier.as_i64());
        }
        if let Some(state) = query.order_state {
            sqlx_query = sqlx_query.bind(state.as_str());
        }
        if let Some(delivery_type) = query.delivery_type {
            sqlx_query = sqlx_query.bind(delivery_type.as_str());
        }
        sqlx_query = sqlx_query
            .bind(query.effective_limit() as i64)
            .bind(query.offset.unwrap_or(0) as i64);

        let mut conn = self.pool.acquire().await?;
        let rows = sqlx_query.fetch_all(&mut *conn).await?;
        let mut orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        Self::attach_lines(&mut *conn, &mut orders).await?;
        Ok(orders)
    }

    async fn update_order(
        &self,
        id: OrderId,
        changes: OrderChanges,
        expected_version: Version,
    ) -> Result<Order> {
        let mut sql = String::from("UPDATE orders SET version = version + 1, updated_at = NOW()");
        let mut param_count = 2;

        if changes.order_state.is_some() {
            param_count += 1;
            sql.push_str(&format!(", order_state = ${param_count}"));
        }
        if changes.delivery_state.is_some() {
            param_count += 1;
            sql.push_str(&format!(", delivery_state = ${param_count}"));
        }
        if changes.courier_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(", courier_id = ${param_count}"));
        }
        if changes.estimated_minutes.is_some() {
            param_count += 1;
            sql.push_str(&format!(", estimated_minutes = ${param_count}"));
        }
        if changes.delivered_at.is_some() {
            param_count += 1;
            sql.push_str(&format!(", delivered_at = ${param_count}"));
        }
        sql.push_str(" WHERE id = $1 AND version = $2 AND deleted_at IS NULL");

        let mut sqlx_query = sqlx::query(&sql)
            .bind(id.as_i64())
            .bind(expected_version.as_i64());
        if let Some(state) = changes.order_state {
            sqlx_query = sqlx_query.bind(state.as_str());
        }
        if let Some(state) = changes.delivery_state {
            sqlx_query = sqlx_query.bind(state.as_str());
        }
        if let Some(courier) = changes.courier_id {
            sqlx_query = sqlx_query.bind(courier.map(|c| c.as_i64()));
        }
        if let Some(minutes) = changes.estimated_minutes {
            sqlx_query = sqlx_query.bind(int_column("estimated_minutes", minutes)?);
        }
        if let Some(at) = changes.delivered_at {
            sqlx_query = sqlx_query.bind(at);
        }

        let mut tx = self.pool.begin().await?;
        let affected = sqlx_query.execute(&mut *tx).await?.rows_affected();

        if affected == 0 {
            // Nothing matched: tell a missing row apart from a stale version.
            let current = Self::fetch_order(&mut *tx, id)
                .await?
                .filter(|o| !o.is_deleted())
                .ok_or_else(|| StoreError::order_not_found(id))?;
            return Err(StoreError::ConcurrencyConflict {
                order_id: id,
                expected: expected_version,
                actual: current.version,
            });
        }

        let order = Self::fetch_order(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn soft_delete_order(&self, id: OrderId) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE orders SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::order_not_found(id));
        }
        Ok(())
    }

    async fn restore_order(&self, id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let affected =
            sqlx::query("UPDATE orders SET deleted_at = NULL, updated_at = NOW() WHERE id = $1")
                .bind(id.as_i64())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if affected == 0 {
            return Err(StoreError::order_not_found(id));
        }

        let order = Self::fetch_order(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn dashboard_stats(&self, day: NaiveDate) -> Result<DashboardStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE (created_at AT TIME ZONE 'UTC')::date = $1) AS orders_today,
                COUNT(*) FILTER (WHERE order_state IN ('Ordered', 'Preparing')) AS pending,
                COUNT(*) FILTER (WHERE order_state = 'EnRoute') AS en_route,
                COUNT(*) FILTER (
                    WHERE (created_at AT TIME ZONE 'UTC')::date = $1 AND order_state = 'Delivered'
                ) AS delivered_today,
                COALESCE(SUM(total_cents) FILTER (
                    WHERE (created_at AT TIME ZONE 'UTC')::date = $1 AND order_state <> 'Cancelled'
                ), 0)::BIGINT AS sales_today
            FROM orders
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        let active_couriers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM couriers WHERE available AND on_duty")
                .fetch_one(&self.pool)
                .await?;

        Ok(DashboardStats {
            orders_today: row.try_get("orders_today")?,
            pending: row.try_get("pending")?,
            en_route: row.try_get("en_route")?,
            delivered_today: row.try_get("delivered_today")?,
            sales_today: Money::from_cents(row.try_get("sales_today")?),
            active_couriers,
        })
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, new: NewNotification) -> Result<Notification> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, category, title, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, recipient_id, category, title, message, read, created_at
            "#,
        )
        .bind(new.recipient.as_i64())
        .bind(new.category.as_str())
        .bind(&new.title)
        .bind(&new.message)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_notification(&row)
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipient_id, category, title, message, read, created_at
            FROM notifications
            WHERE recipient_id = $1 AND (NOT $2 OR NOT read)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(recipient.as_i64())
        .bind(unread_only)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    async fn mark_notification_read(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<Notification> {
        let row = sqlx::query(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND recipient_id = $2
            RETURNING id, recipient_id, category, title, message, read, created_at
            "#,
        )
        .bind(id.as_i64())
        .bind(recipient.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_notification(&row),
            None => Err(StoreError::NotFound {
                entity: "notification",
                id: id.as_i64(),
            }),
        }
    }

    async fn unread_count(&self, recipient: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl CourierStore for PostgresStore {
    async fn upsert_courier(&self, courier: Courier) -> Result<Courier> {
        let row = sqlx::query(
            r#"
            INSERT INTO couriers (id, first_name, last_name, phone, available, on_duty)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                available = EXCLUDED.available,
                on_duty = EXCLUDED.on_duty
            RETURNING id, first_name, last_name, phone, available, on_duty
            "#,
        )
        .bind(courier.id.as_i64())
        .bind(&courier.first_name)
        .bind(&courier.last_name)
        .bind(&courier.phone)
        .bind(courier.available)
        .bind(courier.on_duty)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_courier(&row)
    }

    async fn get_courier(&self, id: CourierId) -> Result<Option<Courier>> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, phone, available, on_duty FROM couriers WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_courier).transpose()
    }

    async fn list_couriers(&self) -> Result<Vec<Courier>> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, phone, available, on_duty FROM couriers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_courier).collect()
    }

    async fn set_courier_status(
        &self,
        id: CourierId,
        available: Option<bool>,
        on_duty: Option<bool>,
    ) -> Result<Courier> {
        let row = sqlx::query(
            r#"
            UPDATE couriers SET
                available = COALESCE($2, available),
                on_duty = COALESCE($3, on_duty)
            WHERE id = $1
            RETURNING id, first_name, last_name, phone, available, on_duty
            "#,
        )
        .bind(id.as_i64())
        .bind(available)
        .bind(on_duty)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_courier(&row),
            None => Err(StoreError::NotFound {
                entity: "courier",
                id: id.as_i64(),
            }),
        }
    }
}
