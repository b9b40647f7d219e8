//! Row types owned by the order store.

use chrono::{DateTime, Utc};
use common::{
    CourierId, DeliveryState, DeliveryType, Money, NotificationId, OrderId, OrderLineId,
    OrderState, UserId,
};
use serde::{Deserialize, Serialize};

/// Row version of an order, used for optimistic concurrency control.
///
/// A freshly inserted order is at version 1; every successful update
/// increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a freshly inserted order.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Where a `Delivery` order goes. Pickup orders usually leave it empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub city_id: Option<i64>,
    pub municipality_id: Option<i64>,
    pub street: Option<String>,
    pub residence: Option<String>,
}

/// A persisted order, rehydrated with its line items and joined display
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    /// `None` for guest orders.
    pub customer_id: Option<UserId>,
    pub delivery_type: DeliveryType,
    pub address: DeliveryAddress,
    pub contact_name: String,
    pub contact_phone: String,
    pub description: Option<String>,
    pub payment_method: String,
    /// Sum of line subtotals at creation; never recomputed.
    pub total: Money,
    pub order_state: OrderState,
    pub delivery_state: DeliveryState,
    pub courier_id: Option<CourierId>,
    /// Joined from the courier record.
    pub courier_name: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A line item belonging to exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub menu_item_id: Option<i64>,
    pub product_id: Option<i64>,
    /// Catalog name at the time the order was placed.
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Frozen at creation, not recomputed from the catalog.
    pub subtotal: Money,
    pub notes: Option<String>,
}

/// Insert payload for an order and its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: Option<UserId>,
    pub delivery_type: DeliveryType,
    pub address: DeliveryAddress,
    pub contact_name: String,
    pub contact_phone: String,
    pub description: Option<String>,
    pub payment_method: String,
    pub total: Money,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub menu_item_id: Option<i64>,
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub notes: Option<String>,
}

/// Column changes applied by one compare-and-write.
///
/// `courier_id` is tri-state: `None` leaves the column alone,
/// `Some(None)` clears it and `Some(Some(id))` assigns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderChanges {
    pub order_state: Option<OrderState>,
    pub delivery_state: Option<DeliveryState>,
    pub courier_id: Option<Option<CourierId>>,
    pub estimated_minutes: Option<u32>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderChanges {
    pub fn is_empty(&self) -> bool {
        self.order_state.is_none()
            && self.delivery_state.is_none()
            && self.courier_id.is_none()
            && self.estimated_minutes.is_none()
            && self.delivered_at.is_none()
    }

    /// Applies the changes to an in-memory copy of the row.
    pub fn apply_to(&self, order: &mut Order) {
        if let Some(state) = self.order_state {
            order.order_state = state;
        }
        if let Some(state) = self.delivery_state {
            order.delivery_state = state;
        }
        if let Some(courier) = self.courier_id {
            order.courier_id = courier;
        }
        if let Some(minutes) = self.estimated_minutes {
            order.estimated_minutes = Some(minutes);
        }
        if let Some(at) = self.delivered_at {
            order.delivered_at = Some(at);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    Order,
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Order => "Order",
            NotificationCategory::System => "System",
        }
    }
}

impl std::str::FromStr for NotificationCategory {
    type Err = common::ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Order" => Ok(NotificationCategory::Order),
            "System" => Ok(NotificationCategory::System),
            other => Err(common::ParseEnumError::new("notification category", other)),
        }
    }
}

/// A durable in-app notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient: UserId,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    pub fn order(recipient: UserId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient,
            category: NotificationCategory::Order,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Delivery personnel, referenced (not owned) by orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Courier {
    pub id: CourierId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub available: bool,
    pub on_duty: bool,
}

impl Courier {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Counted as active staff on the dashboard.
    pub fn is_active(&self) -> bool {
        self.available && self.on_duty
    }
}

/// Aggregate figures for the admin dashboard, for one UTC day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub orders_today: i64,
    /// Orders still in `Ordered` or `Preparing`.
    pub pending: i64,
    pub en_route: i64,
    pub delivered_today: i64,
    /// Totals of today's orders that were not cancelled.
    pub sales_today: Money,
    pub active_couriers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_starts_at_one_and_increments() {
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::first().next(), Version::new(2));
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(OrderChanges::default().is_empty());
        let changes = OrderChanges {
            courier_id: Some(None),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn courier_display_name_joins_names() {
        let courier = Courier {
            id: CourierId::new(7),
            first_name: "Ana".to_string(),
            last_name: "Rojas".to_string(),
            phone: "555-0100".to_string(),
            available: true,
            on_duty: false,
        };
        assert_eq!(courier.display_name(), "Ana Rojas");
        assert!(!courier.is_active());
    }

    #[test]
    fn notification_category_round_trips() {
        for category in [NotificationCategory::Order, NotificationCategory::System] {
            assert_eq!(
                category.as_str().parse::<NotificationCategory>().unwrap(),
                category
            );
        }
        assert!("Promo".parse::<NotificationCategory>().is_err());
    }

    #[test]
    fn address_serializes_as_nested_object() {
        let address = DeliveryAddress {
            street: Some("Av. 5 de Julio".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&address).unwrap();
        assert_eq!(json["street"], "Av. 5 de Julio");
        assert!(json["city_id"].is_null());
    }
}
