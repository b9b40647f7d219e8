//! Order commands.

use common::{CourierId, DeliveryState, DeliveryType, Money, OrderState, UserId};
use order_store::{DeliveryAddress, NewOrder, NewOrderLine, Version};
use serde::{Deserialize, Deserializer, Serialize};

use super::OrderError;

/// Largest quantity a single line may carry.
pub const MAX_LINE_QUANTITY: u32 = 1_000;

/// Longest delivery estimate accepted, in minutes (one day).
pub const MAX_ESTIMATED_MINUTES: u32 = 24 * 60;

/// Command to place a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub delivery_type: DeliveryType,

    #[serde(flatten)]
    pub address: DeliveryAddress,

    pub contact_name: String,
    pub contact_phone: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Free-form payment tag; nothing is charged.
    pub payment_method: String,

    pub lines: Vec<PlaceOrderLine>,
}

/// One requested line. Exactly one of `menu_item_id` or `product_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderLine {
    #[serde(default)]
    pub menu_item_id: Option<i64>,

    #[serde(default)]
    pub product_id: Option<i64>,

    /// Display name frozen onto the line.
    pub name: String,

    pub quantity: u32,

    /// Unit price in cents.
    pub unit_price: Money,

    #[serde(default)]
    pub notes: Option<String>,
}

impl PlaceOrderLine {
    /// Creates a line for a menu item.
    pub fn menu_item(id: i64, name: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            menu_item_id: Some(id),
            product_id: None,
            name: name.into(),
            quantity,
            unit_price,
            notes: None,
        }
    }

    /// Creates a line for a standalone product.
    pub fn product(id: i64, name: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            menu_item_id: None,
            product_id: Some(id),
            name: name.into(),
            quantity,
            unit_price,
            notes: None,
        }
    }

    /// Unit price times quantity; `None` when the amount overflows.
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

fn require(value: &str, field: &'static str) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::MissingField { field });
    }
    Ok(())
}

fn require_opt(value: Option<&str>, field: &'static str) -> Result<(), OrderError> {
    require(value.unwrap_or_default(), field)
}

impl PlaceOrder {
    /// Validates the command without touching the store.
    pub fn validate(&self) -> Result<(), OrderError> {
        require(&self.contact_name, "contact_name")?;
        require(&self.contact_phone, "contact_phone")?;
        require(&self.payment_method, "payment_method")?;

        if self.delivery_type == DeliveryType::Delivery {
            require_opt(self.address.street.as_deref(), "street")?;
            require_opt(self.address.residence.as_deref(), "residence")?;
        }

        if self.lines.is_empty() {
            return Err(OrderError::NoLines);
        }

        for (index, line) in self.lines.iter().enumerate() {
            let line_no = index + 1;
            if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::InvalidQuantity {
                    line: line_no,
                    quantity: line.quantity,
                });
            }
            if !line.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    line: line_no,
                    price: line.unit_price,
                });
            }
            if line.menu_item_id.is_some() == line.product_id.is_some() {
                return Err(OrderError::AmbiguousItem { line: line_no });
            }
            require(&line.name, "line name")?;
        }

        self.total().ok_or(OrderError::TotalOverflow)?;
        Ok(())
    }

    /// Sum of all line subtotals; `None` when the amount overflows.
    pub fn total(&self) -> Option<Money> {
        let subtotals = self
            .lines
            .iter()
            .map(PlaceOrderLine::subtotal)
            .collect::<Option<Vec<_>>>()?;
        Money::checked_sum(subtotals)
    }

    /// Builds the insert payload with frozen subtotals and total.
    pub fn into_new_order(
        self,
        order_number: String,
        customer_id: Option<UserId>,
    ) -> Result<NewOrder, OrderError> {
        let total = self.total().ok_or(OrderError::TotalOverflow)?;
        let lines = self
            .lines
            .into_iter()
            .map(|line| {
                Ok(NewOrderLine {
                    subtotal: line.subtotal().ok_or(OrderError::TotalOverflow)?,
                    menu_item_id: line.menu_item_id,
                    product_id: line.product_id,
                    name: line.name,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    notes: line.notes,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Ok(NewOrder {
            order_number,
            customer_id,
            delivery_type: self.delivery_type,
            address: self.address,
            contact_name: self.contact_name,
            contact_phone: self.contact_phone,
            description: self.description,
            payment_method: self.payment_method,
            total,
            lines,
        })
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A partial update to an order.
///
/// `courier_id` is tri-state: absent leaves the courier alone, `null`
/// unassigns and an id assigns. `expected_version` and `force` are controls,
/// not fields, and do not count towards an empty patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default)]
    pub order_state: Option<OrderState>,

    #[serde(default)]
    pub delivery_state: Option<DeliveryState>,

    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub courier_id: Option<Option<CourierId>>,

    #[serde(default)]
    pub estimated_minutes: Option<u32>,

    /// Reject the write if the stored version differs.
    #[serde(default)]
    pub expected_version: Option<Version>,

    /// Skip the transition allow-list.
    #[serde(default)]
    pub force: bool,
}

impl OrderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_state(mut self, state: OrderState) -> Self {
        self.order_state = Some(state);
        self
    }

    pub fn delivery_state(mut self, state: DeliveryState) -> Self {
        self.delivery_state = Some(state);
        self
    }

    pub fn assign_courier(mut self, courier: CourierId) -> Self {
        self.courier_id = Some(Some(courier));
        self
    }

    pub fn unassign_courier(mut self) -> Self {
        self.courier_id = Some(None);
        self
    }

    pub fn estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn expected_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// True when no order field is present.
    pub fn is_empty(&self) -> bool {
        self.order_state.is_none()
            && self.delivery_state.is_none()
            && self.courier_id.is_none()
            && self.estimated_minutes.is_none()
    }

    /// The courier this patch assigns, if any.
    pub fn assigned_courier(&self) -> Option<CourierId> {
        self.courier_id.flatten()
    }

    /// Checks that can be made before the order is read.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.is_empty() {
            return Err(OrderError::EmptyPatch);
        }
        if let Some(minutes) = self.estimated_minutes
            && (minutes == 0 || minutes > MAX_ESTIMATED_MINUTES)
        {
            return Err(OrderError::InvalidEstimate { minutes });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_order() -> PlaceOrder {
        PlaceOrder {
            delivery_type: DeliveryType::Delivery,
            address: DeliveryAddress {
                city_id: Some(1),
                municipality_id: Some(4),
                street: Some("Calle 8".to_string()),
                residence: Some("Casa 12".to_string()),
            },
            contact_name: "Luisa".to_string(),
            contact_phone: "555-0101".to_string(),
            description: None,
            payment_method: "Cash".to_string(),
            lines: vec![
                PlaceOrderLine::menu_item(1, "Pizza", 1, Money::from_cents(1250)),
                PlaceOrderLine::product(2, "Soda", 2, Money::from_cents(950)),
            ],
        }
    }

    #[test]
    fn valid_order_passes_and_totals_lines() {
        let cmd = place_order();
        assert!(cmd.validate().is_ok());
        assert_eq!(cmd.total(), Some(Money::from_cents(3150)));
    }

    #[test]
    fn blank_contact_is_rejected() {
        let mut cmd = place_order();
        cmd.contact_phone = "   ".to_string();
        assert_eq!(
            cmd.validate(),
            Err(OrderError::MissingField {
                field: "contact_phone"
            })
        );
    }

    #[test]
    fn delivery_requires_address_but_pickup_does_not() {
        let mut cmd = place_order();
        cmd.address.street = None;
        assert_eq!(
            cmd.validate(),
            Err(OrderError::MissingField { field: "street" })
        );

        cmd.delivery_type = DeliveryType::Pickup;
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn line_rules_are_enforced() {
        let mut cmd = place_order();
        cmd.lines.clear();
        assert_eq!(cmd.validate(), Err(OrderError::NoLines));

        let mut cmd = place_order();
        cmd.lines[1].quantity = 0;
        assert_eq!(
            cmd.validate(),
            Err(OrderError::InvalidQuantity {
                line: 2,
                quantity: 0
            })
        );

        let mut cmd = place_order();
        cmd.lines[0].unit_price = Money::zero();
        assert!(matches!(
            cmd.validate(),
            Err(OrderError::InvalidPrice { line: 1, .. })
        ));

        let mut cmd = place_order();
        cmd.lines[0].product_id = Some(5);
        assert_eq!(cmd.validate(), Err(OrderError::AmbiguousItem { line: 1 }));

        let mut cmd = place_order();
        cmd.lines[0].menu_item_id = None;
        assert_eq!(cmd.validate(), Err(OrderError::AmbiguousItem { line: 1 }));
    }

    #[test]
    fn new_order_freezes_subtotals() {
        let new = place_order()
            .into_new_order("ORD-1-ABCDEFGH".to_string(), None)
            .unwrap();
        assert_eq!(new.total, Money::from_cents(3150));
        assert_eq!(new.lines[1].subtotal, Money::from_cents(1900));
        assert_eq!(new.address.street.as_deref(), Some("Calle 8"));
    }

    #[test]
    fn place_order_reads_flat_address_fields() {
        let cmd: PlaceOrder = serde_json::from_value(serde_json::json!({
            "delivery_type": "Pickup",
            "contact_name": "Ana",
            "contact_phone": "555",
            "payment_method": "Card",
            "lines": [{"menu_item_id": 3, "name": "Taco", "quantity": 2, "unit_price": 300}]
        }))
        .unwrap();
        assert_eq!(cmd.address, DeliveryAddress::default());
        assert_eq!(cmd.total(), Some(Money::from_cents(600)));
    }

    #[test]
    fn patch_distinguishes_absent_and_null_courier() {
        let absent: OrderPatch = serde_json::from_str(r#"{"estimated_minutes": 20}"#).unwrap();
        assert_eq!(absent.courier_id, None);

        let null: OrderPatch = serde_json::from_str(r#"{"courier_id": null}"#).unwrap();
        assert_eq!(null.courier_id, Some(None));
        assert!(!null.is_empty());

        let assign: OrderPatch = serde_json::from_str(r#"{"courier_id": 7}"#).unwrap();
        assert_eq!(assign.assigned_courier(), Some(CourierId::new(7)));
    }

    #[test]
    fn controls_alone_make_an_empty_patch() {
        let patch = OrderPatch::new().expected_version(Version::first()).forced();
        assert_eq!(patch.validate(), Err(OrderError::EmptyPatch));

        let unknown: OrderPatch = serde_json::from_str(r#"{"colour": "red"}"#).unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn zero_estimate_is_rejected() {
        let patch = OrderPatch::new().estimated_minutes(0);
        assert_eq!(
            patch.validate(),
            Err(OrderError::InvalidEstimate { minutes: 0 })
        );
    }

    #[test]
    fn estimate_is_capped_at_one_day() {
        let patch = OrderPatch::new().estimated_minutes(MAX_ESTIMATED_MINUTES);
        assert!(patch.validate().is_ok());

        let patch = OrderPatch::new().estimated_minutes(u32::MAX);
        assert_eq!(
            patch.validate(),
            Err(OrderError::InvalidEstimate { minutes: u32::MAX })
        );
    }

    #[test]
    fn quantity_is_capped_per_line() {
        let mut cmd = place_order();
        cmd.lines[0].quantity = MAX_LINE_QUANTITY;
        assert!(cmd.validate().is_ok());

        cmd.lines[0].quantity = MAX_LINE_QUANTITY + 1;
        assert_eq!(
            cmd.validate(),
            Err(OrderError::InvalidQuantity {
                line: 1,
                quantity: MAX_LINE_QUANTITY + 1
            })
        );
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let mut cmd = place_order();
        cmd.lines[0].quantity = MAX_LINE_QUANTITY;
        cmd.lines[0].unit_price = Money::from_cents(i64::MAX / 2);
        assert_eq!(cmd.lines[0].subtotal(), None);
        assert_eq!(cmd.total(), None);
        assert_eq!(cmd.validate(), Err(OrderError::TotalOverflow));
        assert!(matches!(
            cmd.into_new_order("ORD-1-ABCDEFGH".to_string(), None),
            Err(OrderError::TotalOverflow)
        ));
    }

    #[test]
    fn line_subtotals_overflowing_only_in_sum_are_rejected() {
        let mut cmd = place_order();
        cmd.lines[0].unit_price = Money::from_cents(i64::MAX);
        cmd.lines[0].quantity = 1;
        assert!(cmd.lines[0].subtotal().is_some());
        assert_eq!(cmd.validate(), Err(OrderError::TotalOverflow));
    }
}
