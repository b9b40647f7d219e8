use common::{CourierId, DeliveryType, OrderState, UserId};

/// Builder for order listing queries.
///
/// Results exclude soft-deleted orders, are ordered newest first and are
/// capped at [`OrderQuery::DEFAULT_LIMIT`] unless a limit is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Only orders placed by this customer.
    pub customer_id: Option<UserId>,

    /// Only orders assigned to this courier.
    pub courier_id: Option<CourierId>,

    pub order_state: Option<OrderState>,

    pub delivery_type: Option<DeliveryType>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    pub const DEFAULT_LIMIT: usize = 100;

    /// Creates a new unfiltered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one customer's orders.
    pub fn for_customer(customer_id: UserId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    /// Creates a query for the orders assigned to a courier.
    pub fn for_courier(courier_id: CourierId) -> Self {
        Self {
            courier_id: Some(courier_id),
            ..Default::default()
        }
    }

    pub fn customer_id(mut self, id: UserId) -> Self {
        self.customer_id = Some(id);
        self
    }

    pub fn courier_id(mut self, id: CourierId) -> Self {
        self.courier_id = Some(id);
        self
    }

    pub fn order_state(mut self, state: OrderState) -> Self {
        self.order_state = Some(state);
        self
    }

    pub fn delivery_type(mut self, delivery_type: DeliveryType) -> Self {
        self.delivery_type = Some(delivery_type);
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The limit actually applied by stores.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}
