//! The order lifecycle engine.

use chrono::Utc;
use common::{CourierId, OrderId, UserId};
use order_store::{CourierStore, Order, OrderQuery, OrderStore};

use crate::error::DomainError;

use super::{OrderError, OrderPatch, PlaceOrder, generate_order_number, plan_transition};

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The order as read before the write.
    pub previous: Order,
    /// The rehydrated order after the write.
    pub order: Order,
}

impl TransitionOutcome {
    pub fn previous_courier(&self) -> Option<CourierId> {
        self.previous.courier_id
    }

    /// The courier assigned by this transition, if the assignment is new.
    pub fn newly_assigned_courier(&self) -> Option<CourierId> {
        self.order
            .courier_id
            .filter(|courier| self.previous.courier_id != Some(*courier))
    }

    pub fn state_changed(&self) -> bool {
        self.previous.order_state != self.order.order_state
    }
}

/// Places orders and applies state transitions against an order store.
///
/// Every write goes through the store's compare-and-write, keyed by the
/// version the engine read, so concurrent writers surface as
/// [`DomainError::Conflict`].
#[derive(Clone)]
pub struct LifecycleEngine<S> {
    store: S,
}

impl<S: OrderStore + CourierStore> LifecycleEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates and persists a new order with its lines.
    #[tracing::instrument(skip(self, command), fields(lines = command.lines.len()))]
    pub async fn place_order(
        &self,
        command: PlaceOrder,
        customer_id: Option<UserId>,
    ) -> Result<Order, DomainError> {
        command.validate()?;

        let new_order = command.into_new_order(generate_order_number(), customer_id)?;
        let order = self.store.insert_order(new_order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order placed"
        );
        Ok(order)
    }

    /// Applies a patch to an order.
    #[tracing::instrument(skip(self, patch), fields(order_id = %id))]
    pub async fn transition(
        &self,
        id: OrderId,
        patch: OrderPatch,
    ) -> Result<TransitionOutcome, DomainError> {
        let start = std::time::Instant::now();
        patch.validate()?;

        let current = self.get(id).await?;

        if let Some(expected) = patch.expected_version
            && expected != current.version
        {
            metrics::counter!("order_transition_conflicts_total").increment(1);
            return Err(DomainError::Conflict {
                order_id: id,
                expected,
                actual: current.version,
            });
        }

        if let Some(courier) = patch.assigned_courier()
            && self.store.get_courier(courier).await?.is_none()
        {
            return Err(OrderError::UnknownCourier(courier).into());
        }

        let changes = plan_transition(&current, &patch, Utc::now())?;
        let order = match self
            .store
            .update_order(id, changes, current.version)
            .await
            .map_err(DomainError::from)
        {
            Ok(order) => order,
            Err(err @ DomainError::Conflict { .. }) => {
                metrics::counter!("order_transition_conflicts_total").increment(1);
                tracing::warn!(error = %err, "concurrent order update");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        metrics::counter!("order_transitions_total", "state" => order.order_state.as_str())
            .increment(1);
        metrics::histogram!("order_transition_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            from = %current.order_state,
            to = %order.order_state,
            version = %order.version,
            "order transitioned"
        );

        Ok(TransitionOutcome {
            previous: current,
            order,
        })
    }

    /// Tombstones an order; it disappears from every default read.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, id: OrderId) -> Result<(), DomainError> {
        self.store.soft_delete_order(id).await?;
        tracing::info!(order_id = %id, "order soft-deleted");
        Ok(())
    }

    /// Clears the tombstone of a soft-deleted order.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, id: OrderId) -> Result<Order, DomainError> {
        let order = self.store.restore_order(id).await?;
        tracing::info!(order_id = %id, "order restored");
        Ok(order)
    }

    /// Loads a live order, failing with `NotFound` if it is missing or deleted.
    pub async fn get(&self, id: OrderId) -> Result<Order, DomainError> {
        self.store
            .get_order(id)
            .await?
            .ok_or(DomainError::NotFound(id))
    }

    pub async fn list(&self, query: OrderQuery) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders(query).await?)
    }
}
