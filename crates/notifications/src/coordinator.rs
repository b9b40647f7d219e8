//! Coordinator wiring the lifecycle engine to the dispatcher.

use chrono::Utc;
use common::{CourierId, OrderId, UserId};
use domain::{LifecycleEngine, OrderPatch, PlaceOrder, TransitionOutcome};
use order_store::{Backend, DashboardStats, Notification, Order, OrderQuery};
use realtime::{LocationUpdate, Publisher};

use crate::dispatcher::NotificationDispatcher;
use crate::error::Result;
use crate::report::DispatchReport;

/// Applies lifecycle operations and dispatches their side effects.
///
/// The store and the publisher are injected once at construction; nothing
/// here reaches for process-global state.
pub struct OrderCoordinator<S, P> {
    engine: LifecycleEngine<S>,
    dispatcher: NotificationDispatcher<S, P>,
}

impl<S, P> OrderCoordinator<S, P>
where
    S: Backend,
    P: Publisher,
{
    pub fn new(store: S, publisher: P) -> Self {
        Self {
            engine: LifecycleEngine::new(store.clone()),
            dispatcher: NotificationDispatcher::new(store, publisher),
        }
    }

    pub fn engine(&self) -> &LifecycleEngine<S> {
        &self.engine
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<S, P> {
        &self.dispatcher
    }

    /// Places an order and announces it to the admins.
    #[tracing::instrument(skip(self, command))]
    pub async fn place_order(
        &self,
        command: PlaceOrder,
        customer: Option<UserId>,
    ) -> Result<(Order, DispatchReport)> {
        let order = self.engine.place_order(command, customer).await?;
        let report = self.dispatcher.order_created(&order)?;
        Ok((order, report))
    }

    /// Transitions an order and fans the change out.
    #[tracing::instrument(skip(self, patch))]
    pub async fn transition(
        &self,
        id: OrderId,
        patch: OrderPatch,
    ) -> Result<(TransitionOutcome, DispatchReport)> {
        let outcome = self.engine.transition(id, patch).await?;
        let report = self
            .dispatcher
            .order_updated(&outcome.order, outcome.previous_courier())
            .await?;
        Ok((outcome, report))
    }

    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, id: OrderId) -> Result<DispatchReport> {
        self.engine.soft_delete(id).await?;
        Ok(self.dispatcher.order_deleted(id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, id: OrderId) -> Result<(Order, DispatchReport)> {
        let order = self.engine.restore(id).await?;
        let report = self.dispatcher.order_restored(&order)?;
        Ok((order, report))
    }

    /// Relays a courier position. Only the courier assigned to the order is
    /// relayed; anything else is ignored and yields `None`.
    pub async fn relay_courier_location(
        &self,
        courier: CourierId,
        update: LocationUpdate,
    ) -> Result<Option<DispatchReport>> {
        let order = match self.engine.get(update.order_id).await {
            Ok(order) => order,
            Err(domain::DomainError::NotFound(order_id)) => {
                tracing::warn!(%order_id, %courier, "location for unknown order ignored");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if order.courier_id != Some(courier) {
            tracing::warn!(
                order_id = %order.id,
                %courier,
                "location from a courier not assigned to the order ignored"
            );
            return Ok(None);
        }

        Ok(Some(self.dispatcher.courier_location(&order, courier, &update)))
    }

    /// Sends a direct notification to one user.
    pub async fn send_notification(
        &self,
        recipient: UserId,
        title: String,
        message: String,
    ) -> Result<(Notification, DispatchReport)> {
        self.dispatcher.notify_user(recipient, title, message).await
    }

    pub async fn get(&self, id: OrderId) -> Result<Order> {
        Ok(self.engine.get(id).await?)
    }

    pub async fn list(&self, query: OrderQuery) -> Result<Vec<Order>> {
        Ok(self.engine.list(query).await?)
    }

    /// Dashboard figures for the current UTC day.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Ok(self
            .store()
            .dashboard_stats(Utc::now().date_naive())
            .await?)
    }
}
