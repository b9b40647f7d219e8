//! Order placement, listing and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::{DeliveryType, OrderId, OrderState, Role};
use domain::{OrderPatch, PlaceOrder};
use order_store::{Backend, Order, OrderQuery};
use serde::Deserialize;

use crate::AppState;
use crate::auth::{MaybeSession, Session};
use crate::error::ApiError;
use crate::extract::ApiPath;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub state: Option<OrderState>,
    pub delivery_type: Option<DeliveryType>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Visibility --

/// The listing scope of a session: admins see everything, couriers their
/// assigned orders and customers their own.
fn scoped_query(session: &Session) -> OrderQuery {
    match session.role {
        Role::Admin => OrderQuery::new(),
        Role::Courier => OrderQuery::for_courier(session.user_id.into()),
        Role::Customer => OrderQuery::for_customer(session.user_id),
    }
}

fn is_visible(session: &Session, order: &Order) -> bool {
    match session.role {
        Role::Admin => true,
        Role::Courier => order.courier_id == session.courier_id(),
        Role::Customer => order.customer_id == Some(session.user_id),
    }
}

fn not_found(id: OrderId) -> ApiError {
    ApiError::NotFound(format!("Order {id} not found"))
}

// -- Handlers --

/// POST /orders: place an order as the signed-in customer or as a guest.
#[tracing::instrument(skip_all)]
pub async fn create<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    MaybeSession(session): MaybeSession,
    payload: Result<Json<PlaceOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(command) = payload?;
    let customer = session.map(|s| s.user_id);

    let (order, _) = state.coordinator.place_order(command, customer).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: list the orders visible to the session, newest first.
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn list<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Query(params) = params?;

    let mut query = scoped_query(&session);
    query.order_state = params.state;
    query.delivery_type = params.delivery_type;
    query.limit = Some(
        params
            .limit
            .unwrap_or(OrderQuery::DEFAULT_LIMIT)
            .min(OrderQuery::DEFAULT_LIMIT),
    );
    query.offset = params.offset;

    Ok(Json(state.coordinator.list(query).await?))
}

/// GET /orders/{id}: one order, if the session may see it.
#[tracing::instrument(skip(state, session))]
pub async fn get<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>, ApiError> {
    let order = state.coordinator.get(id).await?;
    if !is_visible(&session, &order) {
        return Err(not_found(id));
    }
    Ok(Json(order))
}

/// PATCH /orders/{id}: transition an order.
///
/// Couriers may only update orders assigned to them, and may neither
/// reassign them nor force a transition.
#[tracing::instrument(skip(state, session, payload), fields(user_id = %session.user_id))]
pub async fn update<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<OrderId>,
    payload: Result<Json<OrderPatch>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    session.require_role(&[Role::Admin, Role::Courier])?;
    let Json(patch) = payload?;

    if let Some(courier) = session.courier_id() {
        let order = state.coordinator.get(id).await?;
        if order.courier_id != Some(courier) {
            return Err(ApiError::Forbidden(
                "Order is not assigned to you".to_string(),
            ));
        }
        if patch.courier_id.is_some() || patch.force {
            return Err(ApiError::Forbidden(
                "Couriers cannot reassign or force orders".to_string(),
            ));
        }
    }

    let (outcome, _) = state.coordinator.transition(id, patch).await?;
    Ok(Json(outcome.order))
}

/// DELETE /orders/{id}: soft delete.
#[tracing::instrument(skip(state, session))]
pub async fn delete<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<StatusCode, ApiError> {
    session.require_role(&[Role::Admin])?;
    state.coordinator.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{id}/restore: undo a soft delete.
#[tracing::instrument(skip(state, session))]
pub async fn restore<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>, ApiError> {
    session.require_role(&[Role::Admin])?;
    let (order, _) = state.coordinator.restore(id).await?;
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CourierId, UserId};

    #[test]
    fn listing_scope_follows_role() {
        let admin = Session::new(UserId::new(1), "Ana", Role::Admin);
        let courier = Session::new(UserId::new(7), "Pedro", Role::Courier);
        let customer = Session::new(UserId::new(5), "Luisa", Role::Customer);

        assert_eq!(scoped_query(&admin), OrderQuery::new());
        assert_eq!(
            scoped_query(&courier),
            OrderQuery::for_courier(CourierId::new(7))
        );
        assert_eq!(
            scoped_query(&customer),
            OrderQuery::for_customer(UserId::new(5))
        );
    }
}
