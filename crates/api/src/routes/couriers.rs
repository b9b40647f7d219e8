//! Courier records and staffing flags.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use common::{CourierId, Role};
use order_store::{Backend, Courier, CourierStore};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Session;
use crate::error::ApiError;
use crate::extract::ApiPath;

#[derive(Debug, Deserialize)]
pub struct CourierRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub on_duty: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub available: Option<bool>,
    pub on_duty: Option<bool>,
}

/// GET /couriers
pub async fn list<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
) -> Result<Json<Vec<Courier>>, ApiError> {
    session.require_role(&[Role::Admin])?;
    Ok(Json(state.store().list_couriers().await?))
}

/// PUT /couriers/{id}: create or replace a courier.
#[tracing::instrument(skip(state, session, payload))]
pub async fn upsert<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<CourierId>,
    payload: Result<Json<CourierRequest>, JsonRejection>,
) -> Result<Json<Courier>, ApiError> {
    session.require_role(&[Role::Admin])?;
    let Json(req) = payload?;

    let courier = state
        .store()
        .upsert_courier(Courier {
            id,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            available: req.available,
            on_duty: req.on_duty,
        })
        .await?;
    Ok(Json(courier))
}

/// PATCH /couriers/{id}/status: update availability flags.
///
/// Allowed for admins and for the courier themself.
#[tracing::instrument(skip(state, session, payload))]
pub async fn set_status<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<CourierId>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Courier>, ApiError> {
    if !session.is_admin() && session.courier_id() != Some(id) {
        return Err(ApiError::forbidden());
    }
    let Json(req) = payload?;

    if req.available.is_none() && req.on_duty.is_none() {
        return Err(ApiError::BadRequest(
            "Nothing to update: provide available or on_duty".to_string(),
        ));
    }

    let courier = state
        .store()
        .set_courier_status(id, req.available, req.on_duty)
        .await?;
    Ok(Json(courier))
}
