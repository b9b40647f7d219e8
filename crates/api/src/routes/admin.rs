//! Admin dashboard endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::Role;
use order_store::{Backend, DashboardStats};

use crate::AppState;
use crate::auth::Session;
use crate::error::ApiError;

/// GET /admin/stats: dashboard figures for the current UTC day.
pub async fn stats<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
) -> Result<Json<DashboardStats>, ApiError> {
    session.require_role(&[Role::Admin])?;
    Ok(Json(state.coordinator.dashboard_stats().await?))
}
