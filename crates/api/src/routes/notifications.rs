//! In-app notification inbox endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::{NotificationId, Role, UserId};
use order_store::{Backend, Notification, NotificationStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Session;
use crate::error::ApiError;
use crate::extract::ApiPath;

const INBOX_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct InboxParams {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub notifications: Vec<Notification>,
    pub unread: i64,
}

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub recipient_id: UserId,
    pub title: String,
    pub message: String,
}

/// GET /notifications: the caller's inbox, newest first.
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn list<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    params: Result<Query<InboxParams>, QueryRejection>,
) -> Result<Json<InboxResponse>, ApiError> {
    let Query(params) = params?;
    let store = state.store();

    let notifications = store
        .list_notifications(session.user_id, params.unread_only, INBOX_LIMIT)
        .await?;
    let unread = store.unread_count(session.user_id).await?;

    Ok(Json(InboxResponse {
        notifications,
        unread,
    }))
}

/// POST /notifications/{id}/read: mark one of the caller's notifications read.
#[tracing::instrument(skip(state, session))]
pub async fn mark_read<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .store()
        .mark_notification_read(session.user_id, id)
        .await?;
    Ok(Json(notification))
}

/// POST /notifications: send a direct notification (admins only).
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn send<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    session: Session,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    session.require_role(&[Role::Admin])?;
    let Json(req) = payload?;

    if req.title.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and message are required".to_string(),
        ));
    }

    let (notification, _) = state
        .coordinator
        .send_notification(req.recipient_id, req.title, req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(notification)))
}
