//! Real-time channel over WebSocket.
//!
//! GET /ws?token=<session token>
//!
//! Browsers cannot set headers on a WebSocket handshake, so the session token
//! travels as a query parameter. Room membership comes from the verified
//! session: `role:<role>` and `user:<id>`. Clients never pick their rooms.
//!
//! Client messages:
//! - `{"event":"courier:location","data":{"order_id":..,"lat":..,"lng":..}}`
//!   from couriers, relayed to the order's customer and the admins
//! - `{"event":"stats:request"}` from admins, answered with `stats:update`
//!
//! Anything else is ignored.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use order_store::Backend;
use realtime::{ClientMessage, Event, EventKind, Room};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Session;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// GET /ws?token=<session token>
pub async fn handle<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<WsAuthQuery>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let session = state.keys.verify(&query.token).map_err(|e| {
        tracing::debug!("websocket session rejected: {e}");
        metrics::counter!("websocket_rejected_total").increment(1);
        ApiError::from(e)
    })?;

    Ok(ws.on_upgrade(move |socket| run_session(socket, state, session)))
}

async fn run_session<S: Backend>(socket: WebSocket, state: Arc<AppState<S>>, session: Session) {
    let (mut sink, mut stream) = socket.split();

    let mut connection = state.hub.connect();
    metrics::counter!("websocket_sessions_total").increment(1);
    for room in Room::memberships(session.user_id, session.role) {
        connection.join(room);
    }

    tracing::info!(
        connection_id = connection.id(),
        user_id = %session.user_id,
        role = %session.role,
        "websocket connected"
    );

    let mut ping_interval = tokio::time::interval(state.config.ws_heartbeat());
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            event = connection.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&state, &session, text.as_str()).await
                            && send_event(&mut sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(
        connection_id = connection.id(),
        user_id = %session.user_id,
        "websocket disconnected"
    );
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &Event,
) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!(event = %event.event, "failed to serialize event: {e}");
            Ok(())
        }
    }
}

/// Handles one client message; returns an event to send back to this
/// connection only, if any.
pub(crate) async fn handle_client_message<S: Backend>(
    state: &AppState<S>,
    session: &Session,
    text: &str,
) -> Option<Event> {
    let Some(message) = ClientMessage::parse(text) else {
        tracing::debug!(user_id = %session.user_id, "ignoring unknown client message");
        metrics::counter!("websocket_messages_ignored_total").increment(1);
        return None;
    };

    match message {
        ClientMessage::CourierLocation(update) => {
            let Some(courier) = session.courier_id() else {
                tracing::debug!(user_id = %session.user_id, "location from a non-courier session ignored");
                return None;
            };
            if let Err(e) = state
                .coordinator
                .relay_courier_location(courier, update)
                .await
            {
                tracing::warn!(%courier, "failed to relay courier location: {e}");
            }
            None
        }
        ClientMessage::StatsRequest => {
            if !session.is_admin() {
                return None;
            }
            match state.coordinator.dashboard_stats().await {
                Ok(stats) => Event::from_payload(EventKind::StatsUpdate, &stats).ok(),
                Err(e) => {
                    tracing::warn!("failed to load dashboard stats: {e}");
                    None
                }
            }
        }
    }
}
