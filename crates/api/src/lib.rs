//! HTTP and WebSocket server for the restaurant order system.
//!
//! Provides REST endpoints for orders, notifications, couriers and the admin
//! dashboard, a WebSocket endpoint for live room events, structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::OrderCoordinator;
use order_store::Backend;
use realtime::RoomHub;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::SessionKeys;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Backend> {
    pub coordinator: OrderCoordinator<S, RoomHub>,
    pub hub: RoomHub,
    pub keys: SessionKeys,
    pub config: Config,
}

impl<S: Backend> AppState<S> {
    pub fn store(&self) -> &S {
        self.coordinator.store()
    }
}

impl<S: Backend> FromRef<Arc<AppState<S>>> for SessionKeys {
    fn from_ref(state: &Arc<AppState<S>>) -> Self {
        state.keys.clone()
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Backend>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .patch(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/restore", post(routes::orders::restore::<S>))
        .route(
            "/notifications",
            get(routes::notifications::list::<S>).post(routes::notifications::send::<S>),
        )
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read::<S>),
        )
        .route("/couriers", get(routes::couriers::list::<S>))
        .route("/couriers/{id}", put(routes::couriers::upsert::<S>))
        .route(
            "/couriers/{id}/status",
            patch(routes::couriers::set_status::<S>),
        )
        .route("/admin/stats", get(routes::admin::stats::<S>))
        .route("/ws", get(routes::ws::handle::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a store, with a fresh room hub.
pub fn create_default_state<S: Backend>(store: S, config: Config) -> Arc<AppState<S>> {
    let hub = RoomHub::new();
    let coordinator = OrderCoordinator::new(store, hub.clone());
    let keys = SessionKeys::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.session_ttl_hours),
    );

    Arc::new(AppState {
        coordinator,
        hub,
        keys,
        config,
    })
}
