use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use domain::models::PlatformEvent;
use domain::services::InviteGateway;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, require_admin, trace_id};
use crate::routes::{default_roles, events, health, invites, purge};

/// Shared state of the HTTP surface.
///
/// Everything the handlers need is passed in explicitly; there is no
/// global bot object.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub gateway: Arc<dyn InviteGateway>,
    /// Producer side of the platform event queue.
    pub events: mpsc::Sender<PlatformEvent>,
}

pub fn create_app(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // Admin routes and event ingestion (require the admin key)
    let admin_routes = Router::new()
        .route(
            "/api/v1/communities/:community_id/invites",
            post(invites::create_invite).get(invites::list_invites),
        )
        .route(
            "/api/v1/invites/:invite_id",
            patch(invites::update_invite_uses).delete(invites::revoke_invite),
        )
        .route(
            "/api/v1/communities/:community_id/default-role",
            put(default_roles::set_default_role),
        )
        .route(
            "/api/v1/channels/:channel_id/purge",
            post(purge::purge_messages),
        )
        .route("/api/v1/events", post(events::ingest_event))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .with_state(state)
}
