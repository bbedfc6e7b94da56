//! Common test utilities for integration tests.
//!
//! Every test gets its own in-memory SQLite database with the migrations
//! applied and an in-memory platform gateway, so no external services are
//! needed.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use domain::models::{InviteRecord, LiveInvite, PlatformEvent};
use domain::services::{InMemoryGateway, InviteGateway};
use persistence::repositories::{DefaultRoleRepository, InviteRepository};
use role_invite_api::{
    app::{create_app, AppState},
    config::Config,
    services::{Attributor, Reconciler},
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

pub const COMMUNITY: &str = "100000000000000001";
pub const SYSTEM_CHANNEL: i64 = 200000000000000001;
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// Create an in-memory database with the schema applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    persistence::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Test configuration with the admin key set to [`TEST_ADMIN_KEY`].
pub fn test_config() -> Config {
    let hash = shared::crypto::sha256_hex(TEST_ADMIN_KEY);
    Config::load_for_test(&[("security.admin_api_key_hash", hash.as_str())])
        .expect("Failed to build test config")
}

/// Database, gateway and repositories wired together.
pub struct TestHarness {
    pub pool: SqlitePool,
    pub gateway: Arc<InMemoryGateway>,
    pub invites: InviteRepository,
    pub default_roles: DefaultRoleRepository,
}

impl TestHarness {
    /// A harness with one community whose system channel is [`SYSTEM_CHANNEL`].
    pub async fn new() -> Self {
        let pool = create_test_pool().await;
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_community(COMMUNITY, SYSTEM_CHANNEL);
        Self {
            invites: InviteRepository::new(pool.clone()),
            default_roles: DefaultRoleRepository::new(pool.clone()),
            pool,
            gateway,
        }
    }

    pub fn dyn_gateway(&self) -> Arc<dyn InviteGateway> {
        self.gateway.clone()
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.invites.clone(), self.dyn_gateway())
    }

    pub fn attributor(&self) -> Attributor {
        self.attributor_with(false)
    }

    pub fn attributor_with(&self, default_role_while_pending: bool) -> Attributor {
        Attributor::new(
            self.invites.clone(),
            self.default_roles.clone(),
            self.dyn_gateway(),
            default_role_while_pending,
        )
    }

    /// Builds the router; the receiver is the consumer end of the event queue.
    pub fn app(&self) -> (Router, mpsc::Receiver<PlatformEvent>) {
        self.app_with_config(test_config())
    }

    pub fn app_with_config(&self, config: Config) -> (Router, mpsc::Receiver<PlatformEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.attribution.event_queue_capacity);
        let app = create_app(AppState {
            pool: self.pool.clone(),
            config: Arc::new(config),
            gateway: self.dyn_gateway(),
            events: events_tx,
        });
        (app, events_rx)
    }

    /// Stores a role invite and publishes it remotely with the same counter.
    pub async fn seed_invite(&self, invite_id: &str, role_id: Option<i64>, uses: i64) {
        self.gateway.put_invite(COMMUNITY, live_invite(invite_id, uses));
        self.invites
            .upsert(&stored_invite(invite_id, role_id, uses))
            .await
            .expect("Failed to seed invite");
    }

    pub async fn stored_uses(&self, invite_id: &str) -> Option<i64> {
        self.invites
            .find(invite_id)
            .await
            .expect("Failed to read invite")
            .map(|r| r.uses)
    }

    pub async fn stored_ids(&self) -> Vec<String> {
        self.invites
            .load(COMMUNITY)
            .await
            .expect("Failed to load invites")
            .into_iter()
            .map(|r| r.invite_id)
            .collect()
    }
}

pub fn live_invite(invite_id: &str, uses: i64) -> LiveInvite {
    LiveInvite {
        id: invite_id.to_string(),
        uses,
        max_uses: 0,
        max_age: 0,
        creator_id: Some(42),
        channel_id: Some(SYSTEM_CHANNEL),
    }
}

pub fn stored_invite(invite_id: &str, role_id: Option<i64>, uses: i64) -> InviteRecord {
    InviteRecord {
        invite_id: invite_id.to_string(),
        community_id: COMMUNITY.to_string(),
        role_id,
        creator_id: 42,
        uses,
        max_uses: 0,
        duration_seconds: Some(0),
        channel_id: Some(SYSTEM_CHANNEL),
    }
}

/// Build a JSON request carrying the admin key.
pub fn json_request_with_api_key(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    api_key: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", api_key)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a body-less request carrying the admin key.
pub fn request_with_api_key(method: Method, uri: &str, api_key: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-Key", api_key)
        .body(Body::empty())
        .unwrap()
}

/// Parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
