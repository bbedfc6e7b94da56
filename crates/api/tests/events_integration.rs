//! Integration tests for platform event ingestion and dispatch.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{
    json_request_with_api_key, live_invite, parse_response_body, test_config, TestHarness,
    COMMUNITY, TEST_ADMIN_KEY,
};
use domain::models::PlatformEvent;
use role_invite_api::services::EventDispatcher;
use serde_json::json;
use tokio::sync::mpsc;
use tower::ServiceExt;

const ROLE: i64 = 600000000000000001;

fn dispatcher(harness: &TestHarness) -> Arc<EventDispatcher> {
    Arc::new(EventDispatcher::new(
        Arc::new(harness.attributor()),
        harness.invites.clone(),
    ))
}

#[tokio::test]
async fn test_invite_created_is_tracked_without_role() {
    let harness = TestHarness::new().await;

    dispatcher(&harness)
        .handle(PlatformEvent::InviteCreated {
            community_id: COMMUNITY.to_string(),
            invite: live_invite("new", 0),
        })
        .await;

    let record = harness.invites.find("new").await.unwrap().unwrap();
    assert_eq!(record.role_id, None);
    assert_eq!(record.duration_seconds, Some(0));
}

#[tokio::test]
async fn test_invite_created_does_not_clobber_role() {
    let harness = TestHarness::new().await;
    harness.seed_invite("mine", Some(ROLE), 0).await;

    dispatcher(&harness)
        .handle(PlatformEvent::InviteCreated {
            community_id: COMMUNITY.to_string(),
            invite: live_invite("mine", 0),
        })
        .await;

    assert_eq!(
        harness.invites.find("mine").await.unwrap().unwrap().role_id,
        Some(ROLE)
    );
}

#[tokio::test]
async fn test_invite_deleted_removes_record() {
    let harness = TestHarness::new().await;
    harness.seed_invite("old", Some(ROLE), 0).await;

    let dispatcher = dispatcher(&harness);
    let event = PlatformEvent::InviteDeleted {
        community_id: COMMUNITY.to_string(),
        invite_id: "old".to_string(),
    };
    dispatcher.handle(event.clone()).await;
    // A repeated deletion is harmless.
    dispatcher.handle(event).await;

    assert!(harness.invites.find("old").await.unwrap().is_none());
}

#[tokio::test]
async fn test_dispatcher_drains_queue_then_stops() {
    let harness = TestHarness::new().await;
    harness.gateway.create_role(COMMUNITY, ROLE);
    harness.seed_invite("a", Some(ROLE), 0).await;
    harness.gateway.record_uses("a", 1);

    let (tx, rx) = mpsc::channel(8);
    let handle = dispatcher(&harness).spawn(rx);
    tx.send(PlatformEvent::MemberArrived {
        community_id: COMMUNITY.to_string(),
        member_id: 7,
        pending: false,
    })
    .await
    .unwrap();
    drop(tx);
    handle.await.unwrap();

    assert_eq!(harness.gateway.grants().len(), 1);
    assert_eq!(harness.stored_uses("a").await, Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ungating_right_after_gated_arrival_resumes_attribution() {
    const DEFAULT_ROLE: i64 = 600000000000000009;
    const MEMBERS: i64 = 200;

    let harness = TestHarness::new().await;
    harness.gateway.create_role(COMMUNITY, DEFAULT_ROLE);
    harness.default_roles.set(COMMUNITY, DEFAULT_ROLE).await.unwrap();

    let attributor = Arc::new(harness.attributor());
    let dispatcher = Arc::new(EventDispatcher::new(
        Arc::clone(&attributor),
        harness.invites.clone(),
    ));
    let (tx, rx) = mpsc::channel(2 * MEMBERS as usize);
    let handle = dispatcher.spawn(rx);

    for member_id in 1..=MEMBERS {
        for pending in [true, false] {
            let event = if pending {
                PlatformEvent::MemberArrived {
                    community_id: COMMUNITY.to_string(),
                    member_id,
                    pending,
                }
            } else {
                PlatformEvent::MemberUpdated {
                    community_id: COMMUNITY.to_string(),
                    member_id,
                    pending,
                }
            };
            tx.send(event).await.unwrap();
        }
    }
    drop(tx);
    handle.await.unwrap();

    assert!(attributor.pending().is_empty());
    let mut granted: Vec<i64> = harness
        .gateway
        .grants()
        .into_iter()
        .filter(|g| g.role_id == DEFAULT_ROLE)
        .map(|g| g.member_id)
        .collect();
    granted.sort_unstable();
    assert_eq!(granted, (1..=MEMBERS).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_ingest_queues_event() {
    let harness = TestHarness::new().await;
    let (app, mut rx) = harness.app();

    let response = app
        .oneshot(json_request_with_api_key(
            Method::POST,
            "/api/v1/events",
            json!({
                "type": "member_arrived",
                "community_id": COMMUNITY,
                "member_id": 7,
                "pending": true
            }),
            TEST_ADMIN_KEY,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        rx.try_recv().unwrap(),
        PlatformEvent::MemberArrived {
            community_id: COMMUNITY.to_string(),
            member_id: 7,
            pending: true
        }
    );
}

#[tokio::test]
async fn test_ingest_requires_admin_key() {
    let harness = TestHarness::new().await;
    let (app, mut rx) = harness.app();

    let response = app
        .oneshot(json_request_with_api_key(
            Method::POST,
            "/api/v1/events",
            json!({"type": "invite_deleted", "community_id": COMMUNITY, "invite_id": "x"}),
            "wrong-key",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_ingest_rejects_unknown_event_type() {
    let harness = TestHarness::new().await;
    let (app, _rx) = harness.app();

    let response = app
        .oneshot(json_request_with_api_key(
            Method::POST,
            "/api/v1/events",
            json!({"type": "member_left", "community_id": COMMUNITY}),
            TEST_ADMIN_KEY,
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_full_queue_is_reported() {
    let harness = TestHarness::new().await;
    let hash = shared::crypto::sha256_hex(TEST_ADMIN_KEY);
    let config = role_invite_api::config::Config::load_for_test(&[
        ("security.admin_api_key_hash", hash.as_str()),
        ("attribution.event_queue_capacity", "1"),
    ])
    .unwrap();
    let (app, _rx) = harness.app_with_config(config);
    let event = json!({"type": "invite_deleted", "community_id": COMMUNITY, "invite_id": "x"});

    let first = app
        .clone()
        .oneshot(json_request_with_api_key(
            Method::POST,
            "/api/v1/events",
            event.clone(),
            TEST_ADMIN_KEY,
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = app
        .oneshot(json_request_with_api_key(
            Method::POST,
            "/api/v1/events",
            event,
            TEST_ADMIN_KEY,
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = parse_response_body(second).await;
    assert_eq!(body["error"], "service_unavailable");
}

#[tokio::test]
async fn test_closed_queue_is_reported() {
    let harness = TestHarness::new().await;
    let (app, rx) = harness.app_with_config(test_config());
    drop(rx);

    let response = app
        .oneshot(json_request_with_api_key(
            Method::POST,
            "/api/v1/events",
            json!({"type": "invite_deleted", "community_id": COMMUNITY, "invite_id": "x"}),
            TEST_ADMIN_KEY,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
