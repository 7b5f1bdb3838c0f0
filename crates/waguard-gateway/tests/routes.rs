// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin routes end to end over in-memory collaborators.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use waguard_config::WaguardConfig;
use waguard_core::{ConnectionId, WarmupState};
use waguard_gateway::{router, AuthConfig, GatewayState, HealthState};
use waguard_governor::{Collaborators, Governor, RecalcQueue};
use waguard_test_utils::{fixtures, ManualClock, MemoryStore, MockTelemetry};

const TOKEN: &str = "admin-token";

struct App {
    router: Router,
    store: Arc<MemoryStore>,
    telemetry: Arc<MockTelemetry>,
}

async fn app() -> App {
    let now = Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap();
    let store = Arc::new(MemoryStore::new());
    let telemetry = Arc::new(MockTelemetry::new());
    let governor = Arc::new(Governor::new(
        &WaguardConfig::default(),
        Collaborators {
            telemetry: telemetry.clone(),
            connections: store.clone(),
            store: store.clone(),
            clock: Arc::new(ManualClock::new(now)),
        },
    ));
    for (id, stats) in [(1, fixtures::healthy()), (2, fixtures::failing())] {
        store.insert_connection(fixtures::connection(id, 60, now)).await;
        telemetry.set_stats(ConnectionId(id), stats).await;
    }
    let (queue, _worker) = RecalcQueue::start(governor.clone(), 8, CancellationToken::new());

    let router = router(GatewayState {
        governor,
        queue: Some(queue),
        auth: AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: Some(Arc::new(|| "waguard_recomputes_total 3\n".to_string())),
        },
    });
    App {
        router,
        store,
        telemetry,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("x-actor-id", "owner-1")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &App, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn admin_routes_require_the_bearer_token() {
    let app = app().await;
    let req = Request::builder()
        .uri("/v1/health/summary")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/health/summary")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_endpoints_need_no_token() {
    let app = app().await;
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("waguard_recomputes_total"));
}

#[tokio::test]
async fn recalculate_then_summarize() {
    let app = app().await;
    let (status, body) = send(&app, post("/v1/health/recalculate", json!({"window": "24h"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 2);

    let (status, body) = send(&app, get("/v1/health/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["by_status"]["critical"], 1);
    assert_eq!(body["needs_attention"][0]["connection_id"], 2);

    let (status, body) = send(&app, get("/v1/health/connections/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["throttle"]["reconnect_blocked"], true);
    assert_eq!(body["health"]["status"], "critical");
}

#[tokio::test]
async fn single_recalculate_and_bad_window() {
    let app = app().await;
    let (status, body) = send(
        &app,
        post("/v1/health/recalculate", json!({"connection_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 98.4);

    let (status, body) = send(
        &app,
        post("/v1/health/recalculate", json!({"connection_id": 1, "window": "1y"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn queued_recalculate_is_accepted() {
    let app = app().await;
    let (status, body) = send(
        &app,
        post("/v1/health/recalculate", json!({"connection_id": 1, "queued": true})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["queued"], true);
    assert_eq!(body["window"], "24h");
}

#[tokio::test]
async fn errors_map_to_statuses() {
    let app = app().await;

    let (status, body) = send(&app, get("/v1/health/connections/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "connection_not_found");

    app.telemetry.set_stats(ConnectionId(1), fixtures::silent()).await;
    let (status, body) = send(
        &app,
        post("/v1/health/recalculate", json!({"connection_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "insufficient_data");

    app.telemetry.fail(ConnectionId(2), true).await;
    let (status, body) = send(
        &app,
        post("/v1/health/recalculate", json!({"connection_id": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "telemetry_unavailable");

    let (status, body) = send(&app, post("/v1/health/connections/1/resume", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "invalid_transition");
}

#[tokio::test]
async fn owner_flow_over_http() {
    let app = app().await;
    send(&app, post("/v1/health/recalculate", json!({"connection_id": 2}))).await;

    let (status, body) = send(
        &app,
        post("/v1/health/connections/2/force-reset-actions", json!({"reason": "vip send"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flags"]["reconnect_blocked"], false);

    let (status, body) = send(
        &app,
        post(
            "/v1/health/connections/2/force-cooldown",
            json!({"hours": 48, "reason": "manual"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "cooldown");

    let (status, body) = send(&app, post("/v1/health/connections/2/resume", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "score_too_low");

    let (status, body) = send(
        &app,
        post("/v1/health/connections/2/force-resume", json!({"reason": " "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let (status, body) = send(
        &app,
        post("/v1/health/connections/2/force-resume", json!({"reason": "verified"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "warming");

    let (status, body) = send(
        &app,
        get("/v1/health/connections/2/history/states?page=1&per_page=1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["trigger_type"], "owner_resume");
    assert_eq!(body["items"][0]["is_override"], true);
    assert_eq!(body["items"][0]["actor_id"], "owner-1");

    let warmup = app
        .store
        .all_events(ConnectionId(2))
        .await
        .last()
        .map(|e| e.to_state);
    assert_eq!(warmup, Some(WarmupState::Warming));

    let (status, body) = send(&app, get("/v1/health/connections/2/history/blocks")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total"].as_u64().unwrap() >= 4);

    let (status, _) = send(&app, get("/v1/health/connections/2/history/limits")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, get("/v1/health/connections/2/trend?days=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 3);
}

#[tokio::test]
async fn owner_routes_need_an_actor() {
    let app = app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/v1/health/connections/1/reset-actions")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "invalid request: missing x-actor-id header");
}
