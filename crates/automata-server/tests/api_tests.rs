//! Integration tests for the HTTP API.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, and the
//! error-to-status mapping without a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use automata_core::{ServiceConfig, SimulationService};
use automata_server::router::build_router;
use automata_server::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_router() -> Router {
    let mut config = ServiceConfig::default();
    config.engine.worker_threads = 2;
    config.engine.max_steps_per_request = 100;
    let service = SimulationService::new(config).unwrap();
    build_router(Arc::new(AppState::new(service)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn delete(path: &str) -> Request<Body> {
    Request::delete(path).body(Body::empty()).unwrap()
}

fn create_body() -> Value {
    json!({
        "dim_x": 3, "dim_y": 3, "dim_z": 3,
        "boundary_mode": "Wrapped",
        "rule_specification": {"kind": "Notation", "notation": "S4,5/B5"},
        "initial_state_source": {
            "kind": "Cells",
            "cells": [{"x": 1, "y": 1, "z": 1, "state": 1}]
        }
    })
}

async fn create(router: &Router) -> String {
    let (status, json) = send(router, post_json("/api/simulations", &create_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["generation"], 0);
    json["session_id"].as_str().unwrap().to_owned()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = make_router();
    let response = router.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_health() {
    let router = make_router();
    let (status, json) = send(&router, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn test_presets_include_445() {
    let router = make_router();
    let (status, json) = send(&router, get("/api/presets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["445"], "4/4/5/M");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let router = make_router();
    let id = create(&router).await;

    let (status, json) = send(&router, get("/api/simulations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["sessions"][0]["session_id"], id.as_str());

    let (status, json) = send(&router, get(&format!("/api/simulations/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generation"], 0);
    assert_eq!(json["cell_states"].as_array().unwrap().len(), 27);

    let (status, json) = send(
        &router,
        post_json(&format!("/api/simulations/{id}/step"), &json!({"step_count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generation"], 1);
    assert_eq!(json["population"], 0);
    assert_eq!(json["changed_cells"], 1);

    let (status, json) = send(&router, get(&format!("/api/simulations/{id}/stats"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generation"], 1);
    assert_eq!(json["volume"], 27);

    let (status, json) = send(&router, delete(&format!("/api/simulations/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = send(&router, delete(&format!("/api/simulations/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = send(&router, get(&format!("/api/simulations/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error_kind"], "SessionNotFound");
}

#[tokio::test]
async fn test_export_then_import_continues_generation() {
    let router = make_router();
    let id = create(&router).await;
    send(
        &router,
        post_json(&format!("/api/simulations/{id}/step"), &json!({"step_count": 2})),
    )
    .await;

    let (status, document) = send(&router, get(&format!("/api/simulations/{id}/export"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["generation"], 2);

    let (status, json) = send(&router, post_json("/api/simulations/import", &document)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["generation"], 2);
    assert_ne!(json["session_id"], id.as_str());
}

#[tokio::test]
async fn test_invalid_dimensions_are_unprocessable() {
    let router = make_router();
    let mut body = create_body();
    body["dim_x"] = json!(0);
    let (status, json) = send(&router, post_json("/api/simulations", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error_kind"], "InvalidDimensions");

    let (_, json) = send(&router, get("/api/health")).await;
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn test_invalid_rule_is_unprocessable() {
    let router = make_router();
    let mut body = create_body();
    body["rule_specification"] = json!({"kind": "Notation", "notation": "nonsense"});
    let (status, json) = send(&router, post_json("/api/simulations", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error_kind"], "InvalidRuleSpecification");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let router = make_router();
    let request = Request::post("/api/simulations")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_kind"], "InvalidRequest");
}

#[tokio::test]
async fn test_step_count_limits() {
    let router = make_router();
    let id = create(&router).await;
    let path = format!("/api/simulations/{id}/step");

    for count in [0, 101] {
        let (status, json) = send(&router, post_json(&path, &json!({"step_count": count}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error_kind"], "InvalidStepCount");
    }

    let (_, json) = send(&router, get(&format!("/api/simulations/{id}"))).await;
    assert_eq!(json["generation"], 0);
}

#[tokio::test]
async fn test_non_blocking_step_on_idle_session_succeeds() {
    let router = make_router();
    let id = create(&router).await;
    let (status, json) = send(
        &router,
        post_json(
            &format!("/api/simulations/{id}/step?wait=false"),
            &json!({"step_count": 3}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generation"], 3);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let router = make_router();
    let id = automata_types::SessionId::new();
    for request in [
        get(&format!("/api/simulations/{id}")),
        get(&format!("/api/simulations/{id}/stats")),
        get(&format!("/api/simulations/{id}/export")),
        delete(&format!("/api/simulations/{id}")),
        post_json(&format!("/api/simulations/{id}/step"), &json!({"step_count": 1})),
    ] {
        let (status, json) = send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error_kind"], "SessionNotFound");
    }
}

#[tokio::test]
async fn test_invalid_session_id_is_bad_request() {
    let router = make_router();
    let (status, json) = send(&router, get("/api/simulations/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_kind"], "InvalidRequest");
}
