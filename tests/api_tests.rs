/// HTTP tests driving the router in-process
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use loan_desk::agent::WorkflowOrchestrator;
use loan_desk::agents::create_default_registry;
use loan_desk::api::{create_router, ApiState};
use loan_desk::execution::ExecutionEngine;
use loan_desk::state::{InMemoryPortfolioStore, Portfolio};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn create_test_router() -> Router {
    let as_of = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
    let store = Arc::new(InMemoryPortfolioStore::new(Portfolio::generate(60, Some(31337), as_of)));
    let engine = ExecutionEngine::new(create_default_registry(), Duration::ZERO);

    create_router(ApiState {
        store,
        orchestrator: Arc::new(WorkflowOrchestrator::new(Arc::new(engine))),
        default_population_size: 25,
    })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn first_id_with_status(router: &Router, status: &str) -> String {
    let (_, body) = send(router, "GET", &format!("/api/applications?status={}", status), None).await;
    body["data"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let router = create_test_router();
    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_list_includes_display_status() {
    let router = create_test_router();
    let (status, body) = send(&router, "GET", "/api/applications", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let apps = body["data"].as_array().unwrap();
    assert_eq!(apps.len(), 60);

    let reviewing = apps.iter().find(|a| a["status"] == "reviewing").unwrap();
    assert_eq!(reviewing["display_status"], "In Review");
}

#[tokio::test]
async fn test_stage_filter() {
    let router = create_test_router();
    let (_, body) = send(&router, "GET", "/api/applications?stage=processing", None).await;
    for app in body["data"].as_array().unwrap() {
        let status = app["status"].as_str().unwrap();
        assert!(status == "reviewing" || status == "information_needed");
    }

    let (status, body) = send(&router, "GET", "/api/applications?stage=servicing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_application_is_404() {
    let router = create_test_router();
    let (status, body) = send(&router, "GET", "/api/applications/APP-00000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&router, "GET", "/api/borrowers/BOR-00000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cash_flow_is_stable() {
    let router = create_test_router();
    let id = first_id_with_status(&router, "underwriting").await;
    let uri = format!("/api/applications/{}/cash-flow", id);

    let (status, first) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["charts"]["monthly_trend"].as_array().unwrap().len(), 12);

    let (_, second) = send(&router, "GET", &uri, None).await;
    assert_eq!(first["data"]["analysis"], second["data"]["analysis"]);
}

#[tokio::test]
async fn test_decision_override_and_audit() {
    let router = create_test_router();
    let id = first_id_with_status(&router, "approved").await;
    let (_, before) = send(&router, "GET", &format!("/api/applications/{}", id), None).await;

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/applications/{}/decision", id),
        Some(json!({ "decision": "reject", "actor": "m.chen", "note": "Revised income" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["display_status"], "Rejected");
    assert_eq!(body["data"]["last_updated"], before["data"]["last_updated"]);
    assert_eq!(body["data"]["date_decided"], before["data"]["date_decided"]);

    let (status, body) = send(&router, "GET", &format!("/api/audit/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let trail = body["data"].as_array().unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0]["from"], "approved");
    assert_eq!(trail[0]["to"], "rejected");
    assert_eq!(trail[0]["actor"], "m.chen");
}

#[tokio::test]
async fn test_invalid_transition_is_409() {
    let router = create_test_router();
    let id = first_id_with_status(&router, "draft").await;

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/applications/{}/status", id),
        Some(json!({ "status": "funded" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/applications/{}/decision", id),
        Some(json!({ "decision": "approve" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/applications/{}/status", id),
        Some(json!({ "status": "submitted", "actor": "ops" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "submitted");
}

#[tokio::test]
async fn test_agent_run_and_workflow() {
    let router = create_test_router();
    let id = first_id_with_status(&router, "underwriting").await;

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/applications/{}/agents/fraud-risk", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["report"]["stage"], "fraud-risk");

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/applications/{}/agents/servicing", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, "POST", &format!("/api/applications/{}/workflow", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reports"].as_array().unwrap().len(), 7);

    // Workflow only recommends
    let (_, body) = send(&router, "GET", &format!("/api/applications/{}", id), None).await;
    assert_eq!(body["data"]["status"], "underwriting");
}

#[tokio::test]
async fn test_refresh_population() {
    let router = create_test_router();

    let (status, body) = send(
        &router,
        "POST",
        "/api/population/refresh",
        Some(json!({ "count": 12, "seed": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 12);
    assert_eq!(body["data"]["seed"], 7);

    let (_, body) = send(&router, "GET", "/api/summary", None).await;
    assert_eq!(body["data"]["total_applications"], 12);

    let (_, body) = send(
        &router,
        "POST",
        "/api/population/refresh",
        Some(json!({ "count": -3 })),
    )
    .await;
    assert_eq!(body["data"]["count"], 0);

    let (_, body) = send(&router, "GET", "/api/summary", None).await;
    assert_eq!(body["data"]["approval_rate_display"], "N/A");

    let (_, body) = send(&router, "POST", "/api/population/refresh", None).await;
    assert_eq!(body["data"]["count"], 25);
}
