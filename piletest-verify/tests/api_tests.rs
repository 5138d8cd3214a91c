//! Integration tests for the piletest-verify HTTP API

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

use helpers::{batch, FakeExtractor};
use piletest_common::events::EventBus;
use piletest_verify::types::ExtractionError;
use piletest_verify::AppState;

fn create_test_app() -> (Router, Arc<FakeExtractor>) {
    let fake = FakeExtractor::new();
    let state = AppState::new(fake.clone(), EventBus::new(100));
    (piletest_verify::build_router(state), fake)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn intake_body() -> Value {
    json!({
        "sources": [{
            "file_name": "page1.jpg",
            "content_type": "image/jpeg",
            "data_base64": STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0]),
        }]
    })
}

/// Upload, select IVPLT and extract a full load cycle
async fn app_in_verify() -> (Router, Arc<FakeExtractor>) {
    let (app, fake) = create_test_app();
    send(&app, "POST", "/report/intake", Some(intake_body())).await;
    send(&app, "POST", "/report/test-type", Some(json!({"test_type": "IVPLT"}))).await;
    fake.queue_ready(Ok(batch(&[(0.0, 0.0), (100.0, 5.0), (0.0, 3.0)])));
    let (status, _) = send(&app, "POST", "/report/extract", None).await;
    assert_eq!(status, StatusCode::OK);
    (app, fake)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, fake) = create_test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "piletest-verify");
    assert_eq!(body["extractor"]["available"], true);

    fake.set_available(false);
    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_initial_report_is_empty_intake() {
    let (app, _fake) = create_test_app();

    let (status, body) = send(&app, "GET", "/report", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["stage"], "intake");
    assert_eq!(body["report"]["phase_inference_enabled"], true);
    assert_eq!(body["derived"]["status"], "UNDETERMINED");
}

#[tokio::test]
async fn test_intake_validation() {
    let (app, _fake) = create_test_app();

    let (status, body) = send(&app, "POST", "/report/intake", Some(json!({"sources": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let bad_base64 = json!({"sources": [{
        "file_name": "page1.jpg", "content_type": "image/jpeg", "data_base64": "!!!"
    }]});
    let (status, _) = send(&app, "POST", "/report/intake", Some(bad_base64)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong_type = json!({"sources": [{
        "file_name": "notes.txt", "content_type": "text/plain", "data_base64": STANDARD.encode("x")
    }]});
    let (status, body) = send(&app, "POST", "/report/intake", Some(wrong_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_SOURCE");

    let (status, body) = send(&app, "POST", "/report/intake", Some(intake_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["sources"][0]["file_name"], "page1.jpg");
    assert!(body["report"]["sources"][0].get("data").is_none());
}

#[tokio::test]
async fn test_extract_commits_and_derives_results() {
    let (app, _fake) = app_in_verify().await;

    let (status, body) = send(&app, "GET", "/report", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["stage"], "verify");
    assert_eq!(body["report"]["readings"].as_array().unwrap().len(), 3);
    assert_eq!(body["report"]["readings"][2]["phase"], "unloading");

    let derived = &body["derived"];
    assert!((derived["max_applied_load_mt"].as_f64().unwrap() - 70.6).abs() < 1e-9);
    assert_eq!(derived["net_settlement_mm"], 3.0);
    assert_eq!(derived["status"], "PASS");
}

#[tokio::test]
async fn test_extract_response_shape() {
    let (app, fake) = create_test_app();
    send(&app, "POST", "/report/intake", Some(intake_body())).await;
    fake.queue_ready(Ok(batch(&[(0.0, 0.0)])));

    let (status, body) = send(&app, "POST", "/report/extract", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "committed");
    assert_eq!(body["reading_count"], 1);
    // no test type selected yet, so the report stays in intake
    assert!(body["transition"].is_null());
    assert_eq!(body["report"]["report"]["stage"], "intake");
}

#[tokio::test]
async fn test_extract_unavailable_and_failed() {
    let (app, fake) = create_test_app();
    send(&app, "POST", "/report/intake", Some(intake_body())).await;

    fake.set_available(false);
    let (status, body) = send(&app, "POST", "/report/extract", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "EXTRACTION_UNAVAILABLE");

    fake.set_available(true);
    fake.queue_ready(Err(ExtractionError::Malformed("missing field `readings`".into())));
    let (status, body) = send(&app, "POST", "/report/extract", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTRACTION_FAILED");

    let (_, body) = send(&app, "GET", "/report", None).await;
    assert!(body["report"]["error_message"]
        .as_str()
        .unwrap()
        .contains("readings"));
}

#[tokio::test]
async fn test_edit_reading() {
    let (app, _fake) = app_in_verify().await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/report/readings/1",
        Some(json!({"field": "pressure", "value": " 90 "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["changed"], true);
    assert_eq!(body["outcome"]["invalidates_phase"], true);

    let reading = &body["report"]["report"]["readings"][1];
    assert_eq!(reading["pressure"]["value"], 90.0);
    assert_eq!(reading["pressure"]["confidence"], 1.0);
    assert_eq!(reading["phase"], "loading");
}

#[tokio::test]
async fn test_edit_errors() {
    let (app, _fake) = app_in_verify().await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/report/readings/9",
        Some(json!({"field": "pressure", "value": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        "PATCH",
        "/report/readings/0",
        Some(json!({"field": "load", "value": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PATCH",
        "/report/readings/0",
        Some(json!({"field": "gauge1", "value": "O.5"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["coerced_to_empty"], true);
    assert!(body["report"]["report"]["readings"][0]["gauges"][0]["value"].is_null());
}

#[tokio::test]
async fn test_edit_project_updates_derived_load() {
    let (app, _fake) = app_in_verify().await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/report/project",
        Some(json!({"field": "ram_area", "value": "500 cm²"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["derived"]["max_applied_load_mt"], 50.0);
    assert_eq!(body["report"]["report"]["project"]["ram_area"]["confidence"], 1.0);
}

#[tokio::test]
async fn test_phase_toggle() {
    let (app, _fake) = app_in_verify().await;

    let (status, body) = send(&app, "POST", "/report/phases", Some(json!({"enabled": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["report"]["readings"][0].get("phase").is_none());
    assert_eq!(body["derived"]["status"], "UNDETERMINED");

    let (_, body) = send(&app, "POST", "/report/phases", Some(json!({"enabled": true}))).await;
    assert_eq!(body["report"]["readings"][1]["phase"], "loading");
}

#[tokio::test]
async fn test_stage_guards() {
    let (app, fake) = create_test_app();

    let (status, body) = send(&app, "POST", "/report/stage", Some(json!({"stage": "verify"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ILLEGAL_TRANSITION");

    // extraction with zero readings still reaches verify
    send(&app, "POST", "/report/intake", Some(intake_body())).await;
    send(&app, "POST", "/report/test-type", Some(json!({"test_type": "RVPLT"}))).await;
    fake.queue_ready(Ok(batch(&[])));
    send(&app, "POST", "/report/extract", None).await;

    let (status, body) = send(&app, "POST", "/report/stage", Some(json!({"stage": "finalize"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("at least one reading"));

    let (_, body) = send(&app, "GET", "/report", None).await;
    assert_eq!(body["report"]["stage"], "verify");
    assert!(body["report"]["error_message"].is_string());
}

#[tokio::test]
async fn test_finalize_and_read_final_report() {
    let (app, _fake) = app_in_verify().await;

    let (status, _) = send(&app, "GET", "/report/final", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/report/stage", Some(json!({"stage": "finalize"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transition"]["old_stage"], "verify");
    assert_eq!(body["transition"]["new_stage"], "finalize");

    let (status, body) = send(&app, "GET", "/report/final", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["test_type"], "IVPLT");
    assert_eq!(body["readings"].as_array().unwrap().len(), 3);
    assert_eq!(body["derived"]["status"], "PASS");

    // finalized report is read-only
    let (status, _) = send(
        &app,
        "PATCH",
        "/report/readings/0",
        Some(json!({"field": "pressure", "value": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // backward navigation reopens editing
    let (status, _) = send(&app, "POST", "/report/stage", Some(json!({"stage": "verify"}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_returns_to_empty_intake() {
    let (app, _fake) = app_in_verify().await;

    let (status, body) = send(&app, "POST", "/report/stage", Some(json!({"stage": "intake"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["report"]["stage"], "intake");
    assert_eq!(body["report"]["report"]["readings"].as_array().unwrap().len(), 0);
    assert!(body["report"]["report"]["test_type"].is_null());
}
