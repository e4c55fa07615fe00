//! Exercises the HTTP adapter end to end: bootstrap a real `AppState` over
//! an in-memory store, drive the router with `tower::ServiceExt::oneshot`,
//! and assert on the response envelope rather than on a component directly.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use blackroad_scheduler_core::config::SchedulerConfig;
use blackroad_scheduler_core::store::MemoryStore;
use blackroad_scheduler_core::{api, default_probe, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_state() -> AppState {
    AppState::bootstrap(
        SchedulerConfig::default(),
        Arc::new(MemoryStore::new()),
        Vec::new(),
        default_probe(),
    )
    .await
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_route_is_unauthenticated_and_bare() {
    let router = api::router(test_state().await);
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_id_header_is_present_on_every_response() {
    let router = api::router(test_state().await);
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn create_then_get_job_round_trips_through_http() {
    let router = api::router(test_state().await);

    let create = Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "source": "http-test" }).to_string()))
        .unwrap();
    let response = router.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["success"], json!(true));
    let job_id = created["data"]["id"].as_str().unwrap().to_string();

    let get = Request::builder()
        .uri(format!("/api/jobs/{job_id}"))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["data"]["id"], json!(job_id));
    assert_eq!(fetched["data"]["source"], json!("http-test"));
}

#[tokio::test]
async fn get_unknown_job_maps_not_found_to_404_envelope() {
    let router = api::router(test_state().await);
    let response = router
        .oneshot(Request::builder().uri("/api/jobs/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn update_repo_then_list_repos_through_http() {
    let router = api::router(test_state().await);

    let structure = json!({
        "files": ["README.md"],
        "directories": ["src"],
        "config_files": ["Cargo.toml"],
        "has_manifest": true,
        "has_type_config": true,
        "has_deployment_config": true,
        "primary_language": "rust",
    });
    let update = Request::builder()
        .method("PUT")
        .uri("/api/repos")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "full_name": "acme/widgets", "structure": structure }).to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(update).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list = router
        .oneshot(Request::builder().uri("/api/repos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(list).await;
    let repos = body["data"]["repos"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["full_name"], json!("acme/widgets"));
}

#[tokio::test]
async fn update_repo_rejects_malformed_full_name_with_400() {
    let router = api::router(test_state().await);
    let structure = json!({
        "files": [], "directories": [], "config_files": [],
        "has_manifest": true, "has_type_config": true, "has_deployment_config": true,
        "primary_language": null,
    });
    let update = Request::builder()
        .method("PUT")
        .uri("/api/repos")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "full_name": "noSlash", "structure": structure }).to_string()))
        .unwrap();
    let response = router.oneshot(update).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
}
