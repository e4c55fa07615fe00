//! Thin HTTP adapter: one route per component operation. Per the design,
//! the router's only responsibilities are routing, CORS, and request-id
//! propagation — every route handler itself is a one-line call into a
//! component.

pub mod handlers;
pub mod middleware;
pub mod responses;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/jobs", get(handlers::list_jobs).post(handlers::create_job))
        .route("/api/jobs/metrics", get(handlers::get_job_metrics))
        .route("/api/jobs/cleanup", post(handlers::cleanup_jobs))
        .route("/api/jobs/health", get(handlers::job_coordinator_health))
        .route(
            "/api/jobs/:id",
            get(handlers::get_job).patch(handlers::update_job).delete(handlers::delete_job),
        )
        .route("/api/repos", get(handlers::list_repos).put(handlers::update_repo))
        .route("/api/repos/status", get(handlers::get_sync_status))
        .route("/api/repos/full-sync", post(handlers::trigger_full_sync))
        .route("/api/repos/cohesiveness", get(handlers::get_cohesiveness_report))
        .route("/api/repos/cohesiveness/check", post(handlers::trigger_cohesiveness_check))
        .route("/api/repos/:repo_name/sync", post(handlers::sync_repo))
        .route("/api/healing/metrics", get(handlers::get_healer_metrics))
        .route("/api/healing/health", get(handlers::healer_health))
        .route("/api/healing/:id", get(handlers::get_healing_task))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
