//! Route handlers: one per component operation, per the thin-adapter
//! contract (routing, payload, and error mapping only, no business logic).

use super::responses::{ok, ok_created, ApiFailure, ApiResult};
use crate::healer::{HealerHealth, HealerMetrics, HealingTask};
use crate::jobs::types::{CleanupResult, Job, JobCreateRequest, JobMetrics, JobPatch, ListJobsQuery, ListJobsResult};
use crate::jobs::JobCoordinatorHealth;
use crate::repos::{CohesivenessReport, ListReposResult, RepoData, RepoUpdateRequest, SyncStatus};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;

// --- Job Coordinator ---------------------------------------------------

pub async fn list_jobs(State(state): State<AppState>, Query(query): Query<ListJobsQuery>) -> ApiResult<ListJobsResult> {
    ok(state.jobs.list_jobs(query).await?)
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<JobCreateRequest>,
) -> Result<(axum::http::StatusCode, Json<super::responses::ApiResponse<Job>>), ApiFailure> {
    ok_created(state.jobs.create_job(request).await?)
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Job> {
    ok(state.jobs.get_job(&id).await?)
}

pub async fn delete_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.jobs.delete_job(&id).await?;
    ok(())
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> ApiResult<Job> {
    ok(state.jobs.update_job(&id, patch).await?)
}

pub async fn get_job_metrics(State(state): State<AppState>) -> ApiResult<JobMetrics> {
    ok(state.jobs.get_metrics().await?)
}

pub async fn cleanup_jobs(State(state): State<AppState>) -> ApiResult<CleanupResult> {
    ok(state.jobs.cleanup().await?)
}

pub async fn job_coordinator_health(State(state): State<AppState>) -> ApiResult<JobCoordinatorHealth> {
    ok(state.jobs.health().await?)
}

// --- Repo Sync Engine ----------------------------------------------------

pub async fn list_repos(State(state): State<AppState>) -> ApiResult<ListReposResult> {
    ok(state.repos.list_repos().await?)
}

pub async fn get_sync_status(State(state): State<AppState>) -> ApiResult<SyncStatus> {
    ok(state.repos.get_status().await?)
}

pub async fn trigger_full_sync(State(state): State<AppState>) -> ApiResult<usize> {
    ok(state.repos.trigger_full_sync().await?)
}

pub async fn sync_repo(State(state): State<AppState>, Path(repo_name): Path<String>) -> ApiResult<()> {
    state.repos.sync_repo(&repo_name).await?;
    ok(())
}

pub async fn trigger_cohesiveness_check(State(state): State<AppState>) -> ApiResult<usize> {
    ok(state.repos.trigger_cohesiveness_check().await?)
}

pub async fn get_cohesiveness_report(State(state): State<AppState>) -> ApiResult<CohesivenessReport> {
    ok(state.repos.get_cohesiveness_report().await?)
}

pub async fn update_repo(
    State(state): State<AppState>,
    Json(request): Json<RepoUpdateRequest>,
) -> ApiResult<RepoData> {
    ok(state.repos.update_repo(request).await?)
}

// --- Self-Healer -----------------------------------------------------------

pub async fn get_healing_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<HealingTask> {
    ok(state.healer.get_task(&id).await?)
}

pub async fn get_healer_metrics(State(state): State<AppState>) -> ApiResult<HealerMetrics> {
    ok(state.healer.get_metrics().await?)
}

pub async fn healer_health(State(state): State<AppState>) -> ApiResult<HealerHealth> {
    ok(state.healer.health_check().await?)
}
