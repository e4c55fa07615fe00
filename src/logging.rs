//! Structured logging helpers.
//!
//! Thin wrappers over `tracing::event!` so call sites log consistent field
//! names (`job_id`, `task_id`, `repo`, `strategy`) instead of ad-hoc message
//! strings. Components call these instead of `tracing::info!` directly at
//! the handful of points that cross a component or queue boundary.

use tracing::{info, warn};

pub fn job_created(job_id: &str, job_type: &str, priority: &str) {
    info!(job_id, job_type, priority, "job created");
}

pub fn job_transitioned(job_id: &str, from: &str, to: &str) {
    info!(job_id, from, to, "job status transitioned");
}

pub fn job_failed(job_id: &str, retry_count: u32, max_retries: u32, reason: &str) {
    warn!(job_id, retry_count, max_retries, reason, "job attempt failed");
}

pub fn repo_synced(repo: &str, overall: u32, issue_count: usize) {
    info!(repo, overall, issue_count, "repo cohesiveness recomputed");
}

pub fn full_sync_started(known_repo_count: usize) {
    info!(known_repo_count, "full sync started");
}

pub fn healing_task_enqueued(task_id: &str, job_id: &str, strategy: &str, severity: &str) {
    info!(task_id, job_id, strategy, severity, "healing task enqueued");
}

pub fn healing_strategy_attempt(task_id: &str, strategy: &str, attempt: u32, max_attempts: u32) {
    info!(task_id, strategy, attempt, max_attempts, "healing strategy attempt");
}

pub fn healing_strategy_exhausted(task_id: &str, strategy: &str, next: Option<&str>) {
    match next {
        Some(next) => warn!(task_id, strategy, next, "healing strategy exhausted, escalating"),
        None => warn!(task_id, strategy, "healing strategy exhausted, no further strategy"),
    }
}

pub fn healing_task_resolved(task_id: &str, strategy: &str, time_to_resolve_ms: u64) {
    info!(task_id, strategy, time_to_resolve_ms, "healing task resolved");
}

pub fn healing_task_escalated(task_id: &str, reason: &str) {
    warn!(task_id, reason, "healing task escalated");
}
