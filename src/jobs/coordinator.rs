//! Authoritative job registry.
//!
//! A single-writer actor: all mutating operations take the same
//! `tokio::sync::Mutex` guard, giving the whole registry one coarse-grained
//! serialization boundary rather than per-entry locks.
//! State is hydrated from the durable store on construction and rewritten in
//! full on every mutation, per the durable entity contract.

use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};
use crate::jobs::types::{
    CleanupResult, Job, JobCreateRequest, JobMetrics, JobPatch, JobStatus, JobType,
    ListJobsQuery, ListJobsResult,
};
use crate::logging;
use crate::messages::JobQueueMessage;
use crate::queue::Queue;
use crate::store::DurableStore;
use crate::validation;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const COMPONENT: &str = "job_coordinator";
const GC_HORIZON_HOURS: i64 = 24;
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersistedState {
    jobs: HashMap<String, Job>,
    metrics: JobMetrics,
    schema_version: u32,
}

struct State {
    hydrated: bool,
    jobs: HashMap<String, Job>,
    metrics: JobMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobCoordinatorHealth {
    pub status: String,
    pub job_count: usize,
    pub oldest_pending_age_secs: Option<i64>,
}

pub struct JobCoordinator {
    state: Mutex<State>,
    store: Arc<dyn DurableStore>,
    queue: Arc<Queue<JobQueueMessage>>,
    clock: Arc<dyn Clock>,
    default_max_retries: u32,
}

impl JobCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn DurableStore>,
        queue: Arc<Queue<JobQueueMessage>>,
        clock: Arc<dyn Clock>,
        default_max_retries: u32,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                hydrated: false,
                jobs: HashMap::new(),
                metrics: JobMetrics::default(),
            }),
            store,
            queue,
            clock,
            default_max_retries,
        }
    }

    pub async fn hydrate(&self) -> SchedulerResult<()> {
        let persisted = self.store.load(COMPONENT).await?;
        let mut state = self.state.lock().await;
        if let Some(value) = persisted {
            let persisted: PersistedState = serde_json::from_value(value)?;
            state.jobs = persisted.jobs;
            state.metrics = persisted.metrics;
        }
        state.hydrated = true;
        Ok(())
    }

    fn require_hydrated(state: &State) -> SchedulerResult<()> {
        if state.hydrated {
            Ok(())
        } else {
            Err(SchedulerError::NotReady {
                component: COMPONENT.to_string(),
            })
        }
    }

    async fn persist(&self, state: &State) -> SchedulerResult<()> {
        let persisted = PersistedState {
            jobs: state.jobs.clone(),
            metrics: state.metrics.clone(),
            schema_version: SCHEMA_VERSION,
        };
        self.store.save(COMPONENT, &serde_json::to_value(persisted)?).await
    }

    pub async fn list_jobs(&self, query: ListJobsQuery) -> SchedulerResult<ListJobsResult> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| query.status.map_or(true, |s| matches_status(j.status, s)))
            .filter(|j| query.job_type.map_or(true, |t| matches_type(j.job_type, t)))
            .cloned()
            .collect();

        jobs.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.created_at.cmp(&a.created_at)));

        let limit = query.limit.unwrap_or(100);
        jobs.truncate(limit);

        Ok(ListJobsResult {
            jobs,
            metrics: recompute_status_counts(&state.metrics, &state.jobs),
        })
    }

    pub async fn create_job(&self, request: JobCreateRequest) -> SchedulerResult<Job> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let job = Job {
            id: self.clock.new_id(),
            job_type: request.job_type.unwrap_or(JobType::SyncContent),
            status: JobStatus::Pending,
            priority: request.priority.unwrap_or_default(),
            payload: request.payload.unwrap_or_default(),
            retry_count: 0,
            max_retries: request.max_retries.unwrap_or(self.default_max_retries),
            healing_attempts: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
            result: None,
            source: request.source.unwrap_or_else(|| "unspecified".to_string()),
            schema_version: SCHEMA_VERSION,
        };

        state.jobs.insert(job.id.clone(), job.clone());
        state.metrics.total_created += 1;
        self.persist(&state).await?;
        self.queue.enqueue(JobQueueMessage::New(job.clone())).await;

        logging::job_created(&job.id, job_type_label(job.job_type), priority_label(job.priority));
        Ok(job)
    }

    pub async fn get_job(&self, id: &str) -> SchedulerResult<Job> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        state.jobs.get(id).cloned().ok_or_else(|| SchedulerError::NotFound {
            resource: format!("job:{id}"),
        })
    }

    pub async fn delete_job(&self, id: &str) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        state.jobs.remove(id).ok_or_else(|| SchedulerError::NotFound {
            resource: format!("job:{id}"),
        })?;
        self.persist(&state).await
    }

    pub async fn update_job(&self, id: &str, patch: JobPatch) -> SchedulerResult<Job> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let State { jobs, metrics, .. } = &mut *state;
        let job = jobs.get_mut(id).ok_or_else(|| SchedulerError::NotFound {
            resource: format!("job:{id}"),
        })?;

        let from_status = job.status;
        if let Some(status) = patch.status {
            job.status = status;
            match status {
                JobStatus::Completed => {
                    job.completed_at = Some(now);
                    metrics.total_completed += 1;
                }
                JobStatus::Failed => metrics.total_failed += 1,
                JobStatus::Healing => metrics.total_healing += 1,
                JobStatus::Pending | JobStatus::Running => {}
            }
        }
        if let Some(retry_count) = patch.retry_count {
            validation::require_non_negative("retryCount", i64::from(retry_count))?;
            if retry_count > job.max_retries {
                return Err(SchedulerError::Validation {
                    field: "retryCount".to_string(),
                    reason: format!(
                        "retryCount {retry_count} exceeds maxRetries {}",
                        job.max_retries
                    ),
                });
            }
            job.retry_count = retry_count;
        }
        if let Some(healing_attempts) = patch.healing_attempts {
            job.healing_attempts = healing_attempts;
        }
        if patch.error.is_some() {
            job.error = patch.error;
        }
        if patch.result.is_some() {
            job.result = patch.result;
        }
        job.updated_at = now;

        let updated = job.clone();
        if let Some(status) = patch.status {
            if status_label(from_status) != status_label(status) {
                logging::job_transitioned(&updated.id, status_label(from_status), status_label(status));
            }
        }

        self.persist(&state).await?;
        Ok(updated)
    }

    pub async fn get_metrics(&self) -> SchedulerResult<JobMetrics> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        Ok(recompute_status_counts(&state.metrics, &state.jobs))
    }

    /// Deletes jobs whose status is terminal and whose effective completion
    /// time (`completedAt` or `updatedAt`) is older than the GC horizon.
    pub async fn cleanup(&self) -> SchedulerResult<CleanupResult> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let horizon = Duration::hours(GC_HORIZON_HOURS);

        let to_remove: Vec<String> = state
            .jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Completed | JobStatus::Failed))
            .filter(|j| {
                let effective = j.completed_at.unwrap_or(j.updated_at);
                now - effective > horizon
            })
            .map(|j| j.id.clone())
            .collect();

        let cleaned = to_remove.len();
        for id in &to_remove {
            state.jobs.remove(id);
        }

        self.persist(&state).await?;
        Ok(CleanupResult {
            cleaned,
            remaining: state.jobs.len(),
        })
    }

    pub async fn health(&self) -> SchedulerResult<JobCoordinatorHealth> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let oldest_pending_age_secs = state
            .jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Pending))
            .map(|j| (now - j.created_at).num_seconds())
            .max();

        Ok(JobCoordinatorHealth {
            status: "ok".to_string(),
            job_count: state.jobs.len(),
            oldest_pending_age_secs,
        })
    }
}

fn matches_status(actual: JobStatus, filter: JobStatus) -> bool {
    std::mem::discriminant(&actual) == std::mem::discriminant(&filter)
}

fn matches_type(actual: JobType, filter: JobType) -> bool {
    std::mem::discriminant(&actual) == std::mem::discriminant(&filter)
}

fn recompute_status_counts(base: &JobMetrics, jobs: &HashMap<String, Job>) -> JobMetrics {
    let mut metrics = base.clone();
    metrics.pending = 0;
    metrics.running = 0;
    metrics.completed = 0;
    metrics.failed = 0;
    metrics.healing = 0;
    for job in jobs.values() {
        match job.status {
            JobStatus::Pending => metrics.pending += 1,
            JobStatus::Running => metrics.running += 1,
            JobStatus::Completed => metrics.completed += 1,
            JobStatus::Failed => metrics.failed += 1,
            JobStatus::Healing => metrics.healing += 1,
        }
    }
    metrics
}

fn job_type_label(t: JobType) -> &'static str {
    match t {
        JobType::ScrapeRepo => "scrape_repo",
        JobType::SyncContent => "sync_content",
        JobType::CheckCohesiveness => "check_cohesiveness",
        JobType::SelfHeal => "self_heal",
        JobType::UpdateCache => "update_cache",
        JobType::FullSync => "full_sync",
        JobType::Cleanup => "cleanup",
        JobType::Notify => "notify",
    }
}

fn priority_label(p: crate::jobs::types::JobPriority) -> &'static str {
    use crate::jobs::types::JobPriority;
    match p {
        JobPriority::Critical => "critical",
        JobPriority::High => "high",
        JobPriority::Normal => "normal",
        JobPriority::Low => "low",
    }
}

fn status_label(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Pending => "pending",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Healing => "healing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;
    use crate::store::MemoryStore;

    fn coordinator() -> JobCoordinator {
        JobCoordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Queue::new("jobs")),
            Arc::new(FixedClock::at(chrono::Utc::now())),
            3,
        )
    }

    async fn hydrated() -> JobCoordinator {
        let c = coordinator();
        c.hydrate().await.unwrap();
        c
    }

    #[tokio::test]
    async fn operations_fail_before_hydration() {
        let c = coordinator();
        let err = c.get_metrics().await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotReady { .. }));
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let c = hydrated().await;
        let job = c.create_job(JobCreateRequest::default()).await.unwrap();
        let fetched = c.get_job(&job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.max_retries, 3);
    }

    #[tokio::test]
    async fn list_orders_by_priority_then_recency() {
        let c = hydrated().await;
        let low = c
            .create_job(JobCreateRequest {
                priority: Some(crate::jobs::types::JobPriority::Low),
                ..Default::default()
            })
            .await
            .unwrap();
        let critical = c
            .create_job(JobCreateRequest {
                priority: Some(crate::jobs::types::JobPriority::Critical),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = c.list_jobs(ListJobsQuery::default()).await.unwrap();
        assert_eq!(result.jobs[0].id, critical.id);
        assert_eq!(result.jobs[1].id, low.id);
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let c = hydrated().await;
        for _ in 0..5 {
            c.create_job(JobCreateRequest::default()).await.unwrap();
        }
        let result = c
            .list_jobs(ListJobsQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.jobs.len(), 2);
    }

    #[tokio::test]
    async fn update_to_completed_sets_completed_at_and_metric() {
        let c = hydrated().await;
        let job = c.create_job(JobCreateRequest::default()).await.unwrap();
        let updated = c
            .update_job(
                &job.id,
                JobPatch {
                    status: Some(JobStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.completed_at.is_some());
        assert!(updated.completed_at.unwrap() >= updated.created_at);
        let metrics = c.get_metrics().await.unwrap();
        assert_eq!(metrics.total_completed, 1);
    }

    #[tokio::test]
    async fn cleanup_evicts_only_old_terminal_jobs() {
        let c = hydrated().await;
        let stale = c.create_job(JobCreateRequest::default()).await.unwrap();
        c.update_job(
            &stale.id,
            JobPatch {
                status: Some(JobStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fresh = c.create_job(JobCreateRequest::default()).await.unwrap();
        c.update_job(
            &fresh.id,
            JobPatch {
                status: Some(JobStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Directly age the stale job's updated_at/completed_at past the horizon.
        {
            let mut state = c.state.lock().await;
            if let Some(j) = state.jobs.get_mut(&stale.id) {
                j.completed_at = Some(chrono::Utc::now() - Duration::hours(25));
                j.updated_at = j.completed_at.unwrap();
            }
        }

        let result = c.cleanup().await.unwrap();
        assert_eq!(result.cleaned, 1);
        assert_eq!(result.remaining, 1);
        assert!(c.get_job(&fresh.id).await.is_ok());
        assert!(c.get_job(&stale.id).await.is_err());
    }

    #[tokio::test]
    async fn cleanup_twice_is_idempotent() {
        let c = hydrated().await;
        let job = c.create_job(JobCreateRequest::default()).await.unwrap();
        c.update_job(
            &job.id,
            JobPatch {
                status: Some(JobStatus::Failed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        {
            let mut state = c.state.lock().await;
            if let Some(j) = state.jobs.get_mut(&job.id) {
                j.updated_at = chrono::Utc::now() - Duration::hours(30);
            }
        }

        let first = c.cleanup().await.unwrap();
        assert_eq!(first.cleaned, 1);
        let second = c.cleanup().await.unwrap();
        assert_eq!(second.cleaned, 0);
    }

    #[tokio::test]
    async fn empty_list_has_zeroed_metrics() {
        let c = hydrated().await;
        let metrics = c.get_metrics().await.unwrap();
        assert_eq!(metrics.pending, 0);
        assert_eq!(metrics.total_created, 0);
    }
}
