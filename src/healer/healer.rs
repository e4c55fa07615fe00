//! Progressive remediation engine.
//!
//! A single-writer actor over the healing task map, mirroring the job
//! coordinator's shape. Unlike a binary open/closed circuit breaker, the
//! multi-node escalation graph in [`super::strategy`] gives each node its
//! own attempt ceiling and backoff schedule, and exhaustion moves the task
//! to the next node rather than flipping a single boolean.
//!
//! The healer never enqueues a task onto the healing queue itself —
//! producers (job/scrape processors, the sync engine) own that, and the
//! healing processor drives repeated attempts by redelivering the same
//! message while a task stays `pending`. This keeps scheduling entirely in
//! the queue's at-least-once semantics rather than duplicating it here.

use super::strategy;
use super::types::{
    HealerHealth, HealerMetrics, HealingStatus, HealingTask, Resolution, ResolutionMetrics,
    Strategy,
};
use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};
use crate::jobs::types::{JobPriority, JobType};
use crate::logging;
use crate::messages::{JobQueueMessage, JobRetrySignal, ScrapeTask, ScrapeType};
use crate::queue::Queue;
use crate::store::{DurableStore, KvStore};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const COMPONENT: &str = "self_healer";
const SCHEMA_VERSION: u32 = 1;
const STUCK_PENDING_MINUTES: i64 = 30;
const ESCALATION_RATE_WARN_THRESHOLD: f64 = 0.3;
const ESCALATION_RATE_MIN_SAMPLE: u64 = 10;

/// Abstract contract for the strategies that perform real remediation work
/// against an external collaborator (retry, clear-cache-then-retry, switch
/// endpoint, reduce batch size). The core has no transport of its own; it
/// only needs to know whether the attempt succeeded.
#[async_trait]
pub trait RemediationProbe: Send + Sync {
    async fn attempt(&self, strategy: Strategy, context: &HashMap<String, Value>) -> bool;
}

/// Conservative default: every action-based strategy fails until a real
/// collaborator is wired in, so a misconfigured deployment escalates loudly
/// instead of silently reporting healed.
pub struct AlwaysFailProbe;

#[async_trait]
impl RemediationProbe for AlwaysFailProbe {
    async fn attempt(&self, _strategy: Strategy, _context: &HashMap<String, Value>) -> bool {
        false
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersistedState {
    tasks: HashMap<String, HealingTask>,
    metrics: HealerMetrics,
    schema_version: u32,
}

struct State {
    hydrated: bool,
    tasks: HashMap<String, HealingTask>,
    metrics: HealerMetrics,
}

struct StrategyOutcome {
    success: bool,
    message: String,
    updated_context: Option<HashMap<String, Value>>,
    forced_escalation: bool,
}

pub struct SelfHealer {
    state: Mutex<State>,
    store: Arc<dyn DurableStore>,
    job_queue: Arc<Queue<JobQueueMessage>>,
    scrape_queue: Arc<Queue<ScrapeTask>>,
    kv: Arc<KvStore>,
    clock: Arc<dyn Clock>,
    probe: Arc<dyn RemediationProbe>,
    self_heal_enabled: bool,
}

impl SelfHealer {
    #[must_use]
    pub fn new(
        store: Arc<dyn DurableStore>,
        job_queue: Arc<Queue<JobQueueMessage>>,
        scrape_queue: Arc<Queue<ScrapeTask>>,
        kv: Arc<KvStore>,
        clock: Arc<dyn Clock>,
        probe: Arc<dyn RemediationProbe>,
        self_heal_enabled: bool,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                hydrated: false,
                tasks: HashMap::new(),
                metrics: HealerMetrics::default(),
            }),
            store,
            job_queue,
            scrape_queue,
            kv,
            clock,
            probe,
            self_heal_enabled,
        }
    }

    pub async fn hydrate(&self) -> SchedulerResult<()> {
        let persisted = self.store.load(COMPONENT).await?;
        let mut state = self.state.lock().await;
        if let Some(value) = persisted {
            let persisted: PersistedState = serde_json::from_value(value)?;
            state.tasks = persisted.tasks;
            state.metrics = persisted.metrics;
        }
        state.hydrated = true;
        Ok(())
    }

    fn require_hydrated(state: &State) -> SchedulerResult<()> {
        if state.hydrated {
            Ok(())
        } else {
            Err(SchedulerError::NotReady { component: COMPONENT.to_string() })
        }
    }

    async fn persist(&self, state: &State) -> SchedulerResult<()> {
        let persisted = PersistedState {
            tasks: state.tasks.clone(),
            metrics: state.metrics.clone(),
            schema_version: SCHEMA_VERSION,
        };
        self.store.save(COMPONENT, &serde_json::to_value(persisted)?).await
    }

    /// Registers a task the first time it is seen; a redelivery of a task
    /// already known to the healer is a no-op that returns the authoritative
    /// (possibly further-advanced) copy instead of resetting it.
    pub async fn ingest(&self, task: HealingTask) -> SchedulerResult<HealingTask> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        if let Some(existing) = state.tasks.get(&task.id) {
            return Ok(existing.clone());
        }

        logging::healing_task_enqueued(
            &task.id,
            &task.job_id,
            strategy::label(task.strategy),
            severity_label(task.issue.severity),
        );

        let mut task = task;
        if !self.self_heal_enabled {
            self.escalate_under_kv(&task).await?;
            task.status = HealingStatus::Escalated;
            state.metrics.escalations += 1;
            logging::healing_task_escalated(&task.id, "self-healing disabled");
        }

        state.tasks.insert(task.id.clone(), task.clone());
        self.persist(&state).await?;
        Ok(task)
    }

    /// Executes a single attempt of a task's current strategy, advancing it
    /// through the escalation graph on failure. Callers redeliver the
    /// originating queue message while the returned task's status is
    /// `pending`, and ack once it reaches `resolved` or `escalated`.
    pub async fn attempt(&self, task_id: &str) -> SchedulerResult<HealingTask> {
        let prepared = {
            let mut state = self.state.lock().await;
            Self::require_hydrated(&state)?;

            let task = state.tasks.get(task_id).ok_or_else(|| SchedulerError::NotFound {
                resource: format!("healing_task:{task_id}"),
            })?;
            if matches!(task.status, HealingStatus::Resolved | HealingStatus::Escalated) {
                return Ok(task.clone());
            }

            let now = self.clock.now();
            let State { tasks, metrics, .. } = &mut *state;
            let task = tasks.get_mut(task_id).expect("presence checked above");
            task.status = HealingStatus::Attempting;
            task.attempts += 1;
            task.updated_at = now;

            let strategy = task.strategy;
            let attempt_number = task.attempts;
            metrics.total_attempts += 1;
            metrics
                .by_strategy
                .entry(strategy::label(strategy).to_string())
                .or_default()
                .attempts += 1;

            logging::healing_strategy_attempt(
                task_id,
                strategy::label(strategy),
                attempt_number,
                strategy::config_for(strategy).max_attempts,
            );

            (strategy, attempt_number, task.job_id.clone(), task.issue.context.clone())
        };

        let (strategy, attempt_number, job_id, context) = prepared;
        let outcome = self.execute_strategy(strategy, attempt_number, &job_id, &context).await;

        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let State { tasks, metrics, .. } = &mut *state;
        let task = tasks.get_mut(task_id).ok_or_else(|| SchedulerError::NotFound {
            resource: format!("healing_task:{task_id}"),
        })?;

        if let Some(updated_context) = outcome.updated_context {
            task.issue.context = updated_context;
        }

        if outcome.forced_escalation {
            task.status = HealingStatus::Escalated;
            task.resolution = Some(Resolution {
                strategy,
                success: false,
                message: outcome.message,
                attempt: attempt_number,
                resolved_at: now,
                metrics: ResolutionMetrics {
                    time_to_resolve_ms: (now - task.created_at).num_milliseconds().max(0) as u64,
                    resources_used: attempt_number,
                },
            });
            metrics.escalations += 1;
            logging::healing_task_escalated(task_id, "escalate_to_agent strategy reached");
        } else if outcome.success {
            task.status = HealingStatus::Resolved;
            let time_to_resolve_ms = (now - task.created_at).num_milliseconds().max(0) as u64;
            task.resolution = Some(Resolution {
                strategy,
                success: true,
                message: outcome.message,
                attempt: attempt_number,
                resolved_at: now,
                metrics: ResolutionMetrics { time_to_resolve_ms, resources_used: attempt_number },
            });

            metrics.successful_resolutions += 1;
            let n = metrics.successful_resolutions;
            let avg_old = metrics.average_time_to_resolve_ms;
            metrics.average_time_to_resolve_ms = rolling_average(avg_old, n, time_to_resolve_ms);
            metrics
                .by_strategy
                .entry(strategy::label(strategy).to_string())
                .or_default()
                .successes += 1;

            logging::healing_task_resolved(task_id, strategy::label(strategy), time_to_resolve_ms);
        } else {
            task.resolution = Some(Resolution {
                strategy,
                success: false,
                message: outcome.message.clone(),
                attempt: attempt_number,
                resolved_at: now,
                metrics: ResolutionMetrics { time_to_resolve_ms: 0, resources_used: attempt_number },
            });

            if task.attempts >= task.max_attempts {
                match strategy::next_strategy(strategy) {
                    Some(next) => {
                        logging::healing_strategy_exhausted(
                            task_id,
                            strategy::label(strategy),
                            Some(strategy::label(next)),
                        );
                        task.strategy = next;
                        task.attempts = 0;
                        task.max_attempts = strategy::config_for(next).max_attempts;
                        task.status = HealingStatus::Pending;
                    }
                    None => {
                        logging::healing_strategy_exhausted(task_id, strategy::label(strategy), None);
                        task.status = HealingStatus::Escalated;
                        metrics.escalations += 1;
                        logging::healing_task_escalated(task_id, &outcome.message);
                    }
                }
            } else {
                task.status = HealingStatus::Pending;
            }
        }

        let result = task.clone();
        self.persist(&state).await?;
        Ok(result)
    }

    async fn execute_strategy(
        &self,
        strategy: Strategy,
        attempt_number: u32,
        job_id: &str,
        context: &HashMap<String, Value>,
    ) -> StrategyOutcome {
        match strategy {
            Strategy::RetryWithBackoff => {
                let backoff = strategy::backoff_ms(strategy, attempt_number.saturating_sub(1));
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                self.reenqueue_job(job_id, attempt_number, context).await;
                let success = self.probe.attempt(strategy, context).await;
                StrategyOutcome {
                    success,
                    message: format!("retried job {job_id} after {backoff}ms backoff"),
                    updated_context: None,
                    forced_escalation: false,
                }
            }
            Strategy::ClearCacheRetry => {
                let backoff = strategy::backoff_ms(strategy, attempt_number.saturating_sub(1));
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                if let Some(Value::String(repo_name)) = context.get("repoName") {
                    self.kv.delete(&format!("repo:{repo_name}")).await;
                    self.kv.delete(&format!("cohesiveness:{repo_name}")).await;
                }
                self.kv.delete(&format!("cache:{job_id}")).await;
                self.reenqueue_job(job_id, attempt_number, context).await;
                let success = self.probe.attempt(strategy, context).await;
                StrategyOutcome {
                    success,
                    message: "cleared cache and retried".to_string(),
                    updated_context: None,
                    forced_escalation: false,
                }
            }
            Strategy::SwitchEndpoint => {
                let backoff = strategy::backoff_ms(strategy, attempt_number.saturating_sub(1));
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                let success = self.probe.attempt(strategy, context).await;
                StrategyOutcome {
                    success,
                    message: "attempted backup upstream".to_string(),
                    updated_context: None,
                    forced_escalation: false,
                }
            }
            Strategy::ReduceBatchSize => {
                let backoff = strategy::backoff_ms(strategy, attempt_number.saturating_sub(1));
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                let current = context.get("batchSize").and_then(Value::as_u64).unwrap_or(10);
                let reduced = (current / 2).max(1);
                let mut updated_context = context.clone();
                updated_context.insert("batchSize".to_string(), Value::from(reduced));
                self.reenqueue_job(job_id, attempt_number, &updated_context).await;
                let success = self.probe.attempt(strategy, &updated_context).await;
                StrategyOutcome {
                    success,
                    message: format!("reduced batch size to {reduced}"),
                    updated_context: Some(updated_context),
                    forced_escalation: false,
                }
            }
            Strategy::NotifyAndSkip => {
                if let Some(task) = self.find_task_by_job(job_id).await {
                    let _ = self
                        .kv
                        .set(
                            format!("skipped:{}", task.id),
                            serde_json::to_value(&task).unwrap_or(Value::Null),
                            Some(Duration::days(7)),
                        )
                        .await;
                }
                StrategyOutcome {
                    success: true,
                    message: "notified and skipped".to_string(),
                    updated_context: None,
                    forced_escalation: false,
                }
            }
            Strategy::FullReset => {
                let backoff = strategy::backoff_ms(strategy, attempt_number.saturating_sub(1));
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                match context.get("repoName").and_then(Value::as_str) {
                    Some(repo_name) => {
                        self.kv.delete(&format!("repo:{repo_name}")).await;
                        self.kv.delete(&format!("cohesiveness:{repo_name}")).await;
                        self.scrape_queue
                            .enqueue(ScrapeTask {
                                id: self.clock.new_id(),
                                repo: repo_name.to_string(),
                                scrape_type: ScrapeType::Full,
                                priority: JobPriority::Critical,
                            })
                            .await;
                        StrategyOutcome {
                            success: true,
                            message: format!("full reset for {repo_name}"),
                            updated_context: None,
                            forced_escalation: false,
                        }
                    }
                    None => StrategyOutcome {
                        success: false,
                        message: "full_reset requires context.repoName".to_string(),
                        updated_context: None,
                        forced_escalation: false,
                    },
                }
            }
            Strategy::EscalateToAgent => {
                if let Some(task) = self.find_task_by_job(job_id).await {
                    self.escalate_under_kv(&task).await.ok();
                }
                self.job_queue
                    .enqueue(JobQueueMessage::Retry(JobRetrySignal {
                        job_id: job_id.to_string(),
                        job_type: JobType::Notify,
                        priority: JobPriority::Critical,
                        retry_count: attempt_number,
                        context: context.clone(),
                    }))
                    .await;
                StrategyOutcome {
                    success: false,
                    message: "escalated to agent".to_string(),
                    updated_context: None,
                    forced_escalation: true,
                }
            }
        }
    }

    async fn reenqueue_job(&self, job_id: &str, retry_count: u32, context: &HashMap<String, Value>) {
        self.job_queue
            .enqueue(JobQueueMessage::Retry(JobRetrySignal {
                job_id: job_id.to_string(),
                job_type: JobType::SyncContent,
                priority: JobPriority::High,
                retry_count,
                context: context.clone(),
            }))
            .await;
    }

    async fn escalate_under_kv(&self, task: &HealingTask) -> SchedulerResult<()> {
        self.kv.set(format!("escalated:{}", task.id), serde_json::to_value(task)?, None).await;
        Ok(())
    }

    async fn find_task_by_job(&self, job_id: &str) -> Option<HealingTask> {
        let state = self.state.lock().await;
        state.tasks.values().find(|t| t.job_id == job_id).cloned()
    }

    pub async fn health_check(&self) -> SchedulerResult<HealerHealth> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let mut warnings = Vec::new();
        for task in state.tasks.values() {
            if matches!(task.status, HealingStatus::Pending)
                && (now - task.updated_at) > Duration::minutes(STUCK_PENDING_MINUTES)
            {
                warnings.push(format!("task {} pending for over 30 minutes", task.id));
            }
        }

        let critical = state.metrics.total_attempts > ESCALATION_RATE_MIN_SAMPLE
            && (state.metrics.escalations as f64 / state.metrics.total_attempts as f64)
                > ESCALATION_RATE_WARN_THRESHOLD;

        Ok(HealerHealth {
            status: if critical {
                "critical"
            } else if warnings.is_empty() {
                "ok"
            } else {
                "warning"
            }
            .to_string(),
            warnings,
            critical,
        })
    }

    pub async fn get_task(&self, id: &str) -> SchedulerResult<HealingTask> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        state.tasks.get(id).cloned().ok_or_else(|| SchedulerError::NotFound {
            resource: format!("healing_task:{id}"),
        })
    }

    pub async fn get_metrics(&self) -> SchedulerResult<HealerMetrics> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        Ok(state.metrics.clone())
    }
}

fn rolling_average(avg_old: u64, n: u64, sample: u64) -> u64 {
    if n == 0 {
        return sample;
    }
    let total = (avg_old as f64) * ((n - 1) as f64) + (sample as f64);
    (total / n as f64).round() as u64
}

fn severity_label(s: super::types::Severity) -> &'static str {
    use super::types::Severity;
    match s {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}
