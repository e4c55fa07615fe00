//! Job queue processor: glue between the job queue and the job coordinator.
//!
//! The actual work a job performs is an external collaborator concern (the
//! core only tracks lifecycle); `JobHandler` is the trait boundary a
//! deployment plugs its per-type dispatch into. On exhausted retries this
//! processor constructs a healing task and enqueues it; it never reaches
//! into the healer directly, matching the message-only boundary between
//! components.

use crate::clock::Clock;
use crate::error::SchedulerResult;
use crate::healer::types::{HealingIssue, HealingTask, Severity as HealSeverity, Strategy};
use crate::jobs::types::{Job, JobPatch, JobStatus};
use crate::jobs::JobCoordinator;
use crate::logging;
use crate::messages::{JobQueueMessage, JobRetrySignal};
use crate::queue::Queue;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, job: &Job) -> SchedulerResult<Value>;
}

pub struct JobProcessor {
    coordinator: Arc<JobCoordinator>,
    healing_queue: Arc<Queue<HealingTask>>,
    queue: Arc<Queue<JobQueueMessage>>,
    clock: Arc<dyn Clock>,
    handler: Arc<dyn JobHandler>,
}

impl JobProcessor {
    #[must_use]
    pub fn new(
        coordinator: Arc<JobCoordinator>,
        healing_queue: Arc<Queue<HealingTask>>,
        queue: Arc<Queue<JobQueueMessage>>,
        clock: Arc<dyn Clock>,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        Self { coordinator, healing_queue, queue, clock, handler }
    }

    /// Drains up to `batch_size` pending messages and processes each to
    /// completion (ack or redeliver).
    pub async fn process_batch(&self, batch_size: usize) -> SchedulerResult<usize> {
        let batch = self.queue.consume_batch(batch_size).await;
        let count = batch.len();
        for delivery in batch {
            match &delivery.message {
                JobQueueMessage::New(job) => {
                    self.dispatch(&job.id).await?;
                }
                JobQueueMessage::Retry(signal) => {
                    self.dispatch_retry(signal).await?;
                }
            }
            self.queue.ack(&delivery.delivery_id).await;
        }
        Ok(count)
    }

    async fn dispatch(&self, job_id: &str) -> SchedulerResult<()> {
        let job = self.coordinator.get_job(job_id).await?;
        self.run(job).await
    }

    async fn dispatch_retry(&self, signal: &JobRetrySignal) -> SchedulerResult<()> {
        let job = self.coordinator.get_job(&signal.job_id).await?;
        self.run(job).await
    }

    async fn run(&self, job: Job) -> SchedulerResult<()> {
        self.coordinator
            .update_job(&job.id, JobPatch { status: Some(JobStatus::Running), ..Default::default() })
            .await?;

        match self.handler.execute(&job).await {
            Ok(result) => {
                self.coordinator
                    .update_job(
                        &job.id,
                        JobPatch {
                            status: Some(JobStatus::Completed),
                            result: Some(result),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            Err(e) => {
                if job.retry_count < job.max_retries {
                    logging::job_failed(&job.id, job.retry_count + 1, job.max_retries, &e.to_string());
                    self.coordinator
                        .update_job(
                            &job.id,
                            JobPatch {
                                status: Some(JobStatus::Pending),
                                retry_count: Some(job.retry_count + 1),
                                error: Some(e.to_string()),
                                ..Default::default()
                            },
                        )
                        .await?;
                } else {
                    self.coordinator
                        .update_job(
                            &job.id,
                            JobPatch {
                                status: Some(JobStatus::Healing),
                                error: Some(e.to_string()),
                                ..Default::default()
                            },
                        )
                        .await?;

                    let task = HealingTask::new(
                        self.clock.new_id(),
                        job.id.clone(),
                        HealingIssue {
                            issue_type: "job_exhausted_retries".to_string(),
                            severity: HealSeverity::High,
                            description: format!("job {} exhausted its retry budget", job.id),
                            context: HashMap::new(),
                            original_error: Some(e.to_string()),
                        },
                        Strategy::RetryWithBackoff,
                        None,
                        self.clock.now(),
                    );
                    self.healing_queue.enqueue(task).await;
                }
            }
        }
        Ok(())
    }
}
