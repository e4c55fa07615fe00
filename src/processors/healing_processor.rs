//! Healing queue processor: the one place allowed to hold both the healing
//! queue and the self-healer directly, since it exists purely to drive one
//! from the other. Producers elsewhere only ever construct a `HealingTask`
//! and enqueue it; this processor is the sole consumer.
//!
//! A task is ingested once (idempotent against redelivery of the same
//! message) and then attempted. While the result stays `pending` — the
//! common case, since most strategies need several attempts before they
//! exhaust into the next node of the escalation graph — the original
//! delivery is redelivered so the next batch picks it up again. Once a task
//! reaches `resolved` or `escalated` the delivery is acked and the queue
//! stops carrying it.

use crate::error::SchedulerResult;
use crate::healer::types::HealingStatus;
use crate::healer::SelfHealer;
use crate::healer::types::HealingTask;
use crate::queue::Queue;
use std::sync::Arc;

pub struct HealingProcessor {
    healer: Arc<SelfHealer>,
    queue: Arc<Queue<HealingTask>>,
}

impl HealingProcessor {
    #[must_use]
    pub fn new(healer: Arc<SelfHealer>, queue: Arc<Queue<HealingTask>>) -> Self {
        Self { healer, queue }
    }

    pub async fn process_batch(&self, batch_size: usize) -> SchedulerResult<usize> {
        let batch = self.queue.consume_batch(batch_size).await;
        let count = batch.len();
        for delivery in batch {
            let task = self.healer.ingest(delivery.message.clone()).await?;
            let result = self.healer.attempt(&task.id).await?;

            match result.status {
                HealingStatus::Resolved | HealingStatus::Escalated => {
                    self.queue.ack(&delivery.delivery_id).await;
                }
                HealingStatus::Pending | HealingStatus::Attempting => {
                    self.queue.redeliver(&delivery.delivery_id).await;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;
    use crate::healer::types::{HealingIssue, Severity, Strategy};
    use crate::healer::AlwaysFailProbe;
    use crate::messages::JobQueueMessage;
    use crate::store::{KvStore, MemoryStore};
    use std::collections::HashMap;

    fn task(job_id: &str) -> HealingTask {
        HealingTask::new(
            format!("task-{job_id}"),
            job_id.to_string(),
            HealingIssue {
                issue_type: "job_exhausted_retries".to_string(),
                severity: Severity::High,
                description: "boom".to_string(),
                context: HashMap::new(),
                original_error: None,
            },
            Strategy::RetryWithBackoff,
            Some(1),
            chrono::Utc::now(),
        )
    }

    fn healer() -> Arc<SelfHealer> {
        Arc::new(SelfHealer::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Queue::<JobQueueMessage>::new("jobs")),
            Arc::new(Queue::new("scrape")),
            Arc::new(KvStore::new()),
            Arc::new(FixedClock::at(chrono::Utc::now())),
            Arc::new(AlwaysFailProbe),
            true,
        ))
    }

    #[tokio::test]
    async fn unresolved_task_is_redelivered_not_acked() {
        let healer = healer();
        healer.hydrate().await.unwrap();
        let queue = Arc::new(Queue::new("healing"));
        queue.enqueue(task("job-1")).await;

        let processor = HealingProcessor::new(healer, queue.clone());
        processor.process_batch(10).await.unwrap();

        assert_eq!(queue.pending_len().await, 1);
        assert_eq!(queue.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn exhausted_single_attempt_task_escalates_and_acks() {
        let healer = healer();
        healer.hydrate().await.unwrap();
        let queue = Arc::new(Queue::new("healing"));
        // max_attempts override of 1 on a strategy whose table next_on_exhaustion
        // is itself a non-terminal node still leaves the task pending under the
        // next strategy; loop until it reaches a terminal state to exercise ack.
        queue.enqueue(task("job-1")).await;

        let processor = HealingProcessor::new(healer.clone(), queue.clone());
        for _ in 0..20 {
            if queue.pending_len().await == 0 && queue.in_flight_len().await == 0 {
                break;
            }
            processor.process_batch(10).await.unwrap();
        }

        assert_eq!(queue.pending_len().await, 0);
        assert_eq!(queue.in_flight_len().await, 0);
    }
}
