//! Scrape queue processor: glue between the scrape queue and the repo sync
//! engine. The scraper's own parsing of remote-host payloads is out of
//! scope; `Scraper` is the trait boundary.

use crate::clock::Clock;
use crate::error::SchedulerResult;
use crate::healer::types::{HealingIssue, HealingTask, Severity as HealSeverity, Strategy};
use crate::messages::ScrapeTask;
use crate::queue::Queue;
use crate::repos::types::{RepoData, RepoUpdateRequest};
use crate::repos::RepoSyncEngine;
use crate::store::KvStore;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

/// Per spec, scrape-filed healing tasks escalate faster than job-filed ones:
/// three attempts at `retry_with_backoff` instead of the strategy table's
/// five-attempt default.
const SCRAPE_FAILURE_MAX_ATTEMPTS: u32 = 3;

/// `None` signals an ETag match: nothing changed upstream.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, task: &ScrapeTask, etag: Option<&str>) -> SchedulerResult<Option<RepoData>>;
}

pub struct ScrapeProcessor {
    engine: Arc<RepoSyncEngine>,
    healing_queue: Arc<Queue<HealingTask>>,
    queue: Arc<Queue<ScrapeTask>>,
    kv: Arc<KvStore>,
    clock: Arc<dyn Clock>,
    scraper: Arc<dyn Scraper>,
}

impl ScrapeProcessor {
    #[must_use]
    pub fn new(
        engine: Arc<RepoSyncEngine>,
        healing_queue: Arc<Queue<HealingTask>>,
        queue: Arc<Queue<ScrapeTask>>,
        kv: Arc<KvStore>,
        clock: Arc<dyn Clock>,
        scraper: Arc<dyn Scraper>,
    ) -> Self {
        Self { engine, healing_queue, queue, kv, clock, scraper }
    }

    pub async fn process_batch(&self, batch_size: usize) -> SchedulerResult<usize> {
        let batch = self.queue.consume_batch(batch_size).await;
        let count = batch.len();
        for delivery in batch {
            let task = delivery.message.clone();
            match self.scraper.scrape(&task, None).await {
                Ok(None) => {
                    self.queue.ack(&delivery.delivery_id).await;
                }
                Ok(Some(repo_data)) => {
                    self.engine
                        .update_repo(RepoUpdateRequest {
                            full_name: repo_data.full_name.clone(),
                            description: repo_data.description.clone(),
                            stars: repo_data.stars,
                            structure: repo_data.structure.clone(),
                            etag: repo_data.etag.clone(),
                        })
                        .await?;

                    self.kv
                        .set(
                            format!("repo:{}", repo_data.full_name),
                            serde_json::to_value(&repo_data)?,
                            Some(Duration::hours(1)),
                        )
                        .await;

                    self.queue.ack(&delivery.delivery_id).await;
                }
                Err(e) => {
                    self.engine.record_error(e.to_string()).await?;

                    let healing_task = HealingTask::new(
                        self.clock.new_id(),
                        format!("scrape-{}", task.repo),
                        HealingIssue {
                            issue_type: "scrape_failed".to_string(),
                            severity: HealSeverity::Warning,
                            description: format!("scrape of {} failed", task.repo),
                            context: HashMap::from([(
                                "repoName".to_string(),
                                serde_json::Value::String(task.repo.clone()),
                            )]),
                            original_error: Some(e.to_string()),
                        },
                        Strategy::RetryWithBackoff,
                        Some(SCRAPE_FAILURE_MAX_ATTEMPTS),
                        self.clock.now(),
                    );
                    self.healing_queue.enqueue(healing_task).await;
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
    use crate::error::SchedulerError;
    use crate::jobs::types::JobPriority;
    use crate::messages::ScrapeType;
    use crate::repos::types::Structure;
    use crate::store::MemoryStore;

    fn engine() -> Arc<RepoSyncEngine> {
        Arc::new(RepoSyncEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Queue::new("scrape")),
            Arc::new(Queue::new("healing")),
            Arc::new(KvStore::new()),
            Arc::new(FixedClock::at(chrono::Utc::now())),
            Vec::new(),
        ))
    }

    fn scrape_task() -> ScrapeTask {
        ScrapeTask {
            id: "t1".to_string(),
            repo: "acme/widgets".to_string(),
            scrape_type: ScrapeType::Full,
            priority: JobPriority::Normal,
        }
    }

    struct AlwaysFailsScraper;
    #[async_trait]
    impl Scraper for AlwaysFailsScraper {
        async fn scrape(&self, _task: &ScrapeTask, _etag: Option<&str>) -> SchedulerResult<Option<RepoData>> {
            Err(SchedulerError::TransientUpstream {
                operation: "scrape".to_string(),
                reason: "rate limited".to_string(),
            })
        }
    }

    struct AlwaysSucceedsScraper;
    #[async_trait]
    impl Scraper for AlwaysSucceedsScraper {
        async fn scrape(&self, task: &ScrapeTask, _etag: Option<&str>) -> SchedulerResult<Option<RepoData>> {
            Ok(Some(RepoData {
                full_name: task.repo.clone(),
                description: None,
                stars: Some(1),
                structure: Structure {
                    files: vec![],
                    directories: vec![],
                    config_files: vec![],
                    has_manifest: true,
                    has_type_config: true,
                    has_deployment_config: true,
                    primary_language: Some("rust".to_string()),
                },
                cohesiveness: Default::default(),
                etag: None,
                last_scraped_at: chrono::Utc::now(),
                schema_version: 1,
            }))
        }
    }

    #[tokio::test]
    async fn failed_scrape_files_healing_task_with_scrape_specific_max_attempts() {
        let eng = engine();
        eng.hydrate().await.unwrap();
        let healing_queue = Arc::new(Queue::new("healing"));
        let queue = Arc::new(Queue::new("scrape"));
        queue.enqueue(scrape_task()).await;

        let processor = ScrapeProcessor::new(
            eng,
            healing_queue.clone(),
            queue.clone(),
            Arc::new(KvStore::new()),
            Arc::new(FixedClock::at(chrono::Utc::now())),
            Arc::new(AlwaysFailsScraper),
        );

        processor.process_batch(10).await.unwrap();
        assert_eq!(healing_queue.pending_len().await, 1);
        let delivery = healing_queue.consume_batch(1).await.into_iter().next().unwrap();
        assert_eq!(delivery.message.max_attempts, SCRAPE_FAILURE_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn successful_scrape_updates_engine_and_acks() {
        let eng = engine();
        eng.hydrate().await.unwrap();
        let healing_queue = Arc::new(Queue::new("healing"));
        let queue = Arc::new(Queue::new("scrape"));
        queue.enqueue(scrape_task()).await;

        let processor = ScrapeProcessor::new(
            eng.clone(),
            healing_queue,
            queue.clone(),
            Arc::new(KvStore::new()),
            Arc::new(FixedClock::at(chrono::Utc::now())),
            Arc::new(AlwaysSucceedsScraper),
        );

        processor.process_batch(10).await.unwrap();
        let listed = eng.list_repos().await.unwrap();
        assert_eq!(listed.repos.len(), 1);
        assert_eq!(queue.pending_len().await, 0);
    }
}
