//! Authoritative repository registry, sync orchestration, and cohesiveness
//! scoring.
//!
//! Most operations take the component's lock for their entire duration, per
//! the durable entity contract. `triggerFullSync` is the one exception: it
//! is fire-and-forget, so the `inProgress` flag is set and cleared in two
//! short critical sections around the (potentially long) batch of scrape
//! enqueues, which is what makes two overlapping calls able to observe each
//! other's in-flight state rather than simply serializing end-to-end.

use super::cohesiveness;
use super::types::{
    CohesivenessReport, ListReposResult, RepoCohesivenessSummary, RepoData, RepoUpdateRequest,
    SeverityCounts, SyncStatus,
};
use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};
use crate::healer::types::{HealingIssue, HealingTask, Severity as HealSeverity, Strategy};
use crate::logging;
use crate::messages::{ScrapeTask, ScrapeType};
use crate::queue::Queue;
use crate::store::{DurableStore, KvStore};
use crate::validation;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

const COMPONENT: &str = "repo_sync_engine";
const SCHEMA_VERSION: u32 = 1;
const RECENT_ERRORS_CAP: usize = 10;

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersistedState {
    repos: HashMap<String, RepoData>,
    known_repos: Vec<String>,
    last_full_sync: Option<DateTime<Utc>>,
    last_cohesiveness_check: Option<DateTime<Utc>>,
    schema_version: u32,
}

struct State {
    hydrated: bool,
    repos: HashMap<String, RepoData>,
    known_repos: Vec<String>,
    last_full_sync: Option<DateTime<Utc>>,
    last_cohesiveness_check: Option<DateTime<Utc>>,
    in_progress: bool,
    recent_errors: VecDeque<String>,
}

pub struct RepoSyncEngine {
    state: Mutex<State>,
    store: Arc<dyn DurableStore>,
    scrape_queue: Arc<Queue<ScrapeTask>>,
    healing_queue: Arc<Queue<HealingTask>>,
    kv: Arc<KvStore>,
    clock: Arc<dyn Clock>,
}

impl RepoSyncEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn DurableStore>,
        scrape_queue: Arc<Queue<ScrapeTask>>,
        healing_queue: Arc<Queue<HealingTask>>,
        kv: Arc<KvStore>,
        clock: Arc<dyn Clock>,
        known_repos_seed: Vec<String>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                hydrated: false,
                repos: HashMap::new(),
                known_repos: known_repos_seed,
                last_full_sync: None,
                last_cohesiveness_check: None,
                in_progress: false,
                recent_errors: VecDeque::new(),
            }),
            store,
            scrape_queue,
            healing_queue,
            kv,
            clock,
        }
    }

    pub async fn hydrate(&self) -> SchedulerResult<()> {
        let persisted = self.store.load(COMPONENT).await?;
        let mut state = self.state.lock().await;
        if let Some(value) = persisted {
            let persisted: PersistedState = serde_json::from_value(value)?;
            state.repos = persisted.repos;
            if !persisted.known_repos.is_empty() {
                state.known_repos = persisted.known_repos;
            }
            state.last_full_sync = persisted.last_full_sync;
            state.last_cohesiveness_check = persisted.last_cohesiveness_check;
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
            repos: state.repos.clone(),
            known_repos: state.known_repos.clone(),
            last_full_sync: state.last_full_sync,
            last_cohesiveness_check: state.last_cohesiveness_check,
            schema_version: SCHEMA_VERSION,
        };
        self.store.save(COMPONENT, &serde_json::to_value(persisted)?).await
    }

    pub async fn list_repos(&self) -> SchedulerResult<ListReposResult> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        Ok(ListReposResult {
            repos: state.repos.values().cloned().collect(),
            known_repos: state.known_repos.clone(),
            last_full_sync: state.last_full_sync,
        })
    }

    pub async fn get_status(&self) -> SchedulerResult<SyncStatus> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        Ok(SyncStatus {
            in_progress: state.in_progress,
            last_full_sync: state.last_full_sync,
            last_cohesiveness_check: state.last_cohesiveness_check,
            repo_count: state.repos.len(),
            recent_errors: state.recent_errors.iter().cloned().collect(),
        })
    }

    pub async fn record_error(&self, message: impl Into<String>) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        if state.recent_errors.len() >= RECENT_ERRORS_CAP {
            state.recent_errors.pop_front();
        }
        state.recent_errors.push_back(message.into());
        self.persist(&state).await
    }

    /// Fire-and-forget: enqueues a full-scrape task per known repo and
    /// returns as soon as they are queued, without waiting on any scrape to
    /// complete.
    pub async fn trigger_full_sync(&self) -> SchedulerResult<usize> {
        let known_repos = {
            let mut state = self.state.lock().await;
            Self::require_hydrated(&state)?;
            if state.in_progress {
                return Err(SchedulerError::Conflict {
                    reason: "full sync already in progress".to_string(),
                });
            }
            state.in_progress = true;
            state.known_repos.clone()
        };

        logging::full_sync_started(known_repos.len());
        for repo in &known_repos {
            self.scrape_queue
                .enqueue(ScrapeTask {
                    id: self.clock.new_id(),
                    repo: repo.clone(),
                    scrape_type: ScrapeType::Full,
                    priority: crate::jobs::types::JobPriority::Normal,
                })
                .await;
        }

        let mut state = self.state.lock().await;
        state.in_progress = false;
        state.last_full_sync = Some(self.clock.now());
        self.persist(&state).await?;

        Ok(known_repos.len())
    }

    pub async fn sync_repo(&self, repo_name: &str) -> SchedulerResult<()> {
        validation::require_non_empty("repoName", repo_name)?;
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;
        self.scrape_queue
            .enqueue(ScrapeTask {
                id: self.clock.new_id(),
                repo: repo_name.to_string(),
                scrape_type: ScrapeType::Full,
                priority: crate::jobs::types::JobPriority::High,
            })
            .await;
        Ok(())
    }

    /// Recomputes cohesiveness for every stored repo, writes a 1-hour TTL
    /// snapshot to the shared cache, and files a healing task for any repo
    /// with an auto-fixable critical issue.
    pub async fn trigger_cohesiveness_check(&self) -> SchedulerResult<usize> {
        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let full_names: Vec<String> = state.repos.keys().cloned().collect();
        let mut healing_tasks_enqueued = 0;

        for full_name in &full_names {
            let Some(repo) = state.repos.get_mut(full_name) else { continue };
            let mut score = cohesiveness::score(&repo.structure);
            score.last_checked = Some(now);
            repo.cohesiveness = score.clone();

            logging::repo_synced(full_name, score.overall, score.issues.len());

            self.kv
                .set(
                    format!("cohesiveness:{full_name}"),
                    serde_json::to_value(&score)?,
                    Some(Duration::hours(1)),
                )
                .await;

            let critical_autofixable: Vec<_> = score
                .issues
                .iter()
                .filter(|i| i.severity == super::types::Severity::Critical && i.auto_fixable)
                .collect();

            if !critical_autofixable.is_empty() {
                let mut context = HashMap::new();
                context.insert("repoName".to_string(), Value::String(full_name.clone()));
                context.insert(
                    "issues".to_string(),
                    serde_json::to_value(&critical_autofixable)?,
                );

                let task = HealingTask::new(
                    self.clock.new_id(),
                    format!("scrape-{full_name}"),
                    HealingIssue {
                        issue_type: "cohesiveness_critical".to_string(),
                        severity: HealSeverity::High,
                        description: format!("critical auto-fixable issues in {full_name}"),
                        context,
                        original_error: None,
                    },
                    Strategy::EscalateToAgent,
                    None,
                    now,
                );
                logging::healing_task_enqueued(&task.id, &task.job_id, "escalate_to_agent", "high");
                self.healing_queue.enqueue(task).await;
                healing_tasks_enqueued += 1;
            }
        }

        state.last_cohesiveness_check = Some(now);
        self.persist(&state).await?;
        Ok(healing_tasks_enqueued)
    }

    pub async fn get_cohesiveness_report(&self) -> SchedulerResult<CohesivenessReport> {
        let state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let repos: Vec<RepoCohesivenessSummary> = state
            .repos
            .values()
            .map(|r| RepoCohesivenessSummary {
                full_name: r.full_name.clone(),
                overall: r.cohesiveness.overall,
                issue_count: r.cohesiveness.issues.len(),
            })
            .collect();

        let average_overall = if repos.is_empty() {
            0.0
        } else {
            repos.iter().map(|r| f64::from(r.overall)).sum::<f64>() / repos.len() as f64
        };

        let mut by_severity = SeverityCounts::default();
        let mut auto_fixable_count = 0;
        for repo in state.repos.values() {
            for issue in &repo.cohesiveness.issues {
                match issue.severity {
                    super::types::Severity::Info => by_severity.info += 1,
                    super::types::Severity::Warning => by_severity.warning += 1,
                    super::types::Severity::Critical => by_severity.critical += 1,
                }
                if issue.auto_fixable {
                    auto_fixable_count += 1;
                }
            }
        }

        Ok(CohesivenessReport { repos, average_overall, by_severity, auto_fixable_count })
    }

    /// Upserts the repo (the canonical writer of `repo:{fullName}`, with no
    /// TTL) and grows the known-repo list if this is a name not seen
    /// before.
    pub async fn update_repo(&self, request: RepoUpdateRequest) -> SchedulerResult<RepoData> {
        validation::require_full_name("fullName", &request.full_name)?;

        let mut state = self.state.lock().await;
        Self::require_hydrated(&state)?;

        let now = self.clock.now();
        let cohesiveness = state
            .repos
            .get(&request.full_name)
            .map(|r| r.cohesiveness.clone())
            .unwrap_or_default();

        let repo = RepoData {
            full_name: request.full_name.clone(),
            description: request.description,
            stars: request.stars,
            structure: request.structure,
            cohesiveness,
            etag: request.etag,
            last_scraped_at: now,
            schema_version: SCHEMA_VERSION,
        };

        state.repos.insert(repo.full_name.clone(), repo.clone());

        let short_name = repo
            .full_name
            .rsplit('/')
            .next()
            .unwrap_or(&repo.full_name)
            .to_string();
        if !state.known_repos.contains(&short_name) {
            state.known_repos.push(short_name);
        }

        self.kv
            .set(format!("repo:{}", repo.full_name), serde_json::to_value(&repo)?, None)
            .await;

        self.persist(&state).await?;
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;
    use crate::repos::types::Structure;
    use crate::store::MemoryStore;

    fn engine(known: Vec<&str>) -> RepoSyncEngine {
        RepoSyncEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Queue::new("scrape")),
            Arc::new(Queue::new("healing")),
            Arc::new(KvStore::new()),
            Arc::new(FixedClock::at(chrono::Utc::now())),
            known.into_iter().map(String::from).collect(),
        )
    }

    async fn hydrated(known: Vec<&str>) -> RepoSyncEngine {
        let e = engine(known);
        e.hydrate().await.unwrap();
        e
    }

    fn full_structure() -> Structure {
        Structure {
            files: vec!["README.md".to_string()],
            directories: vec!["src".to_string()],
            config_files: vec!["Cargo.toml".to_string()],
            has_manifest: true,
            has_type_config: true,
            has_deployment_config: true,
            primary_language: Some("rust".to_string()),
        }
    }

    #[tokio::test]
    async fn update_repo_then_list_contains_it() {
        let e = hydrated(vec![]).await;
        e.update_repo(RepoUpdateRequest {
            full_name: "acme/foo".to_string(),
            description: None,
            stars: None,
            structure: full_structure(),
            etag: None,
        })
        .await
        .unwrap();

        let listed = e.list_repos().await.unwrap();
        assert_eq!(listed.repos.len(), 1);
        assert_eq!(listed.repos[0].full_name, "acme/foo");
        assert!(listed.known_repos.contains(&"foo".to_string()));
    }

    #[tokio::test]
    async fn update_repo_rejects_malformed_full_name() {
        let e = hydrated(vec![]).await;
        let result = e
            .update_repo(RepoUpdateRequest {
                full_name: "noSlash".to_string(),
                description: None,
                stars: None,
                structure: full_structure(),
                etag: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_known_repos_full_sync_still_updates_timestamp() {
        let e = hydrated(vec![]).await;
        let count = e.trigger_full_sync().await.unwrap();
        assert_eq!(count, 0);
        let status = e.get_status().await.unwrap();
        assert!(status.last_full_sync.is_some());
    }

    #[tokio::test]
    async fn second_overlapping_full_sync_is_rejected() {
        let e = Arc::new(hydrated(vec!["foo", "bar"]).await);
        {
            let mut state = e.state.lock().await;
            state.in_progress = true;
        }
        let result = e.trigger_full_sync().await;
        assert!(matches!(result, Err(SchedulerError::Conflict { .. })));
    }

    #[tokio::test]
    async fn cohesiveness_check_persists_scores() {
        let e = hydrated(vec![]).await;
        e.update_repo(RepoUpdateRequest {
            full_name: "acme/foo".to_string(),
            description: None,
            stars: None,
            structure: full_structure(),
            etag: None,
        })
        .await
        .unwrap();

        e.trigger_cohesiveness_check().await.unwrap();
        let report = e.get_cohesiveness_report().await.unwrap();
        assert_eq!(report.repos.len(), 1);
        assert!(report.repos[0].overall >= 90);
    }
}
