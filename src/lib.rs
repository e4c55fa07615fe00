//! # BlackRoad Scheduler Core
//!
//! A content-scheduler control plane: three cooperating components — a job
//! coordinator, a repository sync engine with cohesiveness scoring, and a
//! progressive self-healer — communicating over durable queues and a shared
//! KV cache. Each component is a single-writer actor hydrated from a
//! pluggable durable store; queue processors are the only glue between
//! them, so no component holds a direct reference to another.
//!
//! ## Architecture
//!
//! - [`jobs`]: authoritative job registry, lifecycle, retry accounting
//! - [`repos`]: tracked-repository registry, sync orchestration, cohesiveness scoring
//! - [`healer`]: strategy-escalation remediation engine
//! - [`processors`]: queue-to-component glue
//! - [`store`]: durable entity persistence and the shared TTL cache
//! - [`queue`]: the at-least-once message queue adapter
//! - [`api`]: the thin HTTP adapter
//! - [`config`]: environment-driven runtime configuration
//! - [`error`]: the shared error taxonomy

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod healer;
pub mod jobs;
pub mod logging;
pub mod messages;
pub mod processors;
pub mod queue;
pub mod repos;
pub mod store;
pub mod validation;

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::healer::{AlwaysFailProbe, HealingTask, RemediationProbe, SelfHealer};
use crate::jobs::JobCoordinator;
use crate::messages::{JobQueueMessage, ScrapeTask};
use crate::queue::Queue;
use crate::repos::RepoSyncEngine;
use crate::store::{DurableStore, KvStore};
use std::sync::Arc;

/// Shared application handle threaded through every HTTP handler: `Arc`-wrapped
/// component handles, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobCoordinator>,
    pub repos: Arc<RepoSyncEngine>,
    pub healer: Arc<SelfHealer>,
    pub job_queue: Arc<Queue<JobQueueMessage>>,
    pub scrape_queue: Arc<Queue<ScrapeTask>>,
    pub healing_queue: Arc<Queue<HealingTask>>,
    pub kv: Arc<KvStore>,
    pub config: Arc<SchedulerConfig>,
}

impl AppState {
    /// Wires the three components and their shared queues/cache over a
    /// common durable store, then hydrates each before returning. Callers
    /// get back a state that is immediately safe to serve traffic from.
    pub async fn bootstrap(
        config: SchedulerConfig,
        store: Arc<dyn DurableStore>,
        known_repos_seed: Vec<String>,
        probe: Arc<dyn RemediationProbe>,
    ) -> error::SchedulerResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let kv = Arc::new(KvStore::new());

        let job_queue = Arc::new(Queue::new("jobs"));
        let scrape_queue = Arc::new(Queue::new("scrape"));
        let healing_queue = Arc::new(Queue::new("healing"));

        let jobs = Arc::new(JobCoordinator::new(
            store.clone(),
            job_queue.clone(),
            clock.clone(),
            config.max_retry_attempts,
        ));
        let repos = Arc::new(RepoSyncEngine::new(
            store.clone(),
            scrape_queue.clone(),
            healing_queue.clone(),
            kv.clone(),
            clock.clone(),
            known_repos_seed,
        ));
        let healer = Arc::new(SelfHealer::new(
            store,
            job_queue.clone(),
            scrape_queue.clone(),
            kv.clone(),
            clock,
            probe,
            config.self_heal_enabled,
        ));

        jobs.hydrate().await?;
        repos.hydrate().await?;
        healer.hydrate().await?;

        Ok(Self {
            jobs,
            repos,
            healer,
            job_queue,
            scrape_queue,
            healing_queue,
            kv,
            config: Arc::new(config),
        })
    }
}

/// Conservative default probe for deployments that haven't wired a real
/// remediation collaborator yet.
pub fn default_probe() -> Arc<dyn RemediationProbe> {
    Arc::new(AlwaysFailProbe)
}
