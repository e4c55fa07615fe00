//! Entry point: wires the three components, starts the queue processors as
//! background polling loops, and serves the HTTP adapter.

use async_trait::async_trait;
use blackroad_scheduler_core::api;
use blackroad_scheduler_core::config::SchedulerConfig;
use blackroad_scheduler_core::error::SchedulerResult;
use blackroad_scheduler_core::jobs::types::Job;
use blackroad_scheduler_core::messages::ScrapeTask;
use blackroad_scheduler_core::processors::{HealingProcessor, JobHandler, JobProcessor, Scraper};
use blackroad_scheduler_core::repos::types::RepoData;
use blackroad_scheduler_core::store::{DurableStore, FileStore, MemoryStore};
use blackroad_scheduler_core::{default_probe, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Placeholder dispatch for job types this core doesn't execute itself.
/// Per-type work is a deployment concern; a real binary swaps this for a
/// dispatcher that knows how to run `sync_content`, `notify`, etc.
struct NoopJobHandler;

#[async_trait]
impl JobHandler for NoopJobHandler {
    async fn execute(&self, job: &Job) -> SchedulerResult<serde_json::Value> {
        info!(job_id = %job.id, job_type = ?job.job_type, "no-op handler executed job");
        Ok(serde_json::json!({ "handled": "noop" }))
    }
}

/// Placeholder scraper that always reports an ETag match (nothing changed).
/// A real deployment plugs in the collaborator that actually talks to the
/// code host.
struct NoopScraper;

#[async_trait]
impl Scraper for NoopScraper {
    async fn scrape(&self, task: &ScrapeTask, _etag: Option<&str>) -> SchedulerResult<Option<RepoData>> {
        info!(repo = %task.repo, "no-op scraper reported no change");
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = SchedulerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    });
    info!(environment = %config.environment, "configuration loaded");

    let store: Arc<dyn DurableStore> = match std::env::var("STORAGE_DIR") {
        Ok(dir) => {
            info!(dir = %dir, "using file-backed durable store");
            Arc::new(FileStore::new(PathBuf::from(dir)))
        }
        Err(_) => {
            info!("STORAGE_DIR unset, using in-memory durable store");
            Arc::new(MemoryStore::new())
        }
    };

    let known_repos_seed: Vec<String> = std::env::var("KNOWN_REPOS")
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    let state = AppState::bootstrap(config, store, known_repos_seed, default_probe()).await?;
    info!("all components hydrated");

    spawn_processor_loops(&state);

    let app = api::router(state.clone());
    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");

    let shutdown = async {
        #[allow(clippy::unwrap_used)]
        tokio::signal::ctrl_c().await.unwrap();
        info!("shutdown signal received");
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server stopped");
    Ok(())
}

/// Starts one polling loop per queue processor. Each loop drains a batch,
/// sleeps briefly, and repeats for the life of the process.
fn spawn_processor_loops(state: &AppState) {
    let job_processor = Arc::new(JobProcessor::new(
        state.jobs.clone(),
        state.healing_queue.clone(),
        state.job_queue.clone(),
        Arc::new(blackroad_scheduler_core::clock::SystemClock),
        Arc::new(NoopJobHandler),
    ));
    tokio::spawn(poll_loop("job_processor", Duration::from_millis(500), move || {
        let processor = job_processor.clone();
        async move { processor.process_batch(10).await.map(|_| ()) }
    }));

    let scrape_processor = Arc::new(blackroad_scheduler_core::processors::ScrapeProcessor::new(
        state.repos.clone(),
        state.healing_queue.clone(),
        state.scrape_queue.clone(),
        state.kv.clone(),
        Arc::new(blackroad_scheduler_core::clock::SystemClock),
        Arc::new(NoopScraper),
    ));
    tokio::spawn(poll_loop("scrape_processor", Duration::from_millis(500), move || {
        let processor = scrape_processor.clone();
        async move { processor.process_batch(10).await.map(|_| ()) }
    }));

    let healing_processor = Arc::new(HealingProcessor::new(state.healer.clone(), state.healing_queue.clone()));
    tokio::spawn(poll_loop("healing_processor", Duration::from_millis(500), move || {
        let processor = healing_processor.clone();
        async move { processor.process_batch(10).await.map(|_| ()) }
    }));
}

async fn poll_loop<F, Fut>(name: &'static str, period: Duration, mut step: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = SchedulerResult<()>> + Send,
{
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = step().await {
            error!(processor = name, error = %e, "processor batch failed");
        }
    }
}
