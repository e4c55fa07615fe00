//! Message shapes shared across component boundaries via queues, kept
//! separate from any single component's entity module so neither the repo
//! sync engine nor the self-healer has to depend on the other just to build
//! a scrape task.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeType {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub id: String,
    pub repo: String,
    pub scrape_type: ScrapeType,
    pub priority: crate::jobs::types::JobPriority,
}

/// A signal asking the job processor to re-dispatch an existing job, as
/// opposed to a brand new one. The healer emits this instead of a full
/// `Job` record since it never holds the coordinator's copy of one —
/// the two components share only queues, never direct references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRetrySignal {
    pub job_id: String,
    pub job_type: crate::jobs::types::JobType,
    pub priority: crate::jobs::types::JobPriority,
    pub retry_count: u32,
    pub context: HashMap<String, Value>,
}

/// The job queue carries both brand-new jobs (from `createJob`) and retry
/// signals (from the healer); the processor dispatches each differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobQueueMessage {
    New(crate::jobs::types::Job),
    Retry(JobRetrySignal),
}
