//! Job entity and its supporting enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ScrapeRepo,
    SyncContent,
    CheckCohesiveness,
    SelfHeal,
    UpdateCache,
    FullSync,
    Cleanup,
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Healing,
}

/// Lower rank sorts earlier: `Critical < High < Normal < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Critical,
    High,
    Normal,
    Low,
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub payload: HashMap<String, Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub healing_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub result: Option<Value>,
    /// Ambient: what created this job (`"http"`, `"cron"`, `"healer"`, ...).
    /// Purely descriptive.
    pub source: String,
    pub schema_version: u32,
}

/// Caller-supplied fields for `createJob`; anything omitted gets the
/// coordinator's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobCreateRequest {
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub priority: Option<JobPriority>,
    pub payload: Option<HashMap<String, Value>>,
    pub max_retries: Option<u32>,
    pub source: Option<String>,
}

/// Caller-supplied fields for `updateJob`; only present fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub retry_count: Option<u32>,
    pub healing_attempts: Option<u32>,
    pub error: Option<String>,
    pub result: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobMetrics {
    pub total_created: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_healing: u64,
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub healing: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListJobsResult {
    pub jobs: Vec<Job>,
    pub metrics: JobMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub cleaned: usize,
    pub remaining: usize,
}
