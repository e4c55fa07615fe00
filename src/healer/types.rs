//! Healing task entity, strategy enum, and resolution record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One node of the escalation graph. Order here is purely declarative; the
/// graph's edges live in [`crate::healer::strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RetryWithBackoff,
    ClearCacheRetry,
    SwitchEndpoint,
    ReduceBatchSize,
    NotifyAndSkip,
    FullReset,
    EscalateToAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingStatus {
    Pending,
    Attempting,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingIssue {
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    pub context: HashMap<String, Value>,
    pub original_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionMetrics {
    pub time_to_resolve_ms: u64,
    pub resources_used: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub strategy: Strategy,
    pub success: bool,
    pub message: String,
    pub attempt: u32,
    pub resolved_at: DateTime<Utc>,
    pub metrics: ResolutionMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingTask {
    pub id: String,
    pub job_id: String,
    pub issue: HealingIssue,
    pub strategy: Strategy,
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: HealingStatus,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u32,
}

const SCHEMA_VERSION: u32 = 1;

impl HealingTask {
    /// Builds a task ready to be handed to `SelfHealer::ingest`. The
    /// strategy table supplies the default attempt ceiling; callers that
    /// need a stricter budget (e.g. a scrape failure that should escalate
    /// faster than a job failure) pass an explicit override.
    pub fn new(
        id: String,
        job_id: String,
        issue: HealingIssue,
        strategy: Strategy,
        max_attempts_override: Option<u32>,
        now: DateTime<Utc>,
    ) -> Self {
        let max_attempts =
            max_attempts_override.unwrap_or_else(|| super::strategy::config_for(strategy).max_attempts);
        Self {
            id,
            job_id,
            issue,
            strategy,
            attempts: 0,
            max_attempts,
            status: HealingStatus::Pending,
            resolution: None,
            created_at: now,
            updated_at: now,
            schema_version: SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealerMetrics {
    pub total_attempts: u64,
    pub successful_resolutions: u64,
    pub escalations: u64,
    pub average_time_to_resolve_ms: u64,
    pub by_strategy: HashMap<String, StrategyMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub attempts: u64,
    pub successes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealerHealth {
    pub status: String,
    pub warnings: Vec<String>,
    pub critical: bool,
}
