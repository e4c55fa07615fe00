//! Repository entity, its structural/cohesiveness sub-records, and the
//! scrape task message shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingConfig,
    StructureMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
    pub path: Option<String>,
    pub suggestion: Option<String>,
    pub auto_fixable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub files: Vec<String>,
    pub directories: Vec<String>,
    pub config_files: Vec<String>,
    pub has_manifest: bool,
    pub has_type_config: bool,
    pub has_deployment_config: bool,
    pub primary_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohesiveness {
    pub structure: u32,
    pub naming: u32,
    pub dependencies: u32,
    pub config: u32,
    pub overall: u32,
    pub issues: Vec<Issue>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl Default for Cohesiveness {
    fn default() -> Self {
        Self {
            structure: 100,
            naming: 100,
            dependencies: 100,
            config: 100,
            overall: 100,
            issues: Vec::new(),
            last_checked: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoData {
    pub full_name: String,
    pub description: Option<String>,
    pub stars: Option<u64>,
    pub structure: Structure,
    pub cohesiveness: Cohesiveness,
    pub etag: Option<String>,
    pub last_scraped_at: DateTime<Utc>,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListReposResult {
    pub repos: Vec<RepoData>,
    pub known_repos: Vec<String>,
    pub last_full_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub in_progress: bool,
    pub last_full_sync: Option<DateTime<Utc>>,
    pub last_cohesiveness_check: Option<DateTime<Utc>>,
    pub repo_count: usize,
    pub recent_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohesivenessReport {
    pub repos: Vec<RepoCohesivenessSummary>,
    pub average_overall: f64,
    pub by_severity: SeverityCounts,
    pub auto_fixable_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoCohesivenessSummary {
    pub full_name: String,
    pub overall: u32,
    pub issue_count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
}

/// Fields accepted by `updateRepo`; at minimum `full_name` and `structure`
/// must be supplied by the caller, all else defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoUpdateRequest {
    pub full_name: String,
    pub description: Option<String>,
    pub stars: Option<u64>,
    pub structure: Structure,
    pub etag: Option<String>,
}
