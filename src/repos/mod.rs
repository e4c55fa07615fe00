//! Authoritative repository registry: sync orchestration and cohesiveness
//! scoring.

pub mod cohesiveness;
pub mod engine;
pub mod types;

pub use engine::RepoSyncEngine;
pub use types::{
    CohesivenessReport, Issue, IssueType, ListReposResult, RepoCohesivenessSummary, RepoData,
    RepoUpdateRequest, Severity, Structure, SyncStatus,
};
