//! Authoritative job registry: lifecycle, priority ordering, retry
//! accounting, metrics, and garbage collection.

pub mod coordinator;
pub mod types;

pub use coordinator::{JobCoordinator, JobCoordinatorHealth};
pub use types::{
    CleanupResult, Job, JobCreateRequest, JobMetrics, JobPatch, JobPriority, JobStatus, JobType,
    ListJobsQuery, ListJobsResult,
};
