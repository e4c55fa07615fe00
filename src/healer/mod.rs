//! Progressive, multi-strategy remediation engine: the strategy-escalation
//! state machine, backoff scheduling, metrics, and escalation sinks.

pub mod healer;
pub mod strategy;
pub mod types;

pub use healer::{AlwaysFailProbe, RemediationProbe, SelfHealer};
pub use types::{
    HealerHealth, HealerMetrics, HealingIssue, HealingStatus, HealingTask, Resolution,
    ResolutionMetrics, Severity, Strategy, StrategyMetrics,
};
