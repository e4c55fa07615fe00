//! The strategy-escalation graph.
//!
//! A static lookup table, not dispatch scattered through the execution
//! path, so every transition can be enumerated by a test. Each node carries
//! its attempt ceiling, per-attempt backoff schedule, and the node it
//! escalates to once exhausted.

use super::types::Strategy;

pub struct StrategyConfig {
    pub max_attempts: u32,
    pub backoff_ms: &'static [u64],
    pub next_on_exhaustion: Option<Strategy>,
}

#[must_use]
pub fn config_for(strategy: Strategy) -> StrategyConfig {
    match strategy {
        Strategy::RetryWithBackoff => StrategyConfig {
            max_attempts: 5,
            backoff_ms: &[1000, 2000, 4000, 8000, 16000],
            next_on_exhaustion: Some(Strategy::ClearCacheRetry),
        },
        Strategy::ClearCacheRetry => StrategyConfig {
            max_attempts: 2,
            backoff_ms: &[2000, 5000],
            next_on_exhaustion: Some(Strategy::SwitchEndpoint),
        },
        Strategy::SwitchEndpoint => StrategyConfig {
            max_attempts: 3,
            backoff_ms: &[1000, 3000, 5000],
            next_on_exhaustion: Some(Strategy::ReduceBatchSize),
        },
        Strategy::ReduceBatchSize => StrategyConfig {
            max_attempts: 3,
            backoff_ms: &[1000, 2000, 3000],
            next_on_exhaustion: Some(Strategy::NotifyAndSkip),
        },
        Strategy::NotifyAndSkip => StrategyConfig {
            max_attempts: 1,
            backoff_ms: &[0],
            next_on_exhaustion: Some(Strategy::EscalateToAgent),
        },
        Strategy::FullReset => StrategyConfig {
            max_attempts: 1,
            backoff_ms: &[5000],
            next_on_exhaustion: Some(Strategy::EscalateToAgent),
        },
        Strategy::EscalateToAgent => StrategyConfig {
            max_attempts: 1,
            backoff_ms: &[0],
            next_on_exhaustion: None,
        },
    }
}

/// Backoff for the given 0-indexed attempt number, clamped to the last
/// entry if `attempt_index` runs past the schedule's length.
#[must_use]
pub fn backoff_ms(strategy: Strategy, attempt_index: u32) -> u64 {
    let config = config_for(strategy);
    let idx = (attempt_index as usize).min(config.backoff_ms.len().saturating_sub(1));
    config.backoff_ms.get(idx).copied().unwrap_or(0)
}

/// A strategy is exhausted once `attempts >= max_attempts` following a
/// failed execution.
#[must_use]
pub fn is_exhausted(strategy: Strategy, attempts: u32) -> bool {
    attempts >= config_for(strategy).max_attempts
}

#[must_use]
pub fn next_strategy(strategy: Strategy) -> Option<Strategy> {
    config_for(strategy).next_on_exhaustion
}

#[must_use]
pub fn label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::RetryWithBackoff => "retry_with_backoff",
        Strategy::ClearCacheRetry => "clear_cache_retry",
        Strategy::SwitchEndpoint => "switch_endpoint",
        Strategy::ReduceBatchSize => "reduce_batch_size",
        Strategy::NotifyAndSkip => "notify_and_skip",
        Strategy::FullReset => "full_reset",
        Strategy::EscalateToAgent => "escalate_to_agent",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_escalation_path_terminates_at_agent() {
        let mut current = Strategy::RetryWithBackoff;
        let mut hops = 0;
        loop {
            match next_strategy(current) {
                Some(next) => {
                    current = next;
                    hops += 1;
                    assert!(hops < 10, "escalation graph should terminate quickly");
                }
                None => break,
            }
        }
        assert_eq!(current, Strategy::EscalateToAgent);
    }

    #[test]
    fn every_non_terminal_node_has_a_distinct_successor() {
        for strategy in [
            Strategy::RetryWithBackoff,
            Strategy::ClearCacheRetry,
            Strategy::SwitchEndpoint,
            Strategy::ReduceBatchSize,
            Strategy::NotifyAndSkip,
            Strategy::FullReset,
        ] {
            assert!(next_strategy(strategy).is_some());
        }
        assert!(next_strategy(Strategy::EscalateToAgent).is_none());
    }

    #[test]
    fn retry_with_backoff_schedule_matches_table() {
        let schedule: Vec<u64> = (0..5).map(|i| backoff_ms(Strategy::RetryWithBackoff, i)).collect();
        assert_eq!(schedule, vec![1000, 2000, 4000, 8000, 16000]);
        assert!(is_exhausted(Strategy::RetryWithBackoff, 5));
        assert!(!is_exhausted(Strategy::RetryWithBackoff, 4));
    }

    #[test]
    fn max_attempts_match_table() {
        assert_eq!(config_for(Strategy::RetryWithBackoff).max_attempts, 5);
        assert_eq!(config_for(Strategy::ClearCacheRetry).max_attempts, 2);
        assert_eq!(config_for(Strategy::SwitchEndpoint).max_attempts, 3);
        assert_eq!(config_for(Strategy::ReduceBatchSize).max_attempts, 3);
        assert_eq!(config_for(Strategy::NotifyAndSkip).max_attempts, 1);
        assert_eq!(config_for(Strategy::FullReset).max_attempts, 1);
        assert_eq!(config_for(Strategy::EscalateToAgent).max_attempts, 1);
    }
}
