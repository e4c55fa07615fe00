//! Runtime configuration, loaded from environment variables with documented
//! defaults. Mirrors the enumerated options in the external interfaces
//! section: environment name, default org, scrape cadence, the self-heal
//! kill switch, retry ceiling, and the optional code-host token.

use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Free-form deployment label (e.g. "production", "staging").
    pub environment: String,
    /// Default org the sync engine's known-repo list is scoped to.
    pub blackroad_org: String,
    /// Cadence the external cron surface uses for incremental scrape.
    pub scrape_interval_minutes: u32,
    /// When false, healing tasks are immediately escalated instead of
    /// walking the strategy graph.
    pub self_heal_enabled: bool,
    /// Applied as the default `maxRetries` on jobs created without one.
    pub max_retry_attempts: u32,
    /// Forwarded to the scraper; never logged.
    pub github_token: Option<String>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            environment: "default".to_string(),
            blackroad_org: "BlackRoad-OS".to_string(),
            scrape_interval_minutes: 30,
            self_heal_enabled: true,
            max_retry_attempts: 3,
            github_token: None,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables over the documented
    /// defaults, then validate.
    pub fn from_env() -> SchedulerResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> SchedulerResult<()> {
        if let Ok(v) = env::var("ENVIRONMENT") {
            self.environment = v;
        }
        if let Ok(v) = env::var("BLACKROAD_ORG") {
            self.blackroad_org = v;
        }
        if let Ok(v) = env::var("SCRAPE_INTERVAL_MINUTES") {
            self.scrape_interval_minutes =
                v.parse()
                    .map_err(|_| SchedulerError::Configuration {
                        reason: format!("invalid SCRAPE_INTERVAL_MINUTES: {v}"),
                    })?;
        }
        if let Ok(v) = env::var("SELF_HEAL_ENABLED") {
            self.self_heal_enabled = v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = env::var("MAX_RETRY_ATTEMPTS") {
            self.max_retry_attempts =
                v.parse()
                    .map_err(|_| SchedulerError::Configuration {
                        reason: format!("invalid MAX_RETRY_ATTEMPTS: {v}"),
                    })?;
        }
        if let Ok(v) = env::var("GITHUB_TOKEN") {
            self.github_token = Some(v);
        }
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().map_err(|_| SchedulerError::Configuration {
                reason: format!("invalid PORT: {v}"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.blackroad_org.trim().is_empty() {
            return Err(SchedulerError::Configuration {
                reason: "BLACKROAD_ORG cannot be empty".to_string(),
            });
        }
        if self.scrape_interval_minutes == 0 {
            return Err(SchedulerError::Configuration {
                reason: "SCRAPE_INTERVAL_MINUTES must be greater than 0".to_string(),
            });
        }
        if self.server.port == 0 {
            return Err(SchedulerError::Configuration {
                reason: "server port cannot be 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_org() {
        let mut config = SchedulerConfig::default();
        config.blackroad_org = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_scrape_interval() {
        let mut config = SchedulerConfig::default();
        config.scrape_interval_minutes = 0;
        assert!(config.validate().is_err());
    }
}
