use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Predicate consulted immediately before each due task fires.
pub(crate) type Validator = Box<dyn Fn() -> bool>;

/// Errors from building a [`SchedulerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Scheduler tuning knobs, typically parsed from TOML.
///
/// The per-tick valves default to 0 (unbounded), which keeps the
/// drain-until-empty tick behaviour. Hosts running handlers they do not
/// fully trust can set a ceiling to bound the work done in a single tick;
/// work past the ceiling stays queued, in order, for the next tick.
///
/// The backlog watermarks default to 0 (disabled). When set, the pending
/// task count is checked after every tick and logged at warn/error level
/// once it crosses the elevated/critical mark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max deferred operations applied per tick. 0 = unbounded.
    #[serde(default)]
    pub max_asyncs_per_tick: usize,
    /// Max due tasks dispatched per tick. 0 = unbounded.
    #[serde(default)]
    pub max_dispatches_per_tick: usize,
    /// Pending-task count that logs an elevated backlog after a tick.
    /// 0 = disabled.
    #[serde(default)]
    pub backlog_warn_threshold: usize,
    /// Pending-task count that logs a critical backlog after a tick.
    /// 0 = disabled.
    #[serde(default)]
    pub backlog_critical_threshold: usize,
}

impl SchedulerConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the limits for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backlog_warn_threshold != 0
            && self.backlog_critical_threshold != 0
            && self.backlog_warn_threshold > self.backlog_critical_threshold
        {
            return Err(ConfigError::Invalid(format!(
                "backlog_warn_threshold ({}) exceeds backlog_critical_threshold ({})",
                self.backlog_warn_threshold, self.backlog_critical_threshold
            )));
        }
        Ok(())
    }
}
