//! Resolution Configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults (5000ms timeout, 50ms poll, `visible`, `optimistic`)
//! 2. A YAML file
//! 3. `LOCATE_*` environment variables
//!
//! ```yaml
//! timeout_ms: 10000
//! poll_interval_ms: 100
//! condition: clickable
//! collection_loading_strategy: paranoid
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loading::CollectionLoadingStrategy;
use crate::policy::{WaitPolicy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{LocateError, LocateResult};
use crate::state::Condition;

/// Environment variable overriding the timeout
pub const ENV_TIMEOUT_MS: &str = "LOCATE_TIMEOUT_MS";
/// Environment variable overriding the poll interval
pub const ENV_POLL_INTERVAL_MS: &str = "LOCATE_POLL_INTERVAL_MS";
/// Environment variable overriding the condition
pub const ENV_CONDITION: &str = "LOCATE_CONDITION";
/// Environment variable overriding the collection loading strategy
pub const ENV_COLLECTION_STRATEGY: &str = "LOCATE_COLLECTION_STRATEGY";

/// Session-wide resolution settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocateConfig {
    /// Resolution timeout in milliseconds
    pub timeout_ms: u64,
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Condition every resolution waits for
    pub condition: Condition,
    /// How multi-element lookups decide they are loaded
    pub collection_loading_strategy: CollectionLoadingStrategy,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            condition: Condition::default(),
            collection_loading_strategy: CollectionLoadingStrategy::default(),
        }
    }
}

impl LocateConfig {
    /// Parse and validate a YAML document
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Config`] on malformed YAML, unknown keys, or
    /// an invalid resulting policy
    pub fn from_yaml(yaml: &str) -> LocateResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| LocateError::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Io`] if the file cannot be read, otherwise as
    /// [`from_yaml`](Self::from_yaml)
    pub fn from_path(path: impl AsRef<Path>) -> LocateResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Defaults overridden by the process environment
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Config`] if a variable does not parse
    pub fn from_env() -> LocateResult<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `LOCATE_*` overrides read through `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Config`] if a variable does not parse
    pub fn with_env_overrides<F>(mut self, lookup: F) -> LocateResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONDITION) {
            self.condition = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_COLLECTION_STRATEGY) {
            self.collection_loading_strategy = raw.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Settings equivalent to a policy and strategy
    #[must_use]
    pub fn from_policy(policy: &WaitPolicy, strategy: CollectionLoadingStrategy) -> Self {
        Self {
            timeout_ms: duration_millis(policy.timeout()),
            poll_interval_ms: duration_millis(policy.poll_interval()),
            condition: policy.condition(),
            collection_loading_strategy: strategy,
        }
    }

    /// Build the wait policy these settings describe
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::InvalidPolicy`] if the poll interval is zero
    /// while the timeout is not
    pub fn to_policy(&self) -> LocateResult<WaitPolicy> {
        WaitPolicy::new(
            Duration::from_millis(self.timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
            self.condition,
        )
    }

    /// Check that the settings form a valid policy
    ///
    /// # Errors
    ///
    /// Same as [`to_policy`](Self::to_policy)
    pub fn validate(&self) -> LocateResult<()> {
        self.to_policy().map(|_| ())
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Config`] if serialization fails
    pub fn to_yaml(&self) -> LocateResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| LocateError::config(e.to_string()))
    }
}

fn parse_millis(key: &str, raw: &str) -> LocateResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| LocateError::config(format!("{key} must be a whole number of milliseconds, got '{raw}'")))
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
