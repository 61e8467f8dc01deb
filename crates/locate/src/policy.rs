//! Wait Policies
//!
//! A [`WaitPolicy`] bundles the three knobs of element resolution: how long
//! to wait, how often to ask the driver, and what counts as success.
//!
//! ## Toyota Way Application
//!
//! - **Poka-Yoke**: A policy that would spin without sleeping cannot be built
//! - **Muda**: One immutable value instead of scattered timeout settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::{LocateError, LocateResult};
use crate::state::Condition;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for element resolution (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT POLICY
// =============================================================================

/// Timeout, poll interval and success condition for element resolution.
///
/// Policies are immutable values: the `with_*` methods return a modified
/// copy. The poll interval must be non-zero whenever the timeout is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitPolicy {
    timeout: Duration,
    poll_interval: Duration,
    condition: Condition,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            condition: Condition::Visible,
        }
    }
}

impl WaitPolicy {
    /// Create a validated policy
    pub fn new(
        timeout: Duration,
        poll_interval: Duration,
        condition: Condition,
    ) -> LocateResult<Self> {
        let policy = Self {
            timeout,
            poll_interval,
            condition,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Policy that checks exactly once and never waits
    #[must_use]
    pub fn immediate(condition: Condition) -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            condition,
        }
    }

    /// Copy with a different timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Copy with a different timeout in milliseconds
    #[must_use]
    pub const fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Copy with a different poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Copy with a different success condition
    #[must_use]
    pub const fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Get the timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Get the success condition
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }

    /// Check the policy invariants
    pub fn validate(&self) -> LocateResult<()> {
        if !self.timeout.is_zero() && self.poll_interval.is_zero() {
            return Err(LocateError::InvalidPolicy {
                message: format!(
                    "poll interval must be positive when timeout is {}ms",
                    self.timeout.as_millis()
                ),
            });
        }
        Ok(())
    }
}
