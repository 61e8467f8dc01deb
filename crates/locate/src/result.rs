//! Result and error types for Locate.

use std::time::Duration;

use thiserror::Error;

use crate::driver::DriverError;
use crate::loading::CollectionLoadingStrategy;
use crate::locator::Locator;
use crate::policy::WaitPolicy;

/// Result type for Locate operations
pub type LocateResult<T> = Result<T, LocateError>;

/// Errors that can occur while resolving elements
#[derive(Debug, Error)]
pub enum LocateError {
    /// No element satisfied the wait policy before the deadline
    #[error(
        "Timed out after {}ms waiting for {locator} to be {} ({strategy}, timeout {}ms, {polls} polls, last poll: {matched} matched / {satisfied} satisfied)",
        .elapsed.as_millis(),
        .policy.condition(),
        .policy.timeout().as_millis()
    )]
    Timeout {
        /// Locator being resolved
        locator: Locator,
        /// Policy in effect for the resolution
        policy: WaitPolicy,
        /// Collection loading strategy in effect
        strategy: CollectionLoadingStrategy,
        /// Time spent polling
        elapsed: Duration,
        /// Number of driver queries issued
        polls: u32,
        /// Elements matched by the locator on the last poll
        matched: usize,
        /// Elements satisfying the condition on the last poll
        satisfied: usize,
    },

    /// Elements were still present when waiting for their absence
    #[error(
        "Timed out after {}ms waiting for {locator} to stop being {} ({remaining} still {})",
        .elapsed.as_millis(),
        .policy.condition(),
        .policy.condition()
    )]
    StillPresent {
        /// Locator being resolved
        locator: Locator,
        /// Policy in effect for the resolution
        policy: WaitPolicy,
        /// Time spent polling
        elapsed: Duration,
        /// Elements still satisfying the condition on the last poll
        remaining: usize,
    },

    /// A single-element lookup matched more than one element
    #[error("Locator {locator} matched {count} elements where exactly one was required")]
    Ambiguous {
        /// Locator being resolved
        locator: Locator,
        /// Number of satisfying elements
        count: usize,
    },

    /// Wait policy violates its invariants
    #[error("Invalid wait policy: {message}")]
    InvalidPolicy {
        /// Error message
        message: String,
    },

    /// Locator string could not be parsed
    #[error("Invalid locator '{input}': {message}")]
    InvalidLocator {
        /// Offending input
        input: String,
        /// Error message
        message: String,
    },

    /// A page object has no element with this name
    #[error("Page '{page}' has no element named '{name}'")]
    UnknownElement {
        /// Page name
        page: String,
        /// Requested element name
        name: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario file could not be parsed or is invalid
    #[error("Scenario error: {message}")]
    Scenario {
        /// Error message
        message: String,
    },

    /// Session hook failed
    #[error("Hook '{hook}' failed: {message}")]
    Hook {
        /// Hook phase
        hook: String,
        /// Error message
        message: String,
    },

    /// Underlying UI driver fault, propagated unchanged
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LocateError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::Scenario {
            message: message.into(),
        }
    }

    /// Create a hook failure
    #[must_use]
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a timeout of any kind
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StillPresent { .. })
    }

    /// Whether this error came from the driver rather than from waiting
    #[must_use]
    pub const fn is_driver_fault(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}
