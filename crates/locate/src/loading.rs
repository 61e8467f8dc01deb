//! Collection loading strategies.
//!
//! A multi-element lookup can be considered "loaded" at different points.
//! Pages that render lists incrementally need a stricter strategy than
//! static pages, at the cost of extra polls.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::driver::ElementHandle;
use crate::result::LocateError;

/// When a multi-element query counts as loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionLoadingStrategy {
    /// Accept the first query that does not fail, even with zero matches
    #[default]
    Optimistic,
    /// Wait until at least one element satisfies the condition
    Pessimistic,
    /// Wait until every present element satisfies the condition and the set
    /// is unchanged since the previous poll
    Paranoid,
}

impl CollectionLoadingStrategy {
    /// Name used in string and serialized forms
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Pessimistic => "pessimistic",
            Self::Paranoid => "paranoid",
        }
    }

    /// Whether an empty result set can ever count as loaded
    #[must_use]
    pub const fn accepts_empty(&self) -> bool {
        matches!(self, Self::Optimistic)
    }

    /// Strategy to use for single-element lookups
    ///
    /// A lookup for one element cannot succeed with nothing, so the
    /// optimistic strategy is upgraded to pessimistic.
    #[must_use]
    pub const fn for_single_element(self) -> Self {
        match self {
            Self::Optimistic => Self::Pessimistic,
            other => other,
        }
    }
}

impl fmt::Display for CollectionLoadingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionLoadingStrategy {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "pessimistic" => Ok(Self::Pessimistic),
            "paranoid" => Ok(Self::Paranoid),
            other => Err(LocateError::config(format!(
                "unknown collection loading strategy '{other}'"
            ))),
        }
    }
}

/// Per-poll observation fed to a [`LoadingTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollObservation {
    /// Elements returned by the driver
    pub matched: usize,
    /// Elements satisfying the condition
    pub satisfied: usize,
}

impl PollObservation {
    /// Whether every matched element satisfied the condition
    #[must_use]
    pub const fn all_satisfied(&self) -> bool {
        self.matched == self.satisfied
    }
}

/// Evaluates a strategy's success predicate across consecutive polls.
///
/// Only the paranoid strategy carries state between polls: the satisfying
/// set seen on the previous poll.
#[derive(Debug, Clone)]
pub struct LoadingTracker {
    strategy: CollectionLoadingStrategy,
    previous: Option<BTreeSet<ElementHandle>>,
}

impl LoadingTracker {
    /// Create a tracker for one resolution
    #[must_use]
    pub const fn new(strategy: CollectionLoadingStrategy) -> Self {
        Self {
            strategy,
            previous: None,
        }
    }

    /// Record a poll and report whether the collection counts as loaded
    pub fn observe(&mut self, observation: PollObservation, satisfying: &[ElementHandle]) -> bool {
        match self.strategy {
            CollectionLoadingStrategy::Optimistic => true,
            CollectionLoadingStrategy::Pessimistic => observation.satisfied > 0,
            CollectionLoadingStrategy::Paranoid => {
                if observation.satisfied == 0 || !observation.all_satisfied() {
                    self.previous = None;
                    return false;
                }
                let current: BTreeSet<ElementHandle> = satisfying.iter().cloned().collect();
                let stable = self.previous.as_ref() == Some(&current);
                self.previous = Some(current);
                stable
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn handles(ids: &[&str]) -> Vec<ElementHandle> {
        ids.iter().map(|id| ElementHandle::new(*id)).collect()
    }

    fn obs(matched: usize, satisfied: usize) -> PollObservation {
        PollObservation { matched, satisfied }
    }

    mod strategy_tests {
        use super::*;

        #[test]
        fn test_default_is_optimistic() {
            assert_eq!(
                CollectionLoadingStrategy::default(),
                CollectionLoadingStrategy::Optimistic
            );
        }

        #[test]
        fn test_accepts_empty() {
            assert!(CollectionLoadingStrategy::Optimistic.accepts_empty());
            assert!(!CollectionLoadingStrategy::Pessimistic.accepts_empty());
            assert!(!CollectionLoadingStrategy::Paranoid.accepts_empty());
        }

        #[test]
        fn test_single_element_upgrade() {
            assert_eq!(
                CollectionLoadingStrategy::Optimistic.for_single_element(),
                CollectionLoadingStrategy::Pessimistic
            );
            assert_eq!(
                CollectionLoadingStrategy::Paranoid.for_single_element(),
                CollectionLoadingStrategy::Paranoid
            );
        }

        #[test]
        fn test_parse_and_display() {
            for s in [
                CollectionLoadingStrategy::Optimistic,
                CollectionLoadingStrategy::Pessimistic,
                CollectionLoadingStrategy::Paranoid,
            ] {
                assert_eq!(s.to_string().parse::<CollectionLoadingStrategy>().unwrap(), s);
            }
            assert!("lazy".parse::<CollectionLoadingStrategy>().is_err());
        }
    }

    mod tracker_tests {
        use super::*;

        #[test]
        fn test_optimistic_accepts_empty_first_poll() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Optimistic);
            assert!(tracker.observe(obs(0, 0), &[]));
        }

        #[test]
        fn test_pessimistic_needs_one() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Pessimistic);
            assert!(!tracker.observe(obs(0, 0), &[]));
            assert!(!tracker.observe(obs(2, 0), &[]));
            assert!(tracker.observe(obs(2, 1), &handles(&["a"])));
        }

        #[test]
        fn test_paranoid_needs_two_identical_polls() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Paranoid);
            let set = handles(&["a", "b"]);
            assert!(!tracker.observe(obs(2, 2), &set));
            assert!(tracker.observe(obs(2, 2), &set));
        }

        #[test]
        fn test_paranoid_set_semantics_ignore_order() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Paranoid);
            assert!(!tracker.observe(obs(2, 2), &handles(&["a", "b"])));
            assert!(tracker.observe(obs(2, 2), &handles(&["b", "a"])));
        }

        #[test]
        fn test_paranoid_growth_resets_stability() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Paranoid);
            assert!(!tracker.observe(obs(1, 1), &handles(&["a"])));
            assert!(!tracker.observe(obs(2, 2), &handles(&["a", "b"])));
            assert!(tracker.observe(obs(2, 2), &handles(&["a", "b"])));
        }

        #[test]
        fn test_paranoid_partial_satisfaction_resets() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Paranoid);
            assert!(!tracker.observe(obs(1, 1), &handles(&["a"])));
            assert!(!tracker.observe(obs(2, 1), &handles(&["a"])));
            assert!(!tracker.observe(obs(1, 1), &handles(&["a"])));
            assert!(tracker.observe(obs(1, 1), &handles(&["a"])));
        }

        #[test]
        fn test_paranoid_empty_never_loaded() {
            let mut tracker = LoadingTracker::new(CollectionLoadingStrategy::Paranoid);
            for _ in 0..5 {
                assert!(!tracker.observe(obs(0, 0), &[]));
            }
        }
    }
}
