//! Element Resolution with Wait Semantics
//!
//! The [`Resolver`] turns a [`Locator`] plus a [`WaitPolicy`] into live
//! element handles by polling a [`UiDriver`] until the policy is satisfied
//! or its deadline passes.
//!
//! # Deadline arithmetic
//!
//! ```text
//! start ──poll──sleep(p)──poll──sleep(p)──poll──sleep(min(p, left))──poll ✗
//!   │                                                               │
//!   └──────────────────────── timeout T ────────────────────────────┘
//! ```
//!
//! Sleeps are clipped to the time left, so the last poll lands on the
//! deadline and a never-matching locator fails inside `[T, T + poll)`.
//! A timeout too large to add to the start instant (`Duration::MAX`) has
//! no deadline at all: the wait ends only on success or a driver fault.
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: Driver faults stop the line immediately, never retried
//! - **Genchi Genbutsu**: Every poll asks the driver; nothing is cached
//! - **Heijunka**: Fixed-interval polling keeps driver load level

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::driver::{ElementHandle, UiDriver};
use crate::loading::{CollectionLoadingStrategy, LoadingTracker, PollObservation};
use crate::locator::Locator;
use crate::policy::WaitPolicy;
use crate::result::{LocateError, LocateResult};
use crate::state::Condition;

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Handles whose condition held on the final poll, in driver order
    pub handles: Vec<ElementHandle>,
    /// Time from the first poll to success
    pub elapsed: Duration,
    /// Number of driver queries issued
    pub polls: u32,
}

impl Resolution {
    /// Whether no handle was returned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of handles returned
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// First handle in driver order
    #[must_use]
    pub fn first(&self) -> Option<&ElementHandle> {
        self.handles.first()
    }
}

/// `None` deadline: the timeout does not fit in an `Instant`, so the wait
/// never expires
fn past(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|d| now >= d)
}

fn next_sleep(policy: &WaitPolicy, deadline: Option<Instant>, now: Instant) -> Duration {
    deadline.map_or(policy.poll_interval(), |d| {
        policy.poll_interval().min(d.saturating_duration_since(now))
    })
}

/// One poll's worth of driver answers
struct Snapshot {
    observation: PollObservation,
    satisfying: Vec<ElementHandle>,
}

/// Polls a driver until a wait policy is satisfied
#[derive(Debug, Clone, Default)]
pub struct Resolver<C: Clock = SystemClock> {
    clock: C,
    strategy: CollectionLoadingStrategy,
}

impl Resolver<SystemClock> {
    /// Create a resolver on the system clock with the default strategy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> Resolver<C> {
    /// Create a resolver on a specific clock
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            strategy: CollectionLoadingStrategy::default(),
        }
    }

    /// Set the collection loading strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: CollectionLoadingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Collection loading strategy used for multi-element lookups
    #[must_use]
    pub const fn strategy(&self) -> CollectionLoadingStrategy {
        self.strategy
    }

    /// Replace the collection loading strategy
    pub fn set_strategy(&mut self, strategy: CollectionLoadingStrategy) {
        self.strategy = strategy;
    }

    /// Clock used for deadlines and sleeps
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Borrowing view of this resolver with a different strategy
    #[must_use]
    pub const fn using(&self, strategy: CollectionLoadingStrategy) -> Resolver<&C> {
        Resolver {
            clock: &self.clock,
            strategy,
        }
    }

    /// Resolve a locator to every element satisfying the policy
    ///
    /// # Errors
    ///
    /// - [`LocateError::Timeout`] if the strategy's predicate never held
    /// - [`LocateError::InvalidPolicy`] if the policy is malformed
    /// - [`LocateError::Driver`] on any driver fault, without retrying
    pub fn resolve<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        policy: &WaitPolicy,
    ) -> LocateResult<Resolution> {
        self.poll_until_loaded(driver, locator, policy, self.strategy)
    }

    /// Resolve a locator to its first satisfying element
    ///
    /// The optimistic strategy is upgraded to pessimistic, since a
    /// single-element lookup cannot succeed with nothing.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve)
    pub fn resolve_first<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        policy: &WaitPolicy,
    ) -> LocateResult<ElementHandle> {
        let resolution =
            self.poll_until_loaded(driver, locator, policy, self.strategy.for_single_element())?;
        resolution
            .handles
            .into_iter()
            .next()
            .ok_or_else(|| LocateError::Ambiguous {
                locator: locator.clone(),
                count: 0,
            })
    }

    /// Resolve a locator to exactly one satisfying element
    ///
    /// # Errors
    ///
    /// [`LocateError::Ambiguous`] if more than one element satisfies the
    /// condition, otherwise the same as [`resolve_first`](Self::resolve_first)
    pub fn resolve_unique<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        policy: &WaitPolicy,
    ) -> LocateResult<ElementHandle> {
        let resolution =
            self.poll_until_loaded(driver, locator, policy, self.strategy.for_single_element())?;
        let count = resolution.handles.len();
        let mut handles = resolution.handles.into_iter();
        match (handles.next(), count) {
            (Some(handle), 1) => Ok(handle),
            _ => Err(LocateError::Ambiguous {
                locator: locator.clone(),
                count,
            }),
        }
    }

    /// Wait until no element matching the locator satisfies the condition
    ///
    /// # Errors
    ///
    /// - [`LocateError::StillPresent`] if elements remain at the deadline
    /// - [`LocateError::Driver`] on any driver fault
    pub fn resolve_absence<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        policy: &WaitPolicy,
    ) -> LocateResult<Resolution> {
        policy.validate()?;
        let start = self.clock.now();
        let deadline = start.checked_add(policy.timeout());
        let mut polls = 0u32;

        loop {
            polls = polls.saturating_add(1);
            let snapshot = self.snapshot(driver, locator, policy.condition())?;
            let remaining = snapshot.observation.satisfied;
            trace!(%locator, polls, remaining, "absence poll");

            let now = self.clock.now();
            let elapsed = now.saturating_duration_since(start);
            if remaining == 0 {
                debug!(%locator, elapsed_ms = elapsed.as_millis(), polls, "locator gone");
                return Ok(Resolution {
                    handles: Vec::new(),
                    elapsed,
                    polls,
                });
            }
            if past(deadline, now) {
                debug!(%locator, elapsed_ms = elapsed.as_millis(), polls, remaining, "absence wait timed out");
                return Err(LocateError::StillPresent {
                    locator: locator.clone(),
                    policy: *policy,
                    elapsed,
                    remaining,
                });
            }
            self.clock.sleep(next_sleep(policy, deadline, now));
        }
    }

    fn poll_until_loaded<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        policy: &WaitPolicy,
        strategy: CollectionLoadingStrategy,
    ) -> LocateResult<Resolution> {
        policy.validate()?;
        let start = self.clock.now();
        let deadline = start.checked_add(policy.timeout());
        let mut tracker = LoadingTracker::new(strategy);
        let mut polls = 0u32;

        loop {
            polls = polls.saturating_add(1);
            let snapshot = self.snapshot(driver, locator, policy.condition())?;
            trace!(
                %locator,
                driver = driver.name(),
                polls,
                matched = snapshot.observation.matched,
                satisfied = snapshot.observation.satisfied,
                "poll"
            );

            let loaded = tracker.observe(snapshot.observation, &snapshot.satisfying);
            let now = self.clock.now();
            let elapsed = now.saturating_duration_since(start);
            if loaded {
                debug!(
                    %locator,
                    %strategy,
                    elapsed_ms = elapsed.as_millis(),
                    polls,
                    handles = snapshot.satisfying.len(),
                    "resolved"
                );
                return Ok(Resolution {
                    handles: snapshot.satisfying,
                    elapsed,
                    polls,
                });
            }
            if past(deadline, now) {
                debug!(%locator, %strategy, elapsed_ms = elapsed.as_millis(), polls, "timed out");
                return Err(LocateError::Timeout {
                    locator: locator.clone(),
                    policy: *policy,
                    strategy,
                    elapsed,
                    polls,
                    matched: snapshot.observation.matched,
                    satisfied: snapshot.observation.satisfied,
                });
            }
            self.clock.sleep(next_sleep(policy, deadline, now));
        }
    }

    fn snapshot<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        condition: Condition,
    ) -> LocateResult<Snapshot> {
        let found = driver.find_elements(locator)?;
        let matched = found.len();
        let mut satisfying = Vec::with_capacity(matched);
        for handle in found {
            if condition.is_satisfied_by(driver.element_state(&handle)?) {
                satisfying.push(handle);
            }
        }
        Ok(Snapshot {
            observation: PollObservation {
                matched,
                satisfied: satisfying.len(),
            },
            satisfying,
        })
    }
}
