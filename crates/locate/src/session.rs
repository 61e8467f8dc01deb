//! Driver Sessions and Wait Policy Scoping
//!
//! A [`Session`] owns one driver and everything needed to resolve elements
//! against it. All resolving methods take `&mut self`, so at most one
//! resolution is in flight per session.
//!
//! # Policy precedence
//!
//! Highest first:
//!
//! 1. an explicit policy passed to [`Session::find_with`]
//! 2. a per-call override from [`Session::with_timeout_of`]
//! 3. the innermost implicit override from [`Session::implicit_timeout`]
//! 4. the session default
//!
//! Implicit overrides form a stack. Each push returns an
//! [`ImplicitTimeoutGuard`] that pops on drop, so the previous policy comes
//! back on every exit path: normal return, `?`, or unwinding.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::driver::{ElementHandle, UiDriver};
use crate::hooks::{DriverHooks, SessionContext};
use crate::loading::CollectionLoadingStrategy;
use crate::locator::Locator;
use crate::policy::WaitPolicy;
use crate::resolver::{Resolution, Resolver};
use crate::result::LocateResult;
use crate::state::{Condition, ElementState};

// =============================================================================
// SESSION
// =============================================================================

/// A driver plus its resolution settings
#[derive(Debug)]
pub struct Session<D: UiDriver, C: Clock = SystemClock> {
    driver: D,
    resolver: Resolver<C>,
    default_policy: WaitPolicy,
    implicit: Vec<WaitPolicy>,
    context: SessionContext,
    hooks: DriverHooks<D>,
}

impl<D: UiDriver> Session<D, SystemClock> {
    /// Wrap a driver with default settings on the system clock
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self::with_clock(driver, SystemClock)
    }
}

impl<D: UiDriver, C: Clock> Session<D, C> {
    /// Wrap a driver with default settings on a specific clock
    #[must_use]
    pub fn with_clock(driver: D, clock: C) -> Self {
        Self {
            driver,
            resolver: Resolver::with_clock(clock),
            default_policy: WaitPolicy::default(),
            implicit: Vec::new(),
            context: SessionContext::default(),
            hooks: DriverHooks::default(),
        }
    }

    /// Create a session through hooks and a driver factory.
    ///
    /// Creation hooks run first, in order, and may edit the context. The
    /// session's default policy and strategy come from the context's config
    /// as the hooks left it.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure, an invalid config, or the factory's
    /// error; the factory is not called if a hook fails
    pub fn open<F>(
        mut context: SessionContext,
        mut hooks: DriverHooks<D>,
        clock: C,
        factory: F,
    ) -> LocateResult<Self>
    where
        F: FnOnce(&SessionContext) -> LocateResult<D>,
    {
        hooks.run_before_create(&mut context)?;
        let default_policy = context.config.to_policy()?;
        let driver = factory(&context)?;
        info!(session = %context.name, driver = driver.name(), "session opened");
        Ok(Self {
            driver,
            resolver: Resolver::with_clock(clock)
                .with_strategy(context.config.collection_loading_strategy),
            default_policy,
            implicit: Vec::new(),
            context,
            hooks,
        })
    }

    /// Run teardown hooks and release the driver
    ///
    /// # Errors
    ///
    /// Returns the first teardown hook failure, after all hooks have run
    pub fn close(self) -> LocateResult<()> {
        let Self {
            mut driver,
            mut hooks,
            context,
            ..
        } = self;
        let result = hooks.run_before_teardown(&mut driver, &context);
        drop(driver);
        info!(session = %context.name, ok = result.is_ok(), "session closed");
        result
    }

    /// Replace the default policy (builder form)
    #[must_use]
    pub const fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Replace the collection loading strategy (builder form)
    #[must_use]
    pub fn with_strategy(mut self, strategy: CollectionLoadingStrategy) -> Self {
        self.resolver.set_strategy(strategy);
        self
    }

    /// Replace the collection loading strategy
    pub fn set_strategy(&mut self, strategy: CollectionLoadingStrategy) {
        self.resolver.set_strategy(strategy);
    }

    /// Replace the default policy
    ///
    /// # Errors
    ///
    /// Returns [`crate::LocateError::InvalidPolicy`] if the policy is malformed
    pub fn set_default_policy(&mut self, policy: WaitPolicy) -> LocateResult<()> {
        policy.validate()?;
        self.default_policy = policy;
        Ok(())
    }

    // =========================================================================
    // POLICY SCOPING
    // =========================================================================

    /// Policy in effect for calls without an explicit override
    #[must_use]
    pub fn policy(&self) -> WaitPolicy {
        self.implicit
            .last()
            .copied()
            .unwrap_or(self.default_policy)
    }

    /// Policy in effect when no implicit override is active
    #[must_use]
    pub const fn default_policy(&self) -> WaitPolicy {
        self.default_policy
    }

    /// Collection loading strategy for multi-element lookups
    #[must_use]
    pub const fn strategy(&self) -> CollectionLoadingStrategy {
        self.resolver.strategy()
    }

    /// Number of active implicit overrides
    #[must_use]
    pub fn implicit_depth(&self) -> usize {
        self.implicit.len()
    }

    /// Override the timeout session-wide until the guard is dropped
    pub fn implicit_timeout(&mut self, timeout: Duration) -> ImplicitTimeoutGuard<'_, D, C> {
        let policy = self.policy().with_timeout(timeout);
        self.push_implicit(policy)
    }

    /// Override the whole policy session-wide until the guard is dropped
    ///
    /// # Errors
    ///
    /// Returns [`crate::LocateError::InvalidPolicy`] if the policy is malformed
    pub fn implicit_policy(
        &mut self,
        policy: WaitPolicy,
    ) -> LocateResult<ImplicitTimeoutGuard<'_, D, C>> {
        policy.validate()?;
        Ok(self.push_implicit(policy))
    }

    fn push_implicit(&mut self, policy: WaitPolicy) -> ImplicitTimeoutGuard<'_, D, C> {
        self.implicit.push(policy);
        let depth = self.implicit.len();
        debug!(
            depth,
            timeout_ms = policy.timeout().as_millis(),
            "implicit override pushed"
        );
        ImplicitTimeoutGuard {
            session: self,
            depth,
        }
    }

    fn pop_implicit(&mut self, depth: usize) {
        if self.implicit.len() >= depth {
            self.implicit.truncate(depth.saturating_sub(1));
            debug!(depth, "implicit override popped");
        }
    }

    /// Per-call override view starting from the current policy
    pub fn scoped(&mut self) -> TimedSession<'_, D, C> {
        let policy = self.policy();
        let strategy = self.strategy();
        TimedSession {
            session: self,
            policy,
            strategy,
        }
    }

    /// Per-call view with a different timeout; the session is not modified
    pub fn with_timeout_of(&mut self, timeout: Duration) -> TimedSession<'_, D, C> {
        self.scoped().with_timeout(timeout)
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// First element satisfying the current policy
    ///
    /// # Errors
    ///
    /// Timeout or driver fault, see [`Resolver::resolve_first`]
    pub fn find(&mut self, locator: &Locator) -> LocateResult<ElementHandle> {
        let policy = self.policy();
        self.find_with(locator, &policy)
    }

    /// The only element satisfying the current policy
    ///
    /// # Errors
    ///
    /// [`crate::LocateError::Ambiguous`] on more than one match, otherwise as
    /// [`find`](Self::find)
    pub fn find_unique(&mut self, locator: &Locator) -> LocateResult<ElementHandle> {
        let policy = self.policy();
        self.resolver.resolve_unique(&self.driver, locator, &policy)
    }

    /// Every element satisfying the current policy, per the session strategy
    ///
    /// # Errors
    ///
    /// Timeout or driver fault, see [`Resolver::resolve`]
    pub fn find_all(&mut self, locator: &Locator) -> LocateResult<Resolution> {
        let policy = self.policy();
        self.find_all_with(locator, &policy)
    }

    /// First element satisfying an explicit policy
    ///
    /// # Errors
    ///
    /// Timeout or driver fault, see [`Resolver::resolve_first`]
    pub fn find_with(&mut self, locator: &Locator, policy: &WaitPolicy) -> LocateResult<ElementHandle> {
        self.resolver.resolve_first(&self.driver, locator, policy)
    }

    /// Every element satisfying an explicit policy
    ///
    /// # Errors
    ///
    /// Timeout or driver fault, see [`Resolver::resolve`]
    pub fn find_all_with(&mut self, locator: &Locator, policy: &WaitPolicy) -> LocateResult<Resolution> {
        self.resolver.resolve(&self.driver, locator, policy)
    }

    /// Wait until nothing matching the locator satisfies the current policy
    ///
    /// # Errors
    ///
    /// [`crate::LocateError::StillPresent`] at the deadline, or a driver fault
    pub fn wait_for_absence(&mut self, locator: &Locator) -> LocateResult<Resolution> {
        let policy = self.policy();
        self.resolver.resolve_absence(&self.driver, locator, &policy)
    }

    /// Current state of an element, straight from the driver
    ///
    /// # Errors
    ///
    /// Any driver fault, including a stale handle
    pub fn state_of(&mut self, handle: &ElementHandle) -> LocateResult<ElementState> {
        Ok(self.driver.element_state(handle)?)
    }

    /// The underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// The underlying driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Context the session was opened with
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The session's resolver
    #[must_use]
    pub const fn resolver(&self) -> &Resolver<C> {
        &self.resolver
    }
}

// =============================================================================
// PER-CALL OVERRIDES
// =============================================================================

/// A one-call view of a session with an overridden policy.
///
/// Every resolving method consumes the view; the session's own settings are
/// never touched, whether the call succeeds or fails.
#[derive(Debug)]
pub struct TimedSession<'a, D: UiDriver, C: Clock> {
    session: &'a mut Session<D, C>,
    policy: WaitPolicy,
    strategy: CollectionLoadingStrategy,
}

impl<D: UiDriver, C: Clock> TimedSession<'_, D, C> {
    /// Override the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy = self.policy.with_timeout(timeout);
        self
    }

    /// Override the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.policy = self.policy.with_poll_interval(poll_interval);
        self
    }

    /// Override the condition
    #[must_use]
    pub const fn with_condition(mut self, condition: Condition) -> Self {
        self.policy = self.policy.with_condition(condition);
        self
    }

    /// Override the collection loading strategy
    #[must_use]
    pub const fn with_strategy(mut self, strategy: CollectionLoadingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Policy this call will use
    #[must_use]
    pub const fn policy(&self) -> WaitPolicy {
        self.policy
    }

    fn resolver(&self) -> Resolver<&C> {
        self.session.resolver.using(self.strategy)
    }

    /// First satisfying element
    ///
    /// # Errors
    ///
    /// Same as [`Session::find`]
    pub fn find(self, locator: &Locator) -> LocateResult<ElementHandle> {
        self.resolver()
            .resolve_first(&self.session.driver, locator, &self.policy)
    }

    /// The only satisfying element
    ///
    /// # Errors
    ///
    /// Same as [`Session::find_unique`]
    pub fn find_unique(self, locator: &Locator) -> LocateResult<ElementHandle> {
        self.resolver()
            .resolve_unique(&self.session.driver, locator, &self.policy)
    }

    /// Every satisfying element
    ///
    /// # Errors
    ///
    /// Same as [`Session::find_all`]
    pub fn find_all(self, locator: &Locator) -> LocateResult<Resolution> {
        self.resolver()
            .resolve(&self.session.driver, locator, &self.policy)
    }

    /// Wait until nothing matching the locator satisfies the condition
    ///
    /// # Errors
    ///
    /// Same as [`Session::wait_for_absence`]
    pub fn wait_for_absence(self, locator: &Locator) -> LocateResult<Resolution> {
        self.resolver()
            .resolve_absence(&self.session.driver, locator, &self.policy)
    }
}

// =============================================================================
// IMPLICIT OVERRIDES
// =============================================================================

/// Keeps an implicit override active; restores the previous policy on drop
#[derive(Debug)]
pub struct ImplicitTimeoutGuard<'a, D: UiDriver, C: Clock> {
    session: &'a mut Session<D, C>,
    depth: usize,
}

impl<D: UiDriver, C: Clock> ImplicitTimeoutGuard<'_, D, C> {
    /// Pop the override now and return the policy that is restored
    #[must_use]
    pub fn reset(self) -> WaitPolicy {
        self.session.pop_implicit(self.depth);
        self.session.policy()
    }
}

impl<D: UiDriver, C: Clock> Deref for ImplicitTimeoutGuard<'_, D, C> {
    type Target = Session<D, C>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<D: UiDriver, C: Clock> DerefMut for ImplicitTimeoutGuard<'_, D, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<D: UiDriver, C: Clock> Drop for ImplicitTimeoutGuard<'_, D, C> {
    fn drop(&mut self) {
        self.session.pop_implicit(self.depth);
    }
}
