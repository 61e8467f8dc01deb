//! UiDriver - Abstract UI Driver Trait
//!
//! The resolver treats the driver as a black box that answers two questions:
//! which elements currently match a locator, and what state a given element
//! is in right now. Anything that can answer them (a WebDriver client, a
//! CDP bridge, an in-memory fake) can sit under a [`crate::Session`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Session / Resolver                                              │
//! │      │ find_elements(locator)      element_state(handle)         │
//! │      ▼                                                           │
//! │  ┌────────────────────┐   ┌────────────────────────────────────┐ │
//! │  │  UiDriver (trait)  │◄──│ ScriptedDriver (timelines, faults) │ │
//! │  └────────────────────┘   └────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Toyota Principles Applied
//!
//! - **Genchi Genbutsu**: State is read from the driver on every poll, never cached
//! - **Jidoka**: Driver faults stop resolution immediately instead of being retried

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::locator::{Locator, Strategy};
use crate::state::ElementState;

// =============================================================================
// ELEMENT HANDLE
// =============================================================================

/// Opaque reference to an element, owned by the driver session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Driver-assigned identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for ElementHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// DRIVER ERRORS
// =============================================================================

/// Faults raised by the underlying driver.
///
/// These are never retried by the resolver; they surface to the caller
/// exactly as the driver produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The browser or remote session is gone
    #[error("Driver session lost: {reason}")]
    SessionLost {
        /// Reason reported by the driver
        reason: String,
    },

    /// The element is no longer attached to the document
    #[error("Stale element reference: {handle}")]
    StaleElement {
        /// Handle that went stale
        handle: ElementHandle,
    },

    /// The driver cannot look elements up this way
    #[error("Driver does not support locator strategy '{strategy}'")]
    UnsupportedStrategy {
        /// Rejected strategy
        strategy: Strategy,
    },

    /// Any other driver failure
    #[error("Driver error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl DriverError {
    /// Create a generic driver error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

// =============================================================================
// DRIVER TRAIT
// =============================================================================

/// Abstract driver the resolver polls.
///
/// Implementations must answer from the live UI on every call. Both methods
/// take `&self`; exclusive use of a session is enforced one level up.
pub trait UiDriver {
    /// All elements currently matching the locator, in document order
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the driver cannot perform the lookup
    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError>;

    /// Current state of a previously found element
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::StaleElement`] if the element has detached
    fn element_state(&self, handle: &ElementHandle) -> Result<ElementState, DriverError>;

    /// Short name used in log output
    fn name(&self) -> &str {
        "driver"
    }
}

impl<D: UiDriver + ?Sized> UiDriver for Box<D> {
    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
        (**self).find_elements(locator)
    }

    fn element_state(&self, handle: &ElementHandle) -> Result<ElementState, DriverError> {
        (**self).element_state(handle)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// =============================================================================
// SCRIPTED DRIVER
// =============================================================================

/// An element whose state follows a timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedElement {
    handle: ElementHandle,
    locator: Locator,
    timeline: Vec<(Duration, ElementState)>,
}

impl ScriptedElement {
    /// Create an element that is absent until a state is scheduled
    #[must_use]
    pub fn new(handle: impl Into<ElementHandle>, locator: Locator) -> Self {
        Self {
            handle: handle.into(),
            locator,
            timeline: Vec::new(),
        }
    }

    /// Schedule a state change `offset` after the driver started
    #[must_use]
    pub fn at(mut self, offset: Duration, state: ElementState) -> Self {
        let idx = self.timeline.partition_point(|(at, _)| *at <= offset);
        self.timeline.insert(idx, (offset, state));
        self
    }

    /// Same as [`at`](Self::at) with a millisecond offset
    #[must_use]
    pub fn at_ms(self, offset_ms: u64, state: ElementState) -> Self {
        self.at(Duration::from_millis(offset_ms), state)
    }

    /// Element handle
    #[must_use]
    pub const fn handle(&self) -> &ElementHandle {
        &self.handle
    }

    /// Locator this element answers to
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// State at a point on the timeline
    #[must_use]
    pub fn state_at(&self, offset: Duration) -> ElementState {
        self.timeline
            .iter()
            .take_while(|(at, _)| *at <= offset)
            .last()
            .map_or(ElementState::Absent, |(_, state)| *state)
    }
}

/// In-memory driver for tests and scenarios.
///
/// Every element carries a state timeline relative to the moment the driver
/// was created, read from the shared clock on each query. Absent elements
/// are not returned by lookups, and asking for their state is a stale
/// element fault.
#[derive(Debug)]
pub struct ScriptedDriver<C: Clock> {
    clock: C,
    started: Instant,
    elements: Vec<ScriptedElement>,
    session_lost_at: Option<Duration>,
    unsupported: Vec<Strategy>,
    queries: AtomicUsize,
}

impl<C: Clock> ScriptedDriver<C> {
    /// Create an empty driver whose timeline starts now
    #[must_use]
    pub fn new(clock: C) -> Self {
        let started = clock.now();
        Self {
            clock,
            started,
            elements: Vec::new(),
            session_lost_at: None,
            unsupported: Vec::new(),
            queries: AtomicUsize::new(0),
        }
    }

    /// Add an element (builder form)
    #[must_use]
    pub fn with_element(mut self, element: ScriptedElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add an element
    pub fn add_element(&mut self, element: ScriptedElement) {
        self.elements.push(element);
    }

    /// Fail every call made `offset` or later with [`DriverError::SessionLost`]
    #[must_use]
    pub const fn lose_session_at(mut self, offset: Duration) -> Self {
        self.session_lost_at = Some(offset);
        self
    }

    /// Reject lookups using this strategy
    #[must_use]
    pub fn without_strategy(mut self, strategy: Strategy) -> Self {
        self.unsupported.push(strategy);
        self
    }

    /// Number of `find_elements` calls served so far
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Scripted elements
    #[must_use]
    pub fn elements(&self) -> &[ScriptedElement] {
        &self.elements
    }

    /// Clock the timelines are read from
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    fn offset(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }

    fn check_session(&self, offset: Duration) -> Result<(), DriverError> {
        match self.session_lost_at {
            Some(lost) if offset >= lost => Err(DriverError::SessionLost {
                reason: format!("scripted loss at {}ms", lost.as_millis()),
            }),
            _ => Ok(()),
        }
    }
}

impl<C: Clock> UiDriver for ScriptedDriver<C> {
    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let offset = self.offset();
        self.check_session(offset)?;
        if self.unsupported.contains(&locator.strategy()) {
            return Err(DriverError::UnsupportedStrategy {
                strategy: locator.strategy(),
            });
        }
        Ok(self
            .elements
            .iter()
            .filter(|e| e.locator == *locator && e.state_at(offset).is_present())
            .map(|e| e.handle.clone())
            .collect())
    }

    fn element_state(&self, handle: &ElementHandle) -> Result<ElementState, DriverError> {
        let offset = self.offset();
        self.check_session(offset)?;
        let state = self
            .elements
            .iter()
            .find(|e| e.handle == *handle)
            .map_or(ElementState::Absent, |e| e.state_at(offset));
        if state.is_present() {
            Ok(state)
        } else {
            Err(DriverError::StaleElement {
                handle: handle.clone(),
            })
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    mod element_handle_tests {
        use super::*;

        #[test]
        fn test_display_and_id() {
            let h = ElementHandle::new("el-7");
            assert_eq!(h.id(), "el-7");
            assert_eq!(h.to_string(), "el-7");
            assert_eq!(ElementHandle::from("el-7"), h);
        }

        #[test]
        fn test_serializes_transparently() {
            let json = serde_json::to_string(&ElementHandle::new("a")).unwrap();
            assert_eq!(json, "\"a\"");
        }
    }

    mod scripted_element_tests {
        use super::*;

        #[test]
        fn test_absent_before_first_entry() {
            let e = ScriptedElement::new("a", Locator::id("a")).at_ms(100, ElementState::Visible);
            assert_eq!(e.state_at(ms(0)), ElementState::Absent);
            assert_eq!(e.state_at(ms(99)), ElementState::Absent);
            assert_eq!(e.state_at(ms(100)), ElementState::Visible);
        }

        #[test]
        fn test_entries_sorted_on_insert() {
            let e = ScriptedElement::new("a", Locator::id("a"))
                .at_ms(300, ElementState::Absent)
                .at_ms(0, ElementState::PresentNotVisible)
                .at_ms(150, ElementState::VisibleAndClickable);
            assert_eq!(e.state_at(ms(10)), ElementState::PresentNotVisible);
            assert_eq!(e.state_at(ms(200)), ElementState::VisibleAndClickable);
            assert_eq!(e.state_at(ms(301)), ElementState::Absent);
        }
    }

    mod scripted_driver_tests {
        use super::*;

        fn driver(clock: &Arc<ManualClock>) -> ScriptedDriver<Arc<ManualClock>> {
            ScriptedDriver::new(Arc::clone(clock))
                .with_element(
                    ScriptedElement::new("row-1", Locator::css("tr"))
                        .at_ms(0, ElementState::Visible),
                )
                .with_element(
                    ScriptedElement::new("row-2", Locator::css("tr"))
                        .at_ms(200, ElementState::PresentNotVisible)
                        .at_ms(400, ElementState::Absent),
                )
        }

        #[test]
        fn test_find_follows_timeline() {
            let clock = ManualClock::shared();
            let d = driver(&clock);
            assert_eq!(d.find_elements(&Locator::css("tr")).unwrap().len(), 1);
            clock.advance(ms(250));
            assert_eq!(d.find_elements(&Locator::css("tr")).unwrap().len(), 2);
            clock.advance(ms(200));
            assert_eq!(
                d.find_elements(&Locator::css("tr")).unwrap(),
                vec![ElementHandle::new("row-1")]
            );
            assert_eq!(d.query_count(), 3);
        }

        #[test]
        fn test_other_locators_do_not_match() {
            let clock = ManualClock::shared();
            let d = driver(&clock);
            assert!(d.find_elements(&Locator::id("tr")).unwrap().is_empty());
        }

        #[test]
        fn test_state_of_detached_element_is_stale() {
            let clock = ManualClock::shared();
            let d = driver(&clock);
            let err = d.element_state(&ElementHandle::new("row-2")).unwrap_err();
            assert!(matches!(err, DriverError::StaleElement { .. }));
            clock.advance(ms(200));
            assert_eq!(
                d.element_state(&ElementHandle::new("row-2")).unwrap(),
                ElementState::PresentNotVisible
            );
        }

        #[test]
        fn test_session_loss() {
            let clock = ManualClock::shared();
            let d = driver(&clock).lose_session_at(ms(100));
            assert!(d.find_elements(&Locator::css("tr")).is_ok());
            clock.advance(ms(100));
            assert!(matches!(
                d.find_elements(&Locator::css("tr")),
                Err(DriverError::SessionLost { .. })
            ));
            assert!(matches!(
                d.element_state(&ElementHandle::new("row-1")),
                Err(DriverError::SessionLost { .. })
            ));
        }

        #[test]
        fn test_unsupported_strategy() {
            let clock = ManualClock::shared();
            let d = driver(&clock).without_strategy(Strategy::XPath);
            let err = d.find_elements(&Locator::xpath("//tr")).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Driver does not support locator strategy 'xpath'"
            );
        }

        #[test]
        fn test_boxed_driver() {
            let clock = ManualClock::shared();
            let d: Box<dyn UiDriver> = Box::new(driver(&clock));
            assert_eq!(d.name(), "scripted");
            assert_eq!(d.find_elements(&Locator::css("tr")).unwrap().len(), 1);
        }
    }
}
