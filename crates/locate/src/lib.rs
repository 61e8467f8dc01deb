//! Locate: Adaptive Element Resolution with Wait Semantics
//!
//! Locate sits between test code and a UI automation driver. Given a
//! symbolic [`Locator`] and a [`WaitPolicy`], it polls the driver until the
//! matched elements reach the required state or a deadline passes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    LOCATE Architecture                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ Session    │    │ Resolver   │            │
//! │   │ Objects    │───►│ (policy    │───►│ (poll loop,│            │
//! │   │            │    │  scoping)  │    │  strategy) │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             │                    │
//! │                     ┌────────────┐    ┌─────▼──────┐            │
//! │                     │ Clock      │◄───│ UiDriver   │            │
//! │                     │ (sys/fake) │    │ (black box)│            │
//! │                     └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use locate::prelude::*;
//!
//! let mut session = Session::new(driver)
//!     .with_strategy(CollectionLoadingStrategy::Pessimistic);
//!
//! // session default
//! let button = session.find(&Locator::id("submit"))?;
//!
//! // one call, longer timeout; the session is untouched afterwards
//! let rows = session
//!     .with_timeout_of(Duration::from_secs(10))
//!     .find_all(&"table#results tr".parse()?)?;
//!
//! // session-wide until the guard drops
//! {
//!     let mut slow = session.implicit_timeout(Duration::from_secs(30));
//!     slow.wait_for_absence(&Locator::css(".spinner"))?;
//! }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod clock;
mod driver;
mod hooks;
mod loading;
mod locator;
mod page_object;
mod policy;
mod resolver;
mod result;
mod session;
mod state;

/// Layered resolution settings (defaults, YAML, environment)
pub mod config;

/// YAML resolution scenarios run on virtual time
pub mod scenario;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LocateConfig;
pub use driver::{DriverError, ElementHandle, ScriptedDriver, ScriptedElement, UiDriver};
pub use hooks::{DriverHooks, SessionContext};
pub use loading::{CollectionLoadingStrategy, LoadingTracker, PollObservation};
pub use locator::{Locator, Strategy, MAX_SELECTOR_LENGTH};
pub use page_object::{ElementSpec, PageDefinition, PageDefinitionBuilder, PageObject, PageView};
pub use policy::{WaitPolicy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use resolver::{Resolution, Resolver};
pub use result::{LocateError, LocateResult};
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner, StepReport};
pub use session::{ImplicitTimeoutGuard, Session, TimedSession};
pub use state::{Condition, ElementState};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Clock, CollectionLoadingStrategy, Condition, DriverError, DriverHooks, ElementHandle,
        ElementSpec, ElementState, LocateConfig, LocateError, LocateResult, Locator, ManualClock,
        PageDefinition, PageObject, Resolution, Resolver, Session, SessionContext, Strategy,
        SystemClock, UiDriver, WaitPolicy,
    };
    pub use std::time::Duration;
}
