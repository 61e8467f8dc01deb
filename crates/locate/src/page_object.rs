//! Page Object Model Support
//!
//! Pages are declared with explicit configuration: a name, a set of named
//! elements with optional per-element wait overrides, and the elements that
//! must be visible before the page counts as loaded.
//!
//! ## Toyota Way Application:
//! - **Poka-Yoke**: Ready elements are checked against the element table at build time
//! - **Muda**: Locators and their waits live in one place per page
//! - **Genchi Genbutsu**: Page objects reflect actual page structure
//!
//! # Example
//!
//! ```ignore
//! let login = PageDefinition::builder("login")
//!     .with_element("username", Locator::id("username"))
//!     .with_spec(
//!         "submit",
//!         ElementSpec::new(Locator::css("button[type=submit]"))
//!             .with_condition(Condition::Clickable),
//!     )
//!     .with_ready_element("username")
//!     .build()?;
//!
//! let mut page = session.page(&login);
//! page.wait_until_loaded()?;
//! let submit = page.element("submit")?;
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::driver::{ElementHandle, UiDriver};
use crate::loading::CollectionLoadingStrategy;
use crate::locator::Locator;
use crate::resolver::Resolution;
use crate::result::{LocateError, LocateResult};
use crate::session::{Session, TimedSession};
use crate::state::Condition;

/// A named element with optional wait overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    locator: Locator,
    timeout: Option<Duration>,
    condition: Option<Condition>,
    strategy: Option<CollectionLoadingStrategy>,
}

impl ElementSpec {
    /// Element that waits with the session's settings
    #[must_use]
    pub const fn new(locator: Locator) -> Self {
        Self {
            locator,
            timeout: None,
            condition: None,
            strategy: None,
        }
    }

    /// Wait this long for this element
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait for this condition on this element
    #[must_use]
    pub const fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Use this strategy when the element is a collection
    #[must_use]
    pub const fn with_strategy(mut self, strategy: CollectionLoadingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Element locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Timeout override, if any
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Condition override, if any
    #[must_use]
    pub const fn condition(&self) -> Option<Condition> {
        self.condition
    }

    /// Strategy override, if any
    #[must_use]
    pub const fn strategy(&self) -> Option<CollectionLoadingStrategy> {
        self.strategy
    }

    fn apply<'a, D: UiDriver, C: Clock>(&self, view: TimedSession<'a, D, C>) -> TimedSession<'a, D, C> {
        let view = match self.timeout {
            Some(t) => view.with_timeout(t),
            None => view,
        };
        let view = match self.condition {
            Some(c) => view.with_condition(c),
            None => view,
        };
        match self.strategy {
            Some(s) => view.with_strategy(s),
            None => view,
        }
    }
}

/// Declarative description of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDefinition {
    name: String,
    elements: BTreeMap<String, ElementSpec>,
    ready: Vec<String>,
    load_timeout: Option<Duration>,
}

impl PageDefinition {
    /// Start building a page
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PageDefinitionBuilder {
        PageDefinitionBuilder::new(name)
    }

    /// Page name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an element
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::UnknownElement`] if no element has this name
    pub fn spec(&self, name: &str) -> LocateResult<&ElementSpec> {
        self.elements.get(name).ok_or_else(|| LocateError::UnknownElement {
            page: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Element names, sorted
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        self.elements.keys().map(String::as_str).collect()
    }

    /// Elements that must be visible for the page to be loaded
    #[must_use]
    pub fn ready_elements(&self) -> &[String] {
        &self.ready
    }

    /// Overall load timeout, if set
    #[must_use]
    pub const fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout
    }
}

/// Builder for [`PageDefinition`]
#[derive(Debug, Clone)]
pub struct PageDefinitionBuilder {
    name: String,
    elements: BTreeMap<String, ElementSpec>,
    ready: Vec<String>,
    load_timeout: Option<Duration>,
    duplicate: Option<String>,
}

impl PageDefinitionBuilder {
    /// Create a builder for a named page
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: BTreeMap::new(),
            ready: Vec::new(),
            load_timeout: None,
            duplicate: None,
        }
    }

    /// Add an element that uses the session's wait settings
    #[must_use]
    pub fn with_element(self, name: impl Into<String>, locator: Locator) -> Self {
        self.with_spec(name, ElementSpec::new(locator))
    }

    /// Add an element with its own wait settings
    ///
    /// Names are unique per page; a repeated name fails [`build`](Self::build).
    #[must_use]
    pub fn with_spec(mut self, name: impl Into<String>, spec: ElementSpec) -> Self {
        let name = name.into();
        if self.elements.contains_key(&name) {
            if self.duplicate.is_none() {
                self.duplicate = Some(name);
            }
        } else {
            self.elements.insert(name, spec);
        }
        self
    }

    /// Require an element to be visible before the page is loaded
    #[must_use]
    pub fn with_ready_element(mut self, name: impl Into<String>) -> Self {
        self.ready.push(name.into());
        self
    }

    /// Bound the total time `wait_until_loaded` may take
    #[must_use]
    pub const fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Finish the page
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Config`] if an element name was registered
    /// twice, or [`LocateError::UnknownElement`] if a ready element was
    /// never added
    pub fn build(self) -> LocateResult<PageDefinition> {
        if let Some(name) = &self.duplicate {
            return Err(LocateError::config(format!(
                "page '{}' registers element '{name}' more than once",
                self.name
            )));
        }
        if let Some(missing) = self.ready.iter().find(|n| !self.elements.contains_key(*n)) {
            return Err(LocateError::UnknownElement {
                page: self.name.clone(),
                name: missing.clone(),
            });
        }
        Ok(PageDefinition {
            name: self.name,
            elements: self.elements,
            ready: self.ready,
            load_timeout: self.load_timeout,
        })
    }
}

/// Trait for page objects representing a page or component in the UI.
///
/// Implementors hand out a [`PageDefinition`]; everything else comes from
/// [`Session::page`].
///
/// # Example
///
/// ```ignore
/// struct CartPage {
///     definition: PageDefinition,
/// }
///
/// impl PageObject for CartPage {
///     fn definition(&self) -> &PageDefinition {
///         &self.definition
///     }
/// }
/// ```
pub trait PageObject {
    /// Declarative page description
    fn definition(&self) -> &PageDefinition;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        self.definition().name()
    }
}

impl PageObject for PageDefinition {
    fn definition(&self) -> &PageDefinition {
        self
    }
}

/// A page bound to a live session
#[derive(Debug)]
pub struct PageView<'a, D: UiDriver, C: Clock> {
    session: &'a mut Session<D, C>,
    definition: &'a PageDefinition,
}

impl<D: UiDriver, C: Clock> Session<D, C> {
    /// Bind a page object to this session
    pub fn page<'a, P: PageObject + ?Sized>(&'a mut self, page: &'a P) -> PageView<'a, D, C> {
        PageView {
            session: self,
            definition: page.definition(),
        }
    }
}

impl<D: UiDriver, C: Clock> PageView<'_, D, C> {
    /// Page description
    #[must_use]
    pub const fn definition(&self) -> &PageDefinition {
        self.definition
    }

    /// Resolve a named element
    ///
    /// # Errors
    ///
    /// [`LocateError::UnknownElement`], or anything [`Session::find`] returns
    pub fn element(&mut self, name: &str) -> LocateResult<ElementHandle> {
        let spec = self.definition.spec(name)?;
        spec.apply(self.session.scoped()).find(spec.locator())
    }

    /// Resolve a named collection
    ///
    /// # Errors
    ///
    /// [`LocateError::UnknownElement`], or anything [`Session::find_all`] returns
    pub fn elements(&mut self, name: &str) -> LocateResult<Resolution> {
        let spec = self.definition.spec(name)?;
        spec.apply(self.session.scoped()).find_all(spec.locator())
    }

    /// Whether a named element goes away within its timeout
    ///
    /// # Errors
    ///
    /// [`LocateError::UnknownElement`] or a driver fault; running out of time
    /// is `Ok(false)`
    pub fn is_absent(&mut self, name: &str) -> LocateResult<bool> {
        let spec = self.definition.spec(name)?;
        match spec
            .apply(self.session.scoped())
            .wait_for_absence(spec.locator())
        {
            Ok(_) => Ok(true),
            Err(LocateError::StillPresent { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Wait until every ready element is visible
    ///
    /// All ready elements share one deadline: the page's load timeout, or
    /// the session's current timeout when the page sets none.
    ///
    /// # Errors
    ///
    /// The first element that failed to appear, as a timeout or driver fault
    pub fn wait_until_loaded(&mut self) -> LocateResult<()> {
        let budget = self
            .definition
            .load_timeout()
            .unwrap_or_else(|| self.session.policy().timeout());
        let start = self.session.resolver().clock().now();

        for name in self.definition.ready_elements() {
            let spec = self.definition.spec(name)?;
            let spent = self
                .session
                .resolver()
                .clock()
                .now()
                .saturating_duration_since(start);
            let remaining = budget.saturating_sub(spent);
            debug!(page = self.definition.name(), element = %name, remaining_ms = remaining.as_millis(), "waiting for ready element");
            self.session
                .scoped()
                .with_condition(spec.condition().unwrap_or(Condition::Visible))
                .with_timeout(remaining)
                .find(spec.locator())?;
        }
        Ok(())
    }
}
