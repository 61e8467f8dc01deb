//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an immutable descriptor: a lookup [`Strategy`] plus the
//! selector text handed to the driver. Locators never touch the driver
//! themselves; resolution and waiting live in [`crate::Resolver`].
//!
//! # String form
//!
//! Locators parse from and render to `prefix:value` strings
//! (`id:username`, `css:button.primary`, `xpath://form//input`). Strings
//! without a known prefix are "smart" selectors: anything that looks like an
//! XPath expression (`//`, `./`, `/`, `(`) is XPath, the rest is CSS.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::{LocateError, LocateResult};

/// Maximum accepted selector length (10KB)
pub const MAX_SELECTOR_LENGTH: usize = 10 * 1024;

/// Lookup strategy for locating elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Element `id` attribute
    Id,
    /// Element `name` attribute
    Name,
    /// CSS selector (e.g., "button.primary")
    Css,
    /// XPath expression
    XPath,
    /// Single CSS class name
    ClassName,
    /// Tag name (e.g., "table")
    TagName,
    /// Exact link text of an anchor
    LinkText,
}

impl Strategy {
    /// All strategies, in prefix lookup order
    pub const ALL: [Self; 7] = [
        Self::Id,
        Self::Name,
        Self::Css,
        Self::XPath,
        Self::ClassName,
        Self::TagName,
        Self::LinkText,
    ];

    /// Prefix used in the string form of a locator
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::ClassName => "class",
            Self::TagName => "tag",
            Self::LinkText => "link",
        }
    }

    /// Look up a strategy by its prefix
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.prefix() == prefix)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// An immutable element locator.
///
/// Equality, hashing and ordering consider both strategy and value, so
/// `id:a` and `css:#a` are different locators even though they usually
/// match the same element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    strategy: Strategy,
    value: String,
}

impl Locator {
    /// Create a locator, rejecting empty or oversized selector values
    ///
    /// Surrounding whitespace is dropped, matching what [`parse`](Self::parse)
    /// reads back from the `prefix:value` form.
    pub fn new(strategy: Strategy, value: impl Into<String>) -> LocateResult<Self> {
        let value = trim_owned(value.into());
        if value.is_empty() {
            return Err(LocateError::InvalidLocator {
                input: format!("{}:{value}", strategy.prefix()),
                message: "selector value is empty".to_string(),
            });
        }
        if value.len() > MAX_SELECTOR_LENGTH {
            return Err(LocateError::InvalidLocator {
                input: format!(
                    "{}:{}...",
                    strategy.prefix(),
                    value.chars().take(32).collect::<String>()
                ),
                message: format!("selector exceeds {MAX_SELECTOR_LENGTH} bytes"),
            });
        }
        Ok(Self { strategy, value })
    }

    /// Locate by `id` attribute
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::Id, value)
    }

    /// Locate by `name` attribute
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::Name, value)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::Css, value)
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::XPath, value)
    }

    /// Locate by CSS class name
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::ClassName, value)
    }

    /// Locate by tag name
    #[must_use]
    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::TagName, value)
    }

    /// Locate by exact link text
    #[must_use]
    pub fn link_text(value: impl Into<String>) -> Self {
        Self::unchecked(Strategy::LinkText, value)
    }

    // Shorthand constructors are for literals in code; parsed input goes
    // through `new`/`parse` and is validated. Values are trimmed like `new`
    // so the `prefix:value` form parses back to an equal locator.
    fn unchecked(strategy: Strategy, value: impl Into<String>) -> Self {
        let value = trim_owned(value.into());
        debug_assert!(!value.is_empty(), "selector value is empty");
        debug_assert!(
            value.len() <= MAX_SELECTOR_LENGTH,
            "selector exceeds {MAX_SELECTOR_LENGTH} bytes"
        );
        Self { strategy, value }
    }

    /// Parse a `prefix:value` or smart selector string
    pub fn parse(input: &str) -> LocateResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LocateError::InvalidLocator {
                input: input.to_string(),
                message: "locator is empty".to_string(),
            });
        }

        if let Some((prefix, value)) = trimmed.split_once(':') {
            if let Some(strategy) = Strategy::from_prefix(prefix.trim()) {
                return Self::new(strategy, value.trim());
            }
        }

        Self::new(Self::guess_strategy(trimmed), trimmed)
    }

    fn guess_strategy(selector: &str) -> Strategy {
        if selector.starts_with('/') || selector.starts_with("./") || selector.starts_with('(') {
            Strategy::XPath
        } else {
            Strategy::Css
        }
    }

    /// Get the lookup strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Get the selector value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Equivalent CSS selector, for drivers that only speak CSS
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self.strategy {
            Strategy::Css | Strategy::TagName => Some(self.value.clone()),
            Strategy::Id => Some(format!("#{}", self.value)),
            Strategy::ClassName => Some(format!(".{}", self.value)),
            Strategy::Name => Some(format!("[name=\"{}\"]", css_string(&self.value))),
            Strategy::XPath | Strategy::LinkText => None,
        }
    }
}

fn trim_owned(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

/// Body of a double-quoted CSS string
fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy.prefix(), self.value)
    }
}

impl FromStr for Locator {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locator {
    type Error = LocateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}
