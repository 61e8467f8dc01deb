//! Element states and the conditions evaluated against them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::LocateError;

/// Observed state of an element, derived fresh on every poll.
///
/// Variants are ordered from least to most interactable, so a condition can
/// be expressed as a lower bound on the state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// Not attached to the document
    #[default]
    Absent,
    /// Attached but not rendered (hidden, zero size, off-screen)
    PresentNotVisible,
    /// Rendered and visible
    Visible,
    /// Visible and not disabled
    VisibleAndEnabled,
    /// Visible, enabled, and not obscured by another element
    VisibleAndClickable,
}

impl ElementState {
    /// Name used in string and serialized forms
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::PresentNotVisible => "present_not_visible",
            Self::Visible => "visible",
            Self::VisibleAndEnabled => "visible_and_enabled",
            Self::VisibleAndClickable => "visible_and_clickable",
        }
    }

    /// Whether the element is attached at all
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementState {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absent" => Ok(Self::Absent),
            "present_not_visible" | "present" | "hidden" => Ok(Self::PresentNotVisible),
            "visible" => Ok(Self::Visible),
            "visible_and_enabled" | "enabled" => Ok(Self::VisibleAndEnabled),
            "visible_and_clickable" | "clickable" => Ok(Self::VisibleAndClickable),
            other => Err(LocateError::config(format!("unknown element state '{other}'"))),
        }
    }
}

/// Success condition evaluated against each matched element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Attached to the document, visible or not
    Present,
    /// Rendered and visible
    #[default]
    Visible,
    /// Visible and enabled
    Enabled,
    /// Visible, enabled, and able to receive a click
    Clickable,
}

impl Condition {
    /// Check the condition against an observed state
    #[must_use]
    pub fn is_satisfied_by(&self, state: ElementState) -> bool {
        match self {
            Self::Present => state.is_present(),
            Self::Visible => state >= ElementState::Visible,
            Self::Enabled => state >= ElementState::VisibleAndEnabled,
            Self::Clickable => state == ElementState::VisibleAndClickable,
        }
    }

    /// Name used in string and serialized forms
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Visible => "visible",
            Self::Enabled => "enabled",
            Self::Clickable => "clickable",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "visible" => Ok(Self::Visible),
            "enabled" => Ok(Self::Enabled),
            "clickable" => Ok(Self::Clickable),
            other => Err(LocateError::config(format!("unknown condition '{other}'"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL_STATES: [ElementState; 5] = [
        ElementState::Absent,
        ElementState::PresentNotVisible,
        ElementState::Visible,
        ElementState::VisibleAndEnabled,
        ElementState::VisibleAndClickable,
    ];

    fn satisfying(condition: Condition) -> Vec<ElementState> {
        ALL_STATES
            .into_iter()
            .filter(|s| condition.is_satisfied_by(*s))
            .collect()
    }

    mod element_state_tests {
        use super::*;

        #[test]
        fn test_ordering() {
            let mut sorted = ALL_STATES;
            sorted.sort();
            assert_eq!(sorted, ALL_STATES);
        }

        #[test]
        fn test_default_is_absent() {
            assert_eq!(ElementState::default(), ElementState::Absent);
        }

        #[test]
        fn test_parse_aliases() {
            assert_eq!("hidden".parse::<ElementState>().unwrap(), ElementState::PresentNotVisible);
            assert_eq!("clickable".parse::<ElementState>().unwrap(), ElementState::VisibleAndClickable);
            assert!("gone".parse::<ElementState>().is_err());
        }

        #[test]
        fn test_serde_snake_case() {
            let json = serde_json::to_string(&ElementState::VisibleAndEnabled).unwrap();
            assert_eq!(json, "\"visible_and_enabled\"");
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_present() {
            assert_eq!(satisfying(Condition::Present), ALL_STATES[1..].to_vec());
        }

        #[test]
        fn test_visible() {
            assert_eq!(satisfying(Condition::Visible), ALL_STATES[2..].to_vec());
        }

        #[test]
        fn test_enabled() {
            assert_eq!(satisfying(Condition::Enabled), ALL_STATES[3..].to_vec());
        }

        #[test]
        fn test_clickable() {
            assert_eq!(
                satisfying(Condition::Clickable),
                vec![ElementState::VisibleAndClickable]
            );
        }

        #[test]
        fn test_absent_never_satisfies() {
            for c in [
                Condition::Present,
                Condition::Visible,
                Condition::Enabled,
                Condition::Clickable,
            ] {
                assert!(!c.is_satisfied_by(ElementState::Absent));
            }
        }

        #[test]
        fn test_default_and_parse() {
            assert_eq!(Condition::default(), Condition::Visible);
            assert_eq!(" Enabled ".parse::<Condition>().unwrap(), Condition::Enabled);
            assert!("ready".parse::<Condition>().is_err());
        }
    }
}
