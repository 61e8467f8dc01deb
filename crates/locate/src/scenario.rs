//! Resolution scenarios in YAML.
//!
//! A scenario scripts a fake UI (elements whose state changes over virtual
//! time), then runs lookups against it and checks each outcome. Scenarios
//! run on a [`ManualClock`], so a scenario with multi-second waits finishes
//! instantly and always produces the same timings.
//!
//! ```yaml
//! version: "1.0"
//! name: login
//! config:
//!   timeout_ms: 2000
//! elements:
//!   - handle: submit
//!     locator: "id:submit"
//!     timeline:
//!       - { at_ms: 0, state: visible }
//!       - { at_ms: 300, state: visible_and_clickable }
//! steps:
//!   - name: submit becomes clickable
//!     locator: "id:submit"
//!     condition: clickable
//!     expect: { outcome: found, count: 1 }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::ManualClock;
use crate::config::LocateConfig;
use crate::driver::{ElementHandle, ScriptedDriver, ScriptedElement};
use crate::hooks::{DriverHooks, SessionContext};
use crate::loading::CollectionLoadingStrategy;
use crate::locator::Locator;
use crate::result::{LocateError, LocateResult};
use crate::session::Session;
use crate::state::{Condition, ElementState};

/// Supported scenario schema version
pub const SCENARIO_VERSION: &str = "1.0";

type ScenarioSession = Session<ScriptedDriver<Arc<ManualClock>>, Arc<ManualClock>>;

// =============================================================================
// SCHEMA
// =============================================================================

/// Root scenario document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Schema version (must be "1.0")
    pub version: String,
    /// Scenario name
    #[serde(default)]
    pub name: String,
    /// Scenario description
    #[serde(default)]
    pub description: String,
    /// Session settings; the runner's settings apply when absent
    #[serde(default)]
    pub config: Option<LocateConfig>,
    /// Driver session loss, in milliseconds of virtual time
    #[serde(default)]
    pub lose_session_at_ms: Option<u64>,
    /// Scripted elements
    #[serde(default)]
    pub elements: Vec<ElementScript>,
    /// Lookups to run, in order
    pub steps: Vec<Step>,
}

/// A scripted element and its state timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementScript {
    /// Handle the driver reports for this element
    pub handle: String,
    /// Locator the element answers to
    pub locator: Locator,
    /// State changes, sorted by time
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

/// One state change on a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelineEntry {
    /// Virtual time of the change
    pub at_ms: u64,
    /// State from then on
    pub state: ElementState,
}

/// Kind of lookup a step performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// First satisfying element
    #[default]
    Find,
    /// Exactly one satisfying element
    FindUnique,
    /// Every satisfying element, per the collection strategy
    FindAll,
    /// Wait until nothing satisfies the condition
    Absence,
}

/// A single lookup and its expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Step name
    pub name: String,
    /// Locator to resolve
    pub locator: Locator,
    /// Lookup kind
    #[serde(default)]
    pub action: StepAction,
    /// Virtual time to let pass before the lookup starts
    #[serde(default)]
    pub delay_ms: u64,
    /// Condition override
    #[serde(default)]
    pub condition: Option<Condition>,
    /// Strategy override
    #[serde(default)]
    pub strategy: Option<CollectionLoadingStrategy>,
    /// Timeout override
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Poll interval override
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Expected result
    pub expect: Expectation,
}

/// What a step is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    /// Expected outcome
    pub outcome: Outcome,
    /// Expected number of handles, when checked
    #[serde(default)]
    pub count: Option<usize>,
}

/// Observed or expected result of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Elements were resolved
    Found,
    /// The deadline passed
    Timeout,
    /// More than one element matched a unique lookup
    Ambiguous,
    /// Elements went away
    Absent,
    /// The driver failed
    DriverError,
    /// The step's timing settings cannot form a wait
    InvalidPolicy,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Found => "found",
            Self::Timeout => "timeout",
            Self::Ambiguous => "ambiguous",
            Self::Absent => "absent",
            Self::DriverError => "driver_error",
            Self::InvalidPolicy => "invalid_policy",
        };
        f.write_str(s)
    }
}

impl ElementScript {
    fn to_scripted(&self) -> ScriptedElement {
        self.timeline.iter().fold(
            ScriptedElement::new(ElementHandle::new(self.handle.clone()), self.locator.clone()),
            |element, entry| element.at_ms(entry.at_ms, entry.state),
        )
    }
}

impl Step {
    /// Session settings with this step's timing overrides applied
    fn effective_config(&self, base: LocateConfig) -> LocateConfig {
        LocateConfig {
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            poll_interval_ms: self.poll_interval_ms.unwrap_or(base.poll_interval_ms),
            ..base
        }
    }
}

impl Scenario {
    /// Parse a scenario from YAML.
    ///
    /// # Errors
    /// Returns [`LocateError::Scenario`] if YAML is invalid or validation fails.
    pub fn from_yaml(yaml: &str) -> LocateResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| LocateError::scenario(format!("failed to parse YAML: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Validate the scenario structure.
    ///
    /// # Errors
    /// Returns [`LocateError::Scenario`] describing the first problem found.
    pub fn validate(&self) -> LocateResult<()> {
        if self.version != SCENARIO_VERSION {
            return Err(LocateError::scenario(format!(
                "invalid version '{}', expected '{SCENARIO_VERSION}'",
                self.version
            )));
        }
        if self.steps.is_empty() {
            return Err(LocateError::scenario("scenario has no steps"));
        }
        if let Some(config) = &self.config {
            config
                .validate()
                .map_err(|e| LocateError::scenario(format!("config: {e}")))?;
        }

        let mut handles = HashSet::new();
        for element in &self.elements {
            if !handles.insert(element.handle.as_str()) {
                return Err(LocateError::scenario(format!(
                    "duplicate element handle '{}'",
                    element.handle
                )));
            }
            if element
                .timeline
                .windows(2)
                .any(|w| w[0].at_ms > w[1].at_ms)
            {
                return Err(LocateError::scenario(format!(
                    "timeline of '{}' is not sorted by at_ms",
                    element.handle
                )));
            }
        }

        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(LocateError::scenario("step with empty name"));
            }
            step.effective_config(self.config.unwrap_or_default())
                .validate()
                .map_err(|e| LocateError::scenario(format!("step '{}': {e}", step.name)))?;
        }
        Ok(())
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Lookup kind
    pub action: StepAction,
    /// What happened
    pub outcome: Outcome,
    /// What was expected
    pub expected: Expectation,
    /// Virtual time the lookup took
    pub elapsed_ms: u64,
    /// Driver queries issued
    pub polls: usize,
    /// Handles returned
    pub handles: Vec<ElementHandle>,
    /// Whether the outcome met the expectation
    pub passed: bool,
    /// Error text for failed lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of a whole scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Step results, in order
    pub steps: Vec<StepReport>,
}

impl ScenarioReport {
    /// Whether every step met its expectation
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.passed)
    }

    /// Number of steps that did not
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed).count()
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs scenarios against a scripted driver on virtual time.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    config: LocateConfig,
}

impl ScenarioRunner {
    /// Runner with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings used by scenarios without a `config` block
    #[must_use]
    pub const fn with_config(mut self, config: LocateConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every step of a scenario.
    ///
    /// Virtual time carries over from one step to the next. Timeouts,
    /// ambiguity and driver faults are step outcomes, not errors.
    ///
    /// # Errors
    /// Returns an error only if the session cannot be set up.
    pub fn run(&self, scenario: &Scenario) -> LocateResult<ScenarioReport> {
        let clock = ManualClock::shared();
        let mut driver = ScriptedDriver::new(Arc::clone(&clock));
        for element in &scenario.elements {
            driver.add_element(element.to_scripted());
        }
        if let Some(at) = scenario.lose_session_at_ms {
            driver = driver.lose_session_at(Duration::from_millis(at));
        }

        let context = SessionContext::new(scenario.name.clone())
            .with_config(scenario.config.unwrap_or(self.config));
        let mut session = Session::open(context, DriverHooks::new(), Arc::clone(&clock), |_| Ok(driver))?;
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");

        let mut steps = Vec::with_capacity(scenario.steps.len());
        for step in &scenario.steps {
            if step.delay_ms > 0 {
                clock.advance(Duration::from_millis(step.delay_ms));
            }
            steps.push(run_step(&mut session, &clock, step)?);
        }
        session.close()?;

        Ok(ScenarioReport {
            name: scenario.name.clone(),
            steps,
        })
    }
}

fn run_step(session: &mut ScenarioSession, clock: &ManualClock, step: &Step) -> LocateResult<StepReport> {
    let started = clock.elapsed();
    let queries_before = session.driver().query_count();

    let mut view = session.scoped();
    if let Some(ms) = step.timeout_ms {
        view = view.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = step.poll_interval_ms {
        view = view.with_poll_interval(Duration::from_millis(ms));
    }
    if let Some(condition) = step.condition {
        view = view.with_condition(condition);
    }
    if let Some(strategy) = step.strategy {
        view = view.with_strategy(strategy);
    }

    let result = match step.action {
        StepAction::Find => view.find(&step.locator).map(|h| vec![h]),
        StepAction::FindUnique => view.find_unique(&step.locator).map(|h| vec![h]),
        StepAction::FindAll => view.find_all(&step.locator).map(|r| r.handles),
        StepAction::Absence => view.wait_for_absence(&step.locator).map(|r| r.handles),
    };

    let (outcome, handles, message) = match result {
        Ok(handles) if step.action == StepAction::Absence => (Outcome::Absent, handles, None),
        Ok(handles) => (Outcome::Found, handles, None),
        Err(e @ (LocateError::Timeout { .. } | LocateError::StillPresent { .. })) => {
            (Outcome::Timeout, Vec::new(), Some(e.to_string()))
        }
        Err(e @ LocateError::Ambiguous { .. }) => (Outcome::Ambiguous, Vec::new(), Some(e.to_string())),
        Err(e @ LocateError::Driver(_)) => (Outcome::DriverError, Vec::new(), Some(e.to_string())),
        Err(e @ LocateError::InvalidPolicy { .. }) => {
            (Outcome::InvalidPolicy, Vec::new(), Some(e.to_string()))
        }
        Err(e) => return Err(e),
    };

    let elapsed = clock.elapsed().saturating_sub(started);
    let passed =
        outcome == step.expect.outcome && step.expect.count.map_or(true, |c| c == handles.len());
    debug!(step = %step.name, %outcome, passed, elapsed_ms = elapsed.as_millis(), "step finished");

    Ok(StepReport {
        name: step.name.clone(),
        action: step.action,
        outcome,
        expected: step.expect,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        polls: session.driver().query_count().saturating_sub(queries_before),
        handles,
        passed,
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LOGIN: &str = r#"
version: "1.0"
name: login
config:
  timeout_ms: 1000
  poll_interval_ms: 50
elements:
  - handle: user
    locator: "id:username"
    timeline:
      - { at_ms: 120, state: visible }
  - handle: submit
    locator: "id:submit"
    timeline:
      - { at_ms: 0, state: visible }
      - { at_ms: 400, state: visible_and_clickable }
  - handle: spinner
    locator: "css:.spinner"
    timeline:
      - { at_ms: 0, state: visible }
      - { at_ms: 600, state: absent }
steps:
  - name: username appears
    locator: "id:username"
    expect: { outcome: found, count: 1 }
  - name: submit clickable
    locator: "id:submit"
    condition: clickable
    expect: { outcome: found }
  - name: spinner goes away
    locator: ".spinner"
    action: absence
    expect: { outcome: absent }
  - name: missing times out quickly
    locator: "id:missing"
    timeout_ms: 100
    expect: { outcome: timeout }
"#;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_valid() {
            let scenario = Scenario::from_yaml(LOGIN).unwrap();
            assert_eq!(scenario.name, "login");
            assert_eq!(scenario.elements.len(), 3);
            assert_eq!(scenario.steps[2].action, StepAction::Absence);
            assert_eq!(scenario.steps[2].locator, Locator::css(".spinner"));
        }

        #[test]
        fn test_wrong_version() {
            let yaml = LOGIN.replace("\"1.0\"", "\"2.0\"");
            let err = Scenario::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("invalid version"));
        }

        #[test]
        fn test_no_steps() {
            let yaml = "version: \"1.0\"\nsteps: []\n";
            assert!(Scenario::from_yaml(yaml).is_err());
        }

        #[test]
        fn test_unsorted_timeline() {
            let yaml = r#"
version: "1.0"
elements:
  - handle: a
    locator: "id:a"
    timeline:
      - { at_ms: 200, state: visible }
      - { at_ms: 100, state: absent }
steps:
  - name: s
    locator: "id:a"
    expect: { outcome: found }
"#;
            let err = Scenario::from_yaml(yaml).unwrap_err();
            assert!(err.to_string().contains("not sorted"));
        }

        #[test]
        fn test_duplicate_handles() {
            let yaml = r#"
version: "1.0"
elements:
  - { handle: a, locator: "id:a" }
  - { handle: a, locator: "id:b" }
steps:
  - { name: s, locator: "id:a", expect: { outcome: found } }
"#;
            assert!(Scenario::from_yaml(yaml).is_err());
        }

        #[test]
        fn test_step_override_checked_against_config() {
            // zero poll is fine for the zero-timeout config but not for the step
            let yaml = r#"
version: "1.0"
config: { timeout_ms: 0, poll_interval_ms: 0 }
steps:
  - { name: waits, locator: "id:x", timeout_ms: 100, expect: { outcome: timeout } }
"#;
            let err = Scenario::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, LocateError::Scenario { .. }));
            assert!(err.to_string().contains("step 'waits'"));

            let ok = yaml.replace("timeout_ms: 100", "timeout_ms: 0");
            assert!(Scenario::from_yaml(&ok).is_ok());
        }

        #[test]
        fn test_bad_locator() {
            let yaml = "version: \"1.0\"\nsteps:\n  - { name: s, locator: \"id:\", expect: { outcome: found } }\n";
            assert!(matches!(
                Scenario::from_yaml(yaml),
                Err(LocateError::Scenario { .. })
            ));
        }
    }

    mod runner_tests {
        use super::*;

        #[test]
        fn test_login_scenario_passes() {
            let scenario = Scenario::from_yaml(LOGIN).unwrap();
            let report = ScenarioRunner::new().run(&scenario).unwrap();
            assert!(report.passed(), "{report:#?}");
            assert_eq!(report.failed_count(), 0);

            let user = &report.steps[0];
            assert_eq!(user.elapsed_ms, 150);
            assert_eq!(user.polls, 4);
            assert_eq!(user.handles, vec![ElementHandle::new("user")]);

            // virtual time carries over: clickable at 400, step starts at 150
            assert_eq!(report.steps[1].elapsed_ms, 250);
            // spinner gone at 600, step starts at 400
            assert_eq!(report.steps[2].elapsed_ms, 200);
            assert_eq!(report.steps[3].elapsed_ms, 100);
            assert!(report.steps[3].message.as_deref().unwrap().contains("id:missing"));
        }

        #[test]
        fn test_failed_expectation_reported() {
            let yaml = r#"
version: "1.0"
config: { timeout_ms: 100 }
steps:
  - { name: nothing there, locator: "id:x", expect: { outcome: found } }
"#;
            let report = ScenarioRunner::new()
                .run(&Scenario::from_yaml(yaml).unwrap())
                .unwrap();
            assert!(!report.passed());
            assert_eq!(report.steps[0].outcome, Outcome::Timeout);
        }

        #[test]
        fn test_count_mismatch_fails() {
            let yaml = r#"
version: "1.0"
elements:
  - handle: a
    locator: "css:li"
    timeline: [{ at_ms: 0, state: visible }]
steps:
  - { name: list, locator: "css:li", action: find_all, expect: { outcome: found, count: 2 } }
"#;
            let report = ScenarioRunner::new()
                .run(&Scenario::from_yaml(yaml).unwrap())
                .unwrap();
            assert_eq!(report.steps[0].outcome, Outcome::Found);
            assert!(!report.steps[0].passed);
        }

        #[test]
        fn test_ambiguous_and_driver_error_outcomes() {
            let yaml = r#"
version: "1.0"
lose_session_at_ms: 500
elements:
  - { handle: a, locator: "css:li", timeline: [{ at_ms: 0, state: visible }] }
  - { handle: b, locator: "css:li", timeline: [{ at_ms: 0, state: visible }] }
steps:
  - { name: unique, locator: "css:li", action: find_unique, expect: { outcome: ambiguous } }
  - { name: after loss, locator: "css:li", delay_ms: 600, expect: { outcome: driver_error } }
"#;
            let report = ScenarioRunner::new()
                .run(&Scenario::from_yaml(yaml).unwrap())
                .unwrap();
            assert!(report.passed(), "{report:#?}");
            assert_eq!(report.steps[1].polls, 1);
        }

        #[test]
        fn test_runner_config_applies_without_block() {
            let yaml = "version: \"1.0\"\nsteps:\n  - { name: s, locator: \"id:x\", expect: { outcome: timeout } }\n";
            let runner = ScenarioRunner::new().with_config(LocateConfig {
                timeout_ms: 70,
                poll_interval_ms: 10,
                ..LocateConfig::default()
            });
            let report = runner.run(&Scenario::from_yaml(yaml).unwrap()).unwrap();
            assert_eq!(report.steps[0].elapsed_ms, 70);
            assert_eq!(report.steps[0].polls, 8);
        }

        #[test]
        fn test_invalid_step_policy_is_a_failed_step() {
            // valid against the defaults, but the runner's zero poll interval
            // cannot serve the step's 100ms wait
            let yaml = r#"
version: "1.0"
steps:
  - { name: waits, locator: "id:x", timeout_ms: 100, expect: { outcome: timeout } }
  - { name: instant, locator: "id:x", timeout_ms: 0, expect: { outcome: timeout } }
"#;
            let runner = ScenarioRunner::new().with_config(LocateConfig {
                timeout_ms: 0,
                poll_interval_ms: 0,
                ..LocateConfig::default()
            });
            let report = runner.run(&Scenario::from_yaml(yaml).unwrap()).unwrap();

            let waits = &report.steps[0];
            assert_eq!(waits.outcome, Outcome::InvalidPolicy);
            assert!(!waits.passed);
            assert!(waits.message.as_deref().unwrap().contains("poll interval"));
            assert_eq!(report.steps[1].outcome, Outcome::Timeout);
            assert_eq!(report.failed_count(), 1);
        }

        #[test]
        fn test_report_serializes() {
            let report = ScenarioRunner::new()
                .run(&Scenario::from_yaml(LOGIN).unwrap())
                .unwrap();
            let json = serde_json::to_value(&report).unwrap();
            assert_eq!(json["steps"][0]["outcome"], "found");
            assert_eq!(json["steps"][0]["handles"][0], "user");
        }
    }
}
