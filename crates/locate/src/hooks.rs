//! Driver Enhancement Hooks
//!
//! Two ordered callback lists bracket a driver session's life: one runs
//! before the driver is created and may edit the requested capabilities,
//! the other runs before the session is torn down.
//!
//! ## Toyota Way Application
//!
//! - **Heijunka**: Hooks run in registration order, every time
//! - **Jidoka**: A failing creation hook stops the session from starting
//! - **Hansei**: Teardown hooks all run; the first failure is reported

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, warn};

use crate::config::LocateConfig;
use crate::result::{LocateError, LocateResult};

/// Explicit context handed to every hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Session name, used in logs
    pub name: String,
    /// Capabilities requested from the driver
    pub capabilities: BTreeMap<String, String>,
    /// Resolution settings the session will start with
    pub config: LocateConfig,
}

impl SessionContext {
    /// Create a context with default settings
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set a capability (builder form)
    #[must_use]
    pub fn with_capability(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.capabilities.insert(key.into(), value.into());
        self
    }

    /// Replace the resolution settings
    #[must_use]
    pub fn with_config(mut self, config: LocateConfig) -> Self {
        self.config = config;
        self
    }

    /// Look up a capability
    #[must_use]
    pub fn capability(&self, key: &str) -> Option<&str> {
        self.capabilities.get(key).map(String::as_str)
    }
}

type CreateHook = Box<dyn FnMut(&mut SessionContext) -> LocateResult<()> + Send>;
type TeardownHook<D> = Box<dyn FnMut(&mut D, &SessionContext) -> LocateResult<()> + Send>;

/// Ordered pre-creation and pre-teardown callbacks for drivers of type `D`
pub struct DriverHooks<D> {
    before_create: Vec<(String, CreateHook)>,
    before_teardown: Vec<(String, TeardownHook<D>)>,
}

impl<D> Default for DriverHooks<D> {
    fn default() -> Self {
        Self {
            before_create: Vec::new(),
            before_teardown: Vec::new(),
        }
    }
}

impl<D> fmt::Debug for DriverHooks<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHooks")
            .field("before_create", &self.create_hook_names())
            .field("before_teardown", &self.teardown_hook_names())
            .finish()
    }
}

impl<D> DriverHooks<D> {
    /// Create an empty hook set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook that runs before the driver is created
    #[must_use]
    pub fn before_create<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: FnMut(&mut SessionContext) -> LocateResult<()> + Send + 'static,
    {
        self.before_create.push((name.into(), Box::new(hook)));
        self
    }

    /// Register a hook that runs before the session is torn down
    #[must_use]
    pub fn before_teardown<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: FnMut(&mut D, &SessionContext) -> LocateResult<()> + Send + 'static,
    {
        self.before_teardown.push((name.into(), Box::new(hook)));
        self
    }

    /// Names of the creation hooks, in run order
    #[must_use]
    pub fn create_hook_names(&self) -> Vec<&str> {
        self.before_create.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Names of the teardown hooks, in run order
    #[must_use]
    pub fn teardown_hook_names(&self) -> Vec<&str> {
        self.before_teardown.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Whether no hooks are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before_create.is_empty() && self.before_teardown.is_empty()
    }

    /// Run creation hooks in order, stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Hook`] naming the hook that failed
    pub fn run_before_create(&mut self, context: &mut SessionContext) -> LocateResult<()> {
        for (name, hook) in &mut self.before_create {
            info!(session = %context.name, hook = %name, "before_create");
            hook(context).map_err(|e| {
                LocateError::hook(format!("before_create/{name}"), e.to_string())
            })?;
        }
        Ok(())
    }

    /// Run every teardown hook in order
    ///
    /// # Errors
    ///
    /// Returns the first [`LocateError::Hook`] after all hooks have run
    pub fn run_before_teardown(&mut self, driver: &mut D, context: &SessionContext) -> LocateResult<()> {
        let mut first_error: Option<LocateError> = None;
        for (name, hook) in &mut self.before_teardown {
            info!(session = %context.name, hook = %name, "before_teardown");
            if let Err(e) = hook(driver, context) {
                warn!(session = %context.name, hook = %name, error = %e, "teardown hook failed");
                if first_error.is_none() {
                    first_error =
                        Some(LocateError::hook(format!("before_teardown/{name}"), e.to_string()));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, entry: &'static str) -> impl FnMut(&mut SessionContext) -> LocateResult<()> {
        let log = Arc::clone(log);
        move |_ctx| {
            log.lock().unwrap().push(entry.to_string());
            Ok(())
        }
    }

    mod context_tests {
        use super::*;

        #[test]
        fn test_capabilities() {
            let ctx = SessionContext::new("checkout")
                .with_capability("browserName", "firefox")
                .with_capability("headless", "true");
            assert_eq!(ctx.capability("browserName"), Some("firefox"));
            assert_eq!(ctx.capability("platform"), None);
            assert_eq!(ctx.name, "checkout");
        }
    }

    mod before_create_tests {
        use super::*;

        #[test]
        fn test_run_in_registration_order() {
            let log: Log = Arc::default();
            let mut hooks: DriverHooks<()> = DriverHooks::new()
                .before_create("first", recorder(&log, "first"))
                .before_create("second", recorder(&log, "second"));
            hooks.run_before_create(&mut SessionContext::new("s")).unwrap();
            assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        }

        #[test]
        fn test_hooks_can_edit_capabilities() {
            let mut hooks: DriverHooks<()> = DriverHooks::new().before_create("headless", |ctx| {
                ctx.capabilities.insert("headless".into(), "true".into());
                Ok(())
            });
            let mut ctx = SessionContext::new("s");
            hooks.run_before_create(&mut ctx).unwrap();
            assert_eq!(ctx.capability("headless"), Some("true"));
        }

        #[test]
        fn test_first_failure_stops_the_rest() {
            let log: Log = Arc::default();
            let mut hooks: DriverHooks<()> = DriverHooks::new()
                .before_create("fails", |_| Err(LocateError::config("no grid")))
                .before_create("after", recorder(&log, "after"));
            let err = hooks
                .run_before_create(&mut SessionContext::new("s"))
                .unwrap_err();
            assert!(err.to_string().contains("before_create/fails"));
            assert!(log.lock().unwrap().is_empty());
        }
    }

    mod before_teardown_tests {
        use super::*;

        #[test]
        fn test_all_run_and_first_error_returned() {
            let mut hooks: DriverHooks<Vec<&'static str>> = DriverHooks::new()
                .before_teardown("one", |d: &mut Vec<&'static str>, _| {
                    d.push("one");
                    Err(LocateError::config("first"))
                })
                .before_teardown("two", |d: &mut Vec<&'static str>, _| {
                    d.push("two");
                    Err(LocateError::config("second"))
                })
                .before_teardown("three", |d: &mut Vec<&'static str>, _| {
                    d.push("three");
                    Ok(())
                });
            let mut driver = Vec::new();
            let err = hooks
                .run_before_teardown(&mut driver, &SessionContext::new("s"))
                .unwrap_err();
            assert_eq!(driver, vec!["one", "two", "three"]);
            assert!(err.to_string().contains("before_teardown/one"));
            assert!(err.to_string().contains("first"));
        }

        #[test]
        fn test_names_and_debug() {
            let hooks: DriverHooks<()> = DriverHooks::new()
                .before_create("a", |_| Ok(()))
                .before_teardown("b", |_, _| Ok(()));
            assert_eq!(hooks.create_hook_names(), vec!["a"]);
            assert_eq!(hooks.teardown_hook_names(), vec!["b"]);
            assert!(format!("{hooks:?}").contains("DriverHooks"));
            assert!(!hooks.is_empty());
        }
    }
}
