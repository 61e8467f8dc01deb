//! Scenario loading and execution for the `run` and `config` commands

use std::path::{Path, PathBuf};

use locate::{LocateConfig, Scenario, ScenarioReport, ScenarioRunner};
use tracing::{debug, info};

use crate::commands::ConfigOutputFormat;
use crate::error::{CliError, CliResult};
use crate::output::render_json;

/// Read and validate one scenario file
pub fn load_scenario(path: &Path) -> CliResult<Scenario> {
    debug!(path = %path.display(), "loading scenario");
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        CliError::invalid_argument(format!("failed to read {}: {e}", path.display()))
    })?;
    Scenario::from_yaml(&yaml)
        .map_err(|e| CliError::invalid_argument(format!("{}: {e}", path.display())))
}

/// Runs scenario files one after another with shared settings
#[derive(Debug, Clone, Default)]
pub struct ScenarioBatch {
    runner: ScenarioRunner,
    fail_fast: bool,
}

impl ScenarioBatch {
    /// Batch whose scenarios fall back to `config`
    #[must_use]
    pub fn new(config: LocateConfig) -> Self {
        Self {
            runner: ScenarioRunner::new().with_config(config),
            fail_fast: false,
        }
    }

    /// Stop after the first scenario with a failing step
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Load every file up front, then run them in order.
    ///
    /// A malformed file aborts the batch before anything runs.
    pub fn run(&self, files: &[PathBuf]) -> CliResult<Vec<ScenarioReport>> {
        let scenarios = files
            .iter()
            .map(|path| load_scenario(path))
            .collect::<CliResult<Vec<_>>>()?;

        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in &scenarios {
            let report = self.runner.run(scenario)?;
            info!(
                scenario = %report.name,
                failed = report.failed_count(),
                "scenario finished"
            );
            let failed = !report.passed();
            reports.push(report);
            if failed && self.fail_fast {
                debug!("fail-fast: skipping remaining scenarios");
                break;
            }
        }
        Ok(reports)
    }
}

/// Error for a batch with failing steps, if any
pub fn check_reports(reports: &[ScenarioReport]) -> CliResult<()> {
    let failed_steps: usize = reports.iter().map(ScenarioReport::failed_count).sum();
    if failed_steps == 0 {
        return Ok(());
    }
    let failed_scenarios = reports.iter().filter(|r| !r.passed()).count();
    Err(CliError::scenario_failed(format!(
        "{failed_steps} step(s) failed in {failed_scenarios} of {} scenario(s)",
        reports.len()
    )))
}

/// Serialize the effective settings
pub fn render_config(config: &LocateConfig, format: ConfigOutputFormat) -> CliResult<String> {
    match format {
        ConfigOutputFormat::Yaml => Ok(config.to_yaml()?),
        ConfigOutputFormat::Json => render_json(config),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use locate::CollectionLoadingStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PASSING: &str = r#"
version: "1.0"
name: banner
elements:
  - handle: banner
    locator: "css:.banner"
    timeline:
      - { at_ms: 80, state: visible }
steps:
  - name: banner shows up
    locator: ".banner"
    expect: { outcome: found, count: 1 }
"#;

    const FAILING: &str = r#"
version: "1.0"
name: never
steps:
  - name: ghost
    locator: "id:ghost"
    timeout_ms: 100
    expect: { outcome: found }
"#;

    fn write(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_load_valid_scenario() {
            let file = write(PASSING);
            let scenario = load_scenario(file.path()).unwrap();
            assert_eq!(scenario.name, "banner");
        }

        #[test]
        fn test_load_missing_file() {
            let err = load_scenario(Path::new("/nonexistent/s.yaml")).unwrap_err();
            assert!(err.to_string().contains("failed to read"));
        }

        #[test]
        fn test_load_invalid_scenario_names_the_file() {
            let file = write("version: \"2.0\"\nname: x\nsteps: []\n");
            let err = load_scenario(file.path()).unwrap_err();
            assert!(err.to_string().contains(&file.path().display().to_string()));
        }
    }

    mod batch_tests {
        use super::*;

        #[test]
        fn test_passing_batch() {
            let file = write(PASSING);
            let reports = ScenarioBatch::new(LocateConfig::default())
                .run(&[file.path().to_path_buf()])
                .unwrap();
            assert_eq!(reports.len(), 1);
            assert!(reports[0].passed());
            assert!(check_reports(&reports).is_ok());
        }

        #[test]
        fn test_failing_batch_is_reported() {
            let pass = write(PASSING);
            let fail = write(FAILING);
            let reports = ScenarioBatch::new(LocateConfig::default())
                .run(&[fail.path().to_path_buf(), pass.path().to_path_buf()])
                .unwrap();
            assert_eq!(reports.len(), 2);
            let err = check_reports(&reports).unwrap_err();
            assert!(err.to_string().contains("1 step(s) failed in 1 of 2"));
        }

        #[test]
        fn test_fail_fast_stops_after_first_failure() {
            let pass = write(PASSING);
            let fail = write(FAILING);
            let reports = ScenarioBatch::new(LocateConfig::default())
                .with_fail_fast(true)
                .run(&[fail.path().to_path_buf(), pass.path().to_path_buf()])
                .unwrap();
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].name, "never");
        }

        #[test]
        fn test_bad_file_aborts_before_running() {
            let pass = write(PASSING);
            let result = ScenarioBatch::new(LocateConfig::default()).run(&[
                pass.path().to_path_buf(),
                PathBuf::from("/nonexistent/s.yaml"),
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn test_batch_config_applies_to_scenarios_without_one() {
            // 50ms budget: the banner at 80ms is never seen
            let file = write(PASSING);
            let config = LocateConfig {
                timeout_ms: 50,
                ..LocateConfig::default()
            };
            let reports = ScenarioBatch::new(config)
                .run(&[file.path().to_path_buf()])
                .unwrap();
            assert!(!reports[0].passed());
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_render_yaml() {
            let yaml = render_config(&LocateConfig::default(), ConfigOutputFormat::Yaml).unwrap();
            assert!(yaml.contains("timeout_ms: 5000"));
            assert_eq!(LocateConfig::from_yaml(&yaml).unwrap(), LocateConfig::default());
        }

        #[test]
        fn test_render_json() {
            let config = LocateConfig {
                collection_loading_strategy: CollectionLoadingStrategy::Paranoid,
                ..LocateConfig::default()
            };
            let json = render_config(&config, ConfigOutputFormat::Json).unwrap();
            assert!(json.contains("\"collection_loading_strategy\": \"paranoid\""));
        }
    }
}
