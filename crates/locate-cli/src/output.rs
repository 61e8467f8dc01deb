//! Scenario report rendering

use console::{style, Term};
use locate::scenario::{Expectation, StepReport};
use locate::ScenarioReport;
use serde::Serialize;

use crate::error::CliResult;

/// Prints scenario results and status lines
#[derive(Debug)]
pub struct ReportPrinter {
    out: Term,
    err: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode: failures and the summary only
    pub quiet: bool,
}

impl Default for ReportPrinter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl ReportPrinter {
    /// Create a printer writing reports to stdout and status to stderr
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        // console would otherwise drop styling on pipes even for --color always
        if use_color {
            console::set_colors_enabled(true);
        }
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Render one scenario as text
    #[must_use]
    pub fn render_text(&self, report: &ScenarioReport) -> String {
        let mut text = String::new();
        let header = format!("{} ({} steps)", report.name, report.steps.len());
        if self.use_color {
            text.push_str(&style(header).bold().to_string());
        } else {
            text.push_str(&header);
        }
        text.push('\n');

        for step in &report.steps {
            if self.quiet && step.passed {
                continue;
            }
            text.push_str("  ");
            text.push_str(&self.render_step(step));
            text.push('\n');
        }

        let failed = report.failed_count();
        let passed = report.steps.len() - failed;
        let summary = format!("{passed} passed, {failed} failed");
        text.push_str("  ");
        if !self.use_color {
            text.push_str(&summary);
        } else if failed == 0 {
            text.push_str(&style(summary).green().to_string());
        } else {
            text.push_str(&style(summary).red().to_string());
        }
        text.push('\n');
        text
    }

    fn render_step(&self, step: &StepReport) -> String {
        let prefix = match (step.passed, self.use_color) {
            (true, true) => style("✓").green().bold().to_string(),
            (false, true) => style("✗").red().bold().to_string(),
            (true, false) => "PASS".to_string(),
            (false, false) => "FAIL".to_string(),
        };

        let mut line = format!(
            "{prefix} {}: {} after {}ms, {} polls",
            step.name, step.outcome, step.elapsed_ms, step.polls
        );
        if !step.handles.is_empty() {
            let handles: Vec<String> = step.handles.iter().map(ToString::to_string).collect();
            line.push_str(&format!(" [{}]", handles.join(", ")));
        }
        if !step.passed {
            line.push_str(&format!(" (expected {})", describe(&step.expected)));
            if let Some(message) = &step.message {
                line.push_str(&format!(": {message}"));
            }
        }
        line
    }

    /// Print scenarios in the requested form
    pub fn print_reports(&self, reports: &[ScenarioReport], json: bool) -> CliResult<()> {
        if json {
            self.out.write_line(&render_json(reports)?)?;
        } else {
            for report in reports {
                self.out.write_str(&self.render_text(report))?;
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }
}

fn describe(expected: &Expectation) -> String {
    match expected.count {
        Some(count) => format!("{} with {count} handles", expected.outcome),
        None => expected.outcome.to_string(),
    }
}

/// Render any serializable result set as pretty JSON
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
