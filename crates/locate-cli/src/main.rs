//! Locador: run element resolution scenarios from the command line
//!
//! ## Usage
//!
//! ```bash
//! locador run login.yaml checkout.yaml     # Run scenarios
//! locador run login.yaml --format json     # Machine-readable report
//! locador run *.yaml --validate            # Parse only
//! locador --config locate.yaml config      # Effective settings
//! ```

use clap::Parser;
use locador::{
    check_reports, init_logging, render_config, Cli, CliConfig, CliResult, ColorChoice, Commands,
    ConfigArgs, ReportPrinter, RunArgs, RunOutputFormat, ScenarioBatch, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_logging(config.verbosity);

    match cli.command {
        Commands::Run(args) => run_scenarios(&config, &args),
        Commands::Config(args) => run_config(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_config_path(cli.config.as_ref())
}

fn run_scenarios(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let printer = ReportPrinter::new(config.color.should_color(), config.verbosity.is_quiet());

    if args.validate {
        for path in &args.files {
            let scenario = locador::load_scenario(path)?;
            printer.success(&format!(
                "{}: '{}' is valid ({} steps)",
                path.display(),
                scenario.name,
                scenario.steps.len()
            ));
        }
        return Ok(());
    }

    let locate_config = config.locate_config()?;
    let reports = ScenarioBatch::new(locate_config)
        .with_fail_fast(args.fail_fast)
        .run(&args.files)?;
    printer.print_reports(&reports, args.format == RunOutputFormat::Json)?;

    check_reports(&reports)?;
    printer.success(&format!("{} scenario(s) passed", reports.len()));
    Ok(())
}

fn run_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let locate_config = config.locate_config()?;
    println!("{}", render_config(&locate_config, args.format)?.trim_end());
    Ok(())
}
