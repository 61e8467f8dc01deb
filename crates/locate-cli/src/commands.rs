//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Locador: run Locate resolution scenarios on virtual time
#[derive(Parser, Debug)]
#[command(name = "locador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// YAML file with resolution settings (timeout_ms, poll_interval_ms, ...)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run resolution scenarios
    Run(RunArgs),

    /// Show the effective resolution settings
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario YAML file(s) to run
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Validate scenarios without running them
    #[arg(long)]
    pub validate: bool,

    /// Stop after the first scenario with a failing step
    #[arg(long)]
    pub fail_fast: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: RunOutputFormat,
}

/// Scenario report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunOutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: ConfigOutputFormat,
}

/// Configuration dump format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigOutputFormat {
    /// YAML, loadable again through `--config`
    #[default]
    Yaml,
    /// JSON output
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_command() {
            let cli = Cli::parse_from(["locador", "run", "login.yaml"]);
            if let Commands::Run(args) = cli.command {
                assert_eq!(args.files, vec![PathBuf::from("login.yaml")]);
                assert_eq!(args.format, RunOutputFormat::Text);
                assert!(!args.validate);
                assert!(!args.fail_fast);
            } else {
                panic!("expected Run command");
            }
        }

        #[test]
        fn test_parse_run_multiple_files_json() {
            let cli = Cli::parse_from(["locador", "run", "a.yaml", "b.yaml", "--format", "json"]);
            if let Commands::Run(args) = cli.command {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.format, RunOutputFormat::Json);
            } else {
                panic!("expected Run command");
            }
        }

        #[test]
        fn test_run_requires_files() {
            assert!(Cli::try_parse_from(["locador", "run"]).is_err());
        }

        #[test]
        fn test_parse_run_flags() {
            let cli = Cli::parse_from(["locador", "run", "--validate", "--fail-fast", "a.yaml"]);
            if let Commands::Run(args) = cli.command {
                assert!(args.validate);
                assert!(args.fail_fast);
            } else {
                panic!("expected Run command");
            }
        }

        #[test]
        fn test_parse_config_command() {
            let cli = Cli::parse_from(["locador", "config"]);
            if let Commands::Config(args) = cli.command {
                assert_eq!(args.format, ConfigOutputFormat::Yaml);
            } else {
                panic!("expected Config command");
            }
        }

        #[test]
        fn test_parse_config_json() {
            let cli = Cli::parse_from(["locador", "config", "--format", "json"]);
            if let Commands::Config(args) = cli.command {
                assert_eq!(args.format, ConfigOutputFormat::Json);
            } else {
                panic!("expected Config command");
            }
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::parse_from([
                "locador", "config", "-vv", "--color", "never", "--config", "locate.yaml",
            ]);
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.color, ColorArg::Never));
            assert_eq!(cli.config, Some(PathBuf::from("locate.yaml")));
        }

        #[test]
        fn test_quiet_flag() {
            let cli = Cli::parse_from(["locador", "-q", "config"]);
            assert!(cli.quiet);
            assert_eq!(cli.verbose, 0);
        }
    }

    mod color_tests {
        use super::*;
        use crate::config::ColorChoice;

        #[test]
        fn test_color_arg_conversion() {
            let auto: ColorChoice = ColorArg::Auto.into();
            assert!(matches!(auto, ColorChoice::Auto));

            let always: ColorChoice = ColorArg::Always.into();
            assert!(matches!(always, ColorChoice::Always));

            let never: ColorChoice = ColorArg::Never.into();
            assert!(matches!(never, ColorChoice::Never));
        }
    }
}
