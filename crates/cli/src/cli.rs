//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// PyCosworth - in-car telemetry core for Cosworth engine management
#[derive(Parser, Debug)]
#[command(
    name = "pycosworth",
    author,
    version,
    about = "In-car telemetry core for Cosworth engine management",
    long_about = "Polls the ECU and auxiliary sensors over serial links, publishes\n\
                  decoded readings to the shared value store and records them to CSV."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PYCOSWORTH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PYCOSWORTH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run acquisition, logging and the status monitor
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "pycosworth.toml",
        env = "PYCOSWORTH_CONFIG"
    )]
    pub config: PathBuf,

    /// Force demo mode on at startup
    #[arg(long, conflicts_with = "no_demo")]
    pub demo: bool,

    /// Force demo mode off at startup
    #[arg(long)]
    pub no_demo: bool,

    /// Override the log directory from configuration
    #[arg(long, env = "PYCOSWORTH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Start recording as soon as the logger is running
    #[arg(long)]
    pub record: bool,

    /// Do not read commands from stdin
    #[arg(long)]
    pub no_console: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "PYCOSWORTH_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    /// Demo override, `None` keeps the configured value
    pub fn demo_override(&self) -> Option<bool> {
        match (self.demo, self.no_demo) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pycosworth.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "pycosworth.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-sensor display limits
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides() {
        let cli = Cli::parse_from(["pycosworth", "run", "--no-demo", "--record", "--log-dir", "/tmp/logs"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.demo_override(), Some(false));
        assert!(args.record);
        assert_eq!(args.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_demo_flags_conflict() {
        let result = Cli::try_parse_from(["pycosworth", "run", "--demo", "--no-demo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_verbosity() {
        let cli = Cli::parse_from(["pycosworth", "validate", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Validate(_)));
    }
}
