//! CLI command definitions using clap

use catalog_probe::{ScenarioKind, TraceMode};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// catalog-probe: acceptance scenarios for a storefront's category
/// drill-down and search history
#[derive(Parser, Debug)]
#[command(name = "catalog-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the storefront
    Run(RunArgs),

    /// Print the planned steps without opening a browser
    Plan(PlanArgs),

    /// Print the site profile as YAML
    Profile(ProfileArgs),
}

/// Which scenarios to select
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScenarioArg {
    /// Category drill-down and filter state
    DrillDown,
    /// Search history recording and re-application
    History,
    /// Every scenario
    #[default]
    All,
}

impl ScenarioArg {
    /// Scenario kinds selected by this argument
    #[must_use]
    pub fn kinds(self) -> Vec<ScenarioKind> {
        match self {
            Self::DrillDown => vec![ScenarioKind::DrillDown],
            Self::History => vec![ScenarioKind::History],
            Self::All => ScenarioKind::ALL.to_vec(),
        }
    }
}

/// Trace retention argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceArg {
    /// Never record
    Off,
    /// Keep every trace
    On,
    /// Keep traces of failed scenarios only
    #[default]
    RetainOnFailure,
}

impl From<TraceArg> for TraceMode {
    fn from(arg: TraceArg) -> Self {
        match arg {
            TraceArg::Off => Self::Off,
            TraceArg::On => Self::On,
            TraceArg::RetainOnFailure => Self::RetainOnFailure,
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Scenario(s) to run
    #[arg(short, long, default_value = "all")]
    pub scenario: ScenarioArg,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Trace retention
    #[arg(long, default_value = "retain-on-failure")]
    pub trace: TraceArg,

    /// Site profile YAML (defaults to the built-in profile)
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Output directory for traces and screenshots
    #[arg(short, long, default_value = "catalog-probe-output")]
    pub output: PathBuf,

    /// Run scenarios concurrently, each in its own browser
    #[arg(long)]
    pub parallel: bool,

    /// Path to the chromium binary
    #[arg(long, env = "CATALOG_PROBE_CHROMIUM")]
    pub chromium: Option<String>,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Run against the in-memory storefront instead of a browser
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Scenario(s) to plan
    #[arg(short, long, default_value = "all")]
    pub scenario: ScenarioArg,

    /// Site profile YAML (defaults to the built-in profile)
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
}

/// Arguments for the profile command
#[derive(Parser, Debug)]
pub struct ProfileArgs {
    /// Load and validate this profile instead of printing the built-in one
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Auto-detect
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

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["catalog-probe", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenario, ScenarioArg::All);
        assert_eq!(args.trace, TraceArg::RetainOnFailure);
        assert!(!args.headed);
        assert!(!args.mock);
        assert_eq!(args.output, PathBuf::from("catalog-probe-output"));
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "catalog-probe",
            "-vv",
            "--log-format",
            "json",
            "run",
            "--scenario",
            "history",
            "--trace",
            "on",
            "--headed",
            "--parallel",
            "--no-sandbox",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenario.kinds(), vec![ScenarioKind::History]);
        assert_eq!(TraceMode::from(args.trace), TraceMode::On);
        assert!(args.headed && args.parallel && args.no_sandbox);
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        assert!(Cli::try_parse_from(["catalog-probe", "plan", "--scenario", "checkout"]).is_err());
    }

    #[test]
    fn test_all_selects_every_kind() {
        assert_eq!(ScenarioArg::All.kinds(), ScenarioKind::ALL.to_vec());
    }
}
