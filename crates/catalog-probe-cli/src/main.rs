//! catalog-probe: run storefront acceptance scenarios
//!
//! ## Usage
//!
//! ```bash
//! catalog-probe run                          # every scenario, headless
//! catalog-probe run --scenario history --headed
//! catalog-probe run --mock --trace on        # in-memory storefront
//! catalog-probe plan --scenario drill-down   # print the step plan
//! catalog-probe profile > site.yaml          # dump the built-in profile
//! ```

use catalog_probe_cli::{
    handlers, logging, Cli, CliConfig, CliError, CliResult, Commands, Reporter, Verbosity,
};
use clap::Parser;
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
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format);
    logging::init(&config)?;

    let use_color = config.color.should_color();
    console::set_colors_enabled(use_color);
    let reporter = Reporter::new(use_color, config.verbosity.is_quiet());

    match cli.command {
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let report = runtime.block_on(handlers::run(&args))?;
            reporter.report(&report);
            if report.all_passed() {
                Ok(())
            } else {
                Err(CliError::ScenariosFailed {
                    failed: report.failed_count(),
                    total: report.total(),
                })
            }
        }
        Commands::Plan(args) => {
            reporter.line(&handlers::plan(&args)?);
            Ok(())
        }
        Commands::Profile(args) => {
            reporter.line(handlers::profile(&args)?.trim_end());
            Ok(())
        }
    }
}
