//! Subcommand implementations

use catalog_probe::mock::MockStorefrontFactory;
use catalog_probe::{Harness, RunConfig, SiteProfile, SuiteReport};
use std::path::Path;

use crate::commands::{PlanArgs, ProfileArgs, RunArgs};
use crate::error::{CliError, CliResult};

/// Load `path`, or the built-in profile when absent
pub fn load_profile(path: Option<&Path>) -> CliResult<SiteProfile> {
    let profile = match path {
        Some(path) => SiteProfile::from_path(path)?,
        None => SiteProfile::mercari_jp(),
    };
    profile.validate()?;
    Ok(profile)
}

/// Run configuration for `args`
#[must_use]
pub fn run_config(args: &RunArgs) -> RunConfig {
    let mut config = RunConfig::default()
        .with_headless(!args.headed)
        .with_trace(args.trace.into())
        .with_output_dir(&args.output)
        .with_parallel(args.parallel);
    config.chromium_path.clone_from(&args.chromium);
    config.sandbox = !args.no_sandbox;
    config
}

/// Execute the `run` command
pub async fn run(args: &RunArgs) -> CliResult<SuiteReport> {
    let profile = load_profile(args.profile.as_deref())?;
    let config = run_config(args);
    let kinds = args.scenario.kinds();
    tracing::info!(
        scenarios = kinds.len(),
        base_url = %profile.base_url,
        mock = args.mock,
        "starting run"
    );

    if args.mock {
        // The in-memory storefront always models the real site; the loaded
        // profile only supplies expectations.
        let site = SiteProfile {
            base_url: profile.base_url.clone(),
            ..SiteProfile::mercari_jp()
        };
        let harness = Harness::new(MockStorefrontFactory::new(site), profile, config);
        return Ok(harness.run(&kinds).await?);
    }

    run_browser(profile, config, &kinds).await
}

#[cfg(feature = "browser")]
async fn run_browser(
    profile: SiteProfile,
    config: RunConfig,
    kinds: &[catalog_probe::ScenarioKind],
) -> CliResult<SuiteReport> {
    let factory = catalog_probe::BrowserSessionFactory::new(config.browser_config());
    let harness = Harness::new(factory, profile, config);
    Ok(harness.run(kinds).await?)
}

#[cfg(not(feature = "browser"))]
async fn run_browser(
    _profile: SiteProfile,
    _config: RunConfig,
    _kinds: &[catalog_probe::ScenarioKind],
) -> CliResult<SuiteReport> {
    Err(CliError::unsupported(
        "browser support not compiled in; rebuild with --features browser or pass --mock",
    ))
}

/// Render the `plan` command's output
pub fn plan(args: &PlanArgs) -> CliResult<String> {
    let profile = load_profile(args.profile.as_deref())?;
    let mut out = String::new();
    for kind in args.scenario.kinds() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&kind.plan(&profile)?.to_string());
    }
    Ok(out)
}

/// Render the `profile` command's output
pub fn profile(args: &ProfileArgs) -> CliResult<String> {
    let profile = load_profile(args.profile.as_deref())?;
    profile.to_yaml().map_err(CliError::from)
}
