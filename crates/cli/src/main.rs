//! Conduit harness CLI
//!
//! Runs YAML scenarios against a live Conduit deployment and renders or
//! evaluates load profiles.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use conduit_harness::{
    FixtureProvider, HarnessConfig, LoadProfile, Metrics, PlaywrightDriver, RunContext, Scenario,
    ScenarioRunner,
};

#[derive(Parser)]
#[command(name = "conduit-harness")]
#[command(author, version, about = "E2E and load-test harness for Conduit deployments")]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = "CONDUIT_API_URL")]
    api_url: Option<String>,

    /// UI base URL
    #[arg(long, env = "CONDUIT_UI_URL")]
    ui_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run browser scenarios from a directory of YAML files
    Run {
        /// Directory containing scenario YAML files
        #[arg(short, long, default_value = "scenarios")]
        specs: PathBuf,

        /// Run only scenarios carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Run only the scenario with this name
        #[arg(short, long)]
        name: Option<String>,

        /// Extra fixture directory merged over the builtins
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Where to write the JSON suite report
        #[arg(short, long, default_value = "test-results/suite-report.json")]
        output: PathBuf,

        /// Seconds to wait for the backend before starting
        #[arg(long, default_value = "30")]
        ready_timeout: u64,
    },

    /// Emit a load profile as a k6 script or evaluate engine metrics
    Load {
        /// Built-in profile name (smoke, stress, spike, soak)
        profile: String,

        /// Print the full k6 script instead of just the options object
        #[arg(long)]
        script: bool,

        /// JSON metrics file from a finished run to evaluate against the
        /// profile's thresholds
        #[arg(long)]
        metrics: Option<PathBuf>,
    },

    /// List scenarios and built-in load profiles
    List {
        /// Directory containing scenario YAML files
        #[arg(short, long, default_value = "scenarios")]
        specs: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let mut config = HarnessConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(url) = cli.ui_url {
        config.ui_base_url = url;
    }

    match cli.command {
        Commands::Run { specs, tag, name, fixtures, output, ready_timeout } => {
            let exit =
                run_scenarios(config, specs, tag, name, fixtures, output, ready_timeout).await?;
            std::process::exit(exit);
        }
        Commands::Load { profile, script, metrics } => {
            let exit = load_profile(&config, &profile, script, metrics)?;
            std::process::exit(exit);
        }
        Commands::List { specs } => {
            list(&specs)?;
        }
    }

    Ok(())
}

async fn run_scenarios(
    config: HarnessConfig,
    specs: PathBuf,
    tag: Option<String>,
    name: Option<String>,
    fixtures: Option<PathBuf>,
    output: PathBuf,
    ready_timeout: u64,
) -> anyhow::Result<i32> {
    let mut scenarios = Scenario::load_all(&specs)?;
    if let Some(tag) = &tag {
        scenarios.retain(|s| s.tags.iter().any(|t| t == tag));
    }
    if let Some(name) = &name {
        scenarios.retain(|s| &s.name == name);
    }
    if scenarios.is_empty() {
        error!("No scenarios matched under {}", specs.display());
        return Ok(2);
    }

    let mut context = RunContext::new(config.clone())?;
    if let Some(dir) = fixtures {
        let loaded = context.fixtures.load_dir(&dir)?;
        info!("Merged {} fixture(s) from {}", loaded, dir.display());
    }

    context
        .api
        .wait_until_ready(Duration::from_secs(ready_timeout))
        .await?;

    // Make sure the baseline actor exists before any scenario needs it.
    context.session_for("existingUser").await?;

    let driver = PlaywrightDriver::new(&config)?;
    let mut runner = ScenarioRunner::new(driver, &config);
    let suite = runner.run_all(&scenarios).await;
    suite.write_json(&output)?;

    Ok(if suite.all_passed() { 0 } else { 1 })
}

fn load_profile(
    config: &HarnessConfig,
    name: &str,
    script: bool,
    metrics: Option<PathBuf>,
) -> anyhow::Result<i32> {
    let profile = LoadProfile::named(name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown profile {name:?}; built-ins: {}",
            LoadProfile::builtin_names().join(", ")
        )
    })?;
    profile.validate()?;

    if let Some(path) = metrics {
        let metrics: Metrics = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let report = profile.evaluate(&metrics);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.passed { 0 } else { 1 });
    }

    if script {
        let perf_user = FixtureProvider::builtin().user("perfUser")?;
        println!(
            "{}",
            profile.to_k6_script(&config.api_base_url, &perf_user.email, &perf_user.password)
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&profile.to_k6_options())?);
    }

    Ok(0)
}

fn list(specs: &Path) -> anyhow::Result<()> {
    match Scenario::load_all(specs) {
        Ok(scenarios) if !scenarios.is_empty() => {
            println!("Scenarios ({}):", specs.display());
            for scenario in &scenarios {
                let tags = if scenario.tags.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", scenario.tags.join(", "))
                };
                println!("  {}{}", scenario.name, tags);
            }
        }
        _ => println!("No scenarios under {}", specs.display()),
    }

    println!("Load profiles:");
    for name in LoadProfile::builtin_names() {
        if let Some(profile) = LoadProfile::named(name) {
            println!(
                "  {:<7} peak {} VUs over {}s",
                name,
                profile.peak_vus(),
                profile.total_duration().as_secs()
            );
        }
    }

    Ok(())
}
