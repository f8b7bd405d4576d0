//! Cart E2E runner entry point
//!
//! Runs the YAML cart scenarios against a storefront.
//! Run with: cargo run -p cart-e2e -- --specs crates/e2e/scenarios

use clap::Parser;
use std::path::PathBuf;

use cart_e2e::config::HarnessConfig;
use cart_e2e::driver::SessionFactory;
use cart_e2e::playwright::PlaywrightSessionFactory;
use cart_e2e::runner::{TestRunner, TestSuiteResult};
use cart_e2e::simulator::SimulatedSessionFactory;
use cart_e2e::target::TargetSite;

mod output;

#[derive(Parser, Debug)]
#[command(name = "cart-e2e")]
#[command(author, version, about = "Shopping-cart E2E scenarios", long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "cart-e2e.toml")]
    config: PathBuf,

    /// Path to scenario specs directory
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Storefront base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Per-action timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Shell command serving a staged build on $PORT
    #[arg(long)]
    serve_cmd: Option<String>,

    /// Run against the in-process simulated storefront instead of a browser
    #[arg(long)]
    simulate: bool,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value = "table")]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match run(args).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn build_config(args: &Args) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::load(&args.config)?;
    config.apply_env()?;

    if let Some(specs) = &args.specs {
        config.specs_dir = specs.clone();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(url) = &args.base_url {
        config.playwright.base_url = url.clone();
    }
    if let Some(browser) = &args.browser {
        config.playwright.browser = browser.parse()?;
    }
    if args.headed {
        config.playwright.headless = false;
    }
    if let Some(timeout) = args.timeout_ms {
        config.playwright.timeout_ms = timeout;
    }
    if let Some(cmd) = &args.serve_cmd {
        config.target.serve_command = Some(cmd.clone());
    }
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = build_config(&args)?;

    let suite = if args.simulate {
        let factory =
            SimulatedSessionFactory::new(config.playwright.base_url.clone(), config.selectors.clone());
        let runner = TestRunner::new(factory, &config).without_screenshots();
        execute(&runner, &args).await?
    } else {
        // Held until the suite finishes so a staged build stays up
        let site = TargetSite::prepare(&config.target, &config.playwright.base_url).await?;
        config.playwright.base_url = site.base_url().to_string();

        let factory = PlaywrightSessionFactory::new(config.playwright.clone())?;
        let runner = TestRunner::new(factory, &config);
        execute(&runner, &args).await?
    };

    output::print_suite(&suite, args.format)?;
    Ok(suite.all_passed())
}

async fn execute<F: SessionFactory>(runner: &TestRunner<F>, args: &Args) -> anyhow::Result<TestSuiteResult> {
    let suite = if let Some(name) = &args.name {
        let result = runner.run_test(name).await?;
        let duration_ms = result.duration_ms;
        TestSuiteResult::from_results(vec![result], duration_ms)
    } else if let Some(tag) = &args.tag {
        runner.run_tagged(tag).await?
    } else {
        runner.run_all().await?
    };

    runner.write_results(&suite)?;
    Ok(suite)
}
