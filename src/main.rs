//! Command-line entry point for interest-perf.
//!
//! ```bash
//! interest-perf --reg-rate 10/s --reg-target 1000 \
//!     --interest-rate 10/s --interest-target 1000 --test-duration 600
//! ```

use anyhow::Context;
use clap::Parser;
use interest_perf::{PerfArgs, PerfConfig, PerfRun};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let args = PerfArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let config = PerfConfig::try_from(args).context("Failed to parse command line arguments")?;
    tracing::info!("Starting load generator with {config}");

    let perf_run = PerfRun::new(config).context("Failed to set up the test")?;
    let summary = perf_run.run().await.context("Test run failed")?;

    tracing::info!(
        "Registry holds {} instances, {} interest channels open",
        summary.registry_size,
        summary.active_interests
    );
    tracing::info!("Exiting");
    Ok(())
}
