//! Command-line arguments.
//!
//! Every option also reads a `PERF_*` environment variable; an explicit flag
//! wins over the environment, which wins over the default.

use crate::config::{default_pool_size, parse_duration, ConfigError, PerfConfig, Rate};
use crate::scoreboard::ScoreboardFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "interest-perf")]
#[command(about = "Synthetic load generator for registry registrations and interest subscriptions")]
#[command(version)]
#[command(after_help = "EXAMPLE:\n    \
    interest-perf --reg-rate 10/s --reg-target 1000 \\\n        \
    --interest-rate 10/s --interest-target 1000 --test-duration 600")]
pub struct PerfArgs {
    /// Registrations per unit of time (N, N/s, N/m or N/h)
    #[arg(long, env = "PERF_REG_RATE", default_value = "10/s")]
    pub reg_rate: Rate,

    /// Registry size the registration injector converges to
    #[arg(long, env = "PERF_REG_TARGET", default_value = "10000")]
    pub reg_target: usize,

    /// Interest subscriptions per unit of time (N, N/s, N/m or N/h)
    #[arg(long, env = "PERF_INTEREST_RATE", default_value = "1/s")]
    pub interest_rate: Rate,

    /// Number of open interest channels the interest injector converges to
    #[arg(long, env = "PERF_INTEREST_TARGET", default_value = "2000")]
    pub interest_target: usize,

    /// How long the test runs (e.g. "300", "90s", "10m", "1h")
    #[arg(long, env = "PERF_TEST_DURATION", default_value = "300")]
    pub test_duration: String,

    /// Instances in the service pool [default: reg-target plus 20%]
    #[arg(long, env = "PERF_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Applications the service pool is spread over
    #[arg(long, env = "PERF_APPS", default_value = "100")]
    pub apps: usize,

    /// Seed for the service topology
    #[arg(long, env = "PERF_SEED", default_value = "42")]
    pub seed: u64,

    /// Score board render period
    #[arg(long, env = "PERF_SCOREBOARD_INTERVAL", default_value = "5s")]
    pub scoreboard_interval: String,

    #[arg(long, env = "PERF_SCOREBOARD_FORMAT", value_enum, default_value = "table")]
    pub scoreboard_format: ScoreboardFormat,

    /// Append score board output to this file instead of stdout
    #[arg(long, env = "PERF_SCOREBOARD_OUTPUT")]
    pub scoreboard_output: Option<PathBuf>,

    /// Log at debug level when RUST_LOG is not set
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl TryFrom<PerfArgs> for PerfConfig {
    type Error = ConfigError;

    fn try_from(args: PerfArgs) -> Result<Self, Self::Error> {
        let config = PerfConfig {
            registration_rate: args.reg_rate,
            target_registry_level: args.reg_target,
            interest_rate: args.interest_rate,
            target_interest_level: args.interest_target,
            test_duration: parse_duration(&args.test_duration)?,
            pool_size: args
                .pool_size
                .unwrap_or_else(|| default_pool_size(args.reg_target)),
            app_count: args.apps,
            seed: args.seed,
            scoreboard_interval: parse_duration(&args.scoreboard_interval)?,
            scoreboard_format: args.scoreboard_format,
            scoreboard_output: args.scoreboard_output,
        };
        config.validate()?;
        Ok(config)
    }
}
