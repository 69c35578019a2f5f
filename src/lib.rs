//! Interest Perf
//!
//! A synthetic load generator for a service registry and its interest
//! subscriptions.
//!
//! # Features
//!
//! - Registration injection: registers and unregisters instances from a
//!   fixed service pool, converging on a target registry size
//! - Interest injection: opens and closes interest channels, converging on a
//!   target number of open subscriptions
//! - Rate control: each injector ticks at a period derived from its rate
//! - Score board: counters rendered periodically as a table or JSON lines
//!
//! # CLI Usage
//!
//! ```bash
//! # Ten registrations per second up to 1000 instances, for ten minutes
//! interest-perf --reg-rate 10/s --reg-target 1000 \
//!     --interest-rate 10/s --interest-target 1000 --test-duration 600
//!
//! # Machine-readable score board appended to a file
//! interest-perf --scoreboard-format json --scoreboard-output perf.jsonl
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod injector;
pub mod orchestrator;
pub mod queue;
pub mod renderer;
pub mod scoreboard;

#[cfg(test)]
mod testing;

pub use cli::PerfArgs;
pub use config::{PerfConfig, Rate, RateUnit, TickSchedule};
pub use error::{PerfError, Result};
pub use orchestrator::{PerfRun, RunSummary};
pub use scoreboard::{Scoreboard, ScoreboardFormat, ScoreboardSnapshot};
