//! Run configuration, rates and the rate-to-tick policy.

use crate::scoreboard::ScoreboardFormat;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Shortest tick interval the injectors schedule.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Largest service pool a run will generate up front.
pub const MAX_POOL_SIZE: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid rate '{0}': expected N, N/s, N/m or N/h")]
    InvalidRate(String),

    #[error("{0} must be greater than zero")]
    ZeroRate(&'static str),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Service pool of {pool} instances cannot reach the registry target of {target}")]
    PoolTooSmall { pool: usize, target: usize },

    #[error("Service pool of {pool} instances exceeds the limit of {max}")]
    PoolTooLarge { pool: usize, max: usize },

    #[error("At least one application is required")]
    NoApplications,
}

/// Time unit a rate is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Second,
    Minute,
    Hour,
}

impl RateUnit {
    pub fn as_millis(&self) -> u64 {
        match self {
            RateUnit::Second => 1_000,
            RateUnit::Minute => 60_000,
            RateUnit::Hour => 3_600_000,
        }
    }
}

/// Operations per unit of time, e.g. `100/s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub count: u64,
    pub unit: RateUnit,
}

impl Rate {
    pub const fn per_second(count: u64) -> Self {
        Self {
            count,
            unit: RateUnit::Second,
        }
    }

    pub const fn per_minute(count: u64) -> Self {
        Self {
            count,
            unit: RateUnit::Minute,
        }
    }
}

impl FromStr for Rate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (num_str, unit) = match s.split_once('/') {
            Some((num, unit)) => {
                let unit = match unit.trim() {
                    "s" | "sec" => RateUnit::Second,
                    "m" | "min" => RateUnit::Minute,
                    "h" | "hour" => RateUnit::Hour,
                    _ => return Err(ConfigError::InvalidRate(s.to_string())),
                };
                (num.trim(), unit)
            }
            None => (s, RateUnit::Second),
        };

        let count = num_str
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidRate(s.to_string()))?;
        Ok(Self { count, unit })
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            RateUnit::Second => "s",
            RateUnit::Minute => "m",
            RateUnit::Hour => "h",
        };
        write!(f, "{}/{}", self.count, unit)
    }
}

/// How often an injector ticks and how many operations a phase may perform
/// per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    pub interval: Duration,
    pub batch_size: usize,
}

impl TickSchedule {
    /// Convert a rate to a tick schedule.
    ///
    /// The interval is `unit / rate` in whole milliseconds, one operation per
    /// tick. When that rounds down to zero the interval is clamped to
    /// [`MIN_TICK_INTERVAL`] and the batch grows to `rate / unit_millis` so
    /// throughput still approximates the rate.
    pub fn for_rate(rate: Rate) -> Result<Self, ConfigError> {
        if rate.count == 0 {
            return Err(ConfigError::ZeroRate("rate"));
        }

        let unit_millis = rate.unit.as_millis();
        let interval_millis = unit_millis / rate.count;
        if interval_millis == 0 {
            return Ok(Self {
                interval: MIN_TICK_INTERVAL,
                batch_size: (rate.count / unit_millis).max(1) as usize,
            });
        }

        Ok(Self {
            interval: Duration::from_millis(interval_millis),
            batch_size: 1,
        })
    }

    /// Operations per second this schedule delivers when every tick fills
    /// its batch.
    pub fn effective_rate_per_second(&self) -> f64 {
        self.batch_size as f64 * 1000.0 / self.interval.as_millis() as f64
    }
}

/// Parse a duration such as `90`, `90s`, `10m` or `1h`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let (num_str, suffix) = if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else {
        (s, "s")
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;

    let secs = match suffix {
        "h" => num.checked_mul(3600),
        "m" => num.checked_mul(60),
        _ => Some(num),
    }
    .ok_or_else(|| ConfigError::InvalidDuration(s.to_string()))?;

    Ok(Duration::from_secs(secs))
}

/// Complete configuration of one load generator run.
#[derive(Debug, Clone)]
pub struct PerfConfig {
    pub registration_rate: Rate,
    pub target_registry_level: usize,
    pub interest_rate: Rate,
    pub target_interest_level: usize,
    pub test_duration: Duration,
    /// Number of instances in the service pool
    pub pool_size: usize,
    /// Number of applications instances are spread over
    pub app_count: usize,
    /// Seed for the topology generator
    pub seed: u64,
    pub scoreboard_interval: Duration,
    pub scoreboard_format: ScoreboardFormat,
    /// Append score board output to this file instead of stdout
    pub scoreboard_output: Option<PathBuf>,
}

impl Default for PerfConfig {
    fn default() -> Self {
        let target_registry_level = 10_000;
        Self {
            registration_rate: Rate::per_second(10),
            target_registry_level,
            interest_rate: Rate::per_second(1),
            target_interest_level: 2_000,
            test_duration: Duration::from_secs(300),
            pool_size: default_pool_size(target_registry_level),
            app_count: 100,
            seed: 42,
            scoreboard_interval: Duration::from_secs(5),
            scoreboard_format: ScoreboardFormat::Table,
            scoreboard_output: None,
        }
    }
}

/// Pool size giving the registry room to overshoot its target.
///
/// Saturates at `usize::MAX`; `PerfConfig::validate` rejects pools that large.
pub fn default_pool_size(target_registry_level: usize) -> usize {
    target_registry_level.saturating_add((target_registry_level / 5).max(1))
}

impl PerfConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registration_rate.count == 0 {
            return Err(ConfigError::ZeroRate("Registration rate"));
        }
        if self.interest_rate.count == 0 {
            return Err(ConfigError::ZeroRate("Interest subscription rate"));
        }
        if self.test_duration.is_zero() {
            return Err(ConfigError::ZeroDuration("Test duration"));
        }
        if self.scoreboard_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("Score board interval"));
        }
        if self.app_count == 0 {
            return Err(ConfigError::NoApplications);
        }
        if self.pool_size < self.target_registry_level {
            return Err(ConfigError::PoolTooSmall {
                pool: self.pool_size,
                target: self.target_registry_level,
            });
        }
        if self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::PoolTooLarge {
                pool: self.pool_size,
                max: MAX_POOL_SIZE,
            });
        }
        Ok(())
    }

    pub fn registration_schedule(&self) -> Result<TickSchedule, ConfigError> {
        TickSchedule::for_rate(self.registration_rate)
            .map_err(|_| ConfigError::ZeroRate("Registration rate"))
    }

    pub fn interest_schedule(&self) -> Result<TickSchedule, ConfigError> {
        TickSchedule::for_rate(self.interest_rate)
            .map_err(|_| ConfigError::ZeroRate("Interest subscription rate"))
    }
}

impl fmt::Display for PerfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "registration_rate={}, target_registry_level={}, interest_rate={}, \
             target_interest_level={}, test_duration={}s, pool_size={}, apps={}, seed={}",
            self.registration_rate,
            self.target_registry_level,
            self.interest_rate,
            self.target_interest_level,
            self.test_duration.as_secs(),
            self.pool_size,
            self.app_count,
            self.seed
        )
    }
}
