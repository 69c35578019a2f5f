//! Rate-controlled injectors driving the registry and interest channels.
//!
//! Both injectors share the same shape: a Tokio interval fires at the
//! schedule's period, and each tick runs an unconditional "grow" phase followed
//! by a "shrink" phase that is gated on the current level exceeding its target.

pub mod interest;
pub mod registration;

pub use interest::{InterestInjector, InterestTick};
pub use registration::{RegistrationInjector, RegistrationTick};

use crate::config::TickSchedule;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Interval for a schedule. Missed ticks fire back to back.
pub(crate) fn ticker(schedule: &TickSchedule) -> Interval {
    let mut ticker = interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    ticker
}
