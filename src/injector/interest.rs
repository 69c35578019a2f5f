//! Interest injector: keeps the number of open interest channels around its
//! target level.

use crate::config::TickSchedule;
use crate::injector::ticker;
use crate::queue::FifoQueue;
use crate::scoreboard::Scoreboard;
use registry_core::{Interest, InterestChannel, Registry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Channels opened and closed during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterestTick {
    pub opened: usize,
    pub closed: usize,
}

pub struct InterestInjector {
    registry: Arc<dyn Registry>,
    scoreboard: Arc<Scoreboard>,
    queries: Box<dyn Iterator<Item = Interest> + Send>,
    active_interests: FifoQueue<InterestChannel>,
    schedule: TickSchedule,
    target_interest_level: usize,
}

impl InterestInjector {
    pub fn new(
        registry: Arc<dyn Registry>,
        scoreboard: Arc<Scoreboard>,
        queries: Box<dyn Iterator<Item = Interest> + Send>,
        schedule: TickSchedule,
        target_interest_level: usize,
    ) -> Self {
        Self {
            registry,
            scoreboard,
            queries,
            active_interests: FifoQueue::new(),
            schedule,
            target_interest_level,
        }
    }

    /// Shared handle to the open channels, oldest first.
    pub fn active_interests(&self) -> FifoQueue<InterestChannel> {
        self.active_interests.clone()
    }

    pub fn schedule(&self) -> TickSchedule {
        self.schedule
    }

    /// Open one batch of channels, then close up to one batch while above
    /// target.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn tick(&mut self) -> InterestTick {
        let mut opened = 0;
        while opened < self.schedule.batch_size {
            let Some(interest) = self.queries.next() else {
                warn!("Interest query sequence exhausted after {opened} subscriptions");
                break;
            };
            let channel = InterestChannel::open(self.registry.as_ref(), interest);
            debug!("Opened interest channel {} for {}", channel.id(), channel.interest());

            self.active_interests.push(channel);
            self.scoreboard.processed_interests_increment();
            self.scoreboard.active_interests_increment();
            opened += 1;
        }

        let mut closed = 0;
        while closed < self.schedule.batch_size
            && self.active_interests.len() > self.target_interest_level
        {
            let Some(channel) = self.active_interests.pop() else {
                break;
            };
            if channel.close() {
                self.scoreboard.active_interests_decrement();
            }
            debug!("Closed interest channel {}", channel.id());
            closed += 1;
        }

        InterestTick { opened, closed }
    }

    /// Tick on the schedule until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Starting interest subscriptions every {:?} with batches of {} ({:.1}/s, target level {})",
            self.schedule.interval,
            self.schedule.batch_size,
            self.schedule.effective_rate_per_second(),
            self.target_interest_level
        );

        let mut ticker = ticker(&self.schedule);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let tick = self.tick();
                    trace!("Interest tick: {} opened, {} closed", tick.opened, tick.closed);
                }
            }
        }

        info!(
            "Interest subscription injection terminated with {} open channels",
            self.active_interests.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{InMemoryRegistry, InstanceInfo, Source};
    use std::time::Duration;

    fn injector(
        queries: Box<dyn Iterator<Item = Interest> + Send>,
        batch_size: usize,
        target: usize,
    ) -> (InterestInjector, Arc<Scoreboard>, Arc<InMemoryRegistry>) {
        let registry = Arc::new(InMemoryRegistry::new());
        let scoreboard = Arc::new(Scoreboard::new());
        let injector = InterestInjector::new(
            registry.clone(),
            Arc::clone(&scoreboard),
            queries,
            TickSchedule {
                interval: Duration::from_millis(1),
                batch_size,
            },
            target,
        );
        (injector, scoreboard, registry)
    }

    fn endless() -> Box<dyn Iterator<Item = Interest> + Send> {
        Box::new(std::iter::repeat(Interest::FullRegistry))
    }

    #[tokio::test]
    async fn test_zero_target_closes_what_it_opens() {
        let (mut injector, scoreboard, _) = injector(endless(), 5, 0);

        let tick = injector.tick();

        assert_eq!(tick, InterestTick { opened: 5, closed: 5 });
        assert_eq!(scoreboard.processed_interests(), 5);
        assert_eq!(scoreboard.active_interests(), 0);
        assert!(injector.active_interests().is_empty());
    }

    #[tokio::test]
    async fn test_grows_until_target() {
        let (mut injector, scoreboard, _) = injector(endless(), 5, 12);

        assert_eq!(injector.tick(), InterestTick { opened: 5, closed: 0 });
        assert_eq!(injector.tick(), InterestTick { opened: 5, closed: 0 });
        assert_eq!(injector.tick(), InterestTick { opened: 5, closed: 3 });
        assert_eq!(scoreboard.active_interests(), 12);
    }

    #[tokio::test]
    async fn test_steady_state_stays_within_band() {
        let target = 20;
        let batch = 4;
        let (mut injector, scoreboard, _) = injector(endless(), batch, target);
        let active = injector.active_interests();

        for _ in 0..50 {
            injector.tick();
        }
        for _ in 0..20 {
            let tick = injector.tick();
            assert_eq!(tick.opened, batch);
            assert!(active.len() >= target);
            assert!(active.len() < target + batch);
            assert_eq!(scoreboard.active_interests() as usize, active.len());
        }
        assert_eq!(scoreboard.processed_interests(), 70 * batch as u64);
    }

    #[tokio::test]
    async fn test_closes_oldest_first() {
        let (mut injector, _, _) = injector(endless(), 3, 3);
        let active = injector.active_interests();

        injector.tick();
        let first_ids: Vec<u64> = {
            let mut ids = Vec::new();
            for _ in 0..3 {
                let channel = active.pop().unwrap();
                ids.push(channel.id());
                active.push(channel);
            }
            ids
        };

        injector.tick();
        let remaining: Vec<u64> = std::iter::from_fn(|| active.pop().map(|c| c.id())).collect();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().all(|id| !first_ids.contains(id)));
    }

    #[tokio::test]
    async fn test_exhausted_queries_truncate_open_phase() {
        let queries = Box::new(vec![Interest::FullRegistry, Interest::FullRegistry].into_iter());
        let (mut injector, scoreboard, _) = injector(queries, 5, 10);

        assert_eq!(injector.tick(), InterestTick { opened: 2, closed: 0 });
        assert_eq!(injector.tick(), InterestTick::default());
        assert_eq!(scoreboard.processed_interests(), 2);
    }

    #[tokio::test]
    async fn test_open_channels_receive_registry_changes() {
        let (mut injector, _, registry) = injector(endless(), 2, 10);
        injector.tick();

        registry
            .register(InstanceInfo::new("a", "app", "app.vip"), &Source::perf())
            .await
            .unwrap();

        let active = injector.active_interests();
        let first = active.pop().unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while first.delivered() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("open channel should see the registration");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let (injector, scoreboard, _) = injector(endless(), 1, 1000);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(injector.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.unwrap();

        let processed = scoreboard.processed_interests();
        assert!(processed >= 10, "processed {processed}");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(scoreboard.processed_interests(), processed);
    }
}
