//! Registration injector: keeps the registry size around its target level.
//!
//! Every tick registers up to one batch of instances taken from the service
//! pool, then retires up to one batch of the oldest active registrations for
//! as long as the registry is above its target. Retired instances are replaced
//! in the pool, so `pool + active` stays constant for the whole run.
//!
//! Registry calls of a tick are not awaited by the tick. They are collected
//! in submission order (all registrations, then all unregistrations) and
//! applied one after another by a background task.

use crate::config::TickSchedule;
use crate::injector::ticker;
use crate::queue::FifoQueue;
use crate::scoreboard::Scoreboard;
use registry_core::{InstanceInfo, Registry, RegistryError, Source};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use topology_generator::TopologyProvider;
use tracing::{debug, error, info, trace, warn};

/// Operations submitted during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationTick {
    pub registered: usize,
    pub unregistered: usize,
}

enum RegistryOp {
    Register(InstanceInfo),
    Unregister(InstanceInfo),
}

impl RegistryOp {
    fn instance_id(&self) -> &str {
        match self {
            RegistryOp::Register(instance) | RegistryOp::Unregister(instance) => &instance.id,
        }
    }

    async fn apply(self, registry: &dyn Registry, source: &Source) -> Result<(), RegistryError> {
        match self {
            RegistryOp::Register(instance) => registry.register(instance, source).await?,
            RegistryOp::Unregister(instance) => registry.unregister(&instance, source).await?,
        };
        Ok(())
    }
}

pub struct RegistrationInjector {
    registry: Arc<dyn Registry>,
    topology: Arc<dyn TopologyProvider>,
    scoreboard: Arc<Scoreboard>,
    service_pool: FifoQueue<InstanceInfo>,
    active_registrations: FifoQueue<InstanceInfo>,
    source: Source,
    schedule: TickSchedule,
    target_registry_level: usize,
    in_flight: JoinSet<()>,
}

impl RegistrationInjector {
    /// Create an injector whose service pool is seeded from `topology`.
    pub fn new(
        registry: Arc<dyn Registry>,
        topology: Arc<dyn TopologyProvider>,
        scoreboard: Arc<Scoreboard>,
        schedule: TickSchedule,
        target_registry_level: usize,
    ) -> Self {
        let service_pool = FifoQueue::from(topology.service_pool());
        Self {
            registry,
            topology,
            scoreboard,
            service_pool,
            active_registrations: FifoQueue::new(),
            source: Source::perf(),
            schedule,
            target_registry_level,
            in_flight: JoinSet::new(),
        }
    }

    /// Shared handle to the instances not currently registered.
    pub fn service_pool(&self) -> FifoQueue<InstanceInfo> {
        self.service_pool.clone()
    }

    /// Shared handle to the instances submitted for registration, oldest first.
    pub fn active_registrations(&self) -> FifoQueue<InstanceInfo> {
        self.active_registrations.clone()
    }

    pub fn schedule(&self) -> TickSchedule {
        self.schedule
    }

    /// Run one registration phase and one unregistration phase.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn tick(&mut self) -> RegistrationTick {
        self.reap_finished();

        let mut ops = Vec::new();
        let registered = self.register_batch(&mut ops);
        let unregistered = self.unregister_batch(&mut ops);

        if !ops.is_empty() {
            self.submit(ops);
        }

        RegistrationTick {
            registered,
            unregistered,
        }
    }

    fn register_batch(&mut self, ops: &mut Vec<RegistryOp>) -> usize {
        let mut registered = 0;
        while registered < self.schedule.batch_size {
            let Some(instance) = self.service_pool.pop() else {
                warn!(
                    "Run out of available instances after {registered} of {} registrations",
                    self.schedule.batch_size
                );
                break;
            };
            debug!("Registered instance {}", instance.id);

            self.scoreboard.processed_registration_increment();
            self.scoreboard.set_registry_size(self.registry.size());

            self.active_registrations.push(instance.clone());
            ops.push(RegistryOp::Register(instance));
            registered += 1;
        }
        registered
    }

    fn unregister_batch(&mut self, ops: &mut Vec<RegistryOp>) -> usize {
        let mut unregistered = 0;
        while unregistered < self.schedule.batch_size
            && self.registry.size() > self.target_registry_level
        {
            let Some(instance) = self.active_registrations.pop() else {
                debug!("No active registrations left to retire");
                break;
            };
            debug!("Unregistered instance {}", instance.id);

            self.scoreboard.processed_unregistration_increment();
            self.scoreboard.set_registry_size(self.registry.size());

            self.service_pool.push(self.topology.replacement_for(&instance));
            ops.push(RegistryOp::Unregister(instance));
            unregistered += 1;
        }
        unregistered
    }

    /// Apply `ops` in order on a background task.
    ///
    /// The first failing call ends the chain; the remaining calls of the
    /// tick are skipped.
    fn submit(&mut self, ops: Vec<RegistryOp>) {
        let registry = Arc::clone(&self.registry);
        let source = self.source.clone();

        self.in_flight.spawn(async move {
            let total = ops.len();
            for (applied, op) in ops.into_iter().enumerate() {
                let id = op.instance_id().to_string();
                if let Err(e) = op.apply(registry.as_ref(), &source).await {
                    warn!(
                        "Data injection batch terminated due to an error on instance {id}: {e} \
                         ({} of {total} calls skipped)",
                        total - applied - 1
                    );
                    return;
                }
            }
            trace!("Applied {total} registry calls");
        });
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            if let Err(e) = result {
                error!("Registry call chain failed: {e}");
            }
        }
    }

    /// Wait for every submitted chain to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                error!("Registry call chain failed: {e}");
            }
        }
    }

    /// Tick on the schedule until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Starting registry updates every {:?} with batches of {} ({:.1}/s, target size {})",
            self.schedule.interval,
            self.schedule.batch_size,
            self.schedule.effective_rate_per_second(),
            self.target_registry_level
        );

        let mut ticker = ticker(&self.schedule);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let tick = self.tick();
                    trace!(
                        "Registration tick: {} registered, {} unregistered",
                        tick.registered, tick.unregistered
                    );
                }
            }
        }

        self.drain().await;
        info!("Data injection terminated");
    }
}
