//! Wires the registry, topology, injectors and renderer into one timed run.

use crate::config::PerfConfig;
use crate::error::Result;
use crate::injector::{InterestInjector, RegistrationInjector};
use crate::queue::FifoQueue;
use crate::renderer::ScoreboardRenderer;
use crate::scoreboard::{format_table, Scoreboard, ScoreboardSnapshot};
use registry_core::{InMemoryRegistry, InstanceInfo, InterestChannel, Registry};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use topology_generator::{ServiceTopologyGenerator, TopologyProvider};
use tracing::{error, info, warn};

/// Prefix of every generated instance id.
pub const TOPOLOGY_NAME: &str = "perfTest";

/// State of a run after it was stopped.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub snapshot: ScoreboardSnapshot,
    pub registry_size: usize,
    pub service_pool: usize,
    pub active_registrations: usize,
    pub active_interests: usize,
}

impl RunSummary {
    /// Instances owned by the generator; equals the initial pool size.
    pub fn conserved_total(&self) -> usize {
        self.service_pool + self.active_registrations
    }
}

pub struct PerfRun {
    config: PerfConfig,
    registry: Arc<InMemoryRegistry>,
    topology: Arc<ServiceTopologyGenerator>,
    scoreboard: Arc<Scoreboard>,
    cancel: CancellationToken,
    registry_updates: Option<JoinHandle<()>>,
    interest_subscriptions: Option<JoinHandle<()>>,
    score_board_watcher: Option<JoinHandle<()>>,
    service_pool: Option<FifoQueue<InstanceInfo>>,
    active_registrations: Option<FifoQueue<InstanceInfo>>,
    active_interests: Option<FifoQueue<InterestChannel>>,
}

impl PerfRun {
    pub fn new(config: PerfConfig) -> Result<Self> {
        config.validate()?;

        let topology = ServiceTopologyGenerator::new(
            TOPOLOGY_NAME,
            config.app_count,
            config.pool_size,
            config.seed,
        )?;
        info!(
            "Generated topology {} with {} instances over {} applications",
            topology.name(),
            config.pool_size,
            topology.application_count()
        );

        Ok(Self {
            config,
            registry: Arc::new(InMemoryRegistry::new()),
            topology: Arc::new(topology),
            scoreboard: Arc::new(Scoreboard::new()),
            cancel: CancellationToken::new(),
            registry_updates: None,
            interest_subscriptions: None,
            score_board_watcher: None,
            service_pool: None,
            active_registrations: None,
            active_interests: None,
        })
    }

    pub fn config(&self) -> &PerfConfig {
        &self.config
    }

    pub fn scoreboard(&self) -> Arc<Scoreboard> {
        Arc::clone(&self.scoreboard)
    }

    pub fn registry(&self) -> Arc<InMemoryRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn start_registry_updates(&mut self) -> Result<()> {
        if self.registry_updates.is_some() {
            warn!("Registry updates already started");
            return Ok(());
        }

        let injector = RegistrationInjector::new(
            self.registry.clone(),
            self.topology.clone(),
            Arc::clone(&self.scoreboard),
            self.config.registration_schedule()?,
            self.config.target_registry_level,
        );
        self.service_pool = Some(injector.service_pool());
        self.active_registrations = Some(injector.active_registrations());
        self.registry_updates = Some(tokio::spawn(injector.run(self.cancel.child_token())));
        Ok(())
    }

    pub fn start_interest_subscriptions(&mut self) -> Result<()> {
        if self.interest_subscriptions.is_some() {
            warn!("Interest subscriptions already started");
            return Ok(());
        }

        let injector = InterestInjector::new(
            self.registry.clone(),
            Arc::clone(&self.scoreboard),
            self.topology.interest_queries(),
            self.config.interest_schedule()?,
            self.config.target_interest_level,
        );
        self.active_interests = Some(injector.active_interests());
        self.interest_subscriptions = Some(tokio::spawn(injector.run(self.cancel.child_token())));
        Ok(())
    }

    pub fn start_score_board_watcher(&mut self) -> Result<()> {
        if self.score_board_watcher.is_some() {
            warn!("Score board watcher already started");
            return Ok(());
        }

        let scoreboard = Arc::clone(&self.scoreboard);
        let period = self.config.scoreboard_interval;
        let format = self.config.scoreboard_format;
        let renderer = match &self.config.scoreboard_output {
            Some(path) => ScoreboardRenderer::to_file(scoreboard, period, format, path)?,
            None => ScoreboardRenderer::stdout(scoreboard, period, format),
        };
        self.score_board_watcher = Some(tokio::spawn(renderer.run(self.cancel.child_token())));
        Ok(())
    }

    /// Run for the configured test duration, or until Ctrl+C.
    pub async fn run(self) -> Result<RunSummary> {
        self.run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received interrupt signal (Ctrl+C)"),
                Err(e) => {
                    warn!("Failed to install Ctrl+C handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
    }

    /// Run for the configured test duration, or until `interrupt` completes.
    pub async fn run_until<F>(mut self, interrupt: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.start_all() {
            self.stop_all().await;
            return Err(e);
        }

        info!(
            "Test execution time is {}[sec]...",
            self.config.test_duration.as_secs()
        );
        tokio::select! {
            _ = tokio::time::sleep(self.config.test_duration) => {}
            _ = interrupt => info!("Test interrupted, shutting down early"),
        }

        info!("Finishing the test. All actors will be terminated...");
        Ok(self.stop_all().await)
    }

    fn start_all(&mut self) -> Result<()> {
        self.start_registry_updates()?;
        self.start_interest_subscriptions()?;
        self.start_score_board_watcher()?;
        Ok(())
    }

    /// Stop every periodic activity and wait for it to wind down.
    ///
    /// Calling this more than once, or before anything was started, is safe.
    pub async fn stop_all(&mut self) -> RunSummary {
        self.cancel.cancel();

        let activities = [
            ("registry updates", self.registry_updates.take()),
            ("interest subscriptions", self.interest_subscriptions.take()),
            ("score board watcher", self.score_board_watcher.take()),
        ];
        for (name, handle) in activities {
            if let Some(handle) = handle {
                if let Err(e) = handle.await {
                    error!("Stopping {name} failed: {e}");
                }
            }
        }
        self.registry.shutdown();

        let summary = self.summary();
        info!(
            "Final score board:\n{}\nService pool {} + active registrations {} = {} instances",
            format_table(&summary.snapshot),
            summary.service_pool,
            summary.active_registrations,
            summary.conserved_total()
        );
        summary
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            snapshot: self.scoreboard.snapshot(),
            registry_size: self.registry.size(),
            service_pool: self.service_pool.as_ref().map_or(0, FifoQueue::len),
            active_registrations: self.active_registrations.as_ref().map_or(0, FifoQueue::len),
            active_interests: self.active_interests.as_ref().map_or(0, FifoQueue::len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, Rate};
    use crate::error::PerfError;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn small_config(output: &Path) -> PerfConfig {
        PerfConfig {
            registration_rate: Rate::per_second(100),
            target_registry_level: 20,
            interest_rate: Rate::per_second(50),
            target_interest_level: 5,
            test_duration: Duration::from_secs(1),
            pool_size: 30,
            app_count: 3,
            scoreboard_interval: Duration::from_secs(60),
            scoreboard_output: Some(output.to_path_buf()),
            ..PerfConfig::default()
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let output = NamedTempFile::new().expect("Failed to create temp file");
        let config = PerfConfig {
            registration_rate: Rate::per_second(0),
            ..small_config(output.path())
        };
        assert!(matches!(
            PerfRun::new(config),
            Err(PerfError::Config(ConfigError::ZeroRate(_)))
        ));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_harmless() {
        let output = NamedTempFile::new().expect("Failed to create temp file");
        let mut run = PerfRun::new(small_config(output.path())).unwrap();

        let first = run.stop_all().await;
        let second = run.stop_all().await;

        assert_eq!(first.registry_size, 0);
        assert_eq!(second.conserved_total(), 0);
        assert_eq!(second.snapshot.processed_registrations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_after_start() {
        let output = NamedTempFile::new().expect("Failed to create temp file");
        let mut run = PerfRun::new(small_config(output.path())).unwrap();
        run.start_registry_updates().unwrap();
        run.start_interest_subscriptions().unwrap();
        run.start_registry_updates().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let first = run.stop_all().await;
        let processed = first.snapshot.processed_registrations;
        assert!(processed > 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = run.stop_all().await;

        assert_eq!(second.snapshot.processed_registrations, processed);
        assert_eq!(second.conserved_total(), 30);
        assert!(run.registry().is_shut_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_ends_run_early() {
        let output = NamedTempFile::new().expect("Failed to create temp file");
        let config = PerfConfig {
            test_duration: Duration::from_secs(3600),
            ..small_config(output.path())
        };
        let run = PerfRun::new(config).unwrap();

        let started = tokio::time::Instant::now();
        let summary = run
            .run_until(tokio::time::sleep(Duration::from_millis(500)))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(summary.snapshot.processed_registrations > 0);
        assert_eq!(summary.conserved_total(), 30);

        let content = std::fs::read_to_string(output.path()).unwrap();
        assert_eq!(content.matches("Score board after").count(), 1);
    }
}
