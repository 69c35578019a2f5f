//! Service topology provider and its seeded generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use registry_core::{InstanceInfo, Interest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Error type for topology construction.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// At least one application is needed to place instances in
    #[error("Topology '{0}' needs at least one application")]
    NoApplications(String),

    /// Name is used as the instance id prefix
    #[error("Topology name must not be empty")]
    EmptyName,
}

/// Source of synthetic entities and interest queries.
pub trait TopologyProvider: Send + Sync {
    /// Instances available for registration at the start of a run.
    fn service_pool(&self) -> Vec<InstanceInfo>;

    /// Endless sequence of interest queries.
    fn interest_queries(&self) -> Box<dyn Iterator<Item = Interest> + Send>;

    /// A fresh instance to take the place of a retired one.
    fn replacement_for(&self, instance: &InstanceInfo) -> InstanceInfo;
}

#[derive(Debug, Clone)]
struct Application {
    name: String,
    vip_address: String,
}

/// Deterministic topology of `instance_count` instances over `app_count`
/// applications.
///
/// Instance `n` belongs to application `n % app_count`. Network coordinates
/// come from a RNG seeded with `seed`, so two generators built with the same
/// arguments produce the same pool.
pub struct ServiceTopologyGenerator {
    name: String,
    applications: Vec<Application>,
    services: Vec<InstanceInfo>,
    rng: Mutex<StdRng>,
    next_index: AtomicU64,
}

impl ServiceTopologyGenerator {
    pub fn new(
        name: &str,
        app_count: usize,
        instance_count: usize,
        seed: u64,
    ) -> Result<Self, TopologyError> {
        if name.is_empty() {
            return Err(TopologyError::EmptyName);
        }
        if app_count == 0 {
            return Err(TopologyError::NoApplications(name.to_string()));
        }

        let applications: Vec<Application> = (0..app_count)
            .map(|i| {
                let app = format!("app{i:03}");
                Application {
                    vip_address: format!("{app}.{name}.vip"),
                    name: app,
                }
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let services = (0..instance_count as u64)
            .map(|index| instance_at(name, &applications, index, &mut rng))
            .collect();

        Ok(Self {
            name: name.to_string(),
            applications,
            services,
            rng: Mutex::new(rng),
            next_index: AtomicU64::new(instance_count as u64),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }
}

impl TopologyProvider for ServiceTopologyGenerator {
    fn service_pool(&self) -> Vec<InstanceInfo> {
        self.services.clone()
    }

    fn interest_queries(&self) -> Box<dyn Iterator<Item = Interest> + Send> {
        let mut queries: Vec<Interest> = self
            .applications
            .iter()
            .flat_map(|app| {
                [
                    Interest::Application(app.name.clone()),
                    Interest::VipAddress(app.vip_address.clone()),
                ]
            })
            .collect();
        queries.push(Interest::FullRegistry);

        Box::new(queries.into_iter().cycle())
    }

    fn replacement_for(&self, instance: &InstanceInfo) -> InstanceInfo {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let mut replacement = InstanceInfo::new(
            instance_id(&self.name, &instance.app, index),
            instance.app.clone(),
            instance.vip_address.clone(),
        );
        replacement.ip_address = random_ip(&mut *rng);
        replacement.port = random_port(&mut *rng);
        replacement
    }
}

fn instance_at(
    name: &str,
    applications: &[Application],
    index: u64,
    rng: &mut StdRng,
) -> InstanceInfo {
    let app = &applications[(index % applications.len() as u64) as usize];
    let mut instance = InstanceInfo::new(
        instance_id(name, &app.name, index),
        app.name.clone(),
        app.vip_address.clone(),
    );
    instance.ip_address = random_ip(rng);
    instance.port = random_port(rng);
    instance
}

fn instance_id(name: &str, app: &str, index: u64) -> String {
    format!("{name}-{app}-{index:06}")
}

fn random_ip<R: Rng>(rng: &mut R) -> String {
    format!(
        "10.{}.{}.{}",
        rng.gen_range(0..=255u8),
        rng.gen_range(0..=255u8),
        rng.gen_range(1..=254u8)
    )
}

fn random_port<R: Rng>(rng: &mut R) -> u16 {
    rng.gen_range(7000..9000)
}
