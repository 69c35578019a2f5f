use crate::config::ConfigError;
use thiserror::Error;
use topology_generator::TopologyError;

#[derive(Error, Debug)]
pub enum PerfError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Score board output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PerfError>;
