//! Interest queries a subscriber can register with the registry.

use crate::instance::InstanceInfo;
use std::fmt;

/// Predicate selecting which registry changes a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interest {
    /// Every instance in the registry
    FullRegistry,
    /// All instances of one application
    Application(String),
    /// All instances behind one virtual address
    VipAddress(String),
}

impl Interest {
    pub fn matches(&self, instance: &InstanceInfo) -> bool {
        match self {
            Interest::FullRegistry => true,
            Interest::Application(app) => instance.app == *app,
            Interest::VipAddress(vip) => instance.vip_address == *vip,
        }
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interest::FullRegistry => write!(f, "full-registry"),
            Interest::Application(app) => write!(f, "application={app}"),
            Interest::VipAddress(vip) => write!(f, "vip={vip}"),
        }
    }
}
