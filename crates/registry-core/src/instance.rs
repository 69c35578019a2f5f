//! Registry entities and the source tag attached to registry writes.

use std::fmt;

/// Where a registry write originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Written by a client connected to this node
    Local,
    /// Copied from a peer node
    Replicated,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Replicated => write!(f, "replicated"),
        }
    }
}

/// Identity of the writer of record for a registry entry.
///
/// The registry keeps one copy of an instance per source, so a register and
/// its matching unregister must carry equal sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    origin: Origin,
    name: String,
}

impl Source {
    pub fn new(origin: Origin, name: impl Into<String>) -> Self {
        Self {
            origin,
            name: name.into(),
        }
    }

    /// The `local:perf` source used by the load generator.
    pub fn perf() -> Self {
        Self::new(Origin::Local, "perf")
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.name)
    }
}

/// One synthetic registrable service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    /// Stable identity, used as the registry key and in logs
    pub id: String,
    /// Application the instance belongs to
    pub app: String,
    /// Virtual address shared by all instances of the application
    pub vip_address: String,
    pub hostname: String,
    pub ip_address: String,
    pub port: u16,
}

impl InstanceInfo {
    /// Create an instance with placeholder network coordinates.
    pub fn new(id: impl Into<String>, app: impl Into<String>, vip: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            hostname: format!("{id}.perf.internal"),
            id,
            app: app.into(),
            vip_address: vip.into(),
            ip_address: "127.0.0.1".to_string(),
            port: 7001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_source() {
        let source = Source::perf();
        assert_eq!(source.origin(), Origin::Local);
        assert_eq!(source.name(), "perf");
        assert_eq!(source.to_string(), "local:perf");
    }

    #[test]
    fn test_sources_differ_by_origin() {
        let local = Source::new(Origin::Local, "perf");
        let replicated = Source::new(Origin::Replicated, "perf");
        assert_ne!(local, replicated);
        assert_eq!(local, Source::perf());
    }

    #[test]
    fn test_instance_defaults() {
        let instance = InstanceInfo::new("i-1", "billing", "billing.vip");
        assert_eq!(instance.hostname, "i-1.perf.internal");
        assert_eq!(instance.app, "billing");
        assert_eq!(instance.port, 7001);
    }
}
