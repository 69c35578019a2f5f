//! Synthetic service topology for the interest-perf load generator.
//!
//! The [`ServiceTopologyGenerator`] produces a deterministic set of service
//! instances spread over a number of applications, an endless sequence of
//! interest queries over those applications, and replacement instances for
//! the ones the load generator retires.
//!
//! ```text
//!   seed ──▶ ServiceTopologyGenerator
//!              ├── service_pool()       Vec<InstanceInfo>
//!              ├── interest_queries()   app, vip, app, vip, …, full-registry, (repeat)
//!              └── replacement_for(i)   same app/vip, fresh id
//! ```
//!
//! # Example
//!
//! ```rust
//! use topology_generator::{ServiceTopologyGenerator, TopologyProvider};
//!
//! let topology = ServiceTopologyGenerator::new("perfTest", 4, 100, 42).unwrap();
//! assert_eq!(topology.service_pool().len(), 100);
//!
//! let first = topology.interest_queries().next().unwrap();
//! println!("First interest: {first}");
//! ```

pub mod topology;

pub use topology::{ServiceTopologyGenerator, TopologyError, TopologyProvider};
