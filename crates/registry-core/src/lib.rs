//! Registry capability and entity types for the interest-perf load generator.
//!
//! This crate provides the pieces the injectors drive: the synthetic
//! [`InstanceInfo`] entity, the [`Source`] tag attached to every write, the
//! [`Registry`] capability with an in-memory implementation, and the
//! transport-less [`InterestChannel`].
//!
//! # Architecture
//!
//! ```text
//!   register/unregister (Source)        InterestChannel::open(interest)
//!              │                                   │
//!              ▼                                   ▼
//!   ┌─────────────────────┐   ChangeNotification   ┌──────────────────┐
//!   │  InMemoryRegistry   │ ─────── broadcast ───▶ │  drain task      │
//!   │  id → {Source → …}  │                        │  (matches only)  │
//!   └─────────────────────┘                        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use registry_core::{InMemoryRegistry, InstanceInfo, Registry, Source};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let registry = InMemoryRegistry::new();
//! let source = Source::perf();
//! let instance = InstanceInfo::new("perf-app000-000000", "app000", "app000.vip");
//!
//! registry.register(instance.clone(), &source).await.unwrap();
//! assert_eq!(registry.size(), 1);
//!
//! registry.unregister(&instance, &source).await.unwrap();
//! assert_eq!(registry.size(), 0);
//! # });
//! ```

pub mod channel;
pub mod error;
pub mod instance;
pub mod interest;
pub mod registry;

pub use channel::InterestChannel;
pub use error::{RegistryError, Result};
pub use instance::{InstanceInfo, Origin, Source};
pub use interest::Interest;
pub use registry::{ChangeKind, ChangeNotification, InMemoryRegistry, Registry};
