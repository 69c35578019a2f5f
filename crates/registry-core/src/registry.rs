//! Registry capability and an in-memory, source-aware implementation.

use crate::error::{RegistryError, Result};
use crate::instance::{InstanceInfo, Source};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

/// Default capacity of the change notification buffer.
pub const DEFAULT_CHANGE_BUFFER: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Delete,
}

/// A registry change as seen by interest subscribers.
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    pub instance: Arc<InstanceInfo>,
}

/// Capability consumed by the injectors.
///
/// Writes are asynchronous and complete on their own; `size` is a cheap
/// synchronous read that may lag behind writes still in flight.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register a copy of `instance` owned by `source`.
    ///
    /// Returns `true` when the instance id was not present before.
    async fn register(&self, instance: InstanceInfo, source: &Source) -> Result<bool>;

    /// Remove the copy of `instance` owned by `source`.
    ///
    /// Returns `true` when a copy was removed.
    async fn unregister(&self, instance: &InstanceInfo, source: &Source) -> Result<bool>;

    /// Number of distinct instance ids currently registered.
    fn size(&self) -> usize;

    /// Subscribe to the stream of registry changes.
    fn changes(&self) -> broadcast::Receiver<ChangeNotification>;
}

/// Registry kept in process memory.
///
/// Each instance id maps to one copy per [`Source`]. The id counts towards
/// [`Registry::size`] while at least one copy is present.
pub struct InMemoryRegistry {
    entries: Mutex<HashMap<String, HashMap<Source, InstanceInfo>>>,
    size: AtomicUsize,
    changes: broadcast::Sender<ChangeNotification>,
    shut_down: AtomicBool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::with_change_buffer(DEFAULT_CHANGE_BUFFER)
    }

    /// Create a registry whose subscribers may fall `capacity` changes behind
    /// before they start losing notifications.
    pub fn with_change_buffer(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: Mutex::new(HashMap::new()),
            size: AtomicUsize::new(0),
            changes,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Reject all further writes.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("Registry shut down with {} instances", self.size());
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Whether `id` currently has a copy owned by `source`.
    pub fn contains(&self, id: &str, source: &Source) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some_and(|copies| copies.contains_key(source))
    }

    fn notify(&self, kind: ChangeKind, instance: InstanceInfo) {
        // No receivers is the common case before any interest is opened.
        let _ = self.changes.send(ChangeNotification {
            kind,
            instance: Arc::new(instance),
        });
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn register(&self, instance: InstanceInfo, source: &Source) -> Result<bool> {
        if self.is_shut_down() {
            return Err(RegistryError::Shutdown);
        }

        let added = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let copies = entries.entry(instance.id.clone()).or_default();
            let added = copies.is_empty();
            copies.insert(source.clone(), instance.clone());
            if added {
                self.size.fetch_add(1, Ordering::AcqRel);
            }
            added
        };

        self.notify(ChangeKind::Add, instance);
        Ok(added)
    }

    async fn unregister(&self, instance: &InstanceInfo, source: &Source) -> Result<bool> {
        if self.is_shut_down() {
            return Err(RegistryError::Shutdown);
        }

        let (removed, last_copy) = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(copies) = entries.get_mut(&instance.id) else {
                return Ok(false);
            };
            let removed = copies.remove(source);
            let last_copy = copies.is_empty();
            if last_copy {
                entries.remove(&instance.id);
                self.size.fetch_sub(1, Ordering::AcqRel);
            }
            (removed, last_copy)
        };

        match removed {
            Some(copy) => {
                if last_copy {
                    self.notify(ChangeKind::Delete, copy);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotification> {
        self.changes.subscribe()
    }
}
