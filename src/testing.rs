//! Registry doubles shared by unit tests.

use async_trait::async_trait;
use registry_core::{ChangeNotification, InstanceInfo, Registry, RegistryError, Source};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Register,
    Unregister,
}

/// Registry that records every call in the order it was applied.
///
/// Calls for ids listed in `failing` are rejected without being recorded.
pub struct RecordingRegistry {
    calls: Mutex<Vec<(Call, String, Source)>>,
    size: AtomicUsize,
    failing: Vec<String>,
    changes: broadcast::Sender<ChangeNotification>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::failing_on(Vec::new())
    }

    pub fn failing_on(failing: Vec<String>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            calls: Mutex::new(Vec::new()),
            size: AtomicUsize::new(0),
            failing,
            changes,
        }
    }

    pub fn calls(&self) -> Vec<(Call, String, Source)> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, id: &str) -> registry_core::Result<()> {
        if self.failing.iter().any(|f| f == id) {
            return Err(RegistryError::Rejected {
                id: id.to_string(),
                reason: "test failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for RecordingRegistry {
    async fn register(
        &self,
        instance: InstanceInfo,
        source: &Source,
    ) -> registry_core::Result<bool> {
        self.check(&instance.id)?;
        self.calls
            .lock()
            .unwrap()
            .push((Call::Register, instance.id, source.clone()));
        self.size.fetch_add(1, Ordering::AcqRel);
        Ok(true)
    }

    async fn unregister(
        &self,
        instance: &InstanceInfo,
        source: &Source,
    ) -> registry_core::Result<bool> {
        self.check(&instance.id)?;
        self.calls
            .lock()
            .unwrap()
            .push((Call::Unregister, instance.id.clone(), source.clone()));
        self.size.fetch_sub(1, Ordering::AcqRel);
        Ok(true)
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotification> {
        self.changes.subscribe()
    }
}
