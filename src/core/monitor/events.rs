//! Health change notifications
//!
//! Events go out on a broadcast channel for async subscribers and to a list
//! of registered observers for synchronous hooks. A failing or panicking
//! observer is logged and skipped; it never reaches circuit bookkeeping.

use super::types::HealthChangedEvent;
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Error type observers may return
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous receiver of health change events
#[cfg_attr(test, mockall::automock)]
pub trait HealthObserver: Send + Sync {
    /// Called after a provider crosses the healthy/unhealthy boundary
    fn on_health_changed(&self, event: &HealthChangedEvent) -> Result<(), ObserverError>;
}

/// Fan-out for health change events
pub struct HealthNotifier {
    sender: broadcast::Sender<HealthChangedEvent>,
    observers: RwLock<Vec<Arc<dyn HealthObserver>>>,
}

impl HealthNotifier {
    /// Create a notifier whose broadcast subscribers buffer `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<HealthChangedEvent> {
        self.sender.subscribe()
    }

    /// Register a synchronous observer
    pub fn add_observer(&self, observer: Arc<dyn HealthObserver>) {
        self.observers.write().push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Publish an event to subscribers and observers
    pub fn notify(&self, event: HealthChangedEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!(provider = %event.provider_id, "No health event subscribers");
        }

        // Snapshot so observers can register others without deadlocking
        let observers = self.observers.read().clone();
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_health_changed(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(provider = %event.provider_id, error = %err, "Health observer failed");
                }
                Err(_) => {
                    warn!(provider = %event.provider_id, "Health observer panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for HealthNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthNotifier")
            .field("subscribers", &self.sender.receiver_count())
            .field("observers", &self.observer_count())
            .finish()
    }
}
