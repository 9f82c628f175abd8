// ── Device availability ──
//
// One flag per device session, fanned out to every registered entity.
// Entities are held weakly: dropping an entity elsewhere unregisters it.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tracing::debug;

use crate::entity::Entity;

pub struct AvailabilityBroadcaster {
    device: String,
    available: watch::Sender<bool>,
    entities: Mutex<Vec<Weak<Entity>>>,
}

impl AvailabilityBroadcaster {
    pub fn new(device: impl Into<String>) -> Self {
        let (available, _) = watch::channel(false);
        Self {
            device: device.into(),
            available,
            entities: Mutex::new(Vec::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        *self.available.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }

    /// Register an entity and align it with the current availability.
    pub fn register(&self, entity: &Arc<Entity>) {
        entity.set_available(self.is_available());
        self.lock().push(Arc::downgrade(entity));
    }

    /// Set availability. Unchanged values are ignored; changes reach every
    /// live entity exactly once. Returns whether anything changed.
    pub fn set(&self, available: bool) -> bool {
        let changed = self.available.send_if_modified(|current| {
            if *current == available {
                return false;
            }
            *current = available;
            true
        });
        if !changed {
            return false;
        }

        debug!(device = %self.device, available, "device availability changed");
        for entity in self.entities() {
            entity.set_available(available);
        }
        true
    }

    /// Live registered entities. Dead references are pruned.
    pub fn entities(&self) -> Vec<Arc<Entity>> {
        let mut entities = self.lock();
        entities.retain(|weak| weak.strong_count() > 0);
        entities.iter().filter_map(Weak::upgrade).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Weak<Entity>>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AvailabilityBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityBroadcaster")
            .field("device", &self.device)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}
