//! In-memory registry of tracked item entities.
//!
//! Maps transient item-entity ids to the crystal they carry and the
//! last position they were seen at. The registry is owned exclusively
//! by the tracker: the fast path mutates it from the control loop and
//! the poller reads it from a background task, so it is interior-mutable
//! behind a mutex, but no other component ever touches it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use lucent_types::{CrystalId, Position};
use lucent_world::ItemEntityId;

/// A tracked item entity: which crystal it carries and where it was
/// last seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    /// The crystal encoded on the item.
    pub crystal: CrystalId,
    /// The item's last observed position.
    pub last_seen: Position,
}

/// The tracked-item map.
#[derive(Debug, Default)]
pub struct Registry {
    items: Mutex<HashMap<ItemEntityId, TrackedItem>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an item entity.
    pub fn track(&self, id: ItemEntityId, crystal: CrystalId, last_seen: Position) {
        self.lock().insert(id, TrackedItem { crystal, last_seen });
    }

    /// Stop tracking an item entity, returning its entry if present.
    pub fn untrack(&self, id: ItemEntityId) -> Option<TrackedItem> {
        self.lock().remove(&id)
    }

    /// Update an item's last observed position, if it is tracked.
    pub fn update_position(&self, id: ItemEntityId, position: Position) {
        if let Some(entry) = self.lock().get_mut(&id) {
            entry.last_seen = position;
        }
    }

    /// Snapshot all entries for the poller.
    pub fn snapshot(&self) -> Vec<(ItemEntityId, TrackedItem)> {
        self.lock()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry (shutdown).
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Acquire the map, recovering from a poisoned lock.
    ///
    /// A panic while holding the lock cannot leave the map in a state
    /// worse than a missed update, and the sweep reconciles those.
    fn lock(&self) -> MutexGuard<'_, HashMap<ItemEntityId, TrackedItem>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn track_untrack_roundtrip() {
        let registry = Registry::new();
        let id = ItemEntityId(1);
        let crystal = CrystalId::new();
        let position = Position::new("overworld", 0, 64, 0);

        registry.track(id, crystal, position.clone());
        assert_eq!(registry.len(), 1);

        let entry = registry.untrack(id).unwrap();
        assert_eq!(entry.crystal, crystal);
        assert_eq!(entry.last_seen, position);
        assert!(registry.is_empty());
        assert!(registry.untrack(id).is_none());
    }

    #[test]
    fn update_position_only_touches_tracked_items() {
        let registry = Registry::new();
        let id = ItemEntityId(1);
        registry.track(id, CrystalId::new(), Position::new("overworld", 0, 64, 0));

        let moved = Position::new("overworld", 5, 60, 5);
        registry.update_position(id, moved.clone());
        registry.update_position(ItemEntityId(2), moved.clone());

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.first().unwrap().1.last_seen, moved);
    }
}
