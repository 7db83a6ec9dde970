//! World events observed by the Lifecycle Tracker.
//!
//! The environment raises these synchronously on the control loop as
//! state changes happen. Handlers must never block on them; anything
//! slow is handed to a background worker.

use serde::{Deserialize, Serialize};

use lucent_types::{HolderId, Position};

use crate::item::{ContainerSnapshot, ItemEntity, ItemEntityId, ItemStack};

/// The cause of damage applied to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageCause {
    /// Burning in fire.
    Fire,
    /// Contact with lava.
    Lava,
    /// Falling below the world's void floor.
    Void,
    /// Any other cause, carried verbatim.
    Other(String),
}

impl DamageCause {
    /// Whether this cause destroys an item entity outright.
    ///
    /// Fire-family and void damage are the destructive set; everything
    /// else leaves the item in the world.
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::Fire | Self::Lava | Self::Void)
    }

    /// Whether this cause is void damage.
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }
}

/// A marker destroyed by a structural event, with its kind tag.
///
/// The environment reports every destroyed marker; the tracker filters
/// for the crystal kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerBreak {
    /// Where the marker stood.
    pub position: Position,
    /// The destroyed marker's kind tag.
    pub kind: String,
}

/// A state change in the environment, delivered to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// A marker decayed away at a position.
    MarkerFaded {
        /// The destroyed marker.
        marker: MarkerBreak,
    },
    /// An explosion destroyed markers.
    MarkerExploded {
        /// Every marker the explosion destroyed.
        markers: Vec<MarkerBreak>,
    },
    /// An item entity appeared in a world (spawned or dropped).
    ItemSpawned {
        /// The new item entity.
        item: ItemEntity,
    },
    /// An item entity silently left the world (despawn timer, unload).
    ItemDespawned {
        /// The entity as it was when it vanished.
        item: ItemEntity,
    },
    /// An item entity took damage.
    ItemDamaged {
        /// The damaged entity.
        item: ItemEntity,
        /// What damaged it.
        cause: DamageCause,
    },
    /// An item entity was collected by a holder or a hopper-like fixture.
    ItemPickedUp {
        /// The collected entity's transient id.
        item_id: ItemEntityId,
    },
    /// A holder died, dropping their carried items.
    HolderDied {
        /// The holder who died.
        holder: HolderId,
        /// Where they died.
        position: Position,
        /// What killed them.
        cause: DamageCause,
        /// The stacks dropped by the death.
        drops: Vec<ItemStack>,
    },
    /// A holder connected to the environment.
    HolderConnected {
        /// The connecting holder.
        holder: HolderId,
    },
    /// A holder disconnected, with a snapshot of their containers.
    HolderDisconnected {
        /// The disconnecting holder.
        holder: HolderId,
        /// Their display name at disconnect time.
        name: String,
        /// Container contents at disconnect time.
        containers: Vec<ContainerSnapshot>,
    },
}
