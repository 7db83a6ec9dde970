//! Item stacks, item entities, holders, and storage fixtures.
//!
//! Items are transient: an [`ItemEntityId`] identifies an item entity
//! only while it exists in a world. The durable identity of a minted
//! crystal travels in the stack's metadata (see [`crate::codec`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lucent_types::{HolderId, Position};

/// Transient identifier of an item entity in a world.
///
/// Assigned by the world when the item spawns; never persisted, never
/// reused within a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemEntityId(pub u64);

impl core::fmt::Display for ItemEntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// A stack of items as stored in a slot or carried by an item entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// The item kind tag (e.g. `crystal_shard`).
    pub kind: String,
    /// Number of items in the stack.
    pub amount: u32,
    /// Display label shown to holders, if customized.
    pub display_name: Option<String>,
    /// Descriptive label lines attached to the stack.
    pub lore: Vec<String>,
    /// Attached key-value metadata.
    pub metadata: BTreeMap<String, String>,
}

impl ItemStack {
    /// Create a plain stack of the given kind.
    pub fn of(kind: impl Into<String>, amount: u32) -> Self {
        Self {
            kind: kind.into(),
            amount,
            display_name: None,
            lore: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Whether the stack is empty (zero items).
    pub const fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

/// A loose item entity lying in a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntity {
    /// The entity's transient identifier.
    pub id: ItemEntityId,
    /// The stack the entity carries.
    pub stack: ItemStack,
    /// The entity's current position.
    pub position: Position,
}

/// A labeled container and its slot contents.
///
/// Captured both when inspecting an online holder and when snapshotting
/// a holder's inventory at disconnect time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Human-readable container label ("inventory", "vault").
    pub label: String,
    /// Slot contents; `None` for empty slots.
    pub slots: Vec<Option<ItemStack>>,
}

impl ContainerSnapshot {
    /// Create a container from its label and slots.
    pub fn new(label: impl Into<String>, slots: Vec<Option<ItemStack>>) -> Self {
        Self {
            label: label.into(),
            slots,
        }
    }

    /// Iterate over occupied slots as `(slot index, stack)` pairs.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, stack)| stack.as_ref().map(|s| (slot, s)))
            .filter(|(_, stack)| !stack.is_empty())
    }
}

/// An online holder and their container contents, as seen by inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderView {
    /// The holder's identity.
    pub id: HolderId,
    /// The holder's display name.
    pub name: String,
    /// Every container the holder carries.
    pub containers: Vec<ContainerSnapshot>,
}

/// A loaded storage fixture and its contents, as seen by inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureView {
    /// The fixture kind tag ("chest", "barrel").
    pub kind: String,
    /// Where the fixture sits.
    pub position: Position,
    /// Slot contents; `None` for empty slots.
    pub slots: Vec<Option<ItemStack>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupied_skips_empty_and_zero_slots() {
        let container = ContainerSnapshot::new(
            "inventory",
            vec![
                None,
                Some(ItemStack::of("crystal_shard", 1)),
                Some(ItemStack::of("stone", 0)),
                Some(ItemStack::of("wood", 3)),
            ],
        );
        let occupied: Vec<usize> = container.occupied().map(|(slot, _)| slot).collect();
        assert_eq!(occupied, vec![1, 3]);
    }
}
