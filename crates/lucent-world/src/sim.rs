//! The world inspection interface and the in-memory world it describes.
//!
//! [`WorldInspector`] is the synchronous read surface the Audit Engine
//! and Lifecycle Tracker observe the environment through. It must only
//! be exercised from the single control loop that owns live state; the
//! [`crate::live`] channel exists to get there from background workers.
//!
//! [`SimWorld`] is the concrete environment: named worlds holding
//! markers, loose item entities, and storage fixtures, plus the set of
//! currently online holders. Every mutation that the ledger cares about
//! records a [`WorldEvent`] into an internal feed which the control
//! loop drains to the tracker each tick.

use std::collections::{BTreeMap, BTreeSet};

use lucent_types::{CellCoord, HolderId, Position};

use crate::codec;
use crate::event::{DamageCause, MarkerBreak, WorldEvent};
use crate::item::{
    ContainerSnapshot, FixtureView, HolderView, ItemEntity, ItemEntityId, ItemStack,
};

/// Marker kind tag of a placed, unharvested crystal.
pub const CRYSTAL_MARKER: &str = "crystal_cluster";

/// Container label a picked-up item lands in.
const INVENTORY_LABEL: &str = "inventory";

/// Synchronous read access to live world state.
///
/// Implementations touch live, mutable structures, so every call must
/// happen on the control loop that owns them.
pub trait WorldInspector {
    /// Names of all known worlds.
    fn worlds(&self) -> Vec<String>;

    /// The marker kind at a position, if any marker stands there.
    fn marker_at(&self, position: &Position) -> Option<&str>;

    /// Whether the region cell is currently loaded in the given world.
    ///
    /// Returns `false` for unknown worlds.
    fn is_cell_loaded(&self, world: &str, cell: CellCoord) -> bool;

    /// The configured minimum build height of a world.
    ///
    /// Positions strictly below this are in the void. Returns `None`
    /// for unknown worlds.
    fn void_floor(&self, world: &str) -> Option<i32>;

    /// All loose item entities in a world.
    fn loose_items(&self, world: &str) -> Vec<ItemEntity>;

    /// All online holders with their container contents.
    fn online_holders(&self) -> Vec<HolderView>;

    /// All loaded storage fixtures with their contents.
    fn storage_fixtures(&self) -> Vec<FixtureView>;
}

/// Per-world mutable state.
#[derive(Debug, Default)]
struct WorldState {
    /// Minimum build height; the void starts strictly below it.
    min_y: i32,
    /// Markers by position.
    markers: BTreeMap<(i32, i32, i32), String>,
    /// Cells currently loaded.
    loaded_cells: BTreeSet<(i32, i32)>,
    /// Loose item entities by transient id.
    items: BTreeMap<ItemEntityId, ItemEntity>,
    /// Storage fixtures by position.
    fixtures: BTreeMap<(i32, i32, i32), Fixture>,
}

/// A storage fixture's kind and contents.
#[derive(Debug)]
struct Fixture {
    kind: String,
    slots: Vec<Option<ItemStack>>,
}

/// An online holder's name and containers.
#[derive(Debug)]
struct HolderState {
    name: String,
    containers: Vec<ContainerSnapshot>,
}

/// The in-memory environment used by the engine binary and tests.
#[derive(Debug, Default)]
pub struct SimWorld {
    worlds: BTreeMap<String, WorldState>,
    holders: BTreeMap<HolderId, HolderState>,
    events: Vec<WorldEvent>,
    next_item_id: u64,
}

impl SimWorld {
    /// Create an empty environment with no worlds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a world with its minimum build height.
    ///
    /// Re-registering an existing world only updates its floor.
    pub fn add_world(&mut self, name: impl Into<String>, min_y: i32) {
        self.worlds.entry(name.into()).or_default().min_y = min_y;
    }

    /// Mark a region cell as loaded or unloaded.
    ///
    /// Unknown worlds are ignored.
    pub fn set_cell_loaded(&mut self, world: &str, cell: CellCoord, loaded: bool) {
        if let Some(state) = self.worlds.get_mut(world) {
            if loaded {
                state.loaded_cells.insert((cell.x, cell.y));
            } else {
                state.loaded_cells.remove(&(cell.x, cell.y));
            }
        }
    }

    /// Place a marker at a position and load its cell.
    pub fn place_marker(&mut self, position: &Position, kind: &str) {
        if let Some(state) = self.worlds.get_mut(&position.world) {
            state
                .markers
                .insert(coords(position), kind.to_owned());
            let cell = position.cell();
            state.loaded_cells.insert((cell.x, cell.y));
        }
    }

    /// Remove a marker without recording an event (harvest, operator edit).
    pub fn clear_marker(&mut self, position: &Position) -> bool {
        self.worlds
            .get_mut(&position.world)
            .is_some_and(|state| state.markers.remove(&coords(position)).is_some())
    }

    /// Decay a marker away, recording a [`WorldEvent::MarkerFaded`].
    ///
    /// Returns `false` (and records nothing) when no marker stands there.
    pub fn fade_marker(&mut self, position: &Position) -> bool {
        let Some(state) = self.worlds.get_mut(&position.world) else {
            return false;
        };
        let Some(kind) = state.markers.remove(&coords(position)) else {
            return false;
        };
        self.events.push(WorldEvent::MarkerFaded {
            marker: MarkerBreak {
                position: position.clone(),
                kind,
            },
        });
        true
    }

    /// Destroy the markers at the given positions by explosion.
    ///
    /// Records one [`WorldEvent::MarkerExploded`] listing every position
    /// that actually had a marker.
    pub fn explode(&mut self, positions: &[Position]) {
        let mut destroyed = Vec::new();
        for position in positions {
            if let Some(state) = self.worlds.get_mut(&position.world) {
                if let Some(kind) = state.markers.remove(&coords(position)) {
                    destroyed.push(MarkerBreak {
                        position: position.clone(),
                        kind,
                    });
                }
            }
        }
        if !destroyed.is_empty() {
            tracing::debug!(count = destroyed.len(), "explosion destroyed markers");
            self.events
                .push(WorldEvent::MarkerExploded { markers: destroyed });
        }
    }

    /// Spawn a loose item entity in a world.
    ///
    /// Identity metadata is normalized on the way in, so legacy-encoded
    /// stacks re-entering the world pick up the canonical encoding.
    /// Returns `None` when the world is unknown.
    pub fn spawn_item(
        &mut self,
        position: &Position,
        mut stack: ItemStack,
    ) -> Option<ItemEntityId> {
        if !self.worlds.contains_key(&position.world) {
            return None;
        }

        let _ = codec::refresh_identity(&mut stack);
        self.next_item_id = self.next_item_id.wrapping_add(1);
        let id = ItemEntityId(self.next_item_id);
        let item = ItemEntity {
            id,
            stack,
            position: position.clone(),
        };

        if let Some(state) = self.worlds.get_mut(&position.world) {
            state.items.insert(id, item.clone());
        }
        self.events.push(WorldEvent::ItemSpawned { item });
        Some(id)
    }

    /// Despawn an item entity (timer expiry, region unload).
    ///
    /// Records a [`WorldEvent::ItemDespawned`] carrying the entity's
    /// last state. Returns `false` when the id is unknown.
    pub fn despawn_item(&mut self, id: ItemEntityId) -> bool {
        match self.take_item(id) {
            Some(item) => {
                self.events.push(WorldEvent::ItemDespawned { item });
                true
            }
            None => false,
        }
    }

    /// Apply damage to an item entity.
    ///
    /// Destructive causes remove the entity from the world; either way a
    /// [`WorldEvent::ItemDamaged`] is recorded. Returns `false` when the
    /// id is unknown.
    pub fn damage_item(&mut self, id: ItemEntityId, cause: DamageCause) -> bool {
        let destructive = cause.is_destructive();
        let item = if destructive {
            self.take_item(id)
        } else {
            self.find_item(id).cloned()
        };
        match item {
            Some(item) => {
                self.events.push(WorldEvent::ItemDamaged { item, cause });
                true
            }
            None => false,
        }
    }

    /// A holder picks up an item entity.
    ///
    /// The stack moves into the holder's inventory container and a
    /// [`WorldEvent::ItemPickedUp`] is recorded. Returns `false` when
    /// either the item or the holder is unknown.
    pub fn pickup_item(&mut self, id: ItemEntityId, holder: HolderId) -> bool {
        if !self.holders.contains_key(&holder) {
            return false;
        }
        let Some(item) = self.take_item(id) else {
            return false;
        };

        if let Some(state) = self.holders.get_mut(&holder) {
            let index = match state
                .containers
                .iter()
                .position(|c| c.label == INVENTORY_LABEL)
            {
                Some(existing) => existing,
                None => {
                    state
                        .containers
                        .push(ContainerSnapshot::new(INVENTORY_LABEL, Vec::new()));
                    state.containers.len().saturating_sub(1)
                }
            };
            if let Some(container) = state.containers.get_mut(index) {
                container.slots.push(Some(item.stack));
            }
        }

        self.events.push(WorldEvent::ItemPickedUp { item_id: id });
        true
    }

    /// Remove an item entity silently (sweep cleanup, operator edit).
    ///
    /// No event is recorded; the caller is responsible for any ledger
    /// consequence.
    pub fn remove_item(&mut self, id: ItemEntityId) -> Option<ItemEntity> {
        self.take_item(id)
    }

    /// Look up a loose item entity by transient id.
    pub fn find_item(&self, id: ItemEntityId) -> Option<&ItemEntity> {
        self.worlds.values().find_map(|state| state.items.get(&id))
    }

    /// Connect a holder, recording a [`WorldEvent::HolderConnected`].
    pub fn connect_holder(&mut self, holder: HolderId, name: impl Into<String>) {
        self.holders.insert(
            holder,
            HolderState {
                name: name.into(),
                containers: Vec::new(),
            },
        );
        self.events.push(WorldEvent::HolderConnected { holder });
    }

    /// Disconnect a holder, snapshotting their containers into a
    /// [`WorldEvent::HolderDisconnected`].
    ///
    /// Returns `false` when the holder was not online.
    pub fn disconnect_holder(&mut self, holder: HolderId) -> bool {
        match self.holders.remove(&holder) {
            Some(state) => {
                self.events.push(WorldEvent::HolderDisconnected {
                    holder,
                    name: state.name,
                    containers: state.containers,
                });
                true
            }
            None => false,
        }
    }

    /// Replace one of a holder's containers wholesale.
    ///
    /// Unknown holders are ignored.
    pub fn set_holder_container(
        &mut self,
        holder: HolderId,
        label: &str,
        slots: Vec<Option<ItemStack>>,
    ) {
        if let Some(state) = self.holders.get_mut(&holder) {
            match state.containers.iter_mut().find(|c| c.label == label) {
                Some(existing) => existing.slots = slots,
                None => state.containers.push(ContainerSnapshot::new(label, slots)),
            }
        }
    }

    /// Kill a holder: their carried stacks drop and a
    /// [`WorldEvent::HolderDied`] is recorded.
    ///
    /// The drops are returned in the event only; whether they re-enter
    /// the world as item entities is the environment's call (void
    /// deaths destroy them outright).
    pub fn kill_holder(&mut self, holder: HolderId, position: &Position, cause: DamageCause) {
        let drops = match self.holders.get_mut(&holder) {
            Some(state) => {
                let mut drops = Vec::new();
                for container in &mut state.containers {
                    for slot in &mut container.slots {
                        if let Some(stack) = slot.take() {
                            if !stack.is_empty() {
                                drops.push(stack);
                            }
                        }
                    }
                }
                drops
            }
            None => Vec::new(),
        };

        self.events.push(WorldEvent::HolderDied {
            holder,
            position: position.clone(),
            cause,
            drops,
        });
    }

    /// Place a storage fixture with its contents.
    ///
    /// Unknown worlds are ignored.
    pub fn place_fixture(&mut self, position: &Position, kind: &str, slots: Vec<Option<ItemStack>>) {
        if let Some(state) = self.worlds.get_mut(&position.world) {
            state.fixtures.insert(
                coords(position),
                Fixture {
                    kind: kind.to_owned(),
                    slots,
                },
            );
        }
    }

    /// Drain the recorded event feed in occurrence order.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        core::mem::take(&mut self.events)
    }

    /// Find and remove an item entity across all worlds.
    fn take_item(&mut self, id: ItemEntityId) -> Option<ItemEntity> {
        self.worlds
            .values_mut()
            .find_map(|state| state.items.remove(&id))
    }
}

impl WorldInspector for SimWorld {
    fn worlds(&self) -> Vec<String> {
        self.worlds.keys().cloned().collect()
    }

    fn marker_at(&self, position: &Position) -> Option<&str> {
        self.worlds
            .get(&position.world)?
            .markers
            .get(&coords(position))
            .map(String::as_str)
    }

    fn is_cell_loaded(&self, world: &str, cell: CellCoord) -> bool {
        self.worlds
            .get(world)
            .is_some_and(|state| state.loaded_cells.contains(&(cell.x, cell.y)))
    }

    fn void_floor(&self, world: &str) -> Option<i32> {
        self.worlds.get(world).map(|state| state.min_y)
    }

    fn loose_items(&self, world: &str) -> Vec<ItemEntity> {
        self.worlds
            .get(world)
            .map(|state| state.items.values().cloned().collect())
            .unwrap_or_default()
    }

    fn online_holders(&self) -> Vec<HolderView> {
        self.holders
            .iter()
            .map(|(id, state)| HolderView {
                id: *id,
                name: state.name.clone(),
                containers: state.containers.clone(),
            })
            .collect()
    }

    fn storage_fixtures(&self) -> Vec<FixtureView> {
        let mut fixtures = Vec::new();
        for (world_name, state) in &self.worlds {
            for (&(x, y, z), fixture) in &state.fixtures {
                fixtures.push(FixtureView {
                    kind: fixture.kind.clone(),
                    position: Position::new(world_name.clone(), x, y, z),
                    slots: fixture.slots.clone(),
                });
            }
        }
        fixtures
    }
}

/// Map a position to its per-world coordinate key.
const fn coords(position: &Position) -> (i32, i32, i32) {
    (position.x, position.y, position.z)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lucent_types::CrystalId;

    use crate::codec::{self, IDENTITY_KEY};

    use super::*;

    /// Helper: a world named "overworld" with floor at -64.
    fn overworld() -> SimWorld {
        let mut world = SimWorld::new();
        world.add_world("overworld", -64);
        world
    }

    #[test]
    fn fade_records_event_only_for_existing_markers() {
        let mut world = overworld();
        let pos = Position::new("overworld", 10, 70, 10);
        world.place_marker(&pos, CRYSTAL_MARKER);

        assert!(world.fade_marker(&pos));
        assert!(!world.fade_marker(&pos));

        let events = world.drain_events();
        assert_eq!(events.len(), 1);
        match events.first().unwrap() {
            WorldEvent::MarkerFaded { marker } => {
                assert_eq!(marker.position, pos);
                assert_eq!(marker.kind, CRYSTAL_MARKER);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn explosion_lists_only_destroyed_markers() {
        let mut world = overworld();
        let hit = Position::new("overworld", 0, 64, 0);
        let empty = Position::new("overworld", 1, 64, 0);
        world.place_marker(&hit, CRYSTAL_MARKER);

        world.explode(&[hit.clone(), empty]);

        let events = world.drain_events();
        assert_eq!(events.len(), 1);
        match events.first().unwrap() {
            WorldEvent::MarkerExploded { markers } => {
                assert_eq!(markers.len(), 1);
                assert_eq!(markers.first().unwrap().position, hit);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn spawned_items_are_normalized_and_visible() {
        let mut world = overworld();
        let id = CrystalId::new();
        let mut stack = ItemStack::of("raw_shard", 1);
        // Legacy encoding only.
        stack.lore = vec![format!("Ledger ID: {id}")];

        let pos = Position::new("overworld", 5, 70, 5);
        let item_id = world.spawn_item(&pos, stack).unwrap();

        let item = world.find_item(item_id).unwrap();
        assert_eq!(item.stack.metadata.get(IDENTITY_KEY), Some(&id.to_string()));
        assert_eq!(codec::read_identity(&item.stack), Some(id));
        assert_eq!(world.loose_items("overworld").len(), 1);
    }

    #[test]
    fn pickup_moves_stack_into_holder_inventory() {
        let mut world = overworld();
        let holder = HolderId::new();
        world.connect_holder(holder, "Mira");

        let pos = Position::new("overworld", 5, 70, 5);
        let item_id = world
            .spawn_item(&pos, ItemStack::of("crystal_shard", 1))
            .unwrap();

        assert!(world.pickup_item(item_id, holder));
        assert!(world.find_item(item_id).is_none());

        let holders = world.online_holders();
        assert_eq!(holders.len(), 1);
        let inventory = holders
            .first()
            .unwrap()
            .containers
            .iter()
            .find(|c| c.label == "inventory")
            .unwrap();
        assert_eq!(inventory.occupied().count(), 1);
    }

    #[test]
    fn destructive_damage_removes_the_item() {
        let mut world = overworld();
        let pos = Position::new("overworld", 5, 70, 5);
        let item_id = world
            .spawn_item(&pos, ItemStack::of("crystal_shard", 1))
            .unwrap();

        assert!(world.damage_item(item_id, DamageCause::Lava));
        assert!(world.find_item(item_id).is_none());
    }

    #[test]
    fn nondestructive_damage_keeps_the_item() {
        let mut world = overworld();
        let pos = Position::new("overworld", 5, 70, 5);
        let item_id = world
            .spawn_item(&pos, ItemStack::of("crystal_shard", 1))
            .unwrap();

        assert!(world.damage_item(item_id, DamageCause::Other("cactus".to_owned())));
        assert!(world.find_item(item_id).is_some());
    }

    #[test]
    fn disconnect_snapshots_containers() {
        let mut world = overworld();
        let holder = HolderId::new();
        world.connect_holder(holder, "Mira");
        world.set_holder_container(
            holder,
            "inventory",
            vec![Some(ItemStack::of("crystal_shard", 1))],
        );

        assert!(world.disconnect_holder(holder));
        assert!(world.online_holders().is_empty());

        let events = world.drain_events();
        let disconnect = events
            .iter()
            .find_map(|event| match event {
                WorldEvent::HolderDisconnected {
                    name, containers, ..
                } => Some((name.clone(), containers.len())),
                _ => None,
            })
            .unwrap();
        assert_eq!(disconnect, ("Mira".to_owned(), 1));
    }

    #[test]
    fn cell_loading_tracks_marker_placement() {
        let mut world = overworld();
        let pos = Position::new("overworld", 33, 70, -1);
        world.place_marker(&pos, CRYSTAL_MARKER);

        assert!(world.is_cell_loaded("overworld", pos.cell()));
        world.set_cell_loaded("overworld", pos.cell(), false);
        assert!(!world.is_cell_loaded("overworld", pos.cell()));
        assert!(!world.is_cell_loaded("nether", pos.cell()));
    }

    #[test]
    fn void_floor_comes_from_world_config() {
        let world = overworld();
        assert_eq!(world.void_floor("overworld"), Some(-64));
        assert_eq!(world.void_floor("nether"), None);
    }
}
