//! The synchronous world scan.
//!
//! [`scan_world`] touches live, mutable structures and therefore runs
//! on the control loop (the audit runner submits it through the
//! live-access handoff). It does two things in one pass: classifies
//! every `ACTIVE` ledger entry against the physical world, and builds
//! the identity-to-context index of every encoded crystal that can be
//! physically observed right now.

use std::collections::{BTreeMap, BTreeSet};

use lucent_types::{CrystalId, CrystalRecord};
use lucent_world::codec;
use lucent_world::sim::{CRYSTAL_MARKER, WorldInspector};

/// The result of one synchronous world scan.
#[derive(Debug, Default)]
pub struct WorldScan {
    /// `ACTIVE` entries whose marker stands where the ledger says.
    pub confirmed_active: u64,
    /// `ACTIVE` entries whose marker is absent (or whose recorded
    /// location is unusable). Actionable via `fix-missing`.
    pub missing_active: Vec<CrystalRecord>,
    /// `ACTIVE` entries in regions that are not currently loaded.
    /// Indeterminate; never repaired.
    pub unloaded_active: Vec<CrystalRecord>,
    /// Context lines per physically observed crystal identity.
    pub contexts: BTreeMap<CrystalId, Vec<String>>,
}

/// How one `ACTIVE` entry relates to the physical world.
enum ActiveClass {
    Confirmed,
    Missing,
    Unloaded,
}

/// Run the full scan against live world state.
///
/// Consumes the `ACTIVE` entry list so the records land directly in
/// the classification buckets.
pub fn scan_world(world: &dyn WorldInspector, active: Vec<CrystalRecord>) -> WorldScan {
    let known_worlds: BTreeSet<String> = world.worlds().into_iter().collect();
    let mut scan = WorldScan::default();

    for entry in active {
        match classify(world, &known_worlds, &entry) {
            ActiveClass::Confirmed => {
                scan.confirmed_active = scan.confirmed_active.saturating_add(1);
            }
            ActiveClass::Missing => scan.missing_active.push(entry),
            ActiveClass::Unloaded => scan.unloaded_active.push(entry),
        }
    }

    index_holders(world, &mut scan.contexts);
    index_loose_items(world, &mut scan.contexts);
    index_fixtures(world, &mut scan.contexts);

    scan
}

/// Classify one `ACTIVE` entry.
///
/// Entries without a usable location (no recorded position, or a world
/// the environment does not know) count as missing: there is nowhere
/// to look for them, and the ledger claims they are placed.
fn classify(
    world: &dyn WorldInspector,
    known_worlds: &BTreeSet<String>,
    entry: &CrystalRecord,
) -> ActiveClass {
    let Some(position) = &entry.position else {
        return ActiveClass::Missing;
    };
    if !known_worlds.contains(&position.world) {
        return ActiveClass::Missing;
    }
    if !world.is_cell_loaded(&position.world, position.cell()) {
        return ActiveClass::Unloaded;
    }
    if world.marker_at(position) == Some(CRYSTAL_MARKER) {
        ActiveClass::Confirmed
    } else {
        ActiveClass::Missing
    }
}

/// Index every crystal found in online holders' containers.
fn index_holders(world: &dyn WorldInspector, contexts: &mut BTreeMap<CrystalId, Vec<String>>) {
    for holder in world.online_holders() {
        for container in &holder.containers {
            for (slot, stack) in container.occupied() {
                if let Some(id) = codec::read_identity(stack) {
                    contexts.entry(id).or_default().push(format!(
                        "Holder {} {} slot {slot}",
                        holder.name, container.label,
                    ));
                }
            }
        }
    }
}

/// Index every crystal carried by a loose item entity.
fn index_loose_items(world: &dyn WorldInspector, contexts: &mut BTreeMap<CrystalId, Vec<String>>) {
    for world_name in world.worlds() {
        for item in world.loose_items(&world_name) {
            if let Some(id) = codec::read_identity(&item.stack) {
                contexts
                    .entry(id)
                    .or_default()
                    .push(format!("Dropped at {}", item.position));
            }
        }
    }
}

/// Index every crystal sitting in a loaded storage fixture.
fn index_fixtures(world: &dyn WorldInspector, contexts: &mut BTreeMap<CrystalId, Vec<String>>) {
    for fixture in world.storage_fixtures() {
        for (slot, stack) in fixture.slots.iter().enumerate() {
            let Some(stack) = stack else { continue };
            if stack.is_empty() {
                continue;
            }
            if let Some(id) = codec::read_identity(stack) {
                contexts.entry(id).or_default().push(format!(
                    "{} at {} slot {slot}",
                    fixture.kind, fixture.position,
                ));
            }
        }
    }
}
