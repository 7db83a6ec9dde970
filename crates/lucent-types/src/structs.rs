//! Record structs for the Lucent crystal ledger.
//!
//! These are the shapes that cross crate boundaries: the ledger row as
//! the store hands it out, area definitions, offline-holding snapshots,
//! and the derived supply snapshot.

use serde::{Deserialize, Serialize};

use crate::enums::{CrystalStatus, EventKind};
use crate::ids::{CrystalId, HolderId};

/// Width of a region cell, expressed as a power-of-two shift: a cell
/// covers 16x16 positions on the horizontal plane.
const CELL_SHIFT: u32 = 4;

// ---------------------------------------------------------------------------
// Spatial coordinates
// ---------------------------------------------------------------------------

/// An exact position in a named world.
///
/// Positions are all-or-nothing on a crystal record: either every field
/// is known or no location is recorded at all.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Name of the world containing this position.
    pub world: String,
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl Position {
    /// Create a position from a world name and coordinates.
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Return the region cell containing this position.
    pub const fn cell(&self) -> CellCoord {
        CellCoord {
            x: self.x >> CELL_SHIFT,
            y: self.z >> CELL_SHIFT,
        }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}

/// A region cell coordinate on the horizontal plane.
///
/// Cells are the granularity at which the environment loads and unloads
/// regions, and the unit areas are defined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// Cell column (position x divided by the cell width).
    pub x: i32,
    /// Cell row (position z divided by the cell width).
    pub y: i32,
}

impl CellCoord {
    /// Create a cell coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// A crystal row as the ledger store hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrystalRecord {
    /// The crystal's unique identifier.
    pub id: CrystalId,
    /// The area this crystal was minted for, if any.
    pub area_id: Option<String>,
    /// Current lifecycle status.
    pub status: CrystalStatus,
    /// Last recorded world position. Valid only while the status admits
    /// a physical location (`Active`, or `Lost` with a known site).
    pub position: Option<Position>,
}

impl CrystalRecord {
    /// Whether this crystal is currently `Active`.
    pub fn is_active(&self) -> bool {
        self.status == CrystalStatus::Active
    }

    /// Whether this crystal is currently `Held`.
    pub fn is_held(&self) -> bool {
        self.status == CrystalStatus::Held
    }

    /// Format the recorded position, or a placeholder when none exists.
    pub fn describe_position(&self) -> String {
        self.position
            .as_ref()
            .map_or_else(|| "(no recorded location)".to_owned(), Position::to_string)
    }
}

/// An operator-defined area with its target supply and cell footprint.
///
/// An area always references at least one cell; creation is atomic, so
/// an area with zero persisted cells never exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Operator-chosen area identifier.
    pub id: String,
    /// Name of the world the area lives in.
    pub world: String,
    /// Target number of crystals the area should hold.
    pub target_count: u32,
    /// The cells making up the area's footprint.
    pub cells: Vec<CellCoord>,
}

/// An append-only ledger event attached to a crystal.
///
/// Events are immutable once written; they are never updated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrystalEvent {
    /// Autoincrementing row id assigned by the store.
    pub id: i64,
    /// The crystal the event belongs to.
    pub crystal: CrystalId,
    /// What happened.
    pub kind: EventKind,
    /// Free-text detail, if any.
    pub details: Option<String>,
    /// Epoch seconds when the event occurred.
    pub occurred_at: i64,
}

/// A snapshot of one crystal held by a disconnected holder.
///
/// One row per crystal; rows are replaced wholesale when the holder
/// disconnects again and cleared when they reconnect. This is a
/// snapshot, not a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineHolding {
    /// The held crystal.
    pub crystal: CrystalId,
    /// The disconnected holder.
    pub holder: HolderId,
    /// Holder display name at disconnect time, if known.
    pub holder_name: Option<String>,
    /// Free-text context captured at disconnect ("inventory slot 4").
    pub details: Option<String>,
    /// Epoch seconds when the snapshot was recorded.
    pub recorded_at: i64,
}

impl OfflineHolding {
    /// A display identifier for the holder: name when known, id otherwise.
    pub fn holder_label(&self) -> String {
        self.holder_name
            .clone()
            .unwrap_or_else(|| self.holder.to_string())
    }
}

// ---------------------------------------------------------------------------
// Supply snapshot
// ---------------------------------------------------------------------------

/// Per-status crystal counts at a point in time.
///
/// Derived, never stored. The counts always partition the crystal table:
/// `active + held + lost + redeemed == total row count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplySnapshot {
    /// Crystals placed in the world.
    pub active: u64,
    /// Crystals carried by holders.
    pub held: u64,
    /// Crystals gone from circulation without redemption.
    pub lost: u64,
    /// Crystals consumed by redemption.
    pub redeemed: u64,
}

impl SupplySnapshot {
    /// Total number of crystals ever minted.
    pub const fn total(&self) -> u64 {
        // Saturating: four u64 counts from one table cannot overflow in
        // practice, but the lint regime demands no unchecked arithmetic.
        self.active
            .saturating_add(self.held)
            .saturating_add(self.lost)
            .saturating_add(self.redeemed)
    }

    /// Return the count recorded for a single status.
    pub const fn count(&self, status: CrystalStatus) -> u64 {
        match status {
            CrystalStatus::Active => self.active,
            CrystalStatus::Held => self.held,
            CrystalStatus::Lost => self.lost,
            CrystalStatus::Redeemed => self.redeemed,
        }
    }

    /// Record a count for a single status, replacing the previous value.
    pub const fn set_count(&mut self, status: CrystalStatus, value: u64) {
        match status {
            CrystalStatus::Active => self.active = value,
            CrystalStatus::Held => self.held = value,
            CrystalStatus::Lost => self.lost = value,
            CrystalStatus::Redeemed => self.redeemed = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_maps_to_cell_by_shift() {
        let pos = Position::new("overworld", 33, 64, -1);
        // 33 >> 4 == 2, -1 >> 4 == -1 (arithmetic shift).
        assert_eq!(pos.cell(), CellCoord::new(2, -1));
    }

    #[test]
    fn position_display_is_readable() {
        let pos = Position::new("overworld", 1, 2, 3);
        assert_eq!(pos.to_string(), "overworld (1, 2, 3)");
    }

    #[test]
    fn record_describes_missing_position() {
        let record = CrystalRecord {
            id: CrystalId::new(),
            area_id: None,
            status: CrystalStatus::Held,
            position: None,
        };
        assert_eq!(record.describe_position(), "(no recorded location)");
    }

    #[test]
    fn supply_snapshot_totals() {
        let mut snapshot = SupplySnapshot::default();
        snapshot.set_count(CrystalStatus::Active, 3);
        snapshot.set_count(CrystalStatus::Held, 2);
        snapshot.set_count(CrystalStatus::Lost, 1);
        snapshot.set_count(CrystalStatus::Redeemed, 4);
        assert_eq!(snapshot.total(), 10);
        assert_eq!(snapshot.count(CrystalStatus::Held), 2);
    }

    #[test]
    fn offline_holding_label_prefers_name() {
        let holder = HolderId::new();
        let named = OfflineHolding {
            crystal: CrystalId::new(),
            holder,
            holder_name: Some("Mira".to_owned()),
            details: None,
            recorded_at: 0,
        };
        assert_eq!(named.holder_label(), "Mira");

        let anonymous = OfflineHolding {
            holder_name: None,
            ..named
        };
        assert_eq!(anonymous.holder_label(), holder.to_string());
    }
}
