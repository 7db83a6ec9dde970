//! The [`LedgerStore`]: every operation the crystal ledger supports.
//!
//! Status changes are conditional transitions: an `UPDATE` guarded by
//! `status IN (...allowed sources...)` that reports whether it fired.
//! Two racing attempts at the same logical transition therefore resolve
//! to exactly one success and one clean no-op, with no external
//! locking. The single-connection pool (see [`crate::sqlite`])
//! serializes everything else.
//!
//! Event appends and offline-row cleanup that ride along with a
//! successful transition are best-effort: their failure is logged and
//! the transition's success still stands. The audit engine is the
//! authority of last resort for anything that slips through.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use lucent_types::{
    AreaRecord, CellCoord, CrystalEvent, CrystalId, CrystalRecord, CrystalStatus, EventKind,
    HolderId, OfflineHolding, Position, SupplySnapshot,
};

use crate::error::StoreError;
use crate::sqlite::{self, StoreConfig};

/// The persistent crystal ledger.
///
/// Cheap to clone; all clones share the same single-connection pool and
/// readiness flag.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
    ready: Arc<AtomicBool>,
}

impl LedgerStore {
    /// Open the ledger file described by `config`.
    ///
    /// The store is not usable until [`initialize`](Self::initialize)
    /// has run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backing location
    /// cannot be prepared.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = sqlite::open_pool(config).await?;
        Ok(Self {
            pool,
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open an in-memory ledger (tests).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the connection cannot be
    /// established.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = sqlite::open_memory_pool().await?;
        Ok(Self {
            pool,
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create the schema and normalize legacy rows. Idempotent.
    ///
    /// Every DDL statement uses `IF NOT EXISTS` and the whole pass runs
    /// in one transaction, so a failure leaves no half-migrated state.
    /// Legacy status spellings (`active`, `closed`) are rewritten to
    /// the uppercase vocabulary in the same pass.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transaction`] if the migration fails (and
    /// rolls back).
    pub async fn initialize(&self) -> Result<(), StoreError> {
        const SCHEMA: &[&str] = &[
            "CREATE TABLE IF NOT EXISTS crystals (
                id TEXT PRIMARY KEY,
                area_id TEXT,
                world TEXT,
                x INTEGER,
                y INTEGER,
                z INTEGER,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_crystals_location ON crystals(world, x, y, z)",
            "CREATE INDEX IF NOT EXISTS idx_crystals_status ON crystals(status)",
            "UPDATE crystals SET status = 'ACTIVE' WHERE status = 'active'",
            "UPDATE crystals SET status = 'REDEEMED' WHERE status = 'closed'",
            "CREATE TABLE IF NOT EXISTS crystal_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crystal_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                details TEXT,
                occurred_at INTEGER NOT NULL,
                FOREIGN KEY (crystal_id) REFERENCES crystals(id) ON DELETE CASCADE
            )",
            "CREATE INDEX IF NOT EXISTS idx_crystal_events_crystal
                ON crystal_events(crystal_id)",
            "CREATE TABLE IF NOT EXISTS offline_holdings (
                crystal_id TEXT PRIMARY KEY,
                holder_id TEXT NOT NULL,
                holder_name TEXT,
                details TEXT,
                recorded_at INTEGER NOT NULL,
                FOREIGN KEY (crystal_id) REFERENCES crystals(id) ON DELETE CASCADE
            )",
            "CREATE INDEX IF NOT EXISTS idx_offline_holdings_holder
                ON offline_holdings(holder_id)",
            "CREATE TABLE IF NOT EXISTS areas (
                id TEXT PRIMARY KEY,
                world TEXT NOT NULL,
                target_count INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS area_cells (
                area_id TEXT NOT NULL,
                cell_x INTEGER NOT NULL,
                cell_y INTEGER NOT NULL,
                PRIMARY KEY (area_id, cell_x, cell_y),
                FOREIGN KEY (area_id) REFERENCES areas(id) ON DELETE CASCADE
            )",
        ];

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("initializing schema", e))?;

        for &statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::transaction("initializing schema", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::transaction("initializing schema", e))?;

        self.ready.store(true, Ordering::Release);
        tracing::info!("Ledger schema initialized");
        Ok(())
    }

    /// Return a reference to the underlying pool.
    ///
    /// Intended for diagnostics and tests; ledger writes should go
    /// through the typed operations.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully. In-flight operations finish first.
    pub async fn close(&self) {
        self.ready.store(false, Ordering::Release);
        self.pool.close().await;
        tracing::info!("Ledger store closed");
    }

    // -----------------------------------------------------------------
    // Areas
    // -----------------------------------------------------------------

    /// Whether an area with the given id exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the probe fails.
    pub async fn area_exists(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_ready()?;
        let row = sqlx::query("SELECT 1 FROM areas WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::query("probing area existence", e))?;
        Ok(row.is_some())
    }

    /// Create an area and its cell footprint atomically.
    ///
    /// Either the area row and every cell row land together, or nothing
    /// does.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for an empty cell set or a
    /// duplicate id, [`StoreError::Transaction`] if the insert fails
    /// (rolled back; zero rows remain for the id).
    pub async fn create_area(&self, area: &AreaRecord) -> Result<(), StoreError> {
        self.ensure_ready()?;

        if area.cells.is_empty() {
            return Err(StoreError::Invalid {
                reason: "cannot create an area without any cells".to_owned(),
            });
        }
        if self.area_exists(&area.id).await? {
            return Err(StoreError::Invalid {
                reason: format!("area '{}' already exists", area.id),
            });
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("creating area", e))?;

        sqlx::query("INSERT INTO areas (id, world, target_count) VALUES (?, ?, ?)")
            .bind(&area.id)
            .bind(&area.world)
            .bind(i64::from(area.target_count))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::transaction("creating area", e))?;

        for cell in &area.cells {
            sqlx::query("INSERT INTO area_cells (area_id, cell_x, cell_y) VALUES (?, ?, ?)")
                .bind(&area.id)
                .bind(cell.x)
                .bind(cell.y)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::transaction("creating area", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::transaction("creating area", e))?;

        tracing::info!(area = %area.id, cells = area.cells.len(), "Created ledger area");
        Ok(())
    }

    /// List every area with its full cell set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if either query fails.
    pub async fn list_areas(&self) -> Result<Vec<AreaRecord>, StoreError> {
        self.ensure_ready()?;

        let area_rows = sqlx::query("SELECT id, world, target_count FROM areas ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("listing areas", e))?;

        let mut areas = Vec::with_capacity(area_rows.len());
        for row in &area_rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| StoreError::query("listing areas", e))?;
            let world: String = row
                .try_get("world")
                .map_err(|e| StoreError::query("listing areas", e))?;
            let target: i64 = row
                .try_get("target_count")
                .map_err(|e| StoreError::query("listing areas", e))?;

            let cell_rows = sqlx::query(
                "SELECT cell_x, cell_y FROM area_cells WHERE area_id = ? ORDER BY cell_x, cell_y",
            )
            .bind(&id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("loading area cells", e))?;

            let mut cells = Vec::with_capacity(cell_rows.len());
            for cell_row in &cell_rows {
                let x: i32 = cell_row
                    .try_get("cell_x")
                    .map_err(|e| StoreError::query("loading area cells", e))?;
                let y: i32 = cell_row
                    .try_get("cell_y")
                    .map_err(|e| StoreError::query("loading area cells", e))?;
                cells.push(CellCoord::new(x, y));
            }

            areas.push(AreaRecord {
                id,
                world,
                target_count: u32::try_from(target).unwrap_or(0),
                cells,
            });
        }

        Ok(areas)
    }

    // -----------------------------------------------------------------
    // Minting and transitions
    // -----------------------------------------------------------------

    /// Mint a new crystal as `Active` at the given position.
    ///
    /// Returns the new crystal's identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the insert fails.
    pub async fn mint(
        &self,
        area_id: Option<&str>,
        position: &Position,
    ) -> Result<CrystalId, StoreError> {
        self.ensure_ready()?;

        let id = CrystalId::new();
        let now = epoch_now();

        sqlx::query(
            "INSERT INTO crystals (id, area_id, world, x, y, z, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(area_id)
        .bind(&position.world)
        .bind(position.x)
        .bind(position.y)
        .bind(position.z)
        .bind(CrystalStatus::Active.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("recording minted crystal", e))?;

        tracing::debug!(crystal = %id, position = %position, "Minted crystal");
        Ok(id)
    }

    /// Transition `Active -> Held`. The recorded location is cleared: a
    /// held crystal has no world position.
    ///
    /// Returns `true` only if the transition fired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the update fails.
    pub async fn mark_held(&self, id: CrystalId) -> Result<bool, StoreError> {
        self.update_status(id, CrystalStatus::Held, None, &[CrystalStatus::Active])
            .await
    }

    /// Transition `{Active, Held} -> Lost`, recording the loss site (or
    /// clearing the location when unknown) and appending one event.
    ///
    /// A successful transition also removes the crystal's offline
    /// holding row; a crystal that left `Held` is no longer held
    /// offline. Event append and offline cleanup are best-effort.
    ///
    /// Returns `true` only if the transition fired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the conditional update fails.
    pub async fn mark_lost(
        &self,
        id: CrystalId,
        position: Option<&Position>,
        kind: &EventKind,
        details: Option<&str>,
    ) -> Result<bool, StoreError> {
        let updated = self
            .update_status(
                id,
                CrystalStatus::Lost,
                position,
                &[CrystalStatus::Active, CrystalStatus::Held],
            )
            .await?;

        if updated {
            self.clear_offline_row(id).await;
            self.append_event(id, kind, details).await;
        }
        Ok(updated)
    }

    /// Transition `Held -> Redeemed`, appending one event.
    ///
    /// A successful transition also removes the crystal's offline
    /// holding row. Event append and offline cleanup are best-effort.
    ///
    /// Returns `true` only if the transition fired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the conditional update fails.
    pub async fn mark_redeemed(
        &self,
        id: CrystalId,
        kind: &EventKind,
        details: Option<&str>,
    ) -> Result<bool, StoreError> {
        let updated = self
            .update_status(id, CrystalStatus::Redeemed, None, &[CrystalStatus::Held])
            .await?;

        if updated {
            self.clear_offline_row(id).await;
            self.append_event(id, kind, details).await;
        }
        Ok(updated)
    }

    // -----------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------

    /// Find the `Active` crystal recorded at an exact position, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the lookup fails.
    pub async fn find_active_by_location(
        &self,
        position: &Position,
    ) -> Result<Option<CrystalRecord>, StoreError> {
        self.ensure_ready()?;

        let row = sqlx::query(
            "SELECT id, area_id, status, world, x, y, z
             FROM crystals
             WHERE status = ? AND world = ? AND x = ? AND y = ? AND z = ?
             LIMIT 1",
        )
        .bind(CrystalStatus::Active.as_str())
        .bind(&position.world)
        .bind(position.x)
        .bind(position.y)
        .bind(position.z)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::query("looking up crystal by location", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Find a crystal by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the lookup fails.
    pub async fn find_by_id(&self, id: CrystalId) -> Result<Option<CrystalRecord>, StoreError> {
        self.ensure_ready()?;

        let row = sqlx::query(
            "SELECT id, area_id, status, world, x, y, z FROM crystals WHERE id = ? LIMIT 1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::query("looking up crystal by id", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Count crystals per status.
    ///
    /// The counts always partition the table:
    /// `active + held + lost + redeemed == total row count`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the aggregation fails.
    pub async fn count_by_status(&self) -> Result<SupplySnapshot, StoreError> {
        self.ensure_ready()?;

        let rows = sqlx::query("SELECT status, COUNT(*) AS total FROM crystals GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("counting crystals by status", e))?;

        let mut snapshot = SupplySnapshot::default();
        for row in &rows {
            let raw_status: String = row
                .try_get("status")
                .map_err(|e| StoreError::query("counting crystals by status", e))?;
            let total: i64 = row
                .try_get("total")
                .map_err(|e| StoreError::query("counting crystals by status", e))?;

            match CrystalStatus::parse(&raw_status) {
                Some(status) => {
                    snapshot.set_count(status, u64::try_from(total).unwrap_or(0));
                }
                None => {
                    tracing::warn!(status = %raw_status, "Unknown crystal status in ledger");
                }
            }
        }

        Ok(snapshot)
    }

    /// List crystals whose status is in the given set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for an empty status set,
    /// [`StoreError::Query`] if the query fails.
    pub async fn list_by_status(
        &self,
        statuses: &[CrystalStatus],
    ) -> Result<Vec<CrystalRecord>, StoreError> {
        self.ensure_ready()?;

        if statuses.is_empty() {
            return Err(StoreError::Invalid {
                reason: "at least one status must be provided".to_owned(),
            });
        }

        let sql = format!(
            "SELECT id, area_id, status, world, x, y, z FROM crystals WHERE status IN ({})",
            placeholders(statuses.len()),
        );

        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("listing crystals by status", e))?;

        rows.iter().map(record_from_row).collect()
    }

    /// List the append-only event log of one crystal, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub async fn list_events(&self, id: CrystalId) -> Result<Vec<CrystalEvent>, StoreError> {
        self.ensure_ready()?;

        let rows = sqlx::query(
            "SELECT id, crystal_id, event_type, details, occurred_at
             FROM crystal_events
             WHERE crystal_id = ?
             ORDER BY id",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("listing crystal events", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            let row_id: i64 = row
                .try_get("id")
                .map_err(|e| StoreError::query("listing crystal events", e))?;
            let raw_crystal: String = row
                .try_get("crystal_id")
                .map_err(|e| StoreError::query("listing crystal events", e))?;
            let crystal = CrystalId::parse(&raw_crystal).ok_or_else(|| StoreError::Corrupt {
                reason: format!("event {row_id} references malformed crystal id {raw_crystal}"),
            })?;
            let raw_kind: String = row
                .try_get("event_type")
                .map_err(|e| StoreError::query("listing crystal events", e))?;
            let details: Option<String> = row
                .try_get("details")
                .map_err(|e| StoreError::query("listing crystal events", e))?;
            let occurred_at: i64 = row
                .try_get("occurred_at")
                .map_err(|e| StoreError::query("listing crystal events", e))?;

            events.push(CrystalEvent {
                id: row_id,
                crystal,
                kind: EventKind::parse(&raw_kind),
                details,
                occurred_at,
            });
        }

        Ok(events)
    }

    // -----------------------------------------------------------------
    // Offline holdings
    // -----------------------------------------------------------------

    /// Replace a holder's offline-holding rows wholesale.
    ///
    /// Delete-then-insert in one transaction: the last call for a
    /// holder wins completely. Each crystal's context lines are joined
    /// into a single detail string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transaction`] if the replacement fails
    /// (rolled back; the previous rows remain).
    pub async fn replace_offline_holdings(
        &self,
        holder: HolderId,
        holder_name: Option<&str>,
        contexts: &BTreeMap<CrystalId, Vec<String>>,
    ) -> Result<(), StoreError> {
        self.ensure_ready()?;

        let now = epoch_now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("replacing offline holdings", e))?;

        sqlx::query("DELETE FROM offline_holdings WHERE holder_id = ?")
            .bind(holder.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::transaction("replacing offline holdings", e))?;

        for (crystal, lines) in contexts {
            let details = join_details(lines);
            sqlx::query(
                "INSERT INTO offline_holdings
                     (crystal_id, holder_id, holder_name, details, recorded_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(crystal.to_string())
            .bind(holder.to_string())
            .bind(holder_name)
            .bind(details)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::transaction("replacing offline holdings", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::transaction("replacing offline holdings", e))?;

        tracing::debug!(holder = %holder, crystals = contexts.len(), "Replaced offline holdings");
        Ok(())
    }

    /// Remove every offline-holding row recorded for a holder.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the delete fails.
    pub async fn clear_offline_holdings(&self, holder: HolderId) -> Result<(), StoreError> {
        self.ensure_ready()?;

        sqlx::query("DELETE FROM offline_holdings WHERE holder_id = ?")
            .bind(holder.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::query("clearing offline holdings", e))?;
        Ok(())
    }

    /// List the full offline-holding snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails,
    /// [`StoreError::Corrupt`] for rows with malformed ids.
    pub async fn list_offline_holdings(&self) -> Result<Vec<OfflineHolding>, StoreError> {
        self.ensure_ready()?;

        let rows = sqlx::query(
            "SELECT crystal_id, holder_id, holder_name, details, recorded_at
             FROM offline_holdings",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("listing offline holdings", e))?;

        let mut holdings = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw_crystal: String = row
                .try_get("crystal_id")
                .map_err(|e| StoreError::query("listing offline holdings", e))?;
            let crystal = CrystalId::parse(&raw_crystal).ok_or_else(|| StoreError::Corrupt {
                reason: format!("offline holding references malformed crystal id {raw_crystal}"),
            })?;
            let raw_holder: String = row
                .try_get("holder_id")
                .map_err(|e| StoreError::query("listing offline holdings", e))?;
            let holder = HolderId::parse(&raw_holder).ok_or_else(|| StoreError::Corrupt {
                reason: format!("offline holding references malformed holder id {raw_holder}"),
            })?;
            let holder_name: Option<String> = row
                .try_get("holder_name")
                .map_err(|e| StoreError::query("listing offline holdings", e))?;
            let details: Option<String> = row
                .try_get("details")
                .map_err(|e| StoreError::query("listing offline holdings", e))?;
            let recorded_at: i64 = row
                .try_get("recorded_at")
                .map_err(|e| StoreError::query("listing offline holdings", e))?;

            holdings.push(OfflineHolding {
                crystal,
                holder,
                holder_name,
                details,
                recorded_at,
            });
        }

        Ok(holdings)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// The conditional transition primitive.
    ///
    /// Updates status, timestamp, and all four location columns (to the
    /// given position, or to NULL) in one statement guarded by the
    /// allowed source set. Returns whether a row changed.
    async fn update_status(
        &self,
        id: CrystalId,
        new_status: CrystalStatus,
        position: Option<&Position>,
        allowed: &[CrystalStatus],
    ) -> Result<bool, StoreError> {
        self.ensure_ready()?;

        let sql = format!(
            "UPDATE crystals
             SET status = ?, updated_at = ?, world = ?, x = ?, y = ?, z = ?
             WHERE id = ? AND status IN ({})",
            placeholders(allowed.len()),
        );

        let mut query = sqlx::query(&sql)
            .bind(new_status.as_str())
            .bind(epoch_now())
            .bind(position.map(|p| p.world.as_str()))
            .bind(position.map(|p| p.x))
            .bind(position.map(|p| p.y))
            .bind(position.map(|p| p.z))
            .bind(id.to_string());
        for status in allowed {
            query = query.bind(status.as_str());
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::query("updating crystal status", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Append one event row. Best-effort: failure is logged, not
    /// propagated, so a committed transition is never reported as
    /// failed because its annotation could not be written.
    async fn append_event(&self, id: CrystalId, kind: &EventKind, details: Option<&str>) {
        let result = sqlx::query(
            "INSERT INTO crystal_events (crystal_id, event_type, details, occurred_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(kind.as_str())
        .bind(details)
        .bind(epoch_now())
        .execute(&self.pool)
        .await;

        if let Err(error) = result {
            tracing::warn!(crystal = %id, kind = %kind, %error, "Failed to log ledger event");
        }
    }

    /// Delete a single crystal's offline-holding row. Best-effort.
    async fn clear_offline_row(&self, id: CrystalId) {
        let result = sqlx::query("DELETE FROM offline_holdings WHERE crystal_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await;

        if let Err(error) = result {
            tracing::warn!(crystal = %id, %error, "Failed to clear offline record for crystal");
        }
    }

    /// Fail with [`StoreError::Unavailable`] before `initialize()`.
    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                reason: "ledger has not been initialized".to_owned(),
            })
        }
    }
}

/// Current time as epoch seconds.
fn epoch_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build a `?, ?, ...` placeholder list of the given length.
fn placeholders(count: usize) -> String {
    let mut list = String::new();
    for index in 0..count {
        if index > 0 {
            list.push_str(", ");
        }
        list.push('?');
    }
    list
}

/// Decode a crystal row into a [`CrystalRecord`].
///
/// The four location columns are all-or-nothing: a row with only some
/// of them set decodes to no position at all.
fn record_from_row(row: &SqliteRow) -> Result<CrystalRecord, StoreError> {
    let raw_id: String = row
        .try_get("id")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;
    let id = CrystalId::parse(&raw_id).ok_or_else(|| StoreError::Corrupt {
        reason: format!("crystal row has malformed id {raw_id}"),
    })?;

    let area_id: Option<String> = row
        .try_get("area_id")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;

    let raw_status: String = row
        .try_get("status")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;
    let status = CrystalStatus::parse(&raw_status).ok_or_else(|| StoreError::Corrupt {
        reason: format!("crystal {raw_id} has unknown status {raw_status}"),
    })?;

    let world: Option<String> = row
        .try_get("world")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;
    let x: Option<i32> = row
        .try_get("x")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;
    let y: Option<i32> = row
        .try_get("y")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;
    let z: Option<i32> = row
        .try_get("z")
        .map_err(|e| StoreError::query("decoding crystal row", e))?;

    let position = match (world, x, y, z) {
        (Some(world), Some(x), Some(y), Some(z)) => Some(Position { world, x, y, z }),
        _ => None,
    };

    Ok(CrystalRecord {
        id,
        area_id,
        status,
        position,
    })
}

/// Join context lines into the single detail column, `None` when empty.
fn join_details(lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }

    #[test]
    fn join_details_empty_is_null() {
        assert_eq!(join_details(&[]), None);
        assert_eq!(
            join_details(&["slot 1".to_owned(), "slot 2".to_owned()]),
            Some("slot 1; slot 2".to_owned()),
        );
    }
}
