//! Integration tests for the audit engine.
//!
//! Each test wires a real in-memory ledger and a [`SimWorld`] driven by
//! the same live-access loop the engine binary runs, then audits and
//! (where relevant) repairs.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::items_after_statements,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::task::JoinHandle;

use lucent_audit::{AuditError, fix_missing, fix_unexpected, run_audit};
use lucent_store::LedgerStore;
use lucent_types::{CrystalId, CrystalStatus, EventKind, HolderId, Position};
use lucent_world::live::{self, LiveHandle, LiveQueue};
use lucent_world::{CRYSTAL_MARKER, ItemStack, SimWorld, codec};

/// Open and initialize a fresh in-memory ledger.
async fn setup_store() -> LedgerStore {
    let store = LedgerStore::in_memory().await.expect("open ledger");
    store.initialize().await.expect("initialize ledger");
    store
}

/// A world named "overworld" with its floor at -64.
fn overworld() -> SimWorld {
    let mut world = SimWorld::new();
    world.add_world("overworld", -64);
    world
}

/// A position in the test world.
fn pos(x: i32, y: i32, z: i32) -> Position {
    Position::new("overworld", x, y, z)
}

/// A stack encoding the given crystal.
fn tagged(id: CrystalId) -> ItemStack {
    let mut stack = ItemStack::of("crystal_shard", 1);
    codec::apply_identity(&mut stack, id);
    stack
}

/// Run the control-loop side of the live handoff on a background task
/// until told to stop, then hand the world back.
fn spawn_world_loop(
    mut world: SimWorld,
    mut queue: LiveQueue,
) -> (tokio::sync::oneshot::Sender<()>, JoinHandle<SimWorld>) {
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        loop {
            match stop_rx.try_recv() {
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {}
                _ => break,
            }
            let _ = queue.run_pending(&mut world);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        world
    });
    (stop_tx, handle)
}

/// Run one audit against a world, returning the report and the world.
async fn audit_world(
    store: &LedgerStore,
    world: SimWorld,
) -> (lucent_audit::AuditReport, SimWorld) {
    let (live, queue): (LiveHandle, LiveQueue) = live::channel(Duration::from_secs(1));
    let (stop, loop_handle) = spawn_world_loop(world, queue);
    let report = run_audit(store, &live).await.expect("audit should succeed");
    let _ = stop.send(());
    let world = loop_handle.await.expect("world loop");
    (report, world)
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn audit_classifies_and_partitions_everything() {
    let store = setup_store().await;
    let mut world = overworld();
    let holder = HolderId::new();
    world.connect_holder(holder, "Mira");

    // Confirmed: marker standing where the ledger says.
    let confirmed_pos = pos(0, 64, 0);
    let _confirmed = store.mint(None, &confirmed_pos).await.expect("mint");
    world.place_marker(&confirmed_pos, CRYSTAL_MARKER);

    // Missing: loaded cell, no marker.
    let missing_pos = pos(40, 64, 40);
    let missing = store.mint(None, &missing_pos).await.expect("mint");
    world.set_cell_loaded("overworld", missing_pos.cell(), true);

    // Unloaded: nothing loaded around it.
    let unloaded_pos = pos(-500, 64, -500);
    let unloaded = store.mint(None, &unloaded_pos).await.expect("mint");

    // Held and located: the holder carries it.
    let located = store.mint(None, &pos(1, 64, 0)).await.expect("mint");
    assert!(store.mark_held(located).await.expect("hold"));
    world.set_holder_container(holder, "inventory", vec![Some(tagged(located))]);

    // Held and unaccounted: nowhere to be seen.
    let ghost = store.mint(None, &pos(2, 64, 0)).await.expect("mint");
    assert!(store.mark_held(ghost).await.expect("hold"));

    // Held offline: recorded by a disconnect snapshot.
    let offline = store.mint(None, &pos(3, 64, 0)).await.expect("mint");
    assert!(store.mark_held(offline).await.expect("hold"));
    let mut payload = BTreeMap::new();
    payload.insert(offline, vec!["inventory slot 7".to_owned()]);
    store
        .replace_offline_holdings(HolderId::new(), Some("Brook"), &payload)
        .await
        .expect("record offline");

    let (report, _world) = audit_world(&store, world).await;

    assert_eq!(report.confirmed_active, 1);
    let missing_ids: Vec<CrystalId> = report.missing_active.iter().map(|e| e.id).collect();
    assert_eq!(missing_ids, vec![missing]);
    let unloaded_ids: Vec<CrystalId> = report.unloaded_active.iter().map(|e| e.id).collect();
    assert_eq!(unloaded_ids, vec![unloaded]);

    assert_eq!(report.held_total, 3);
    assert_eq!(report.located_held, 2);
    let unaccounted_ids: Vec<CrystalId> = report.unaccounted_held.iter().map(|e| e.id).collect();
    assert_eq!(unaccounted_ids, vec![ghost]);

    assert!(report.unexpected.is_empty());

    let text = report.to_string();
    assert!(text.contains("Active crystals: 1 confirmed, 1 missing, 1 unloaded"));
    assert!(text.contains("Held crystals: 3 in ledger, 2 located, 1 unaccounted"));
}

#[tokio::test]
async fn observed_non_held_crystals_are_flagged_unexpected() {
    let store = setup_store().await;
    let mut world = overworld();
    let holder = HolderId::new();
    world.connect_holder(holder, "Mira");

    // The ledger thinks this crystal is still placed, but its item
    // sits in an inventory: the pickup never reached the ledger.
    let taken = store.mint(None, &pos(0, 64, 0)).await.expect("mint");
    world.set_cell_loaded("overworld", pos(0, 64, 0).cell(), true);
    world.set_holder_container(holder, "inventory", vec![Some(tagged(taken))]);

    let (report, _world) = audit_world(&store, world).await;

    assert_eq!(report.unexpected.len(), 1);
    let entry = report.unexpected.first().unwrap();
    assert_eq!(entry.id, taken);
    assert_eq!(entry.status_note, "ACTIVE");
    assert_eq!(
        entry.contexts,
        vec!["Holder Mira inventory slot 0".to_owned()],
    );
    // The same crystal is also missing from its recorded site.
    assert_eq!(report.missing_active.first().unwrap().id, taken);
}

// =============================================================================
// Repairs
// =============================================================================

#[tokio::test]
async fn fix_missing_marks_lost_and_reaudit_is_clean() {
    let store = setup_store().await;
    let mut world = overworld();

    let site = pos(12, 64, 12);
    let id = store.mint(None, &site).await.expect("mint");
    world.set_cell_loaded("overworld", site.cell(), true);

    let (report, world) = audit_world(&store, world).await;
    assert_eq!(report.missing_active.len(), 1);

    let outcome = fix_missing(&store, &report).await;
    assert_eq!(outcome.fixed, 1);
    assert!(outcome.failures.is_empty());

    let record = store.find_by_id(id).await.expect("lookup").expect("record");
    assert_eq!(record.status, CrystalStatus::Lost);
    let events = store.list_events(id).await.expect("events");
    assert_eq!(events.len(), 1);
    let event = events.first().unwrap();
    assert_eq!(event.kind, EventKind::AuditFix);
    assert!(event.details.as_deref().unwrap().contains("last known"));

    // A second audit sees no missing entries for the repaired id.
    let (reaudit, _world) = audit_world(&store, world).await;
    assert!(reaudit.missing_active.is_empty());
    assert_eq!(reaudit.totals.lost, 1);
}

#[tokio::test]
async fn fix_missing_failures_do_not_abort_the_batch() {
    let store = setup_store().await;
    let mut world = overworld();

    let first_site = pos(1, 64, 1);
    let second_site = pos(2, 64, 2);
    let first = store.mint(None, &first_site).await.expect("mint");
    let second = store.mint(None, &second_site).await.expect("mint");
    world.set_cell_loaded("overworld", first_site.cell(), true);
    world.set_cell_loaded("overworld", second_site.cell(), true);

    let (report, _world) = audit_world(&store, world).await;
    assert_eq!(report.missing_active.len(), 2);

    // The first entry is redeemed between audit and repair, so its
    // conditional transition no longer fires.
    assert!(store.mark_held(first).await.expect("hold"));
    assert!(
        store
            .mark_redeemed(first, &EventKind::Redeemed, None)
            .await
            .expect("redeem")
    );

    let outcome = fix_missing(&store, &report).await;
    assert_eq!(outcome.fixed, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(
        outcome
            .failures
            .first()
            .unwrap()
            .contains("no status change")
    );

    let record = store
        .find_by_id(second)
        .await
        .expect("lookup")
        .expect("record");
    assert_eq!(record.status, CrystalStatus::Lost);
}

#[tokio::test]
async fn fix_unexpected_restores_held_status() {
    let store = setup_store().await;
    let mut world = overworld();
    let holder = HolderId::new();
    world.connect_holder(holder, "Mira");

    // An ACTIVE crystal observed in an inventory: repairable.
    let taken = store.mint(None, &pos(0, 64, 0)).await.expect("mint");
    world.set_cell_loaded("overworld", pos(0, 64, 0).cell(), true);

    // A LOST crystal observed in the same inventory: the physical
    // observation is real, but HELD is only reachable from ACTIVE, so
    // this entry lands in the failure list for the operator.
    let zombie = store.mint(None, &pos(5, 64, 5)).await.expect("mint");
    assert!(
        store
            .mark_lost(zombie, None, &EventKind::Destroyed, None)
            .await
            .expect("lose")
    );

    world.set_holder_container(
        holder,
        "inventory",
        vec![Some(tagged(taken)), Some(tagged(zombie))],
    );

    let (report, _world) = audit_world(&store, world).await;
    assert_eq!(report.unexpected.len(), 2);

    let outcome = fix_unexpected(&store, &report).await;
    assert_eq!(outcome.fixed, 1);
    assert_eq!(outcome.failures.len(), 1);

    let record = store
        .find_by_id(taken)
        .await
        .expect("lookup")
        .expect("record");
    assert_eq!(record.status, CrystalStatus::Held);
    let record = store
        .find_by_id(zombie)
        .await
        .expect("lookup")
        .expect("record");
    assert_eq!(record.status, CrystalStatus::Lost);
}

// =============================================================================
// Failure semantics
// =============================================================================

#[tokio::test]
async fn audit_fails_cleanly_when_the_live_loop_is_unreachable() {
    let store = setup_store().await;
    let id = store.mint(None, &pos(0, 64, 0)).await.expect("mint");

    // A handle whose queue nobody drains: the handoff must time out
    // and the audit must fail without touching the ledger.
    let (live, _queue) = live::channel(Duration::from_millis(20));
    let result = run_audit(&store, &live).await;
    assert!(matches!(result, Err(AuditError::WorldScan { .. })));

    let record = store.find_by_id(id).await.expect("lookup").expect("record");
    assert_eq!(record.status, CrystalStatus::Active);
}
