//! Audit orchestration: snapshot, scan handoff, and partitioning.
//!
//! Runs on a background worker. The only moment it touches live state
//! is the bounded handoff that submits [`scan_world`] to the control
//! loop; everything before and after is ledger queries and pure
//! computation. No ordering is guaranteed against concurrent tracker
//! propagation -- the audit may observe physical state the ledger has
//! not absorbed yet, which is precisely what the repair actions exist
//! to correct.

use std::collections::BTreeSet;

use lucent_store::LedgerStore;
use lucent_types::{CrystalId, CrystalRecord, CrystalStatus, OfflineHolding};
use lucent_world::live::LiveHandle;

use crate::error::AuditError;
use crate::report::{AuditReport, UnexpectedCrystal};
use crate::scan::scan_world;

/// Run a full audit: ledger snapshot, world scan, reconciliation.
///
/// # Errors
///
/// Returns [`AuditError`] if any snapshot query or the world-inspection
/// handoff fails; a failed run performs no repairs and yields no
/// partial report.
pub async fn run_audit(store: &LedgerStore, live: &LiveHandle) -> Result<AuditReport, AuditError> {
    // Ledger snapshot (background side).
    let totals = store.count_by_status().await?;
    let active = store.list_by_status(&[CrystalStatus::Active]).await?;
    let held = store.list_by_status(&[CrystalStatus::Held]).await?;
    let offline = store.list_offline_holdings().await?;

    tracing::debug!(
        active = active.len(),
        held = held.len(),
        offline = offline.len(),
        "Audit snapshot gathered, submitting world scan"
    );

    // World scan (control-loop side, bounded handoff).
    let scan = live
        .with_world(move |world| scan_world(&*world, active))
        .await?;

    // Merge the offline snapshot into the context index.
    let mut contexts = scan.contexts;
    for holding in &offline {
        contexts
            .entry(holding.crystal)
            .or_default()
            .push(offline_context(holding));
    }

    // Partition HELD into located and unaccounted.
    let held_ids: BTreeSet<CrystalId> = held.iter().map(|entry| entry.id).collect();
    let located_held = held
        .iter()
        .filter(|entry| contexts.contains_key(&entry.id))
        .count();
    let unaccounted_held: Vec<CrystalRecord> = held
        .iter()
        .filter(|entry| !contexts.contains_key(&entry.id))
        .cloned()
        .collect();

    // Observed identities the ledger does not expect to be held,
    // annotated with their actual status for operator review. A failed
    // point lookup annotates the entry instead of aborting the audit.
    let mut unexpected = Vec::new();
    for (id, context_lines) in &contexts {
        if held_ids.contains(id) {
            continue;
        }
        let status_note = match store.find_by_id(*id).await {
            Ok(Some(record)) => record.status.to_string(),
            Ok(None) => "UNKNOWN".to_owned(),
            Err(error) => format!("ERROR: {error}"),
        };
        unexpected.push(UnexpectedCrystal {
            id: *id,
            status_note,
            contexts: context_lines.clone(),
        });
    }

    Ok(AuditReport {
        totals,
        confirmed_active: scan.confirmed_active,
        missing_active: scan.missing_active,
        unloaded_active: scan.unloaded_active,
        held_total: held.len(),
        located_held,
        unaccounted_held,
        unexpected,
    })
}

/// Context line for a crystal recorded in the offline snapshot.
fn offline_context(holding: &OfflineHolding) -> String {
    match holding.details.as_deref() {
        Some(details) if !details.is_empty() => {
            format!("Offline holder {} - {details}", holding.holder_label())
        }
        _ => format!("Offline holder {}", holding.holder_label()),
    }
}
