//! Operator-triggered repair actions.
//!
//! Repairs are never automatic: an operator reviews a report, then
//! explicitly applies `fix-missing` or `fix-unexpected` against it.
//! Both are per-entry best-effort -- one entry's failure (including a
//! conditional transition that no longer fires because the world moved
//! on) is recorded and reported, never aborting the rest of the batch.

use lucent_store::LedgerStore;
use lucent_types::EventKind;

use crate::report::AuditReport;

/// The outcome of a repair batch.
#[derive(Debug, Default)]
pub struct RepairOutcome {
    /// Entries whose transition fired.
    pub fixed: u64,
    /// Per-entry failure annotations for the rest.
    pub failures: Vec<String>,
}

/// Transition every MISSING active entry to LOST.
///
/// Each success appends an audit-fix event carrying the entry's last
/// known location. Re-running the audit afterwards reports zero
/// missing entries for every identity that succeeded here.
pub async fn fix_missing(store: &LedgerStore, report: &AuditReport) -> RepairOutcome {
    let mut outcome = RepairOutcome::default();

    for entry in &report.missing_active {
        let details = format!(
            "Audit fix missing active - last known {}",
            entry.describe_position(),
        );
        match store
            .mark_lost(entry.id, None, &EventKind::AuditFix, Some(&details))
            .await
        {
            Ok(true) => outcome.fixed = outcome.fixed.saturating_add(1),
            Ok(false) => outcome
                .failures
                .push(format!("{} (no status change)", entry.id)),
            Err(error) => outcome.failures.push(format!("{} ({error})", entry.id)),
        }
    }

    tracing::info!(
        fixed = outcome.fixed,
        failed = outcome.failures.len(),
        "Marked missing crystals as lost"
    );
    outcome
}

/// Transition every UNEXPECTED identity to HELD.
///
/// Trusts the physical observation over the stale ledger status: the
/// crystal demonstrably sits in someone's container or on the ground.
pub async fn fix_unexpected(store: &LedgerStore, report: &AuditReport) -> RepairOutcome {
    let mut outcome = RepairOutcome::default();

    for entry in &report.unexpected {
        match store.mark_held(entry.id).await {
            Ok(true) => outcome.fixed = outcome.fixed.saturating_add(1),
            Ok(false) => outcome
                .failures
                .push(format!("{} (no status change)", entry.id)),
            Err(error) => outcome.failures.push(format!("{} ({error})", entry.id)),
        }
    }

    tracing::info!(
        fixed = outcome.fixed,
        failed = outcome.failures.len(),
        "Restored unexpected crystals to held status"
    );
    outcome
}
