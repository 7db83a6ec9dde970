//! Error types for the audit engine.

use lucent_store::StoreError;
use lucent_world::LiveAccessError;

/// Errors that fail an audit run.
///
/// Any error here means the run produced no report and performed no
/// repairs; there are no partial audits.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A ledger query failed while gathering the snapshot.
    #[error("ledger query failed: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The synchronous world-inspection phase failed (loop shut down,
    /// handoff timed out, or the task was cancelled).
    #[error("world inspection failed: {source}")]
    WorldScan {
        /// The underlying live-access error.
        #[from]
        source: LiveAccessError,
    },
}
