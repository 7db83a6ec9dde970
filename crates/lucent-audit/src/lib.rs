//! Audit engine for the Lucent crystal ledger.
//!
//! The tracker is fast and best-effort; the audit is slow and
//! authoritative. A run produces a point-in-time reconciliation between
//! what the ledger claims and what the world actually contains:
//!
//! 1. every `ACTIVE` entry is classified `CONFIRMED`, `MISSING`, or
//!    `UNLOADED` against its recorded position;
//! 2. an identity-to-context index is built from online holders'
//!    containers, loose items, loaded storage fixtures, and the
//!    offline-holding snapshot;
//! 3. `HELD` entries partition into `LOCATED` and `UNACCOUNTED`;
//! 4. indexed identities the ledger does not expect to be held are
//!    flagged `UNEXPECTED` with their actual status.
//!
//! Repairs are explicit and operator-triggered, never automatic. Any
//! failure of the world-inspection phase fails the whole audit and
//! performs zero repairs.
//!
//! # Modules
//!
//! - [`scan`] -- The synchronous world scan (runs on the control loop)
//! - [`runner`] -- Orchestration: snapshot, scan handoff, partition
//! - [`report`] -- The report structure and bounded text rendering
//! - [`repair`] -- Operator-triggered `fix-missing` / `fix-unexpected`
//! - [`error`] -- Audit error type

pub mod error;
pub mod repair;
pub mod report;
pub mod runner;
pub mod scan;

// Re-export primary types for convenience.
pub use error::AuditError;
pub use repair::{RepairOutcome, fix_missing, fix_unexpected};
pub use report::{AuditReport, UnexpectedCrystal};
pub use runner::run_audit;
pub use scan::{WorldScan, scan_world};
