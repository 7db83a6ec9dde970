//! Lifecycle tracker for the Lucent crystal ledger.
//!
//! The tracker watches the environment for destructive and transfer
//! events and keeps the ledger's `ACTIVE`/`HELD` population accurate --
//! asynchronously, and without ever blocking the thread that raised an
//! event. It is deliberately best-effort: ledger writes that fail are
//! logged and dropped, because the audit engine is the authority of
//! last resort for anything the tracker misses.
//!
//! Two detection paths run concurrently and redundantly:
//!
//! 1. the **fast path** ([`LifecycleTracker::handle_event`]), driven by
//!    world events on the control loop, and
//! 2. the **slow path**, two independent timers -- a registry poller
//!    and a full-world sweep -- that catch anything the fast path
//!    missed. The sweep scans every loose item regardless of registry
//!    membership; it is the correctness backstop for drift between the
//!    registry and reality.
//!
//! Duplicate detections are harmless: the store's conditional
//! transitions fire at most once per logical change.
//!
//! # Modules
//!
//! - [`registry`] -- In-memory map of tracked item entities
//! - [`writer`] -- Background worker that applies ledger writes
//! - [`offline`] -- Holder disconnect/reconnect snapshot capture
//! - [`tracker`] -- The [`LifecycleTracker`] itself and its timers

pub mod offline;
pub mod registry;
pub mod tracker;
pub mod writer;

// Re-export primary types for convenience.
pub use tracker::{LifecycleTracker, TrackerConfig, TrackerTasks};
pub use writer::{LedgerCommand, LedgerWriter, spawn_writer};
