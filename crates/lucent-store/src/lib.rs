//! Persistent crystal ledger for Lucent, backed by embedded `SQLite`.
//!
//! The ledger is the single source of truth for every crystal's status
//! and event history. It is deliberately boring about concurrency: the
//! connection pool holds exactly ONE connection that is never reclaimed,
//! so every operation is a mutually exclusive critical section and all
//! writes form a strict serial history. Status changes go through
//! conditional `UPDATE ... WHERE status IN (...)` transitions, which
//! makes every transition idempotent and race-safe without any external
//! locking.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time
//! checked) to avoid requiring a live database at build time. All
//! queries are parameterized.
//!
//! # Modules
//!
//! - [`sqlite`] -- Pool configuration and opening
//! - [`ledger`] -- The [`LedgerStore`] and all ledger operations
//! - [`error`] -- The store error taxonomy

pub mod error;
pub mod ledger;
pub mod sqlite;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use ledger::LedgerStore;
pub use sqlite::StoreConfig;
