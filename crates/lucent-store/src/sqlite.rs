//! `SQLite` pool configuration and opening.
//!
//! The ledger lives in a single `SQLite` file. The pool is capped at
//! one connection with idle reclamation disabled: that one connection
//! is the store's mutual-exclusion primitive, so operations may be
//! called concurrently from any task yet execute as a strict serial
//! history.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StoreError;

/// Default time to wait for the (single) connection when acquiring.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Configuration for the ledger's backing file.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the ledger database file.
    pub path: PathBuf,
    /// How long an operation waits for the shared connection before
    /// failing.
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    /// Create a configuration for the given ledger file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Set the connection acquire timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Open the single-connection pool for a ledger file.
///
/// Creates the parent directory if needed and the database file itself
/// on first open.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the backing location cannot
/// be prepared or the connection cannot be established.
pub async fn open_pool(config: &StoreConfig) -> Result<SqlitePool, StoreError> {
    prepare_parent(&config.path)?;

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = pool_options(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|source| StoreError::Unavailable {
            reason: format!("cannot open ledger file {}: {source}", config.path.display()),
        })?;

    tracing::info!(path = %config.path.display(), "Opened ledger database");
    Ok(pool)
}

/// Open a single-connection pool backed by in-memory `SQLite`.
///
/// Used by tests; the database lives exactly as long as the pool's one
/// connection, which is why idle reclamation must stay disabled.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the connection cannot be
/// established.
pub async fn open_memory_pool() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|source| StoreError::Unavailable {
            reason: format!("cannot configure in-memory ledger: {source}"),
        })?
        .foreign_keys(true);

    pool_options(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
        .connect_with(options)
        .await
        .map_err(|source| StoreError::Unavailable {
            reason: format!("cannot open in-memory ledger: {source}"),
        })
}

/// Shared pool options: one connection, never reclaimed.
fn pool_options(acquire_timeout: Duration) -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(acquire_timeout)
        .idle_timeout(None)
        .max_lifetime(None)
}

/// Create the parent directory of the ledger file if it is missing.
fn prepare_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Unavailable {
                reason: format!(
                    "cannot create ledger directory {}: {source}",
                    parent.display()
                ),
            })?;
        }
    }
    Ok(())
}
