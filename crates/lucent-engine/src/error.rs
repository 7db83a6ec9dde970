//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup; `main` propagates it with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// The ledger store failed to open or initialize.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: lucent_store::StoreError,
    },
}
