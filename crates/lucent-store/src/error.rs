//! Error taxonomy for the ledger store.
//!
//! Three broad failure classes -- unavailable, transaction, query --
//! plus two refinements: corrupt rows (the file holds something the
//! vocabulary cannot express) and invalid requests (the caller broke an
//! operation's contract). Transactional operations always roll back
//! fully before surfacing [`StoreError::Transaction`]; the store is
//! never left half-migrated or half-written.

/// Errors that can occur in the ledger store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is not usable: an operation ran before
    /// [`initialize`](crate::ledger::LedgerStore::initialize), or the
    /// backing file location could not be prepared.
    #[error("ledger store unavailable: {reason}")]
    Unavailable {
        /// Why the store cannot serve requests.
        reason: String,
    },

    /// A transactional operation failed and was rolled back.
    #[error("ledger transaction failed while {context}: {source}")]
    Transaction {
        /// What the store was doing.
        context: &'static str,
        /// The underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// A query failed.
    #[error("ledger query failed while {context}: {source}")]
    Query {
        /// What the store was doing.
        context: &'static str,
        /// The underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// A persisted row cannot be decoded into the ledger vocabulary.
    #[error("corrupt ledger row: {reason}")]
    Corrupt {
        /// What was wrong with the row.
        reason: String,
    },

    /// The caller violated an operation's contract.
    #[error("invalid ledger request: {reason}")]
    Invalid {
        /// Which contract was violated.
        reason: String,
    },
}

impl StoreError {
    /// Wrap a database error from a transactional operation.
    pub(crate) const fn transaction(context: &'static str, source: sqlx::Error) -> Self {
        Self::Transaction { context, source }
    }

    /// Wrap a database error from a query.
    pub(crate) const fn query(context: &'static str, source: sqlx::Error) -> Self {
        Self::Query { context, source }
    }
}
