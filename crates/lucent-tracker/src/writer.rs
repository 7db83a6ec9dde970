//! Background worker that applies tracker-detected changes to the ledger.
//!
//! Detection happens on the control loop; persistence happens here.
//! Commands flow through an unbounded channel to a single task that
//! calls the store. Failed writes are logged and NOT retried -- the
//! audit engine reconciles whatever drift they leave behind.
//!
//! Shutdown is cooperative: dropping every [`LedgerWriter`] clone closes
//! the channel, the task drains what is already queued, and only then
//! exits. In-flight writes finish; nothing is forcibly cancelled.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lucent_store::LedgerStore;
use lucent_types::{CrystalId, EventKind, HolderId, Position};

/// A ledger write requested by the tracker.
#[derive(Debug)]
pub enum LedgerCommand {
    /// Mark whatever active crystal is recorded at a position as lost.
    LostAtPosition {
        /// The destroyed fixture's position.
        position: Position,
        /// Event kind to attribute.
        kind: EventKind,
        /// Free-text event detail.
        details: Option<String>,
    },
    /// Mark a specific crystal as lost.
    Lost {
        /// The lost crystal.
        crystal: CrystalId,
        /// Where it was last seen, if known.
        position: Option<Position>,
        /// Event kind to attribute.
        kind: EventKind,
        /// Free-text event detail.
        details: Option<String>,
    },
    /// Replace a holder's offline-holding snapshot wholesale.
    ReplaceOfflineHoldings {
        /// The disconnected holder.
        holder: HolderId,
        /// Their display name, if known.
        holder_name: Option<String>,
        /// Per-crystal context lines captured at disconnect.
        contexts: BTreeMap<CrystalId, Vec<String>>,
    },
    /// Clear a holder's offline-holding snapshot (reconnect).
    ClearOfflineHoldings {
        /// The reconnected holder.
        holder: HolderId,
    },
}

/// Sending side of the writer channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    sender: mpsc::UnboundedSender<LedgerCommand>,
}

impl LedgerWriter {
    /// Enqueue a command for the background writer.
    ///
    /// A closed channel (writer already shut down) is logged and
    /// swallowed; at that point the audit engine is the recovery path.
    pub fn send(&self, command: LedgerCommand) {
        if self.sender.send(command).is_err() {
            tracing::warn!("Ledger writer is closed, dropping command");
        }
    }
}

/// Spawn the background writer task for a store.
///
/// Returns the sending handle and the task handle. The task exits once
/// every [`LedgerWriter`] clone has been dropped and the queue has
/// drained.
pub fn spawn_writer(store: LedgerStore) -> (LedgerWriter, JoinHandle<()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_writer(store, receiver));
    (LedgerWriter { sender }, handle)
}

/// Drain the command queue until every sender is gone.
async fn run_writer(store: LedgerStore, mut receiver: mpsc::UnboundedReceiver<LedgerCommand>) {
    while let Some(command) = receiver.recv().await {
        apply(&store, command).await;
    }
    tracing::debug!("Ledger writer drained and stopped");
}

/// Apply one command, logging (never propagating) failures.
async fn apply(store: &LedgerStore, command: LedgerCommand) {
    match command {
        LedgerCommand::LostAtPosition {
            position,
            kind,
            details,
        } => {
            let record = match store.find_active_by_location(&position).await {
                Ok(Some(record)) => record,
                Ok(None) => return,
                Err(error) => {
                    tracing::warn!(position = %position, %error, "Failed to look up crystal at position");
                    return;
                }
            };
            if let Err(error) = store
                .mark_lost(record.id, Some(&position), &kind, details.as_deref())
                .await
            {
                tracing::warn!(crystal = %record.id, %error, "Failed to mark crystal lost");
            }
        }
        LedgerCommand::Lost {
            crystal,
            position,
            kind,
            details,
        } => {
            if let Err(error) = store
                .mark_lost(crystal, position.as_ref(), &kind, details.as_deref())
                .await
            {
                tracing::warn!(crystal = %crystal, %error, "Failed to mark crystal lost");
            }
        }
        LedgerCommand::ReplaceOfflineHoldings {
            holder,
            holder_name,
            contexts,
        } => {
            if let Err(error) = store
                .replace_offline_holdings(holder, holder_name.as_deref(), &contexts)
                .await
            {
                tracing::warn!(holder = %holder, %error, "Failed to record offline holdings");
            }
        }
        LedgerCommand::ClearOfflineHoldings { holder } => {
            if let Err(error) = store.clear_offline_holdings(holder).await {
                tracing::warn!(holder = %holder, %error, "Failed to clear offline holdings");
            }
        }
    }
}
