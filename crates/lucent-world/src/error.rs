//! Error types for the `lucent-world` crate.

use std::time::Duration;

/// Errors raised by the live-access handoff.
///
/// The control loop owning the world is the only place live state may
/// be touched; a background worker reaches it through a bounded
/// handoff, and every way that handoff can fail is spelled out here so
/// callers degrade instead of stalling.
#[derive(Debug, thiserror::Error)]
pub enum LiveAccessError {
    /// The control loop has shut down and no longer accepts tasks.
    #[error("live world access is closed")]
    Closed,

    /// The control loop did not execute the task within the deadline.
    #[error("live world access timed out after {waited:?}")]
    Timeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// The task was accepted but dropped before producing a result.
    #[error("live world task was cancelled before completion")]
    Cancelled,
}
