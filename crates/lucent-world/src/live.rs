//! Bounded handoff between background workers and the control loop.
//!
//! The scheduling model has exactly two task categories: work that
//! requires exclusive live-state access, and pure computation. This
//! module is the boundary between them. A [`LiveHandle`] is the
//! background side: it submits a closure and awaits the result under an
//! explicit timeout. A [`LiveQueue`] is the control-loop side: the loop
//! drains pending closures against the world it owns, once per tick.
//!
//! The control loop must never block on background work; background
//! workers may wait on the loop, but only through this bounded handoff,
//! which surfaces a timeout as an error rather than a permanent stall.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::LiveAccessError;
use crate::sim::SimWorld;

/// A boxed task executed against the live world on the control loop.
pub type LiveTask = Box<dyn FnOnce(&mut SimWorld) + Send>;

/// Default deadline for a live-access handoff.
pub const DEFAULT_LIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a connected handle/queue pair with the given handoff timeout.
pub fn channel(timeout: Duration) -> (LiveHandle, LiveQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (LiveHandle { sender, timeout }, LiveQueue { receiver })
}

/// Background-side access to the live world.
///
/// Cheap to clone; every clone submits into the same control loop.
#[derive(Debug, Clone)]
pub struct LiveHandle {
    sender: mpsc::UnboundedSender<LiveTask>,
    timeout: Duration,
}

impl LiveHandle {
    /// Run a closure against the live world and await its result.
    ///
    /// The closure executes on the control loop when it next drains its
    /// queue; the await is bounded by the handle's timeout.
    ///
    /// # Errors
    ///
    /// [`LiveAccessError::Closed`] when the loop has shut down,
    /// [`LiveAccessError::Timeout`] when the deadline passes first, and
    /// [`LiveAccessError::Cancelled`] when the loop dropped the task
    /// without running it to completion.
    pub async fn with_world<R, F>(&self, f: F) -> Result<R, LiveAccessError>
    where
        R: Send + 'static,
        F: FnOnce(&mut SimWorld) -> R + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let task: LiveTask = Box::new(move |world| {
            let _ = result_tx.send(f(world));
        });

        self.sender
            .send(task)
            .map_err(|_| LiveAccessError::Closed)?;

        match tokio::time::timeout(self.timeout, result_rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(LiveAccessError::Cancelled),
            Err(_) => Err(LiveAccessError::Timeout {
                waited: self.timeout,
            }),
        }
    }
}

/// Control-loop side of the handoff: the pending-task queue.
#[derive(Debug)]
pub struct LiveQueue {
    receiver: mpsc::UnboundedReceiver<LiveTask>,
}

impl LiveQueue {
    /// Execute every currently pending task against the world.
    ///
    /// Returns the number of tasks run. Never blocks: tasks submitted
    /// after the drain begins wait for the next tick.
    pub fn run_pending(&mut self, world: &mut SimWorld) -> usize {
        let mut ran = 0_usize;
        while let Ok(task) = self.receiver.try_recv() {
            task(world);
            ran = ran.saturating_add(1);
        }
        ran
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::sim::WorldInspector;

    use super::*;

    #[tokio::test]
    async fn handoff_returns_closure_result() {
        let (handle, mut queue) = channel(Duration::from_millis(200));

        let drainer = tokio::spawn(async move {
            let mut world = SimWorld::new();
            world.add_world("overworld", -64);
            // Poll the queue until the task arrives.
            loop {
                if queue.run_pending(&mut world) > 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let worlds = handle
            .with_world(|world| world.worlds().len())
            .await
            .unwrap();
        assert_eq!(worlds, 1);
        drainer.await.unwrap();
    }

    #[tokio::test]
    async fn handoff_times_out_when_queue_is_not_drained() {
        let (handle, _queue) = channel(Duration::from_millis(20));

        let result = handle.with_world(|_world| ()).await;
        assert!(matches!(result, Err(LiveAccessError::Timeout { .. })));
    }

    #[tokio::test]
    async fn handoff_reports_closed_loop() {
        let (handle, queue) = channel(Duration::from_millis(20));
        drop(queue);

        let result = handle.with_world(|_world| ()).await;
        assert!(matches!(result, Err(LiveAccessError::Closed)));
    }
}
