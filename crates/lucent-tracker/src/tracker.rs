//! The [`LifecycleTracker`]: fast-path event handling and slow-path
//! timers.
//!
//! `handle_event` runs on the control loop and must never block: it
//! only mutates the registry and enqueues ledger writes for the
//! background writer. The two timers run as background tasks and reach
//! live state through the bounded live-access handoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use lucent_types::{CrystalId, EventKind, Position};
use lucent_world::codec;
use lucent_world::error::LiveAccessError;
use lucent_world::event::{MarkerBreak, WorldEvent};
use lucent_world::item::ItemEntityId;
use lucent_world::live::LiveHandle;
use lucent_world::sim::{CRYSTAL_MARKER, WorldInspector};

use crate::offline;
use crate::registry::Registry;
use crate::writer::{LedgerCommand, LedgerWriter};

/// Default registry poll interval: one walk per second.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default full-world sweep interval (twice per second).
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Timer configuration for the tracker's slow path.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How often the registry poller walks tracked items.
    pub poll_interval: Duration,
    /// How often the full-world sweep scans all loose items.
    pub sweep_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Handles to the tracker's periodic tasks.
#[derive(Debug)]
pub struct TrackerTasks {
    poll: JoinHandle<()>,
    sweep: JoinHandle<()>,
}

impl TrackerTasks {
    /// Cancel both timers and wait for them to wind down.
    pub async fn shutdown(self) {
        self.poll.abort();
        self.sweep.abort();
        let _ = self.poll.await;
        let _ = self.sweep.await;
    }
}

/// What the poller observed about one tracked item.
enum PollObservation {
    /// The item is gone from the world.
    Vanished {
        /// Where it was last seen.
        last_seen: Position,
        /// Whether that position is below the void floor.
        last_seen_void: bool,
    },
    /// The item is still present.
    Present {
        /// Its current position.
        position: Position,
        /// Whether that position is below the void floor.
        voided: bool,
    },
}

/// The lifecycle tracker.
///
/// Owns the tracked-item registry exclusively; no other component ever
/// reads or writes it.
#[derive(Debug)]
pub struct LifecycleTracker {
    registry: Registry,
    writer: LedgerWriter,
}

impl LifecycleTracker {
    /// Create a tracker that persists through the given writer.
    pub fn new(writer: LedgerWriter) -> Self {
        Self {
            registry: Registry::new(),
            writer,
        }
    }

    /// Number of items currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    /// Drop all registry state (shutdown).
    pub fn shutdown(&self) {
        self.registry.clear();
    }

    /// Fast path: react to one world event.
    ///
    /// Called on the control loop. Never blocks; every ledger
    /// consequence is enqueued for the background writer.
    pub fn handle_event(&self, event: &WorldEvent, world: &dyn WorldInspector) {
        match event {
            WorldEvent::MarkerFaded { marker } => self.marker_destroyed(marker),
            WorldEvent::MarkerExploded { markers } => {
                for marker in markers {
                    self.marker_destroyed(marker);
                }
            }
            WorldEvent::ItemSpawned { item } => {
                if let Some(crystal) = codec::read_identity(&item.stack) {
                    self.registry.track(item.id, crystal, item.position.clone());
                }
            }
            WorldEvent::ItemDespawned { item } => {
                if let Some(crystal) = codec::read_identity(&item.stack) {
                    self.item_destroyed(crystal, &item.position, in_void(world, &item.position));
                }
                let _ = self.registry.untrack(item.id);
            }
            WorldEvent::ItemDamaged { item, cause } => {
                if cause.is_destructive() {
                    if let Some(crystal) = codec::read_identity(&item.stack) {
                        let voided = cause.is_void() || in_void(world, &item.position);
                        self.item_destroyed(crystal, &item.position, voided);
                    }
                    let _ = self.registry.untrack(item.id);
                }
            }
            WorldEvent::ItemPickedUp { item_id } => {
                // Pickup is the redemption pipeline's business; the
                // tracker only stops watching.
                let _ = self.registry.untrack(*item_id);
            }
            WorldEvent::HolderDied {
                position,
                cause,
                drops,
                ..
            } => {
                if cause.is_void() {
                    for stack in drops {
                        if let Some(crystal) = codec::read_identity(stack) {
                            self.item_destroyed(crystal, position, true);
                        }
                    }
                }
            }
            WorldEvent::HolderConnected { holder } => {
                self.writer
                    .send(LedgerCommand::ClearOfflineHoldings { holder: *holder });
            }
            WorldEvent::HolderDisconnected {
                holder,
                name,
                containers,
            } => {
                let contexts = offline::capture_contexts(containers);
                self.writer.send(LedgerCommand::ReplaceOfflineHoldings {
                    holder: *holder,
                    holder_name: Some(name.clone()),
                    contexts,
                });
            }
        }
    }

    /// Slow path (a): walk tracked items against live world state.
    ///
    /// Items that silently vanished are retired (with a void loss when
    /// they were last seen below the floor); items that drifted below
    /// the floor are retired as void losses; everything else just gets
    /// its last-seen position refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`LiveAccessError`] when the live world cannot be
    /// reached; the next tick retries naturally.
    pub async fn poll_once(&self, live: &LiveHandle) -> Result<(), LiveAccessError> {
        let entries = self.registry.snapshot();
        if entries.is_empty() {
            return Ok(());
        }

        let lookups: Vec<(ItemEntityId, Position)> = entries
            .into_iter()
            .map(|(id, tracked)| (id, tracked.last_seen))
            .collect();

        let observations = live
            .with_world(move |world| {
                lookups
                    .into_iter()
                    .map(|(id, last_seen)| {
                        let observation = match world.find_item(id) {
                            Some(item) => PollObservation::Present {
                                voided: in_void(&*world, &item.position),
                                position: item.position.clone(),
                            },
                            None => PollObservation::Vanished {
                                last_seen_void: in_void(&*world, &last_seen),
                                last_seen,
                            },
                        };
                        (id, observation)
                    })
                    .collect::<Vec<_>>()
            })
            .await?;

        for (id, observation) in observations {
            match observation {
                PollObservation::Vanished {
                    last_seen,
                    last_seen_void,
                } => {
                    if let Some(tracked) = self.registry.untrack(id) {
                        if last_seen_void {
                            self.item_destroyed(tracked.crystal, &last_seen, true);
                        }
                    }
                }
                PollObservation::Present { position, voided } => {
                    if voided {
                        if let Some(tracked) = self.registry.untrack(id) {
                            self.item_destroyed(tracked.crystal, &position, true);
                        }
                    } else {
                        self.registry.update_position(id, position);
                    }
                }
            }
        }

        Ok(())
    }

    /// Slow path (b): sweep ALL loose items, registry or not.
    ///
    /// Tagged items found below the void floor are removed from the
    /// world and recorded as void losses. This is the deliberate
    /// redundancy that catches anything the registry missed.
    ///
    /// # Errors
    ///
    /// Returns [`LiveAccessError`] when the live world cannot be
    /// reached; the next tick retries naturally.
    pub async fn sweep_once(&self, live: &LiveHandle) -> Result<(), LiveAccessError> {
        let removed = live
            .with_world(|world| {
                let mut hits = Vec::new();
                for world_name in world.worlds() {
                    let Some(floor) = world.void_floor(&world_name) else {
                        continue;
                    };
                    for item in world.loose_items(&world_name) {
                        if item.position.y >= floor {
                            continue;
                        }
                        let Some(crystal) = codec::read_identity(&item.stack) else {
                            continue;
                        };
                        let _ = world.remove_item(item.id);
                        hits.push((item.id, crystal, item.position));
                    }
                }
                hits
            })
            .await?;

        for (item_id, crystal, position) in removed {
            let _ = self.registry.untrack(item_id);
            self.item_destroyed(crystal, &position, true);
        }

        Ok(())
    }

    /// Spawn both periodic tasks.
    ///
    /// Zero intervals fall back to the defaults. The returned
    /// [`TrackerTasks`] cancels both timers on shutdown.
    pub fn spawn_timers(
        tracker: &Arc<Self>,
        live: &LiveHandle,
        config: &TrackerConfig,
    ) -> TrackerTasks {
        let poll_interval = nonzero_or(config.poll_interval, DEFAULT_POLL_INTERVAL);
        let sweep_interval = nonzero_or(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);

        let poll_tracker = Arc::clone(tracker);
        let poll_live = live.clone();
        let poll = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                if let Err(error) = poll_tracker.poll_once(&poll_live).await {
                    tracing::warn!(%error, "Registry poll could not reach the live world");
                }
            }
        });

        let sweep_tracker = Arc::clone(tracker);
        let sweep_live = live.clone();
        let sweep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                if let Err(error) = sweep_tracker.sweep_once(&sweep_live).await {
                    tracing::warn!(%error, "Void sweep could not reach the live world");
                }
            }
        });

        TrackerTasks { poll, sweep }
    }

    /// React to a destroyed marker: look up and retire whatever active
    /// crystal the ledger records at that position.
    fn marker_destroyed(&self, marker: &MarkerBreak) {
        if marker.kind != CRYSTAL_MARKER {
            return;
        }
        self.writer.send(LedgerCommand::LostAtPosition {
            position: marker.position.clone(),
            kind: EventKind::Destroyed,
            details: None,
        });
    }

    /// Enqueue the loss of a specific crystal.
    fn item_destroyed(&self, crystal: CrystalId, position: &Position, voided: bool) {
        let (kind, details) = if voided {
            (EventKind::VoidLoss, Some(describe_site(position)))
        } else {
            (EventKind::Destroyed, None)
        };
        self.writer.send(LedgerCommand::Lost {
            crystal,
            position: Some(position.clone()),
            kind,
            details,
        });
    }
}

/// Whether a position lies strictly below its world's void floor.
///
/// The floor is the world's configured minimum build height, taken from
/// the inspection interface; unknown worlds have no void.
fn in_void(world: &dyn WorldInspector, position: &Position) -> bool {
    world
        .void_floor(&position.world)
        .is_some_and(|floor| position.y < floor)
}

/// Human-readable loss-site annotation for void-loss events.
fn describe_site(position: &Position) -> String {
    format!(
        "World={}, X={}, Y={}, Z={}",
        position.world, position.x, position.y, position.z,
    )
}

/// Replace a zero duration with a fallback.
fn nonzero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_intervals_fall_back_to_defaults() {
        assert_eq!(
            nonzero_or(Duration::ZERO, DEFAULT_POLL_INTERVAL),
            DEFAULT_POLL_INTERVAL,
        );
        assert_eq!(
            nonzero_or(Duration::from_millis(250), DEFAULT_POLL_INTERVAL),
            Duration::from_millis(250),
        );
    }

    #[test]
    fn site_description_is_stable() {
        let position = Position::new("overworld", 1, -80, 2);
        assert_eq!(describe_site(&position), "World=overworld, X=1, Y=-80, Z=2");
    }
}
