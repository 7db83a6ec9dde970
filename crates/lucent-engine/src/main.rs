//! Engine binary for the Lucent crystal ledger.
//!
//! This is the entry point that wires together the ledger store, the
//! in-memory world, the lifecycle tracker, and the audit engine. It
//! owns the single control loop with exclusive access to live world
//! state; every other component runs on background workers and reaches
//! the world only through the bounded live-access handoff.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `lucent-config.yaml`
//! 3. Open and initialize the ledger store
//! 4. Construct world state from configuration
//! 5. Spawn the background ledger writer and the lifecycle tracker
//! 6. Run the control loop until a shutdown signal arrives
//! 7. Wind down timers, drain the writer, close the store

mod config;
mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lucent_audit::run_audit;
use lucent_store::{LedgerStore, StoreConfig};
use lucent_tracker::{LifecycleTracker, TrackerConfig, spawn_writer};
use lucent_world::SimWorld;
use lucent_world::live;

use crate::config::{LucentConfig, WorldSection};
use crate::error::EngineError;

/// Application entry point for the engine.
///
/// Initializes all subsystems and runs the control loop.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("lucent-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        ledger_path = %config.store.path,
        poll_interval_ms = config.tracker.poll_interval_ms,
        sweep_interval_ms = config.tracker.sweep_interval_ms,
        audit_interval_secs = config.audit.interval_secs,
        tick_interval_ms = config.control.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Open and initialize the ledger store.
    let store = LedgerStore::open(&StoreConfig::new(&config.store.path))
        .await
        .map_err(EngineError::from)?;
    store.initialize().await.map_err(EngineError::from)?;
    info!("Ledger store ready");

    // 4. Construct world state.
    let mut world = SimWorld::new();
    let worlds = if config.worlds.is_empty() {
        vec![WorldSection::fallback()]
    } else {
        config.worlds.clone()
    };
    for section in &worlds {
        world.add_world(&section.name, section.min_y);
    }
    info!(worlds = worlds.len(), "World state constructed");

    // 5. Live-access channel, background writer, lifecycle tracker.
    let (live_handle, mut live_queue) =
        live::channel(Duration::from_millis(config.audit.live_timeout_ms.max(1)));

    let (writer, writer_task) = spawn_writer(store.clone());
    let tracker = Arc::new(LifecycleTracker::new(writer));
    let tracker_config = TrackerConfig {
        poll_interval: Duration::from_millis(config.tracker.poll_interval_ms),
        sweep_interval: Duration::from_millis(config.tracker.sweep_interval_ms),
    };
    let timers = LifecycleTracker::spawn_timers(&tracker, &live_handle, &tracker_config);
    info!("Lifecycle tracker running");

    // 6. Control loop: the single owner of live world state.
    let tick_interval = Duration::from_millis(config.control.tick_interval_ms.max(10));
    let audit_every_ticks = audit_tick_budget(
        config.audit.interval_secs,
        config.control.tick_interval_ms.max(10),
    );
    let mut ticks_since_audit: u64 = 0;
    let mut ticker = tokio::time::interval(tick_interval);

    info!("Entering control loop");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = live_queue.run_pending(&mut world);
                for event in world.drain_events() {
                    tracker.handle_event(&event, &world);
                }

                if let Some(budget) = audit_every_ticks {
                    ticks_since_audit = ticks_since_audit.saturating_add(1);
                    if ticks_since_audit >= budget {
                        ticks_since_audit = 0;
                        spawn_audit_report(store.clone(), live_handle.clone());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // 7. Wind down: cancel timers, drain the writer, close the store.
    timers.shutdown().await;
    tracker.shutdown();
    drop(tracker);
    let _ = writer_task.await;
    store.close().await;

    info!("lucent-engine shutdown complete");
    Ok(())
}

/// Load the engine configuration from `lucent-config.yaml`.
///
/// A missing file means defaults across the board.
fn load_config() -> Result<LucentConfig, EngineError> {
    let config_path = Path::new("lucent-config.yaml");
    if config_path.exists() {
        Ok(LucentConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(LucentConfig::default())
    }
}

/// How many control-loop ticks sit between scheduled audit reports.
///
/// Returns `None` when scheduled audits are disabled.
fn audit_tick_budget(interval_secs: u64, tick_interval_ms: u64) -> Option<u64> {
    if interval_secs == 0 {
        return None;
    }
    let interval_ms = interval_secs.saturating_mul(1000);
    Some(interval_ms.checked_div(tick_interval_ms).unwrap_or(1).max(1))
}

/// Run a read-only audit on a background worker and log its report.
///
/// Repairs stay operator-triggered; the scheduled run only observes.
fn spawn_audit_report(store: LedgerStore, live: live::LiveHandle) {
    tokio::spawn(async move {
        match run_audit(&store, &live).await {
            Ok(report) => {
                for line in report.to_string().lines() {
                    info!("{line}");
                }
            }
            Err(error) => warn!(%error, "Scheduled audit failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_budget_disabled_at_zero() {
        assert_eq!(audit_tick_budget(0, 100), None);
    }

    #[test]
    fn audit_budget_rounds_down_to_at_least_one_tick() {
        assert_eq!(audit_tick_budget(900, 100), Some(9000));
        assert_eq!(audit_tick_budget(1, 5000), Some(1));
    }
}
