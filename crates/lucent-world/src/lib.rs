//! World model and inspection interface for the Lucent crystal ledger.
//!
//! The ledger's environment is mutable and externally controlled: items
//! appear, move, and vanish without asking the ledger first. This crate
//! models that environment and the two contracts the core components
//! consume:
//!
//! - the [`WorldInspector`] trait, the synchronous read surface the
//!   Audit Engine and Lifecycle Tracker observe the world through, and
//! - the item identity [`codec`], which binds a crystal's ledger id to
//!   a physical item's attached metadata.
//!
//! It also provides [`SimWorld`], the in-memory world implementation
//! used by the engine binary and by every test, and the [`live`]
//! channel that carries exclusive-access tasks to the single control
//! loop that owns the world.
//!
//! # Modules
//!
//! - [`item`] -- Item stacks, item entities, holders, and fixtures
//! - [`codec`] -- Crystal identity encoding on physical items
//! - [`event`] -- World events observed by the Lifecycle Tracker
//! - [`sim`] -- The [`WorldInspector`] trait and in-memory [`SimWorld`]
//! - [`live`] -- Main-loop task queue and timeout-bounded handle
//! - [`error`] -- Live-access error type

pub mod codec;
pub mod error;
pub mod event;
pub mod item;
pub mod live;
pub mod sim;

// Re-export primary types for convenience.
pub use error::LiveAccessError;
pub use event::{DamageCause, MarkerBreak, WorldEvent};
pub use item::{ContainerSnapshot, FixtureView, HolderView, ItemEntity, ItemEntityId, ItemStack};
pub use live::{LiveHandle, LiveQueue};
pub use sim::{SimWorld, WorldInspector, CRYSTAL_MARKER};
