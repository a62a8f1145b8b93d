//! # adesto-engine
//!
//! The client-side state engines for Adesto: the availability heatmap
//! aggregation engine, the chat message reconciler, and the space
//! directory, plus the view compositions that keep them reconciled against
//! the backend's realtime feeds.
//!
//! Everything here follows one pattern: build a projection from one
//! snapshot query, mutate it optimistically on local actions before the
//! write is dispatched, and fold realtime events into it — treating the
//! feed as at-least-once and unordered, with self-echo suppression so an
//! optimistic mutation and its echoed confirmation never both count.

pub mod bridge;
pub mod chat;
pub mod config;
pub mod heatmap;
pub mod spaces;

mod error;

pub use adesto_shared::Session;
pub use bridge::{ExploreView, SpaceView};
pub use chat::{ChatEngine, ChatEntry};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use heatmap::{HeatmapEngine, SlotProjection};
pub use spaces::SpaceDirectory;
