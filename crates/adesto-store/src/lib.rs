//! # adesto-store
//!
//! The backend contract Adesto engines are written against, plus an
//! in-process reference backend.
//!
//! The hosted backend owns all persistence, auth and fan-out; this crate
//! pins down exactly what the engines consume from it: queries with
//! read-your-writes consistency, writes, and per-table realtime feeds with
//! at-least-once, unordered delivery. [`MemoryStore`] implements the whole
//! contract in memory and is what the tests and the demo binary run
//! against.

pub mod events;
pub mod memory;
pub mod models;
pub mod store;

mod error;

pub use error::{Result, StoreError};
pub use events::{Feed, MembershipEvent, MessageFeed, MembershipFeed, SignalEvent, SignalFeed, SpaceEvent, SpaceFeed};
pub use memory::MemoryStore;
pub use models::*;
pub use store::{MessageStore, SignalStore, SpaceStore};
