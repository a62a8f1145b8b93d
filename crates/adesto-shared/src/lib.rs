//! # adesto-shared
//!
//! Types shared by every Adesto crate: identifier newtypes, the hour-label
//! and slot types the availability heatmap is keyed on, the visible date
//! window, and the authenticated session object.
//!
//! Nothing in this crate talks to the backend; it is pure data.

pub mod constants;
pub mod session;
pub mod types;
pub mod window;

pub use session::Session;
pub use types::{Hour, InvalidHour, MessageId, SlotKey, SpaceId, UserId};
pub use window::DateWindow;
