//! Row models for every backend table the engines touch.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a view layer or logged as structured data.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adesto_shared::{Hour, MessageId, SlotKey, SpaceId, UserId};

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// The identity of a signal row: the store holds at most one row per key.
///
/// Inserts carry exactly this; deletes match exactly this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub hour: Hour,
}

impl SignalKey {
    pub fn new(space_id: SpaceId, user_id: UserId, slot: SlotKey) -> Self {
        Self {
            space_id,
            user_id,
            date: slot.date,
            hour: slot.hour,
        }
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.date, self.hour)
    }
}

/// One user's declaration of availability for one hour-slot on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signal {
    pub space_id: SpaceId,
    pub user_id: UserId,
    /// Calendar date, no timezone conversion.
    pub date: NaiveDate,
    pub hour: Hour,
    /// Assigned by the store on insert.
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn key(&self) -> SignalKey {
        SignalKey {
            space_id: self.space_id,
            user_id: self.user_id,
            date: self.date,
            hour: self.hour,
        }
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.date, self.hour)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat entry in a space. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    /// Sender display name, denormalized at send time.
    pub sender_name: String,
    pub content: String,
    /// Assigned by the store on insert.
    pub created_at: DateTime<Utc>,
    /// Sender avatar, denormalized at send time.
    pub avatar_url: Option<String>,
}

/// Fields the client supplies when inserting a message; the store assigns
/// `id` and `created_at` and returns the full row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------------

/// A named community users join and interact within.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub members_count: u32,
    pub rating: Option<f32>,
    pub creator_id: UserId,
    pub is_private: bool,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields the client supplies when creating a space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSpace {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub creator_id: UserId,
    pub is_private: bool,
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// One user's membership in one space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub id: Uuid,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}
