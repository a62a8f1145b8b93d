//! The backend contract, as traits the engines are generic over.
//!
//! Queries issued right after a successful write from the same client see
//! that write; subscriptions deliver at-least-once with no ordering
//! guarantee. Every write is asynchronous and must not be assumed to have
//! landed until it resolves.

use async_trait::async_trait;
use uuid::Uuid;

use adesto_shared::{DateWindow, SpaceId, UserId};

use crate::error::Result;
use crate::events::{MembershipFeed, MessageFeed, SignalFeed, SpaceFeed};
use crate::models::{Membership, Message, NewMessage, NewSpace, Signal, SignalKey, Space};

/// The signals table: availability declarations keyed by
/// (space, user, date, hour).
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// All signals for `space_id` whose date falls inside `window`,
    /// bounds inclusive.
    async fn query_signals(&self, space_id: SpaceId, window: &DateWindow) -> Result<Vec<Signal>>;

    /// Insert one signal. The store enforces at most one row per key and
    /// rejects a duplicate with [`StoreError::Conflict`](crate::StoreError::Conflict).
    async fn insert_signal(&self, key: SignalKey) -> Result<Signal>;

    /// Delete the signal matching `key` exactly. Returns whether a row
    /// existed.
    async fn delete_signal(&self, key: &SignalKey) -> Result<bool>;

    /// Subscribe to signal changes for one space.
    fn subscribe_signals(&self, space_id: SpaceId) -> SignalFeed;
}

/// The messages table: append-only chat entries per space.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// The newest `limit` messages for `space_id`, newest first.
    async fn query_messages(&self, space_id: SpaceId, limit: u32) -> Result<Vec<Message>>;

    /// Insert a message; the store assigns id and timestamp and returns
    /// the full row.
    async fn insert_message(&self, new: NewMessage) -> Result<Message>;

    /// Subscribe to message inserts for one space.
    fn subscribe_messages(&self, space_id: SpaceId) -> MessageFeed;
}

/// The spaces and memberships tables.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    async fn list_spaces(&self) -> Result<Vec<Space>>;

    async fn get_space(&self, id: SpaceId) -> Result<Space>;

    async fn insert_space(&self, new: NewSpace) -> Result<Space>;

    /// Delete a space. Returns whether a row existed.
    async fn delete_space(&self, id: SpaceId) -> Result<bool>;

    /// All memberships of one space.
    async fn list_members(&self, space_id: SpaceId) -> Result<Vec<Membership>>;

    /// All memberships held by one user.
    async fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>>;

    /// Add `user_id` to `space_id` and bump the member count. Joining a
    /// space twice is a conflict.
    async fn join_space(&self, space_id: SpaceId, user_id: UserId) -> Result<Membership>;

    /// Remove `user_id` from `space_id` and drop the member count.
    /// Returns whether a membership existed.
    async fn leave_space(&self, space_id: SpaceId, user_id: UserId) -> Result<bool>;

    /// Remove a membership by row id (admin path). Returns whether a row
    /// existed.
    async fn remove_member(&self, membership_id: Uuid) -> Result<bool>;

    /// Subscribe to changes across all spaces.
    fn subscribe_spaces(&self) -> SpaceFeed;

    /// Subscribe to membership changes for one user.
    fn subscribe_memberships(&self, user_id: UserId) -> MembershipFeed;
}
