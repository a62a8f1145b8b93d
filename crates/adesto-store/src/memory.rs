//! In-process reference backend.
//!
//! Implements the full store contract against plain collections behind a
//! mutex, with `tokio::sync::broadcast` channels standing in for the hosted
//! backend's change feeds. Used by the tests and the demo binary; the
//! production client would swap in a client for the hosted service.
//!
//! The store can be flipped "offline" to exercise engine failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use adesto_shared::{DateWindow, MessageId, SpaceId, UserId};

use crate::error::{Result, StoreError};
use crate::events::{
    Feed, MembershipEvent, MembershipFeed, MessageFeed, SignalEvent, SignalFeed, SpaceEvent,
    SpaceFeed,
};
use crate::models::{Membership, Message, NewMessage, NewSpace, Signal, SignalKey, Space};
use crate::store::{MessageStore, SignalStore, SpaceStore};

const FEED_CAPACITY: usize = 256;

#[derive(Default)]
struct Inner {
    signals: Vec<Signal>,
    messages: Vec<Message>,
    spaces: Vec<Space>,
    memberships: Vec<Membership>,
}

/// An in-memory store implementing [`SignalStore`], [`MessageStore`] and
/// [`SpaceStore`]. Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    offline: Arc<AtomicBool>,
    signals_tx: broadcast::Sender<SignalEvent>,
    messages_tx: broadcast::Sender<Message>,
    spaces_tx: broadcast::Sender<SpaceEvent>,
    memberships_tx: broadcast::Sender<MembershipEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            offline: Arc::new(AtomicBool::new(false)),
            signals_tx: broadcast::channel(FEED_CAPACITY).0,
            messages_tx: broadcast::channel(FEED_CAPACITY).0,
            spaces_tx: broadcast::channel(FEED_CAPACITY).0,
            memberships_tx: broadcast::channel(FEED_CAPACITY).0,
        }
    }

    /// Fault injection: while offline, every query and write fails with
    /// [`StoreError::Unavailable`]. Feeds stay open.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Inner holds no user code, so a poisoned lock means a bug in this
        // module; propagating the data anyway keeps the store usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn query_signals(&self, space_id: SpaceId, window: &DateWindow) -> Result<Vec<Signal>> {
        self.ensure_online()?;
        let inner = self.lock();
        Ok(inner
            .signals
            .iter()
            .filter(|s| s.space_id == space_id && window.contains(s.date))
            .cloned()
            .collect())
    }

    async fn insert_signal(&self, key: SignalKey) -> Result<Signal> {
        self.ensure_online()?;
        let signal = {
            let mut inner = self.lock();
            if inner.signals.iter().any(|s| s.key() == key) {
                return Err(StoreError::Conflict(format!(
                    "signal already exists for {} at {}",
                    key.user_id,
                    key.slot()
                )));
            }
            let signal = Signal {
                space_id: key.space_id,
                user_id: key.user_id,
                date: key.date,
                hour: key.hour,
                created_at: Utc::now(),
            };
            inner.signals.push(signal.clone());
            signal
        };
        debug!(space = %signal.space_id, slot = %signal.slot(), "signal inserted");
        let _ = self.signals_tx.send(SignalEvent::Inserted(signal.clone()));
        Ok(signal)
    }

    async fn delete_signal(&self, key: &SignalKey) -> Result<bool> {
        self.ensure_online()?;
        let removed = {
            let mut inner = self.lock();
            match inner.signals.iter().position(|s| s.key() == *key) {
                Some(idx) => Some(inner.signals.swap_remove(idx)),
                None => None,
            }
        };
        match removed {
            Some(signal) => {
                debug!(space = %signal.space_id, slot = %signal.slot(), "signal deleted");
                let _ = self.signals_tx.send(SignalEvent::Deleted(signal));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn subscribe_signals(&self, space_id: SpaceId) -> SignalFeed {
        Feed::new(self.signals_tx.subscribe(), move |event: &SignalEvent| {
            event.signal().space_id == space_id
        })
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn query_messages(&self, space_id: SpaceId, limit: u32) -> Result<Vec<Message>> {
        self.ensure_online()?;
        let inner = self.lock();
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.space_id == space_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn insert_message(&self, new: NewMessage) -> Result<Message> {
        self.ensure_online()?;
        let message = Message {
            id: MessageId::new(),
            space_id: new.space_id,
            user_id: new.user_id,
            sender_name: new.sender_name,
            content: new.content,
            created_at: Utc::now(),
            avatar_url: new.avatar_url,
        };
        self.lock().messages.push(message.clone());
        debug!(space = %message.space_id, msg = %message.id, "message inserted");
        let _ = self.messages_tx.send(message.clone());
        Ok(message)
    }

    fn subscribe_messages(&self, space_id: SpaceId) -> MessageFeed {
        Feed::new(self.messages_tx.subscribe(), move |message: &Message| {
            message.space_id == space_id
        })
    }
}

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        self.ensure_online()?;
        Ok(self.lock().spaces.clone())
    }

    async fn get_space(&self, id: SpaceId) -> Result<Space> {
        self.ensure_online()?;
        self.lock()
            .spaces
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_space(&self, new: NewSpace) -> Result<Space> {
        self.ensure_online()?;
        let space = Space {
            id: SpaceId::new(),
            name: new.name,
            description: new.description,
            location: new.location,
            category: new.category,
            members_count: 0,
            rating: None,
            creator_id: new.creator_id,
            is_private: new.is_private,
            color: new.color,
            created_at: Utc::now(),
        };
        self.lock().spaces.push(space.clone());
        let _ = self.spaces_tx.send(SpaceEvent::Inserted(space.clone()));
        Ok(space)
    }

    async fn delete_space(&self, id: SpaceId) -> Result<bool> {
        self.ensure_online()?;
        let existed = {
            let mut inner = self.lock();
            let before = inner.spaces.len();
            inner.spaces.retain(|s| s.id != id);
            // Cascade, matching the hosted backend's foreign keys.
            inner.memberships.retain(|m| m.space_id != id);
            inner.messages.retain(|m| m.space_id != id);
            inner.signals.retain(|s| s.space_id != id);
            inner.spaces.len() != before
        };
        if existed {
            let _ = self.spaces_tx.send(SpaceEvent::Deleted(id));
        }
        Ok(existed)
    }

    async fn list_members(&self, space_id: SpaceId) -> Result<Vec<Membership>> {
        self.ensure_online()?;
        Ok(self
            .lock()
            .memberships
            .iter()
            .filter(|m| m.space_id == space_id)
            .cloned()
            .collect())
    }

    async fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>> {
        self.ensure_online()?;
        Ok(self
            .lock()
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn join_space(&self, space_id: SpaceId, user_id: UserId) -> Result<Membership> {
        self.ensure_online()?;
        let (membership, space) = {
            let mut inner = self.lock();
            if inner
                .memberships
                .iter()
                .any(|m| m.space_id == space_id && m.user_id == user_id)
            {
                return Err(StoreError::Conflict(format!(
                    "{user_id} already member of {space_id}"
                )));
            }
            let space = match inner.spaces.iter_mut().find(|s| s.id == space_id) {
                Some(space) => {
                    space.members_count += 1;
                    space.clone()
                }
                None => return Err(StoreError::NotFound),
            };
            let membership = Membership {
                id: Uuid::new_v4(),
                space_id,
                user_id,
                joined_at: Utc::now(),
            };
            inner.memberships.push(membership.clone());
            (membership, space)
        };
        let _ = self
            .memberships_tx
            .send(MembershipEvent::Joined(membership.clone()));
        let _ = self.spaces_tx.send(SpaceEvent::Updated(space));
        Ok(membership)
    }

    async fn leave_space(&self, space_id: SpaceId, user_id: UserId) -> Result<bool> {
        self.ensure_online()?;
        let removed = {
            let mut inner = self.lock();
            match inner
                .memberships
                .iter()
                .position(|m| m.space_id == space_id && m.user_id == user_id)
            {
                Some(idx) => {
                    let membership = inner.memberships.swap_remove(idx);
                    let space = inner.spaces.iter_mut().find(|s| s.id == space_id).map(|s| {
                        s.members_count = s.members_count.saturating_sub(1);
                        s.clone()
                    });
                    Some((membership, space))
                }
                None => None,
            }
        };
        match removed {
            Some((membership, space)) => {
                let _ = self.memberships_tx.send(MembershipEvent::Left(membership));
                if let Some(space) = space {
                    let _ = self.spaces_tx.send(SpaceEvent::Updated(space));
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_member(&self, membership_id: Uuid) -> Result<bool> {
        self.ensure_online()?;
        let target = self
            .lock()
            .memberships
            .iter()
            .find(|m| m.id == membership_id)
            .cloned();
        match target {
            Some(m) => self.leave_space(m.space_id, m.user_id).await,
            None => Ok(false),
        }
    }

    fn subscribe_spaces(&self) -> SpaceFeed {
        Feed::new(self.spaces_tx.subscribe(), |_| true)
    }

    fn subscribe_memberships(&self, user_id: UserId) -> MembershipFeed {
        Feed::new(
            self.memberships_tx.subscribe(),
            move |event: &MembershipEvent| event.membership().user_id == user_id,
        )
    }
}
