//! Realtime feed events and the subscription handle.
//!
//! Feeds carry at-least-once, unordered delivery: consumers must tolerate
//! duplicates and reordering. Dropping a [`Feed`] is the unsubscribe.

use tokio::sync::broadcast;
use tracing::warn;

use adesto_shared::SpaceId;

use crate::models::{Membership, Message, Signal, Space};

/// A change to the signals table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent {
    Inserted(Signal),
    Deleted(Signal),
}

impl SignalEvent {
    pub fn signal(&self) -> &Signal {
        match self {
            SignalEvent::Inserted(s) | SignalEvent::Deleted(s) => s,
        }
    }
}

/// A change to the spaces table.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceEvent {
    Inserted(Space),
    Updated(Space),
    Deleted(SpaceId),
}

/// A change to the memberships table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    Joined(Membership),
    Left(Membership),
}

impl MembershipEvent {
    pub fn membership(&self) -> &Membership {
        match self {
            MembershipEvent::Joined(m) | MembershipEvent::Left(m) => m,
        }
    }
}

/// A filtered subscription to one table's change stream.
///
/// `recv` yields the next event matching the subscription's filter, or
/// `None` once the store side has shut down. A lagged receiver skips the
/// overwritten events and keeps going; the projection self-heals on the
/// next full load.
pub struct Feed<T> {
    rx: broadcast::Receiver<T>,
    filter: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: Clone + Send> Feed<T> {
    pub(crate) fn new(
        rx: broadcast::Receiver<T>,
        filter: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            rx,
            filter: Box::new(filter),
        }
    }

    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if (self.filter)(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "realtime feed lagged, events lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Insert/delete events for signal rows in one space.
pub type SignalFeed = Feed<SignalEvent>;

/// Newly inserted message rows in one space.
pub type MessageFeed = Feed<Message>;

/// Insert/update/delete events for all spaces.
pub type SpaceFeed = Feed<SpaceEvent>;

/// Join/leave events for one user's memberships.
pub type MembershipFeed = Feed<MembershipEvent>;
