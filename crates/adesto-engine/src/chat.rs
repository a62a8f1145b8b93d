//! The message stream reconciler.
//!
//! Merges three sources into one ordered, duplicate-free list: the initial
//! page from the message store, locally-originated optimistic entries, and
//! realtime-delivered inserts. Dedup is by store-assigned id; an optimistic
//! entry lives under a temporary id until the insert resolves, then is
//! replaced by the confirmed row even if the realtime echo of that row got
//! there first.

use serde::Serialize;
use tracing::{debug, warn};

use adesto_shared::{MessageId, Session, SpaceId};
use adesto_store::{Message, MessageStore, NewMessage};

use crate::error::{EngineError, Result};

/// One displayed chat entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatEntry {
    pub message: Message,
    /// True while the entry only exists locally, under a temporary id.
    pub pending: bool,
}

/// Maintains the displayed message list for one space.
pub struct ChatEngine<S> {
    store: S,
    space_id: SpaceId,
    /// `None` while browsing logged out; sends are rejected then.
    session: Option<Session>,
    page_limit: u32,
    entries: Vec<ChatEntry>,
    loaded: bool,
}

impl<S: MessageStore> ChatEngine<S> {
    pub fn new(store: S, space_id: SpaceId, session: Option<Session>, page_limit: u32) -> Self {
        Self {
            store,
            space_id,
            session,
            page_limit,
            entries: Vec::new(),
            loaded: false,
        }
    }

    /// Fetch the newest page and present it oldest-first.
    ///
    /// On failure the list is left empty and unloaded, distinguishable from
    /// a legitimately empty conversation.
    pub async fn load(&mut self) -> Result<()> {
        self.entries.clear();
        self.loaded = false;

        let mut page = self
            .store
            .query_messages(self.space_id, self.page_limit)
            .await
            .map_err(|e| {
                warn!(space = %self.space_id, error = %e, "message load failed");
                e
            })?;
        page.reverse();

        self.entries = page
            .into_iter()
            .map(|message| ChatEntry {
                message,
                pending: false,
            })
            .collect();
        self.loaded = true;
        Ok(())
    }

    /// Send a message.
    ///
    /// An entry under a temporary id is appended before the insert is
    /// dispatched; on confirmation it is swapped for the store row. A blank
    /// message is ignored. A failed insert is logged and returned, the
    /// optimistic entry staying put until the next load.
    pub async fn send(&mut self, content: &str) -> Result<()> {
        let session = self
            .session
            .clone()
            .ok_or(EngineError::Unauthenticated)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        let temp = Message {
            id: MessageId::new(),
            space_id: self.space_id,
            user_id: session.user_id,
            sender_name: session.display_name.clone(),
            content: content.to_string(),
            created_at: chrono::Utc::now(),
            avatar_url: session.avatar_url.clone(),
        };
        let temp_id = temp.id;
        self.entries.push(ChatEntry {
            message: temp,
            pending: true,
        });

        let inserted = self
            .store
            .insert_message(NewMessage {
                space_id: self.space_id,
                user_id: session.user_id,
                sender_name: session.display_name,
                content: content.to_string(),
                avatar_url: session.avatar_url,
            })
            .await;

        match inserted {
            Ok(confirmed) => {
                self.resolve_pending(temp_id, confirmed);
                Ok(())
            }
            Err(e) => {
                warn!(space = %self.space_id, error = %e, "message send failed; optimistic entry kept");
                Err(e.into())
            }
        }
    }

    /// Append a realtime-delivered message unless its id is already shown.
    pub fn apply_remote_insert(&mut self, message: Message) {
        if message.space_id != self.space_id {
            return;
        }
        if self.entries.iter().any(|e| e.message.id == message.id) {
            debug!(msg = %message.id, "duplicate realtime message dropped");
            return;
        }
        self.entries.push(ChatEntry {
            message,
            pending: false,
        });
    }

    /// Swap the optimistic entry for the confirmed row. If the realtime
    /// echo of the same row beat the confirmation here, only the temporary
    /// entry is removed.
    fn resolve_pending(&mut self, temp_id: MessageId, confirmed: Message) {
        self.entries
            .retain(|e| !(e.pending && e.message.id == temp_id));
        if self.entries.iter().any(|e| e.message.id == confirmed.id) {
            return;
        }
        self.entries.push(ChatEntry {
            message: confirmed,
            pending: false,
        });
    }

    /// The displayed list, oldest first, optimistic entries at the tail.
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Whether the last load succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adesto_shared::UserId;
    use adesto_store::MemoryStore;

    fn session() -> Session {
        Session::new(UserId::new(), "Ana").with_avatar("https://cdn/avatars/ana.png")
    }

    async fn loaded_chat(store: &MemoryStore, session: Option<Session>) -> ChatEngine<MemoryStore> {
        let mut chat = ChatEngine::new(store.clone(), SpaceId::new(), session, 50);
        chat.load().await.unwrap();
        chat
    }

    #[tokio::test]
    async fn send_appends_exactly_one_confirmed_entry() {
        let store = MemoryStore::new();
        let mut chat = loaded_chat(&store, Some(session())).await;

        chat.send("hello").await.unwrap();

        assert_eq!(chat.entries().len(), 1);
        let entry = &chat.entries()[0];
        assert!(!entry.pending);
        assert_eq!(entry.message.content, "hello");
        assert_eq!(entry.message.sender_name, "Ana");
        assert!(entry.message.avatar_url.is_some());
    }

    #[tokio::test]
    async fn echo_arriving_before_confirmation_does_not_duplicate() {
        let store = MemoryStore::new();
        let space = SpaceId::new();
        let sess = session();
        let mut chat = ChatEngine::new(store.clone(), space, Some(sess.clone()), 50);
        chat.load().await.unwrap();

        // Simulate the race by hand: optimistic entry in, echo of the
        // confirmed row lands, then the insert's own success callback runs.
        let temp = Message {
            id: MessageId::new(),
            space_id: space,
            user_id: sess.user_id,
            sender_name: sess.display_name.clone(),
            content: "hi".to_string(),
            created_at: chrono::Utc::now(),
            avatar_url: None,
        };
        let temp_id = temp.id;
        chat.entries.push(ChatEntry {
            message: temp,
            pending: true,
        });

        let confirmed = store
            .insert_message(NewMessage {
                space_id: space,
                user_id: sess.user_id,
                sender_name: sess.display_name.clone(),
                content: "hi".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap();

        chat.apply_remote_insert(confirmed.clone());
        chat.resolve_pending(temp_id, confirmed.clone());

        let matching: Vec<_> = chat
            .entries()
            .iter()
            .filter(|e| e.message.id == confirmed.id)
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(chat.entries().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_realtime_delivery_is_dropped() {
        let store = MemoryStore::new();
        let mut chat = loaded_chat(&store, Some(session())).await;

        let other = Message {
            id: MessageId::new(),
            space_id: chat.space_id,
            user_id: UserId::new(),
            sender_name: "Ben".to_string(),
            content: "yo".to_string(),
            created_at: chrono::Utc::now(),
            avatar_url: None,
        };
        chat.apply_remote_insert(other.clone());
        chat.apply_remote_insert(other);

        assert_eq!(chat.entries().len(), 1);
    }

    #[tokio::test]
    async fn load_presents_newest_page_oldest_first() {
        let store = MemoryStore::new();
        let space = SpaceId::new();
        let user = UserId::new();
        for i in 0..4 {
            store
                .insert_message(NewMessage {
                    space_id: space,
                    user_id: user,
                    sender_name: "Ana".to_string(),
                    content: format!("m{i}"),
                    avatar_url: None,
                })
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let mut chat = ChatEngine::new(store.clone(), space, None, 3);
        chat.load().await.unwrap();

        let contents: Vec<_> = chat
            .entries()
            .iter()
            .map(|e| e.message.content.as_str())
            .collect();
        assert_eq!(contents, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn blank_sends_are_ignored_and_anonymous_sends_rejected() {
        let store = MemoryStore::new();
        let mut chat = loaded_chat(&store, Some(session())).await;
        chat.send("   ").await.unwrap();
        assert!(chat.entries().is_empty());

        let mut anonymous = loaded_chat(&store, None).await;
        assert!(matches!(
            anonymous.send("hi").await,
            Err(EngineError::Unauthenticated)
        ));
        assert!(anonymous.entries().is_empty());
    }

    #[tokio::test]
    async fn failed_send_keeps_optimistic_entry_and_reports() {
        let store = MemoryStore::new();
        let mut chat = loaded_chat(&store, Some(session())).await;

        store.set_offline(true);
        assert!(chat.send("hello?").await.is_err());

        assert_eq!(chat.entries().len(), 1);
        assert!(chat.entries()[0].pending);

        // The next successful load drops the orphaned optimistic entry.
        store.set_offline(false);
        chat.load().await.unwrap();
        assert!(chat.entries().is_empty());
    }
}
