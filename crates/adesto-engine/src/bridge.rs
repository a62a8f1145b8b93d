//! Bridges realtime feeds into engines.
//!
//! A view owns its engines behind shared handles and a set of pump tasks
//! that forward feed events into them. Subscriptions are scoped to the
//! view: closing it aborts the pumps, so nothing is delivered into a
//! projection that no longer exists. Operations arriving after close are
//! discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use adesto_shared::{DateWindow, Session, SlotKey, SpaceId};
use adesto_store::{MessageStore, SignalStore, SpaceStore};

use crate::chat::{ChatEngine, ChatEntry};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::heatmap::{HeatmapEngine, SlotProjection};
use crate::spaces::SpaceDirectory;

/// One mounted space view: heatmap plus chat, kept live by feed pumps.
pub struct SpaceView<S> {
    heatmap: Arc<Mutex<HeatmapEngine<S>>>,
    chat: Arc<Mutex<ChatEngine<S>>>,
    space_id: SpaceId,
    closed: AtomicBool,
    pumps: Vec<JoinHandle<()>>,
}

impl<S> SpaceView<S>
where
    S: SignalStore + MessageStore + Clone + Send + Sync + 'static,
{
    /// Load the initial window and message page, then start pumping feed
    /// events. Subscriptions are taken before the loads so nothing slips
    /// between snapshot and feed.
    pub async fn open(
        store: S,
        space_id: SpaceId,
        session: Option<Session>,
        config: &EngineConfig,
        window: DateWindow,
    ) -> Result<Self> {
        let mut signal_feed = store.subscribe_signals(space_id);
        let mut message_feed = store.subscribe_messages(space_id);

        let viewer = session.as_ref().map(|s| s.user_id);
        let mut heatmap = HeatmapEngine::new(store.clone(), space_id, viewer, window);
        heatmap.load_window(window).await?;

        let mut chat = ChatEngine::new(store, space_id, session, config.message_page_limit);
        chat.load().await?;

        let heatmap = Arc::new(Mutex::new(heatmap));
        let chat = Arc::new(Mutex::new(chat));

        let signal_pump = {
            let heatmap = heatmap.clone();
            tokio::spawn(async move {
                while let Some(event) = signal_feed.recv().await {
                    heatmap.lock().await.apply_remote_event(&event);
                }
                debug!(space = %space_id, "signal feed closed");
            })
        };
        let message_pump = {
            let chat = chat.clone();
            tokio::spawn(async move {
                while let Some(message) = message_feed.recv().await {
                    chat.lock().await.apply_remote_insert(message);
                }
                debug!(space = %space_id, "message feed closed");
            })
        };

        info!(space = %space_id, "space view opened");
        Ok(Self {
            heatmap,
            chat,
            space_id,
            closed: AtomicBool::new(false),
            pumps: vec![signal_pump, message_pump],
        })
    }

    /// Flip the viewer's signal for a slot.
    pub async fn toggle(&self, slot: SlotKey) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.heatmap.lock().await.toggle(slot).await
    }

    /// Send a chat message.
    pub async fn send(&self, content: &str) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.chat.lock().await.send(content).await
    }

    /// Move to a different date window, reloading the projection.
    pub async fn change_window(&self, window: DateWindow) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.heatmap.lock().await.load_window(window).await
    }

    /// Snapshot of one slot's projection.
    pub async fn slot(&self, slot: &SlotKey) -> SlotProjection {
        self.heatmap.lock().await.slot(slot)
    }

    /// Snapshot of the displayed message list.
    pub async fn messages(&self) -> Vec<ChatEntry> {
        self.chat.lock().await.entries().to_vec()
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Tear the view down: aborts the pumps and drops the subscriptions.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        info!(space = %self.space_id, "space view closed");
    }
}

impl<S> Drop for SpaceView<S> {
    fn drop(&mut self) {
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }
}

/// The mounted explore view: the space directory kept live by feed pumps.
pub struct ExploreView<S> {
    directory: Arc<Mutex<SpaceDirectory<S>>>,
    closed: AtomicBool,
    pumps: Vec<JoinHandle<()>>,
}

impl<S> ExploreView<S>
where
    S: SpaceStore + Clone + Send + Sync + 'static,
{
    pub async fn open(store: S, session: Option<Session>) -> Result<Self> {
        let mut space_feed = store.subscribe_spaces();
        let mut membership_feed = session
            .as_ref()
            .map(|s| store.subscribe_memberships(s.user_id));

        let mut directory = SpaceDirectory::new(store, session);
        directory.load().await?;
        let directory = Arc::new(Mutex::new(directory));

        let mut pumps = Vec::new();
        pumps.push({
            let directory = directory.clone();
            tokio::spawn(async move {
                while let Some(event) = space_feed.recv().await {
                    directory.lock().await.apply_space_event(event);
                }
                debug!("space feed closed");
            })
        });
        if let Some(mut feed) = membership_feed.take() {
            let directory = directory.clone();
            pumps.push(tokio::spawn(async move {
                while let Some(event) = feed.recv().await {
                    directory.lock().await.apply_membership_event(event);
                }
                debug!("membership feed closed");
            }));
        }

        info!("explore view opened");
        Ok(Self {
            directory,
            closed: AtomicBool::new(false),
            pumps,
        })
    }

    /// Shared handle to the directory for joins, creates and admin actions.
    pub fn directory(&self) -> Arc<Mutex<SpaceDirectory<S>>> {
        self.directory.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        info!("explore view closed");
    }
}

impl<S> Drop for ExploreView<S> {
    fn drop(&mut self) {
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }
}
