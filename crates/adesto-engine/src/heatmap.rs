//! The availability heatmap aggregation engine.
//!
//! Maintains a per-(date, hour) projection of signal counts for one space,
//! consistent with the signal store: built from one `load_window` snapshot,
//! mutated optimistically by local toggles, and reconciled against the
//! realtime feed by [`HeatmapEngine::apply_remote_event`].
//!
//! The feed is at-least-once and unordered. The two defenses are the
//! floor-clamp on decrements and self-echo suppression: an echoed event for
//! a toggle this client already applied optimistically must not mutate the
//! counter a second time.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use adesto_shared::{DateWindow, SlotKey, SpaceId, UserId};
use adesto_store::{SignalEvent, SignalKey, SignalStore, StoreError};

use crate::error::{EngineError, Result};

/// The derived view of one slot.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SlotProjection {
    /// Total signals from all users for this slot. Never negative.
    pub count: u32,
    /// Whether the viewing user has a signal here.
    pub mine: bool,
}

/// Aggregates signals for one space over the visible window.
///
/// Owned by exactly one view; a new view builds its own projection.
pub struct HeatmapEngine<S> {
    store: S,
    space_id: SpaceId,
    /// `None` while browsing logged out; toggles are rejected then.
    viewer: Option<UserId>,
    window: DateWindow,
    slots: HashMap<SlotKey, SlotProjection>,
    /// False until a window load succeeds; also false after a failed load,
    /// which is how "errored empty" stays distinguishable from "zero rows".
    loaded: bool,
}

impl<S: SignalStore> HeatmapEngine<S> {
    pub fn new(store: S, space_id: SpaceId, viewer: Option<UserId>, window: DateWindow) -> Self {
        Self {
            store,
            space_id,
            viewer,
            window,
            slots: HashMap::new(),
            loaded: false,
        }
    }

    /// Fetch all signals in `window` and rebuild the projection.
    ///
    /// On failure the projection is left empty and unloaded; toggles stay
    /// disabled until a retry succeeds.
    pub async fn load_window(&mut self, window: DateWindow) -> Result<()> {
        self.window = window;
        self.slots.clear();
        self.loaded = false;

        let rows = self
            .store
            .query_signals(self.space_id, &window)
            .await
            .map_err(|e| {
                warn!(space = %self.space_id, error = %e, "window load failed");
                e
            })?;

        for signal in rows {
            let entry = self.slots.entry(signal.slot()).or_default();
            entry.count += 1;
            if Some(signal.user_id) == self.viewer {
                entry.mine = true;
            }
        }
        self.loaded = true;
        debug!(
            space = %self.space_id,
            start = %window.start(),
            days = window.days(),
            slots = self.slots.len(),
            "window loaded"
        );
        Ok(())
    }

    /// Reload the current window.
    pub async fn reload(&mut self) -> Result<()> {
        self.load_window(self.window).await
    }

    /// Flip the viewer's signal for `slot`.
    ///
    /// The local projection is mutated before the write is dispatched, so
    /// the caller never waits on the network for feedback. A failed write
    /// is logged and returned, and the optimistic mutation is deliberately
    /// left in place; the next load or a corrective remote event reconciles
    /// it (see DESIGN.md on why there is no rollback).
    ///
    /// A slot outside the current window is dropped silently: expected
    /// during window transitions, not an error.
    pub async fn toggle(&mut self, slot: SlotKey) -> Result<()> {
        let viewer = self.viewer.ok_or(EngineError::Unauthenticated)?;
        if !self.loaded {
            return Err(EngineError::NotLoaded);
        }
        if !self.window.contains(slot.date) {
            debug!(slot = %slot, "toggle outside window dropped");
            return Ok(());
        }

        let key = SignalKey::new(self.space_id, viewer, slot);
        let was_mine = self.slots.get(&slot).map(|p| p.mine).unwrap_or(false);

        if was_mine {
            let entry = self.slots.entry(slot).or_default();
            entry.count = entry.count.saturating_sub(1);
            entry.mine = false;

            if let Err(e) = self.store.delete_signal(&key).await {
                warn!(slot = %slot, error = %e, "signal delete failed; local state kept");
                return Err(e.into());
            }
        } else {
            let entry = self.slots.entry(slot).or_default();
            entry.count += 1;
            entry.mine = true;

            match self.store.insert_signal(key).await {
                Ok(_) => {}
                // The row already exists (same user, another tab); the
                // local state already says mine, nothing to undo.
                Err(StoreError::Conflict(reason)) => {
                    debug!(slot = %slot, reason, "signal insert conflicted");
                }
                Err(e) => {
                    warn!(slot = %slot, error = %e, "signal insert failed; local state kept");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Apply one realtime feed event to the projection.
    ///
    /// Pure with respect to the store: safe to call with duplicated or
    /// reordered events.
    pub fn apply_remote_event(&mut self, event: &SignalEvent) {
        let signal = event.signal();
        if signal.space_id != self.space_id || !self.window.contains(signal.date) {
            return;
        }

        let slot = signal.slot();
        let is_self = Some(signal.user_id) == self.viewer;
        let mine = self.slots.get(&slot).map(|p| p.mine).unwrap_or(false);

        match event {
            SignalEvent::Inserted(_) => {
                // Self-echo: the optimistic toggle already counted this.
                if is_self && mine {
                    return;
                }
                let entry = self.slots.entry(slot).or_default();
                entry.count += 1;
                if is_self {
                    // Same user from another tab or device.
                    entry.mine = true;
                }
            }
            SignalEvent::Deleted(_) => {
                if is_self && !mine {
                    return;
                }
                let entry = self.slots.entry(slot).or_default();
                entry.count = entry.count.saturating_sub(1);
                if is_self {
                    entry.mine = false;
                }
            }
        }
    }

    /// The projection for one slot; zero/false for slots nobody signaled.
    pub fn slot(&self, slot: &SlotKey) -> SlotProjection {
        self.slots.get(slot).copied().unwrap_or_default()
    }

    /// All non-empty slots.
    pub fn projection(&self) -> &HashMap<SlotKey, SlotProjection> {
        &self.slots
    }

    /// Whether the last window load succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adesto_store::MemoryStore;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn slot(d: u32, hour: &str) -> SlotKey {
        SlotKey::new(date(d), hour.parse().unwrap())
    }

    fn window() -> DateWindow {
        DateWindow::new(date(15), 7)
    }

    async fn loaded_engine(
        store: &MemoryStore,
        viewer: Option<UserId>,
    ) -> (SpaceId, HeatmapEngine<MemoryStore>) {
        let space = SpaceId::new();
        let mut engine = HeatmapEngine::new(store.clone(), space, viewer, window());
        engine.load_window(window()).await.unwrap();
        (space, engine)
    }

    #[tokio::test]
    async fn load_tallies_counts_and_marks_mine() {
        let store = MemoryStore::new();
        let u1 = UserId::new();
        let u2 = UserId::new();
        let space = SpaceId::new();
        for user in [u1, u2] {
            store
                .insert_signal(SignalKey::new(space, user, slot(15, "8AM")))
                .await
                .unwrap();
        }

        let mut engine = HeatmapEngine::new(store.clone(), space, Some(u1), window());
        engine.load_window(window()).await.unwrap();

        let projection = engine.slot(&slot(15, "8AM"));
        assert_eq!(projection.count, 2);
        assert!(projection.mine);
        assert_eq!(engine.slot(&slot(15, "9AM")), SlotProjection::default());
    }

    #[tokio::test]
    async fn toggle_twice_returns_to_empty() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (_, mut engine) = loaded_engine(&store, Some(viewer)).await;
        let s = slot(16, "8AM");

        engine.toggle(s).await.unwrap();
        assert_eq!(engine.slot(&s), SlotProjection { count: 1, mine: true });

        engine.toggle(s).await.unwrap();
        assert_eq!(engine.slot(&s), SlotProjection { count: 0, mine: false });
    }

    #[tokio::test]
    async fn self_echo_insert_is_not_double_counted() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (space, mut engine) = loaded_engine(&store, Some(viewer)).await;
        let s = slot(16, "8AM");

        let mut feed = store.subscribe_signals(space);
        engine.toggle(s).await.unwrap();

        // The echo of our own insert arrives on the feed.
        let echo = feed.recv().await.expect("echo");
        engine.apply_remote_event(&echo);
        // And again: the feed is at-least-once.
        engine.apply_remote_event(&echo);

        assert_eq!(engine.slot(&s), SlotProjection { count: 1, mine: true });
    }

    #[tokio::test]
    async fn self_echo_delete_is_suppressed_after_toggle_off() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (space, mut engine) = loaded_engine(&store, Some(viewer)).await;
        let s = slot(16, "8AM");

        engine.toggle(s).await.unwrap();
        let mut feed = store.subscribe_signals(space);
        engine.toggle(s).await.unwrap();

        let echo = feed.recv().await.expect("delete echo");
        engine.apply_remote_event(&echo);

        assert_eq!(engine.slot(&s), SlotProjection { count: 0, mine: false });
    }

    #[tokio::test]
    async fn count_never_goes_negative_under_duplicate_deletes() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let other = UserId::new();
        let (space, mut engine) = loaded_engine(&store, Some(viewer)).await;

        let deleted = SignalEvent::Deleted(adesto_store::Signal {
            space_id: space,
            user_id: other,
            date: date(16),
            hour: "8AM".parse().unwrap(),
            created_at: chrono::Utc::now(),
        });

        // Delete delivered before its insert, then duplicated.
        engine.apply_remote_event(&deleted);
        engine.apply_remote_event(&deleted);
        assert_eq!(engine.slot(&slot(16, "8AM")).count, 0);

        let inserted = SignalEvent::Inserted(deleted.signal().clone());
        engine.apply_remote_event(&inserted);
        assert_eq!(engine.slot(&slot(16, "8AM")).count, 1);
    }

    #[tokio::test]
    async fn cross_tab_self_event_updates_mine() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (space, mut engine) = loaded_engine(&store, Some(viewer)).await;
        let s = slot(16, "8AM");

        // The same user signals from another device: no local optimistic
        // state, so suppression must not trigger.
        let event = SignalEvent::Inserted(adesto_store::Signal {
            space_id: space,
            user_id: viewer,
            date: s.date,
            hour: s.hour,
            created_at: chrono::Utc::now(),
        });
        engine.apply_remote_event(&event);

        assert_eq!(engine.slot(&s), SlotProjection { count: 1, mine: true });
    }

    #[tokio::test]
    async fn window_change_discards_out_of_range_state_and_events() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (space, mut engine) = loaded_engine(&store, Some(viewer)).await;
        engine.toggle(slot(16, "8AM")).await.unwrap();

        // Move to the next window: old slots are gone.
        engine.load_window(window().next()).await.unwrap();
        assert_eq!(engine.slot(&slot(16, "8AM")), SlotProjection::default());

        // Events for the old range no longer apply.
        let stale = SignalEvent::Inserted(adesto_store::Signal {
            space_id: space,
            user_id: UserId::new(),
            date: date(16),
            hour: "8AM".parse().unwrap(),
            created_at: chrono::Utc::now(),
        });
        engine.apply_remote_event(&stale);
        assert!(engine.projection().is_empty());

        // As do toggles for the old range, silently.
        engine.toggle(slot(16, "8AM")).await.unwrap();
        assert!(engine.projection().is_empty());
    }

    #[tokio::test]
    async fn toggle_requires_a_loaded_projection_and_a_session() {
        let store = MemoryStore::new();
        let space = SpaceId::new();

        let mut anonymous = HeatmapEngine::new(store.clone(), space, None, window());
        anonymous.load_window(window()).await.unwrap();
        assert!(matches!(
            anonymous.toggle(slot(16, "8AM")).await,
            Err(EngineError::Unauthenticated)
        ));

        let mut unloaded =
            HeatmapEngine::new(store.clone(), space, Some(UserId::new()), window());
        assert!(matches!(
            unloaded.toggle(slot(16, "8AM")).await,
            Err(EngineError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn failed_load_leaves_projection_unloaded_not_empty_success() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (_, mut engine) = loaded_engine(&store, Some(viewer)).await;
        assert!(engine.is_loaded());

        store.set_offline(true);
        assert!(engine.load_window(window()).await.is_err());
        assert!(!engine.is_loaded());
        assert!(engine.projection().is_empty());

        store.set_offline(false);
        engine.reload().await.unwrap();
        assert!(engine.is_loaded());
    }

    #[tokio::test]
    async fn failed_write_keeps_optimistic_state_and_reports() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (_, mut engine) = loaded_engine(&store, Some(viewer)).await;
        let s = slot(16, "8AM");

        store.set_offline(true);
        let result = engine.toggle(s).await;
        assert!(matches!(result, Err(EngineError::Store(_))));

        // No rollback: the optimistic mutation stays until the next load
        // reconciles it.
        assert_eq!(engine.slot(&s), SlotProjection { count: 1, mine: true });

        store.set_offline(false);
        engine.reload().await.unwrap();
        assert_eq!(engine.slot(&s), SlotProjection::default());
    }

    #[tokio::test]
    async fn duplicate_insert_conflict_is_tolerated() {
        let store = MemoryStore::new();
        let viewer = UserId::new();
        let (space, mut engine) = loaded_engine(&store, Some(viewer)).await;
        let s = slot(16, "8AM");

        // Another tab already wrote the row.
        store
            .insert_signal(SignalKey::new(space, viewer, s))
            .await
            .unwrap();

        // The local toggle conflicts on insert but settles on mine=true.
        engine.toggle(s).await.unwrap();
        assert_eq!(engine.slot(&s), SlotProjection { count: 1, mine: true });
    }
}
