//! The space directory (explore view) projection.
//!
//! Same shape as the heatmap at lower complexity: one load builds the list
//! of spaces plus the viewer's membership set, then realtime space and
//! membership events keep it current. Join/leave mutate optimistically
//! before the write, like a toggle. Admin actions are creator-gated.

use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use adesto_shared::{Session, SpaceId};
use adesto_store::{
    Membership, MembershipEvent, NewSpace, Space, SpaceEvent, SpaceStore, StoreError,
};

use crate::error::{EngineError, Result};

/// Projection of all spaces and the viewer's memberships.
pub struct SpaceDirectory<S> {
    store: S,
    /// `None` while browsing logged out; join/leave/create are rejected then.
    session: Option<Session>,
    spaces: Vec<Space>,
    joined: HashSet<SpaceId>,
    loaded: bool,
}

impl<S: SpaceStore> SpaceDirectory<S> {
    pub fn new(store: S, session: Option<Session>) -> Self {
        Self {
            store,
            session,
            spaces: Vec::new(),
            joined: HashSet::new(),
            loaded: false,
        }
    }

    /// Fetch all spaces and the viewer's membership set.
    pub async fn load(&mut self) -> Result<()> {
        self.spaces.clear();
        self.joined.clear();
        self.loaded = false;

        self.spaces = self.store.list_spaces().await.map_err(|e| {
            warn!(error = %e, "space list load failed");
            e
        })?;

        if let Some(session) = &self.session {
            self.joined = self
                .store
                .memberships_for_user(session.user_id)
                .await?
                .into_iter()
                .map(|m| m.space_id)
                .collect();
        }
        self.loaded = true;
        Ok(())
    }

    /// Apply one realtime space event to the projection.
    pub fn apply_space_event(&mut self, event: SpaceEvent) {
        match event {
            SpaceEvent::Inserted(space) => {
                if !self.spaces.iter().any(|s| s.id == space.id) {
                    self.spaces.push(space);
                }
            }
            SpaceEvent::Updated(space) => {
                if let Some(existing) = self.spaces.iter_mut().find(|s| s.id == space.id) {
                    *existing = space;
                }
            }
            SpaceEvent::Deleted(id) => {
                self.spaces.retain(|s| s.id != id);
                self.joined.remove(&id);
            }
        }
    }

    /// Apply one realtime membership event for the viewer.
    ///
    /// Set semantics make self-echoes of optimistic joins/leaves harmless.
    pub fn apply_membership_event(&mut self, event: MembershipEvent) {
        let Some(session) = &self.session else {
            return;
        };
        let membership = event.membership();
        if membership.user_id != session.user_id {
            return;
        }
        match event {
            MembershipEvent::Joined(m) => {
                self.joined.insert(m.space_id);
            }
            MembershipEvent::Left(m) => {
                self.joined.remove(&m.space_id);
            }
        }
    }

    /// Join a space, optimistically marking it joined before the write.
    pub async fn join(&mut self, space_id: SpaceId) -> Result<()> {
        let session = self.session.clone().ok_or(EngineError::Unauthenticated)?;
        if self.joined.contains(&space_id) {
            return Ok(());
        }

        self.joined.insert(space_id);
        if let Some(space) = self.spaces.iter_mut().find(|s| s.id == space_id) {
            space.members_count += 1;
        }

        match self.store.join_space(space_id, session.user_id).await {
            Ok(_) => Ok(()),
            // Already a member server-side (another tab); local state agrees.
            Err(StoreError::Conflict(reason)) => {
                debug!(space = %space_id, reason, "join conflicted");
                Ok(())
            }
            Err(e) => {
                warn!(space = %space_id, error = %e, "join failed; local state kept");
                Err(e.into())
            }
        }
    }

    /// Leave a space, optimistically unmarking it before the write.
    pub async fn leave(&mut self, space_id: SpaceId) -> Result<()> {
        let session = self.session.clone().ok_or(EngineError::Unauthenticated)?;
        if !self.joined.remove(&space_id) {
            return Ok(());
        }
        if let Some(space) = self.spaces.iter_mut().find(|s| s.id == space_id) {
            space.members_count = space.members_count.saturating_sub(1);
        }

        if let Err(e) = self.store.leave_space(space_id, session.user_id).await {
            warn!(space = %space_id, error = %e, "leave failed; local state kept");
            return Err(e.into());
        }
        Ok(())
    }

    /// Create a space owned by the viewer and add it to the projection.
    pub async fn create(&mut self, mut new: NewSpace) -> Result<Space> {
        let session = self.session.clone().ok_or(EngineError::Unauthenticated)?;
        new.creator_id = session.user_id;

        let space = self.store.insert_space(new).await?;
        if !self.spaces.iter().any(|s| s.id == space.id) {
            self.spaces.push(space.clone());
        }
        Ok(space)
    }

    /// Admin: list the members of a space the viewer created.
    pub async fn members(&self, space_id: SpaceId) -> Result<Vec<Membership>> {
        self.require_creator(space_id)?;
        Ok(self.store.list_members(space_id).await?)
    }

    /// Admin: remove a member from a space the viewer created.
    pub async fn remove_member(&self, space_id: SpaceId, membership_id: Uuid) -> Result<()> {
        self.require_creator(space_id)?;
        self.store.remove_member(membership_id).await?;
        Ok(())
    }

    /// Admin: delete a space the viewer created. Removed from the
    /// projection optimistically before the write.
    pub async fn delete_space(&mut self, space_id: SpaceId) -> Result<()> {
        self.require_creator(space_id)?;
        self.spaces.retain(|s| s.id != space_id);
        self.joined.remove(&space_id);

        if let Err(e) = self.store.delete_space(space_id).await {
            warn!(space = %space_id, error = %e, "space delete failed; local state kept");
            return Err(e.into());
        }
        Ok(())
    }

    fn require_creator(&self, space_id: SpaceId) -> Result<()> {
        let session = self.session.as_ref().ok_or(EngineError::Unauthenticated)?;
        let space = self
            .spaces
            .iter()
            .find(|s| s.id == space_id)
            .ok_or(EngineError::UnknownSpace)?;
        if space.creator_id != session.user_id {
            return Err(EngineError::NotCreator);
        }
        Ok(())
    }

    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    pub fn is_joined(&self, space_id: SpaceId) -> bool {
        self.joined.contains(&space_id)
    }

    /// Whether the last load succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}
