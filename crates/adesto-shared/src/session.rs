//! The authenticated session.
//!
//! Resolved once when a view mounts and passed into the engines explicitly;
//! engines never reach out to an ambient auth service mid-operation.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// The current user, as the auth layer resolved them at view mount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    /// Display name denormalized onto outgoing messages.
    pub display_name: String,
    /// Avatar URL denormalized onto outgoing messages, if the profile has one.
    pub avatar_url: Option<String>,
}

impl Session {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}
