//! Messages exchanged between the application shell and the agent.

use crate::notification::NotificationRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Control messages posted by the shell to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Promote a waiting agent to active.
    SkipWaiting,
    /// Delete every cache partition.
    ClearCache,
    /// Set (`count > 0`) or clear (`count == 0`) the application badge.
    UpdateBadge { count: u64 },
    /// Refresh the unread notification list with the caller's credentials.
    FetchNotifications {
        #[serde(rename = "userId")]
        user_id: UserRef,
        token: String,
    },
}

impl ControlMessage {
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        serde_json::from_str(raw).map_err(|e| crate::Error::InvalidMessage(e.to_string()))
    }

    /// Message kind as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::SkipWaiting => "SKIP_WAITING",
            ControlMessage::ClearCache => "CLEAR_CACHE",
            ControlMessage::UpdateBadge { .. } => "UPDATE_BADGE",
            ControlMessage::FetchNotifications { .. } => "FETCH_NOTIFICATIONS",
        }
    }
}

/// The shell identifies users either by numeric id or by a string handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(i64),
    Handle(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{}", id),
            UserRef::Handle(handle) => f.write_str(handle),
        }
    }
}

/// Messages broadcast by the agent to every connected application instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastMessage {
    NotificationsUpdated {
        count: u64,
        notifications: Vec<NotificationRecord>,
    },
}
