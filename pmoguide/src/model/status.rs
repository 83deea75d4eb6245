use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification message from upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub date: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub expires: DateTime<Utc>,
    pub next_suggested_connect_time: Option<DateTime<Utc>>,
    pub max_lineups: u32,
    pub messages: Vec<Message>,
}

/// Last modification time of one lineup registered on the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupStamp {
    pub id: String,
    pub modified: DateTime<Utc>,
}

/// Service health as reported by upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub date: DateTime<Utc>,
    pub status: String,
    pub details: String,
}

impl SystemStatus {
    pub fn is_online(&self) -> bool {
        self.status.eq_ignore_ascii_case("online")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub account: Account,
    pub last_data_update: DateTime<Utc>,
    pub notifications: Vec<Message>,
    pub lineups: Vec<LineupStamp>,
    pub system_status: Option<SystemStatus>,
}

impl UserStatus {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.account.expires <= now
    }

    /// Whether upstream refreshed its data after `since`
    pub fn is_new_data_available(&self, since: DateTime<Utc>) -> bool {
        self.last_data_update > since
    }

    /// Every message addressed to the user, account and system alike
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.account.messages.iter().chain(self.notifications.iter())
    }
}
