//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so the HTTP layer can return it as JSON
//! without an intermediate DTO.

use barakholka_shared::{AdId, MessageId, Participant, RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChatRoom
// ---------------------------------------------------------------------------

/// A two-party conversation, either about a specific ad or a general
/// support chat (`ad == None`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: RoomId,
    pub buyer: UserId,
    pub seller: UserId,
    /// `None` for a general chat with a staff member.
    pub ad: Option<AdId>,
    pub created_at: DateTime<Utc>,
    /// Soft-deactivation flag; only active rooms take part in lookups.
    pub is_active: bool,
}

impl ChatRoom {
    /// Which side `user` is on, or `None` if they are not in the room.
    pub fn participant(&self, user: UserId) -> Option<Participant> {
        if user == self.buyer {
            Some(Participant::Buyer)
        } else if user == self.seller {
            Some(Participant::Seller)
        } else {
            None
        }
    }

    pub fn user_for(&self, side: Participant) -> UserId {
        match side {
            Participant::Buyer => self.buyer,
            Participant::Seller => self.seller,
        }
    }

    /// The other participant, from `viewer`'s side.
    pub fn counterpart_of(&self, viewer: Participant) -> UserId {
        self.user_for(viewer.counterpart())
    }
}

/// One row of a user's chat list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoomSummary {
    pub room: ChatRoom,
    /// The viewer's side in this room.
    pub role: Participant,
    pub counterpart_name: String,
    pub ad_title: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Unread messages authored by the counterpart.
    pub unread_count: u64,
}

/// What a participant sees when opening a room.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoomView {
    pub room: ChatRoom,
    pub role: Participant,
    /// Message posted as part of this visit, if any.
    pub posted: Option<Message>,
    /// Counterpart messages flipped to read by this visit.
    pub marked_read: usize,
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

/// Result of a favorites mutation. `AlreadyExists` and `NotFound` are
/// notices for the user, not failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteOutcome {
    Added,
    AlreadyExists,
    Removed,
    NotFound,
}

/// A bookmarked ad joined with what the favorites page displays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteEntry {
    pub ad_id: AdId,
    pub ad_title: String,
    pub ad_available: bool,
    pub seller_id: UserId,
    pub seller_name: String,
    pub favorited_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SiteStatistics
// ---------------------------------------------------------------------------

/// The singleton statistics snapshot. Every counter is derived by
/// [`Database::recompute_statistics`](crate::Database::recompute_statistics).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteStatistics {
    pub total_ads: u64,
    pub active_ads: u64,
    pub total_users: u64,
    pub total_chats: u64,
    pub total_messages: u64,
    pub total_favorites: u64,
    pub updated_at: DateTime<Utc>,
}

impl SiteStatistics {
    pub fn avg_ads_per_user(&self) -> f64 {
        ratio(self.total_ads, self.total_users)
    }

    pub fn avg_messages_per_chat(&self) -> f64 {
        ratio(self.total_messages, self.total_chats)
    }

    pub fn active_ads_percentage(&self) -> f64 {
        ratio(self.active_ads, self.total_ads) * 100.0
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
