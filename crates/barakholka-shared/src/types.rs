use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|id| *id > 0)
                    .map(Self)
                    .ok_or_else(|| ValidationError::InvalidId(s.to_string()))
            }
        }
    };
}

row_id!(
    /// Identity of a marketplace user, owned by the identity service.
    UserId
);
row_id!(
    /// Identity of a classified ad, owned by the ad service.
    AdId
);
row_id!(
    /// Chat room primary key.
    RoomId
);
row_id!(
    /// Message primary key. Allocated in ascending order, which the polling
    /// endpoint relies on.
    MessageId
);

/// A marketplace account as mirrored from the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub is_seller: bool,
    pub is_staff: bool,
    pub joined_at: DateTime<Utc>,
}

/// A classified ad as mirrored from the ad service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ad {
    pub id: AdId,
    pub seller: UserId,
    pub title: String,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl Ad {
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.seller == user
    }
}

/// Which side of a two-party chat a user is on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Buyer,
    Seller,
}

impl Participant {
    pub fn counterpart(self) -> Self {
        match self {
            Self::Buyer => Self::Seller,
            Self::Seller => Self::Buyer,
        }
    }
}
