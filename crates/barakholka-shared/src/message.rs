//! Validated chat message content.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_MESSAGE_CHARS;
use crate::error::ValidationError;

/// Message text that has already passed validation: trimmed, non-empty and
/// at most [`MAX_MESSAGE_CHARS`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageBody(String);

impl MessageBody {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let len = trimmed.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ValidationError::MessageTooLong {
                len,
                max: MAX_MESSAGE_CHARS,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MessageBody> for String {
    fn from(body: MessageBody) -> Self {
        body.0
    }
}

impl AsRef<str> for MessageBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
