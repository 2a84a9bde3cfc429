use thiserror::Error;

/// Rejections raised while validating user-supplied chat content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message too long: {len} characters (max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}
