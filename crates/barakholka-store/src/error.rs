use barakholka_shared::ValidationError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced room, ad, user or message does not exist.
    #[error("Record not found")]
    NotFound,

    /// The acting user is not a participant of the room.
    #[error("Not a participant of this chat")]
    Forbidden,

    /// Buyer and seller resolved to the same user.
    #[error("Cannot open a chat with yourself")]
    SelfChat,

    /// Sellers cannot bookmark their own ads.
    #[error("Cannot add your own ad to favorites")]
    SelfFavoriteForbidden,

    /// General chat requested but no staff account exists.
    #[error("No support agent available")]
    NoSupportAgentAvailable,

    /// Chat content failed validation.
    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] ValidationError),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map `QueryReturnedNoRows` to [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// True if `e` is a UNIQUE / PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}
