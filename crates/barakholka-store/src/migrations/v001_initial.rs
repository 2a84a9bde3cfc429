//! v001 -- Initial schema creation.
//!
//! Creates the directory mirror (`users`, `ads`) and the chat tables
//! (`chat_rooms`, `messages`).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (mirrored from the identity service)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           INTEGER PRIMARY KEY NOT NULL,
    display_name TEXT NOT NULL,
    is_seller    INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    is_staff     INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    joined_at    TEXT NOT NULL                -- RFC-3339, microseconds
);

CREATE INDEX IF NOT EXISTS idx_users_staff ON users(is_staff, id);

-- ----------------------------------------------------------------
-- Ads (mirrored from the ad service)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ads (
    id         INTEGER PRIMARY KEY NOT NULL,
    seller_id  INTEGER NOT NULL,              -- FK -> users(id)
    title      TEXT NOT NULL,
    available  INTEGER NOT NULL DEFAULT 1,    -- boolean 0/1
    created_at TEXT NOT NULL,

    FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_ads_seller ON ads(seller_id);

-- ----------------------------------------------------------------
-- Chat rooms
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_rooms (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    buyer_id   INTEGER NOT NULL,              -- FK -> users(id)
    seller_id  INTEGER NOT NULL,              -- FK -> users(id)
    ad_id      INTEGER,                       -- nullable FK -> ads(id); NULL = general chat
    created_at TEXT NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,    -- boolean 0/1

    CHECK (buyer_id <> seller_id),
    FOREIGN KEY (buyer_id)  REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (ad_id)     REFERENCES ads(id)   ON DELETE CASCADE
);

-- One active room per (buyer, seller, ad); a general chat (ad_id NULL) is
-- its own key value. Ad ids are positive so 0 never collides.
CREATE UNIQUE INDEX IF NOT EXISTS idx_chat_rooms_active_triple
    ON chat_rooms(buyer_id, seller_id, IFNULL(ad_id, 0))
    WHERE is_active = 1;

CREATE INDEX IF NOT EXISTS idx_chat_rooms_buyer  ON chat_rooms(buyer_id);
CREATE INDEX IF NOT EXISTS idx_chat_rooms_seller ON chat_rooms(seller_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id   INTEGER NOT NULL,               -- FK -> chat_rooms(id)
    sender_id INTEGER NOT NULL,               -- FK -> users(id)
    content   TEXT NOT NULL,
    timestamp TEXT NOT NULL,                  -- RFC-3339, microseconds
    is_read   INTEGER NOT NULL DEFAULT 0,     -- boolean 0/1

    CHECK (length(content) > 0),
    FOREIGN KEY (room_id)   REFERENCES chat_rooms(id) ON DELETE CASCADE,
    FOREIGN KEY (sender_id) REFERENCES users(id)      ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_room_ts
    ON messages(room_id, timestamp, id);

CREATE INDEX IF NOT EXISTS idx_messages_unread
    ON messages(room_id, sender_id)
    WHERE is_read = 0;
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
