use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS favorites (
    user_id    INTEGER NOT NULL,              -- FK -> users(id)
    ad_id      INTEGER NOT NULL,              -- FK -> ads(id)
    created_at TEXT NOT NULL,                 -- RFC-3339, microseconds

    PRIMARY KEY (user_id, ad_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (ad_id)   REFERENCES ads(id)   ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_favorites_user_created
    ON favorites(user_id, created_at DESC);

-- Singleton: the CHECK pins the only legal key.
CREATE TABLE IF NOT EXISTS site_statistics (
    id              INTEGER PRIMARY KEY NOT NULL CHECK (id = 1),
    total_ads       INTEGER NOT NULL DEFAULT 0,
    active_ads      INTEGER NOT NULL DEFAULT 0,
    total_users     INTEGER NOT NULL DEFAULT 0,
    total_chats     INTEGER NOT NULL DEFAULT 0,
    total_messages  INTEGER NOT NULL DEFAULT 0,
    total_favorites INTEGER NOT NULL DEFAULT 0,
    updated_at      TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
