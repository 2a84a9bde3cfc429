use barakholka_shared::{MessageBody, MessageId, RoomId, UserId};
use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};

use crate::database::{count, format_ts, parse_ts, Database};
use crate::error::Result;
use crate::models::Message;
use crate::rooms::room_for_viewer;

const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, content, timestamp, is_read";

impl Database {
    /// Append a message to a room. The sender must be its buyer or seller.
    pub fn post_message(
        &mut self,
        room_id: RoomId,
        sender: UserId,
        body: &MessageBody,
    ) -> Result<Message> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        room_for_viewer(&tx, room_id, sender)?;
        let message = insert_message(&tx, room_id, sender, body)?;

        tx.commit()?;
        Ok(message)
    }

    /// Full transcript of a room, oldest first.
    pub fn list_messages(&self, room_id: RoomId, viewer: UserId) -> Result<Vec<Message>> {
        room_for_viewer(self.conn(), room_id, viewer)?;
        messages_for_room(self.conn(), room_id, None)
    }

    /// Messages with an id greater than `last_id`, oldest first. Used by
    /// clients polling for new messages.
    pub fn list_messages_since(
        &self,
        room_id: RoomId,
        viewer: UserId,
        last_id: MessageId,
    ) -> Result<Vec<Message>> {
        room_for_viewer(self.conn(), room_id, viewer)?;
        messages_for_room(self.conn(), room_id, Some(last_id))
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id.0],
                row_to_message,
            )
            .map_err(crate::error::not_found)
    }

    pub fn count_messages(&self) -> Result<u64> {
        count(self.conn(), "SELECT COUNT(*) FROM messages")
    }
}

/// Insert without any participant check; callers have already done it.
///
/// The timestamp is clamped to the room's latest one so that a clock step
/// backwards cannot reorder the transcript.
pub(crate) fn insert_message(
    conn: &Connection,
    room_id: RoomId,
    sender: UserId,
    body: &MessageBody,
) -> Result<Message> {
    let latest: Option<String> = conn.query_row(
        "SELECT MAX(timestamp) FROM messages WHERE room_id = ?1",
        params![room_id.0],
        |row| row.get(0),
    )?;

    let mut timestamp = Utc::now();
    if let Some(latest) = latest {
        timestamp = timestamp.max(parse_ts(&latest, 0)?);
    }

    conn.execute(
        "INSERT INTO messages (room_id, sender_id, content, timestamp, is_read)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![room_id.0, sender.0, body.as_str(), format_ts(&timestamp)],
    )?;
    let id = MessageId(conn.last_insert_rowid());

    tracing::debug!(
        message_id = %id,
        room_id = %room_id,
        sender = %sender,
        len = body.as_str().len(),
        "message posted"
    );

    // Re-read so the returned timestamp has the stored precision.
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        params![id.0],
        row_to_message,
    )
    .map_err(Into::into)
}

pub(crate) fn messages_for_room(
    conn: &Connection,
    room_id: RoomId,
    after: Option<MessageId>,
) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages
         WHERE room_id = ?1 AND id > ?2
         ORDER BY timestamp ASC, id ASC"
    ))?;

    let rows = stmt.query_map(
        params![room_id.0, after.map_or(0, |id| id.0)],
        row_to_message,
    )?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let ts: String = row.get(4)?;
    Ok(Message {
        id: MessageId(row.get(0)?),
        room_id: RoomId(row.get(1)?),
        sender: UserId(row.get(2)?),
        content: row.get(3)?,
        timestamp: parse_ts(&ts, 4)?,
        is_read: row.get(5)?,
    })
}
