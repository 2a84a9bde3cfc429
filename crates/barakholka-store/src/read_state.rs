//! Unread counts and the bulk mark-as-read transition.
//!
//! `is_read` is only ever flipped here, and only for messages authored by
//! the viewer's counterpart. Each flip is a single conditional `UPDATE`, so
//! concurrent readers see either none or all of it.

use barakholka_shared::{MessageBody, RoomId, UserId};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::database::Database;
use crate::error::Result;
use crate::messages::{insert_message, messages_for_room};
use crate::models::{ChatRoom, RoomView};
use crate::rooms::room_for_viewer;

impl Database {
    /// Unread messages in `room_id` written by `viewer`'s counterpart.
    pub fn unread_count_for(&self, room_id: RoomId, viewer: UserId) -> Result<u64> {
        let (room, role) = room_for_viewer(self.conn(), room_id, viewer)?;
        unread_from(self.conn(), &room, room.counterpart_of(role))
    }

    /// Mark every unread counterpart message in the room as read. Returns the
    /// number of messages that changed; calling it again returns 0.
    pub fn mark_read_on_entry(&self, room_id: RoomId, viewer: UserId) -> Result<usize> {
        let (room, role) = room_for_viewer(self.conn(), room_id, viewer)?;
        mark_read_from(self.conn(), &room, room.counterpart_of(role))
    }

    /// Open a room as `viewer`: post `reply` if given, then mark the
    /// counterpart's messages read, then load the transcript. All three
    /// happen in one transaction.
    pub fn enter_room(
        &mut self,
        room_id: RoomId,
        viewer: UserId,
        reply: Option<&MessageBody>,
    ) -> Result<RoomView> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (room, role) = room_for_viewer(&tx, room_id, viewer)?;

        let posted = reply
            .map(|body| insert_message(&tx, room.id, viewer, body))
            .transpose()?;
        let marked_read = mark_read_from(&tx, &room, room.counterpart_of(role))?;
        let messages = messages_for_room(&tx, room.id, None)?;

        tx.commit()?;

        if marked_read > 0 {
            tracing::debug!(
                room_id = %room.id,
                viewer = %viewer,
                marked_read,
                "messages marked read"
            );
        }

        Ok(RoomView {
            room,
            role,
            posted,
            marked_read,
            messages,
        })
    }
}

fn unread_from(conn: &Connection, room: &ChatRoom, author: UserId) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE room_id = ?1 AND is_read = 0 AND sender_id = ?2",
        params![room.id.0, author.0],
        |row| row.get(0),
    )?;
    Ok(n.max(0) as u64)
}

fn mark_read_from(conn: &Connection, room: &ChatRoom, author: UserId) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE messages SET is_read = 1
         WHERE room_id = ?1 AND is_read = 0 AND sender_id = ?2",
        params![room.id.0, author.0],
    )?;
    Ok(affected)
}
