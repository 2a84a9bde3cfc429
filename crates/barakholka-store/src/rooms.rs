//! Chat room resolution: find-or-create of the single active room for a
//! `(buyer, seller, ad)` triple.
//!
//! Uniqueness lives in the `idx_chat_rooms_active_triple` partial index, not
//! in process memory. Two writers that both miss the lookup race on the
//! insert; the loser sees a UNIQUE violation and re-reads the winner's row.

use barakholka_shared::{AdId, Participant, RoomId, UserId};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::database::{count, format_ts, parse_ts, Database};
use crate::error::{is_unique_violation, not_found, Result, StoreError};
use crate::models::{ChatRoom, RoomSummary};

const ROOM_COLUMNS: &str = "id, buyer_id, seller_id, ad_id, created_at, is_active";

impl Database {
    // ------------------------------------------------------------------
    // Resolve
    // ------------------------------------------------------------------

    /// Return the active room for `(buyer, seller, ad)`, creating it if
    /// needed. `ad == None` is a key value of its own: a general chat never
    /// collapses into a per-ad chat between the same two users.
    pub fn resolve_room(
        &mut self,
        buyer: UserId,
        seller: UserId,
        ad: Option<AdId>,
    ) -> Result<ChatRoom> {
        if buyer == seller {
            return Err(StoreError::SelfChat);
        }

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let room = match find_active_room(&tx, buyer, seller, ad)? {
            Some(room) => room,
            None => insert_room(&tx, buyer, seller, ad)?,
        };

        tx.commit()?;
        Ok(room)
    }

    /// "Message the seller" from an ad page.
    pub fn open_chat_for_ad(&mut self, buyer: UserId, ad_id: AdId) -> Result<ChatRoom> {
        let ad = self.get_ad(ad_id)?;
        if ad.is_owned_by(buyer) {
            return Err(StoreError::SelfChat);
        }
        self.resolve_room(buyer, ad.seller, Some(ad.id))
    }

    /// Start (or resume) a general chat with the support agent, who is the
    /// first staff account.
    pub fn open_general_chat(&mut self, buyer: UserId) -> Result<ChatRoom> {
        let agent = self
            .first_staff_user()?
            .ok_or(StoreError::NoSupportAgentAvailable)?;
        if agent.id == buyer {
            return Err(StoreError::SelfChat);
        }
        self.resolve_room(buyer, agent.id, None)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_room(&self, id: RoomId) -> Result<ChatRoom> {
        load_room(self.conn(), id)
    }

    /// Fetch a room on behalf of `viewer`, rejecting non-participants.
    pub fn room_for_viewer(&self, id: RoomId, viewer: UserId) -> Result<(ChatRoom, Participant)> {
        room_for_viewer(self.conn(), id, viewer)
    }

    /// Active rooms where `viewer` is buyer or seller, newest first, each
    /// annotated with the viewer's unread count.
    pub fn list_rooms_for(&self, viewer: UserId) -> Result<Vec<RoomSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT r.id, r.buyer_id, r.seller_id, r.ad_id, r.created_at, r.is_active,
                    cu.display_name,
                    a.title,
                    (SELECT MAX(m.timestamp) FROM messages m WHERE m.room_id = r.id),
                    (SELECT COUNT(*) FROM messages m
                      WHERE m.room_id = r.id
                        AND m.is_read = 0
                        AND m.sender_id = cu.id)
             FROM chat_rooms r
             JOIN users cu
               ON cu.id = CASE WHEN r.buyer_id = ?1 THEN r.seller_id ELSE r.buyer_id END
             LEFT JOIN ads a ON a.id = r.ad_id
             WHERE r.is_active = 1
               AND (r.buyer_id = ?1 OR r.seller_id = ?1)
             ORDER BY r.created_at DESC, r.id DESC",
        )?;

        let rows = stmt.query_map(params![viewer.0], |row| {
            let room = row_to_room(row)?;
            let last: Option<String> = row.get(8)?;
            let unread: i64 = row.get(9)?;
            Ok((room, row.get::<_, String>(6)?, row.get::<_, Option<String>>(7)?, last, unread))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (room, counterpart_name, ad_title, last, unread) = row?;
            let Some(role) = room.participant(viewer) else {
                continue;
            };
            let last_message_at = last.map(|ts| parse_ts(&ts, 8)).transpose()?;
            summaries.push(RoomSummary {
                room,
                role,
                counterpart_name,
                ad_title,
                last_message_at,
                unread_count: unread.max(0) as u64,
            });
        }
        Ok(summaries)
    }

    pub fn count_rooms(&self) -> Result<u64> {
        count(self.conn(), "SELECT COUNT(*) FROM chat_rooms")
    }

    // ------------------------------------------------------------------
    // Deactivate
    // ------------------------------------------------------------------

    /// Soft-deactivate a room.  Returns `true` if an active room was
    /// deactivated. A later resolve for the same triple creates a new room.
    pub fn deactivate_room(&self, id: RoomId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE chat_rooms SET is_active = 0 WHERE id = ?1 AND is_active = 1",
            params![id.0],
        )?;
        if affected > 0 {
            tracing::info!(room_id = %id, "chat room deactivated");
        }
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn load_room(conn: &Connection, id: RoomId) -> Result<ChatRoom> {
    conn.query_row(
        &format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = ?1"),
        params![id.0],
        row_to_room,
    )
    .map_err(not_found)
}

pub(crate) fn room_for_viewer(
    conn: &Connection,
    id: RoomId,
    viewer: UserId,
) -> Result<(ChatRoom, Participant)> {
    let room = load_room(conn, id)?;
    match room.participant(viewer) {
        Some(role) => Ok((room, role)),
        None => {
            tracing::warn!(room_id = %id, user_id = %viewer, "non-participant denied");
            Err(StoreError::Forbidden)
        }
    }
}

fn find_active_room(
    conn: &Connection,
    buyer: UserId,
    seller: UserId,
    ad: Option<AdId>,
) -> Result<Option<ChatRoom>> {
    // `ad_id IS ?3` so that NULL matches only NULL.
    let room = conn
        .query_row(
            &format!(
                "SELECT {ROOM_COLUMNS} FROM chat_rooms
                 WHERE buyer_id = ?1 AND seller_id = ?2 AND ad_id IS ?3 AND is_active = 1"
            ),
            params![buyer.0, seller.0, ad.map(|a| a.0)],
            row_to_room,
        )
        .optional()?;
    Ok(room)
}

/// Insert a new active room, or return the existing one if the unique index
/// reports that another writer got there first.
fn insert_room(
    conn: &Connection,
    buyer: UserId,
    seller: UserId,
    ad: Option<AdId>,
) -> Result<ChatRoom> {
    let created_at = Utc::now();

    let inserted = conn.execute(
        "INSERT INTO chat_rooms (buyer_id, seller_id, ad_id, created_at, is_active)
         VALUES (?1, ?2, ?3, ?4, 1)",
        params![buyer.0, seller.0, ad.map(|a| a.0), format_ts(&created_at)],
    );

    match inserted {
        Ok(_) => {
            let id = RoomId(conn.last_insert_rowid());
            tracing::info!(
                room_id = %id,
                buyer = %buyer,
                seller = %seller,
                ad = ?ad.map(|a| a.0),
                "chat room created"
            );
            load_room(conn, id)
        }
        Err(e) if is_unique_violation(&e) => {
            tracing::debug!(
                buyer = %buyer,
                seller = %seller,
                "room created concurrently, returning existing room"
            );
            find_active_room(conn, buyer, seller, ad)?.ok_or(StoreError::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRoom> {
    let created: String = row.get(4)?;
    Ok(ChatRoom {
        id: RoomId(row.get(0)?),
        buyer: UserId(row.get(1)?),
        seller: UserId(row.get(2)?),
        ad: row.get::<_, Option<i64>>(3)?.map(AdId),
        created_at: parse_ts(&created, 4)?,
        is_active: row.get(5)?,
    })
}
