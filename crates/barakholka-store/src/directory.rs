//! Local mirror of the [`User`] and [`Ad`] records owned by the identity and
//! ad services.
//!
//! The core only reads these rows. They are written by the directory sync
//! API. Deleting a user or an ad cascades to its rooms, messages and
//! favorites through foreign keys.

use barakholka_shared::{Ad, AdId, User, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{count, format_ts, parse_ts, Database};
use crate::error::{not_found, Result};

impl Database {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert a user or update the mirrored fields of an existing one.
    ///
    /// Uses `ON CONFLICT DO UPDATE` rather than `INSERT OR REPLACE`, which
    /// would delete the row first and cascade away the user's chats.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, display_name, is_seller, is_staff, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                is_seller    = excluded.is_seller,
                is_staff     = excluded.is_staff",
            params![
                user.id.0,
                user.display_name,
                user.is_seller,
                user.is_staff,
                format_ts(&user.joined_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, display_name, is_seller, is_staff, joined_at
                 FROM users WHERE id = ?1",
                params![id.0],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// The support agent for general chats: the staff account with the
    /// lowest id.
    pub fn first_staff_user(&self) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, display_name, is_seller, is_staff, joined_at
                 FROM users WHERE is_staff = 1
                 ORDER BY id ASC LIMIT 1",
                [],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Delete a user.  Returns `true` if a row was deleted.
    pub fn delete_user(&self, id: UserId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        Ok(affected > 0)
    }

    pub fn count_users(&self) -> Result<u64> {
        count(self.conn(), "SELECT COUNT(*) FROM users")
    }

    // ------------------------------------------------------------------
    // Ads
    // ------------------------------------------------------------------

    /// Insert an ad or update the mirrored fields of an existing one.
    /// The seller must already be present.
    pub fn upsert_ad(&self, ad: &Ad) -> Result<()> {
        self.conn().execute(
            "INSERT INTO ads (id, seller_id, title, available, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                seller_id = excluded.seller_id,
                title     = excluded.title,
                available = excluded.available",
            params![
                ad.id.0,
                ad.seller.0,
                ad.title,
                ad.available,
                format_ts(&ad.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_ad(&self, id: AdId) -> Result<Ad> {
        load_ad(self.conn(), id)
    }

    // ON DELETE CASCADE: chat rooms, their messages and favorites go with it
    pub fn delete_ad(&self, id: AdId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM ads WHERE id = ?1", params![id.0])?;
        Ok(affected > 0)
    }

    pub fn count_ads(&self) -> Result<u64> {
        count(self.conn(), "SELECT COUNT(*) FROM ads")
    }

    pub fn count_available_ads(&self) -> Result<u64> {
        count(self.conn(), "SELECT COUNT(*) FROM ads WHERE available = 1")
    }
}

pub(crate) fn load_ad(conn: &Connection, id: AdId) -> Result<Ad> {
    conn.query_row(
        "SELECT id, seller_id, title, available, created_at
         FROM ads WHERE id = ?1",
        params![id.0],
        row_to_ad,
    )
    .map_err(not_found)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let joined: String = row.get(4)?;
    Ok(User {
        id: UserId(row.get(0)?),
        display_name: row.get(1)?,
        is_seller: row.get(2)?,
        is_staff: row.get(3)?,
        joined_at: parse_ts(&joined, 4)?,
    })
}

fn row_to_ad(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ad> {
    let created: String = row.get(4)?;
    Ok(Ad {
        id: AdId(row.get(0)?),
        seller: UserId(row.get(1)?),
        title: row.get(2)?,
        available: row.get(3)?,
        created_at: parse_ts(&created, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use barakholka_shared::MessageBody;
    use crate::testutil::{ad, test_db, user};

    #[test]
    fn upsert_and_get_user() {
        let (db, _dir) = test_db();
        let mut u = user(&db, 1, "Alice", false);

        u.display_name = "Alice B.".into();
        u.is_seller = true;
        db.upsert_user(&u).unwrap();

        let fetched = db.get_user(UserId(1)).unwrap();
        assert_eq!(fetched.display_name, "Alice B.");
        assert!(fetched.is_seller);
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn missing_user_is_not_found() {
        let (db, _dir) = test_db();
        assert!(matches!(db.get_user(UserId(99)), Err(StoreError::NotFound)));
        assert!(matches!(db.get_ad(AdId(99)), Err(StoreError::NotFound)));
    }

    #[test]
    fn first_staff_user_picks_lowest_id() {
        let (db, _dir) = test_db();
        assert!(db.first_staff_user().unwrap().is_none());

        user(&db, 1, "buyer", false);
        user(&db, 7, "second agent", true);
        user(&db, 3, "first agent", true);

        let agent = db.first_staff_user().unwrap().unwrap();
        assert_eq!(agent.id, UserId(3));
    }

    #[test]
    fn upserting_user_keeps_their_ads() {
        let (db, _dir) = test_db();
        let seller = user(&db, 1, "seller", false);
        ad(&db, 10, 1, true);

        db.upsert_user(&seller).unwrap();
        assert!(db.get_ad(AdId(10)).is_ok());
    }

    #[test]
    fn ad_counts() {
        let (db, _dir) = test_db();
        user(&db, 1, "seller", false);
        ad(&db, 10, 1, true);
        ad(&db, 11, 1, false);
        ad(&db, 12, 1, true);

        assert_eq!(db.count_ads().unwrap(), 3);
        assert_eq!(db.count_available_ads().unwrap(), 2);

        assert!(db.delete_ad(AdId(11)).unwrap());
        assert!(!db.delete_ad(AdId(11)).unwrap());
        assert_eq!(db.count_ads().unwrap(), 2);
    }

    #[test]
    fn deleting_user_cascades_to_ads() {
        let (db, _dir) = test_db();
        user(&db, 1, "seller", false);
        ad(&db, 10, 1, true);

        assert!(db.delete_user(UserId(1)).unwrap());
        assert_eq!(db.count_ads().unwrap(), 0);
    }

    #[test]
    fn deleting_buyer_removes_their_rooms_messages_and_favorites() {
        let (mut db, _dir) = test_db();
        user(&db, 1, "buyer", false);
        user(&db, 2, "seller", false);
        user(&db, 3, "other seller", false);
        ad(&db, 10, 2, true);
        ad(&db, 20, 3, true);

        let room = db.open_chat_for_ad(UserId(1), AdId(10)).unwrap();
        let body = MessageBody::parse("is it still for sale?").unwrap();
        db.post_message(room.id, UserId(1), &body).unwrap();
        db.post_message(room.id, UserId(2), &body).unwrap();
        db.add_favorite(UserId(1), AdId(20)).unwrap();

        assert!(db.delete_user(UserId(1)).unwrap());

        assert!(matches!(db.get_room(room.id), Err(StoreError::NotFound)));
        assert_eq!(db.count_rooms().unwrap(), 0);
        assert_eq!(db.count_messages().unwrap(), 0);
        assert_eq!(db.count_favorites().unwrap(), 0);
        assert_eq!(db.count_ads().unwrap(), 2);
    }

    #[test]
    fn deleting_seller_removes_their_rooms_and_favorites_of_their_ads() {
        let (mut db, _dir) = test_db();
        user(&db, 1, "buyer", false);
        user(&db, 2, "seller", false);
        user(&db, 3, "support", true);
        ad(&db, 10, 2, true);

        let ad_room = db.open_chat_for_ad(UserId(1), AdId(10)).unwrap();
        let support_room = db.open_general_chat(UserId(1)).unwrap();
        let body = MessageBody::parse("hello").unwrap();
        db.post_message(ad_room.id, UserId(2), &body).unwrap();
        db.post_message(support_room.id, UserId(1), &body).unwrap();
        db.add_favorite(UserId(1), AdId(10)).unwrap();

        assert!(db.delete_user(UserId(2)).unwrap());

        assert!(matches!(db.get_room(ad_room.id), Err(StoreError::NotFound)));
        assert_eq!(db.get_room(support_room.id).unwrap().buyer, UserId(1));
        assert_eq!(db.count_rooms().unwrap(), 1);
        assert_eq!(db.count_messages().unwrap(), 1);
        assert_eq!(db.count_favorites().unwrap(), 0);
        assert_eq!(db.count_ads().unwrap(), 0);
    }
}
