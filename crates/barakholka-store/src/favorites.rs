//! Favorites: an idempotent set of `(user, ad)` bookmarks.

use barakholka_shared::{AdId, UserId};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::database::{count, format_ts, parse_ts, Database};
use crate::directory::load_ad;
use crate::error::{Result, StoreError};
use crate::models::{FavoriteEntry, FavoriteOutcome};

impl Database {
    /// Bookmark an ad. A second call reports `AlreadyExists`.
    pub fn add_favorite(&mut self, user: UserId, ad_id: AdId) -> Result<FavoriteOutcome> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = add_in(&tx, user, ad_id)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Drop a bookmark. A missing bookmark reports `NotFound` rather than
    /// failing.
    pub fn remove_favorite(&self, user: UserId, ad_id: AdId) -> Result<FavoriteOutcome> {
        remove_in(self.conn(), user, ad_id)
    }

    /// Remove the bookmark if present, otherwise add it.
    pub fn toggle_favorite(&mut self, user: UserId, ad_id: AdId) -> Result<FavoriteOutcome> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = if is_favorited_in(&tx, user, ad_id)? {
            remove_in(&tx, user, ad_id)?
        } else {
            add_in(&tx, user, ad_id)?
        };

        tx.commit()?;
        Ok(outcome)
    }

    pub fn is_favorited(&self, user: UserId, ad_id: AdId) -> Result<bool> {
        is_favorited_in(self.conn(), user, ad_id)
    }

    /// A user's bookmarks, most recent first, with the ad and its seller.
    pub fn list_favorites(&self, user: UserId) -> Result<Vec<FavoriteEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT a.id, a.title, a.available, s.id, s.display_name, f.created_at
             FROM favorites f
             JOIN ads a   ON a.id = f.ad_id
             JOIN users s ON s.id = a.seller_id
             WHERE f.user_id = ?1
             ORDER BY f.created_at DESC, f.rowid DESC",
        )?;

        let rows = stmt.query_map(params![user.0], |row| {
            let created: String = row.get(5)?;
            Ok(FavoriteEntry {
                ad_id: AdId(row.get(0)?),
                ad_title: row.get(1)?,
                ad_available: row.get(2)?,
                seller_id: UserId(row.get(3)?),
                seller_name: row.get(4)?,
                favorited_at: parse_ts(&created, 5)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn count_favorites(&self) -> Result<u64> {
        count(self.conn(), "SELECT COUNT(*) FROM favorites")
    }
}

fn add_in(conn: &Connection, user: UserId, ad_id: AdId) -> Result<FavoriteOutcome> {
    let ad = load_ad(conn, ad_id)?;
    if ad.is_owned_by(user) {
        return Err(StoreError::SelfFavoriteForbidden);
    }

    let inserted = conn.execute(
        "INSERT INTO favorites (user_id, ad_id, created_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, ad_id) DO NOTHING",
        params![user.0, ad_id.0, format_ts(&Utc::now())],
    )?;

    if inserted > 0 {
        tracing::debug!(user = %user, ad = %ad_id, "favorite added");
        Ok(FavoriteOutcome::Added)
    } else {
        Ok(FavoriteOutcome::AlreadyExists)
    }
}

fn remove_in(conn: &Connection, user: UserId, ad_id: AdId) -> Result<FavoriteOutcome> {
    let affected = conn.execute(
        "DELETE FROM favorites WHERE user_id = ?1 AND ad_id = ?2",
        params![user.0, ad_id.0],
    )?;

    if affected > 0 {
        tracing::debug!(user = %user, ad = %ad_id, "favorite removed");
        Ok(FavoriteOutcome::Removed)
    } else {
        Ok(FavoriteOutcome::NotFound)
    }
}

fn is_favorited_in(conn: &Connection, user: UserId, ad_id: AdId) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM favorites WHERE user_id = ?1 AND ad_id = ?2",
            params![user.0, ad_id.0],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
