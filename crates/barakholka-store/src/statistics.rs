//! Site-wide statistics: a single row, fully recomputed on demand.
//!
//! There is no incremental path. Every recompute rescans the ledgers inside
//! one transaction, so the stored snapshot is either the previous one or a
//! complete new one.

use barakholka_shared::constants::STATS_ROW_ID;
use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

use crate::database::{format_ts, parse_ts, Database};
use crate::error::Result;
use crate::models::SiteStatistics;

impl Database {
    /// Return the current snapshot, creating the zeroed singleton row on
    /// first access.
    pub fn current_statistics(&self) -> Result<SiteStatistics> {
        ensure_row(self.conn())?;
        load(self.conn())
    }

    /// Recount ads, available ads, users, chat rooms, messages and
    /// favorites and overwrite the snapshot with the result.
    pub fn recompute_statistics(&mut self) -> Result<SiteStatistics> {
        // A shared-borrow transaction, so the ledger counters below run
        // inside it against the same connection.
        let tx = Transaction::new_unchecked(self.conn(), TransactionBehavior::Immediate)?;

        ensure_row(&tx)?;

        let stats = SiteStatistics {
            total_ads: self.count_ads()?,
            active_ads: self.count_available_ads()?,
            total_users: self.count_users()?,
            total_chats: self.count_rooms()?,
            total_messages: self.count_messages()?,
            total_favorites: self.count_favorites()?,
            updated_at: Utc::now(),
        };

        tx.execute(
            "UPDATE site_statistics SET
                total_ads       = ?2,
                active_ads      = ?3,
                total_users     = ?4,
                total_chats     = ?5,
                total_messages  = ?6,
                total_favorites = ?7,
                updated_at      = ?8
             WHERE id = ?1",
            params![
                STATS_ROW_ID,
                stats.total_ads as i64,
                stats.active_ads as i64,
                stats.total_users as i64,
                stats.total_chats as i64,
                stats.total_messages as i64,
                stats.total_favorites as i64,
                format_ts(&stats.updated_at),
            ],
        )?;

        let stored = load(&tx)?;
        tx.commit()?;

        tracing::info!(
            total_ads = stored.total_ads,
            active_ads = stored.active_ads,
            total_users = stored.total_users,
            total_chats = stored.total_chats,
            total_messages = stored.total_messages,
            total_favorites = stored.total_favorites,
            "site statistics recomputed"
        );

        Ok(stored)
    }
}

/// Get-or-create of the singleton. Concurrent first accesses are settled by
/// the primary key on the fixed id.
fn ensure_row(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO site_statistics (id, updated_at) VALUES (?1, ?2)
         ON CONFLICT(id) DO NOTHING",
        params![STATS_ROW_ID, format_ts(&Utc::now())],
    )?;
    Ok(())
}

fn load(conn: &Connection) -> Result<SiteStatistics> {
    let stats = conn.query_row(
        "SELECT total_ads, active_ads, total_users, total_chats,
                total_messages, total_favorites, updated_at
         FROM site_statistics WHERE id = ?1",
        params![STATS_ROW_ID],
        |row| {
            let updated: String = row.get(6)?;
            Ok(SiteStatistics {
                total_ads: row.get::<_, i64>(0)?.max(0) as u64,
                active_ads: row.get::<_, i64>(1)?.max(0) as u64,
                total_users: row.get::<_, i64>(2)?.max(0) as u64,
                total_chats: row.get::<_, i64>(3)?.max(0) as u64,
                total_messages: row.get::<_, i64>(4)?.max(0) as u64,
                total_favorites: row.get::<_, i64>(5)?.max(0) as u64,
                updated_at: parse_ts(&updated, 6)?,
            })
        },
    )?;
    Ok(stats)
}
