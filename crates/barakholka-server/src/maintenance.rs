//! Offline maintenance commands, run from cron rather than over HTTP.

use std::io::Write;

use anyhow::Context;
use barakholka_store::Database;

/// Recompute the statistics snapshot and report it on `out`.
pub fn update_stats(db: &mut Database, verbose: bool, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Updating site statistics...")?;

    let stats = db
        .recompute_statistics()
        .context("failed to update site statistics")?;

    if verbose {
        writeln!(out, "Statistics updated:")?;
        writeln!(out, "  Ads:             {}", stats.total_ads)?;
        writeln!(out, "  Active ads:      {}", stats.active_ads)?;
        writeln!(out, "  Users:           {}", stats.total_users)?;
        writeln!(out, "  Chats:           {}", stats.total_chats)?;
        writeln!(out, "  Messages:        {}", stats.total_messages)?;
        writeln!(out, "  Favorites:       {}", stats.total_favorites)?;
    } else {
        writeln!(out, "Statistics updated")?;
    }

    Ok(())
}
