//! # barakholka-server
//!
//! Chat and bookmarking backend for the Barakholka classifieds board.
//!
//! This binary provides:
//! - **REST API** (axum) for buyer/seller chats, read state, favorites and
//!   staff statistics
//! - **Directory sync** endpoints through which the identity and ad services
//!   push users and ads
//! - **`update-stats`** maintenance command for cron
//! - **Per-user rate limiting** of chat messages

mod api;
mod config;
mod error;
mod identity;
mod maintenance;
mod rate_limit;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use barakholka_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "barakholka-server")]
#[command(version, about = "Barakholka chat and favorites server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Recompute the site statistics snapshot and exit.
    UpdateStats {
        /// Print every counter after the update.
        #[arg(long)]
        verbose: bool,
    },
}

fn open_database(config: &ServerConfig) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,barakholka_server=debug,barakholka_store=debug")
        }))
        .init();

    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Load configuration and open the database
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    let mut db = open_database(&config)?;

    if let Some(Command::UpdateStats { verbose }) = cli.command {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = maintenance::update_stats(&mut db, verbose, &mut stdout) {
            tracing::error!(error = %e, "statistics update failed");
            return Err(e);
        }
        return Ok(());
    }

    info!("Starting Barakholka server v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        database = ?db.path(),
        directory_sync_enabled = config.admin_token.is_some(),
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Build application state
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = app_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
