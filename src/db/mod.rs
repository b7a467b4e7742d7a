//! Durable idempotency ledger.
//!
//! A single SQLite table of processed source events, keyed by
//! (chain id, relay key). Rows are inserted exactly once, after the
//! destination action is confirmed, and are never updated or deleted.
//! The ledger is the single source of truth for "already relayed",
//! independent of the destination contract's own replay guard.

use eyre::{Result, WrapErr};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

pub mod models;

pub use models::*;

/// Settlement reference recorded when the destination contract's replay
/// guard had already applied the action, so there is no tx hash of our own.
pub const IDEMPOTENT_SETTLEMENT: &str = "IDEMPOTENT";

/// Open (creating if missing) the ledger database at the given path.
pub async fn create_pool(db_path: &str) -> Result<SqlitePool> {
    // The deployment step only guarantees the file location, not the directory.
    if let Some(dir) = Path::new(db_path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("Failed to create ledger directory {}", dir.display()))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .wrap_err_with(|| format!("Failed to open ledger database at {}", db_path))
}

/// Run pending migrations (uses the migration files in migrations/)
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .wrap_err("Failed to run ledger migrations")?;
    Ok(())
}

/// Check whether a source event has already been relayed.
pub async fn has_processed(pool: &SqlitePool, chain_id: i64, relay_key: &str) -> Result<bool> {
    let row: (bool,) = sqlx::query_as(
        r#"SELECT EXISTS(SELECT 1 FROM processed_events WHERE chain_id = ? AND relay_key = ?)"#,
    )
    .bind(chain_id)
    .bind(relay_key)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to check processed event")?;

    Ok(row.0)
}

/// Record a source event as relayed.
///
/// Idempotent: a duplicate insert is silently ignored and never overwrites
/// the settlement reference recorded first.
pub async fn mark_processed(
    pool: &SqlitePool,
    chain_id: i64,
    relay_key: &str,
    settlement_ref: &str,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO processed_events (chain_id, relay_key, settlement_ref)
           VALUES (?, ?, ?)
           ON CONFLICT(chain_id, relay_key) DO NOTHING"#,
    )
    .bind(chain_id)
    .bind(relay_key)
    .bind(settlement_ref)
    .execute(pool)
    .await
    .wrap_err_with(|| format!("Failed to mark event {}/{} processed", chain_id, relay_key))?;

    Ok(())
}

/// Load a ledger row, if present.
pub async fn get_processed(
    pool: &SqlitePool,
    chain_id: i64,
    relay_key: &str,
) -> Result<Option<ProcessedEvent>> {
    sqlx::query_as::<_, ProcessedEvent>(
        r#"SELECT chain_id, relay_key, settlement_ref, created_at
           FROM processed_events WHERE chain_id = ? AND relay_key = ?"#,
    )
    .bind(chain_id)
    .bind(relay_key)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to load processed event")
}

/// Total number of ledger rows.
pub async fn processed_count(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM processed_events"#)
        .fetch_one(pool)
        .await
        .wrap_err("Failed to count processed events")?;

    Ok(row.0)
}
