//! Store migrations.
//!
//! Migrations run in order inside one immediate transaction and are tracked
//! in the `migrations` table, so two processes opening the same store race
//! safely.

use crate::StorageResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StorageResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Store schema up to date");
        tx.commit()?;
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_queue_and_inbox(&tx)?;
    }
    if current_version < 2 {
        migrate_v2_delivery_errors(&tx)?;
    }

    tx.commit()?;
    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: outbound queue and inbox.
fn migrate_v1_queue_and_inbox(conn: &Connection) -> StorageResult<()> {
    info!("Applying migration v1: outbound queue and inbox");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS outbound_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipient TEXT NOT NULL,
            payload BLOB NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            attempts INTEGER NOT NULL DEFAULT 0,
            last_attempt INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_outbound_queue_status
            ON outbound_queue(status, id);

        CREATE TABLE IF NOT EXISTS inbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sender TEXT NOT NULL,
            payload BLOB NOT NULL,
            received_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_inbox_received_at
            ON inbox(received_at);
        ",
    )?;

    record_migration(conn, 1, "queue_and_inbox")?;
    Ok(())
}

/// V2: last delivery error for confirmed delivery.
fn migrate_v2_delivery_errors(conn: &Connection) -> StorageResult<()> {
    info!("Applying migration v2: delivery errors");

    conn.execute_batch("ALTER TABLE outbound_queue ADD COLUMN last_error TEXT;")?;

    record_migration(conn, 2, "delivery_errors")?;
    Ok(())
}
