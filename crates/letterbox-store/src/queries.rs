//! Standalone query functions over a store connection.
//!
//! Each function takes a `&Connection` as its first parameter and runs a
//! single statement, so every write is atomic on its own.

use crate::models::{from_micros, to_micros};
use crate::{Direction, InboxRecord, Message, OutboundRecord, OutboundStatus, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

const OUTBOUND_COLUMNS: &str =
    "id, recipient, payload, status, attempts, last_attempt, last_error";

fn outbound_from_row(row: &Row<'_>) -> rusqlite::Result<OutboundRecord> {
    Ok(OutboundRecord {
        id: row.get(0)?,
        recipient: row.get(1)?,
        payload: row.get(2)?,
        status: OutboundStatus::from_str(&row.get::<_, String>(3)?),
        attempts: row.get(4)?,
        last_attempt: from_micros(row.get(5)?),
        last_error: row.get(6)?,
    })
}

fn inbox_from_row(row: &Row<'_>) -> rusqlite::Result<InboxRecord> {
    Ok(InboxRecord {
        id: row.get(0)?,
        sender: row.get(1)?,
        payload: row.get(2)?,
        received_at: from_micros(row.get(3)?),
    })
}

// ==========================================
// Outbound queue
// ==========================================

/// Queue a payload for `recipient`. Returns the new record id.
pub fn insert_outbound(
    conn: &Connection,
    recipient: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> StorageResult<i64> {
    conn.execute(
        "INSERT INTO outbound_queue (recipient, payload, status, attempts, last_attempt)
         VALUES (?1, ?2, 'pending', 0, ?3)",
        params![recipient, payload, to_micros(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get an outbound record by id.
pub fn get_outbound(conn: &Connection, id: i64) -> StorageResult<Option<OutboundRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {OUTBOUND_COLUMNS} FROM outbound_queue WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id], outbound_from_row);

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All outbound records in id order.
pub fn list_outbound(conn: &Connection) -> StorageResult<Vec<OutboundRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {OUTBOUND_COLUMNS} FROM outbound_queue ORDER BY id ASC"
    ))?;

    let records = stmt
        .query_map([], outbound_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Pending outbound records in id order.
pub fn list_pending_outbound(conn: &Connection) -> StorageResult<Vec<OutboundRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {OUTBOUND_COLUMNS} FROM outbound_queue WHERE status = 'pending' ORDER BY id ASC"
    ))?;

    let records = stmt
        .query_map([], outbound_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Records confirmed delivery may still act on: pending or attempted.
pub fn list_retryable_outbound(conn: &Connection) -> StorageResult<Vec<OutboundRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {OUTBOUND_COLUMNS} FROM outbound_queue
         WHERE status IN ('pending', 'attempted')
         ORDER BY id ASC"
    ))?;

    let records = stmt
        .query_map([], outbound_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Number of pending outbound records.
pub fn count_pending_outbound(conn: &Connection) -> StorageResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outbound_queue WHERE status = 'pending'",
        [],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Transition a pending record to sent. Returns false if the record was not pending.
pub fn mark_sent(conn: &Connection, id: i64, timestamp: DateTime<Utc>) -> StorageResult<bool> {
    let updated = conn.execute(
        "UPDATE outbound_queue
         SET status = 'sent', attempts = attempts + 1, last_attempt = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![to_micros(timestamp), id],
    )?;
    Ok(updated == 1)
}

/// Record a confirmed-delivery attempt on a pending or attempted record.
pub fn mark_attempted(
    conn: &Connection,
    id: i64,
    timestamp: DateTime<Utc>,
) -> StorageResult<bool> {
    let updated = conn.execute(
        "UPDATE outbound_queue
         SET status = 'attempted', attempts = attempts + 1, last_attempt = ?1
         WHERE id = ?2 AND status IN ('pending', 'attempted')",
        params![to_micros(timestamp), id],
    )?;
    Ok(updated == 1)
}

/// Confirm delivery of an attempted record.
pub fn mark_delivered(conn: &Connection, id: i64) -> StorageResult<bool> {
    let updated = conn.execute(
        "UPDATE outbound_queue
         SET status = 'delivered', last_error = NULL
         WHERE id = ?1 AND status = 'attempted'",
        params![id],
    )?;
    Ok(updated == 1)
}

/// Store the reason the latest attempt did not land, keeping the record retryable.
pub fn record_attempt_error(conn: &Connection, id: i64, reason: &str) -> StorageResult<bool> {
    let updated = conn.execute(
        "UPDATE outbound_queue SET last_error = ?1 WHERE id = ?2 AND status = 'attempted'",
        params![reason, id],
    )?;
    Ok(updated == 1)
}

/// Give up on an attempted record.
pub fn mark_failed(conn: &Connection, id: i64, reason: &str) -> StorageResult<bool> {
    let updated = conn.execute(
        "UPDATE outbound_queue
         SET status = 'failed', last_error = ?1
         WHERE id = ?2 AND status = 'attempted'",
        params![reason, id],
    )?;
    Ok(updated == 1)
}

// ==========================================
// Inbox
// ==========================================

/// Append a delivered payload. Returns the new record id.
pub fn insert_inbox(
    conn: &Connection,
    sender: &str,
    payload: &[u8],
    timestamp: DateTime<Utc>,
) -> StorageResult<i64> {
    conn.execute(
        "INSERT INTO inbox (sender, payload, received_at) VALUES (?1, ?2, ?3)",
        params![sender, payload, to_micros(timestamp)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All inbox records in id order.
pub fn list_inbox(conn: &Connection) -> StorageResult<Vec<InboxRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, sender, payload, received_at FROM inbox ORDER BY id ASC",
    )?;

    let records = stmt
        .query_map([], inbox_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

// ==========================================
// Merged view
// ==========================================

/// Both collections merged, ordered by timestamp, then id, then inbox first.
pub fn read_all(conn: &Connection) -> StorageResult<Vec<Message>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, 0 AS direction, sender AS peer, payload, NULL AS status, received_at AS ts
         FROM inbox
         UNION ALL
         SELECT id, 1, recipient, payload, status, last_attempt
         FROM outbound_queue
         ORDER BY ts ASC, id ASC, direction ASC",
    )?;

    let messages = stmt
        .query_map([], |row| {
            let direction = if row.get::<_, i64>(1)? == 0 {
                Direction::Received
            } else {
                Direction::Sent
            };
            Ok(Message {
                id: row.get(0)?,
                direction,
                peer: row.get(2)?,
                payload: row.get(3)?,
                status: row
                    .get::<_, Option<String>>(4)?
                    .map(|s| OutboundStatus::from_str(&s)),
                timestamp: from_micros(row.get(5)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(messages)
}
