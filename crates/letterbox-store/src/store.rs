//! Async handle to one participant's store.
//!
//! Every operation is sent to the connection's dedicated SQLite thread, so
//! callers on the Tokio runtime park instead of blocking. Only SQL and light
//! row mapping run inside [`LocalStore::call`].

use crate::{
    migrations, queries, InboxRecord, Message, OutboundRecord, StorageError, StorageResult,
};
use chrono::{DateTime, Utc};
use rusqlite::OpenFlags;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// `busy_timeout` comes first so the journal switch waits on a concurrent opener.
const OWNER_PRAGMAS: &str = "
    PRAGMA busy_timeout = 5000;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA temp_store = MEMORY;
";

/// Peers only append to the inbox; the journal mode belongs to the owner.
const PEER_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

/// Convert a tokio_rusqlite::Error to StorageError.
fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> StorageError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => StorageError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => {
            StorageError::Connection("Connection closed".to_string())
        }
        other => StorageError::Connection(other.to_string()),
    }
}

/// Durable outbound queue and inbox for one participant.
#[derive(Clone)]
pub struct LocalStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (creating if needed) the store at `path` and run migrations.
    pub async fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Opening store");

        let conn = Connection::open(path)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init(OWNER_PRAGMAS).await?;

        info!(path = %path.display(), "Store initialized with WAL mode");
        Ok(store)
    }

    /// Open a store another participant owns, for inbox delivery.
    ///
    /// Never creates a file. Fails with [`StorageError::NotFound`] when the
    /// file is absent and [`StorageError::NotInitialized`] when its owner has
    /// not created the schema yet.
    pub async fn open_existing(path: &Path) -> StorageResult<Self> {
        if !path.is_file() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };

        store
            .call_sqlite(|conn| conn.execute_batch(PEER_PRAGMAS))
            .await?;

        let has_inbox = store
            .call_sqlite(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'inbox'",
                    [],
                    |row| row.get::<_, i64>(0),
                )
            })
            .await?;
        if has_inbox == 0 {
            return Err(StorageError::NotInitialized(path.display().to_string()));
        }

        debug!(path = %path.display(), "Opened peer store");
        Ok(store)
    }

    /// Open a private in-memory store.
    pub async fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { conn, path: None };
        store.init("PRAGMA foreign_keys = ON;").await?;
        Ok(store)
    }

    async fn init(&self, pragmas: &'static str) -> StorageResult<()> {
        self.call_sqlite(move |conn| conn.execute_batch(pragmas))
            .await?;
        self.call(|conn| migrations::run_migrations(conn)).await
    }

    /// Execute a closure on the store connection's dedicated thread.
    pub async fn call<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let outer_result = self
            .conn
            .call(move |conn| {
                let inner_result = f(conn);
                Ok(inner_result)
            })
            .await;

        match outer_result {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Execute a closure that returns a rusqlite::Result.
    pub async fn call_sqlite<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    /// Store file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Queue `payload` for `recipient` with status pending. Returns the record id.
    pub async fn enqueue_outbound(&self, recipient: &str, payload: &[u8]) -> StorageResult<i64> {
        let recipient = recipient.to_string();
        let payload = payload.to_vec();
        let id = self
            .call(move |conn| queries::insert_outbound(conn, &recipient, &payload, Utc::now()))
            .await?;
        debug!(record_id = id, "Outbound record queued");
        Ok(id)
    }

    pub async fn get_outbound(&self, id: i64) -> StorageResult<Option<OutboundRecord>> {
        self.call(move |conn| queries::get_outbound(conn, id)).await
    }

    pub async fn list_outbound(&self) -> StorageResult<Vec<OutboundRecord>> {
        self.call(queries::list_outbound).await
    }

    /// Snapshot of all pending records in id order.
    pub async fn list_pending_outbound(&self) -> StorageResult<Vec<OutboundRecord>> {
        self.call(queries::list_pending_outbound).await
    }

    /// Pending and attempted records in id order.
    pub async fn list_retryable_outbound(&self) -> StorageResult<Vec<OutboundRecord>> {
        self.call(queries::list_retryable_outbound).await
    }

    pub async fn pending_count(&self) -> StorageResult<u64> {
        self.call(queries::count_pending_outbound).await
    }

    /// Mark a pending record sent. Returns false when it was no longer pending.
    pub async fn mark_sent(&self, id: i64, timestamp: DateTime<Utc>) -> StorageResult<bool> {
        self.call(move |conn| queries::mark_sent(conn, id, timestamp))
            .await
    }

    pub async fn mark_attempted(&self, id: i64, timestamp: DateTime<Utc>) -> StorageResult<bool> {
        self.call(move |conn| queries::mark_attempted(conn, id, timestamp))
            .await
    }

    pub async fn mark_delivered(&self, id: i64) -> StorageResult<bool> {
        self.call(move |conn| queries::mark_delivered(conn, id)).await
    }

    pub async fn record_attempt_error(&self, id: i64, reason: &str) -> StorageResult<bool> {
        let reason = reason.to_string();
        self.call(move |conn| queries::record_attempt_error(conn, id, &reason))
            .await
    }

    pub async fn mark_failed(&self, id: i64, reason: &str) -> StorageResult<bool> {
        let reason = reason.to_string();
        self.call(move |conn| queries::mark_failed(conn, id, &reason))
            .await
    }

    /// Append a payload to this store's inbox.
    pub async fn insert_inbox(
        &self,
        sender: &str,
        payload: &[u8],
        timestamp: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let sender = sender.to_string();
        let payload = payload.to_vec();
        self.call(move |conn| queries::insert_inbox(conn, &sender, &payload, timestamp))
            .await
    }

    pub async fn list_inbox(&self) -> StorageResult<Vec<InboxRecord>> {
        self.call(queries::list_inbox).await
    }

    /// Inbox and outbound records merged in timestamp order.
    pub async fn read_all(&self) -> StorageResult<Vec<Message>> {
        self.call(queries::read_all).await
    }

    /// Check the store is usable by executing a trivial query.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.call_sqlite(|conn| conn.execute_batch("SELECT 1"))
            .await?;
        debug!("Store health check passed");
        Ok(())
    }

    /// Close the connection after pending operations complete.
    pub async fn close(self) -> StorageResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to close store: {:?}", e)))?;
        debug!(path = ?self.path, "Store closed");
        Ok(())
    }
}
