//! Per-participant SQLite store for Letterbox.
//!
//! Each participant owns one store file holding two collections:
//! - `outbound_queue`: messages the owner queued, drained by the outbound worker
//! - `inbox`: messages any participant on the host delivered to the owner
//!
//! ```ignore
//! let store = LocalStore::open(&paths.store_file(&alice)).await?;
//! let id = store.enqueue_outbound("bob", b"hi").await?;
//! let messages = store.read_all().await?;
//! ```
//!
//! Outbound records are only mutated by the owner's worker. The inbox is
//! append-only and may be written by several processes at once; every
//! insert is a single statement under WAL with a busy timeout.

mod error;
mod migrations;
mod models;
pub mod queries;
mod store;

pub use error::{StorageError, StorageResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::{Direction, InboxRecord, Message, OutboundRecord, OutboundStatus};
pub use store::LocalStore;
