//! # Outbound worker
//!
//! Background processor that drains a participant's outbound queue.
//!
//! ```text
//! ┌────────────────┐     ┌────────────────┐     ┌──────────────────┐
//! │ outbound_queue │────▶│ OutboundWorker │────▶│ DeliveryResolver │
//! │  (own store)   │     │  (every 1s)    │     │ direct/loopback/ │
//! └────────────────┘     └────────────────┘     │ fallback         │
//!                                               └──────────────────┘
//! ```
//!
//! Each pass fetches the due records and handles them one at a time in id
//! order. A failure on one record is logged and counted in the
//! [`PassReport`]; it never aborts the pass or the loop.
//!
//! Under the default [`DeliveryPolicy::FireAndForget`] a record is marked
//! `sent` before delivery is tried, so a crash mid-pass or an unreachable
//! recipient loses the message. [`DeliveryPolicy::Confirmed`] keeps such
//! records retryable instead.
//!
//! ```ignore
//! let worker = OutboundWorker::new(alice, store, resolver, OutboundWorkerConfig::default());
//! worker.start();
//! // ...
//! worker.shutdown().await;
//! ```

mod config;
mod report;
mod worker;

pub use config::{DeliveryPolicy, OutboundWorkerConfig};
pub use report::PassReport;
pub use worker::OutboundWorker;
