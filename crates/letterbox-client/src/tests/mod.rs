//! End-to-end scenarios for the Letterbox client.
//!
//! - `harness.rs`      - temp store directory, HTTP mock, wait helpers
//! - `delivery.rs`     - direct, unreachable, and loop-back delivery
//! - `ordering.rs`     - merged message ordering
//! - `lifecycle.rs`    - start / stop / shutdown semantics
//! - `registration.rs` - key upload contract
//! - `sessions.rs`     - login / send / list_messages / logout

mod ordering;
