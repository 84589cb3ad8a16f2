//! pulsewatch-state — service registry and probe history for pulsewatch.
//!
//! Backed by [redb](https://docs.rs/redb), holds the two sources of truth
//! the health-check engine depends on: the registry of monitored service
//! definitions and the append-only log of check outcomes.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Check-log keys are `(service_id, check_id)` tuples so range scans yield
//! a service's history in insertion order.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks. Cache entries layered on top of it
//! elsewhere are derived state: losing them loses latency, never data.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
