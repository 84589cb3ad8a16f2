//! redb table definitions for the pulsewatch state store.
//!
//! Values are JSON-serialized domain types. The check log uses
//! `(service_id, check_id)` tuple keys so a range scan over one service
//! yields its history in append order.

use redb::TableDefinition;

/// Service definitions keyed by service id.
pub const SERVICES: TableDefinition<u64, &[u8]> = TableDefinition::new("services");

/// Check records keyed by `(service_id, check_id)`.
pub const CHECKS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("checks");

/// Monotonic id counters keyed by name (`service_id`, `check_id`).
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");
