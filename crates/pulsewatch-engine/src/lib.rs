//! pulsewatch-engine — request-driven health-check orchestration.
//!
//! The engine decides, per request, whether to serve a cached status or
//! execute a fresh probe, records every probe in the durable check log,
//! and keeps a global metrics snapshot warm. There is no background
//! scheduler: a service that nobody queries is never probed, and
//! staleness is bounded by cache TTL plus read-triggered refresh.
//!
//! # Architecture
//!
//! ```text
//! HealthCheckEngine
//!   ├── check_service(id, force)     → cache → probe → log + cache + metrics
//!   ├── get_service_status(id)       → cache → latest record → "unknown"
//!   ├── check_all_services()         → sequential sweep, failures isolated
//!   ├── update_metrics() / metrics() → full recount, cached 60s
//!   ├── list_services()              → enriched listing, cached 60s
//!   ├── invalidate_service_cache(id) → registry mutation hook
//!   └── prune_history(older_than)    → retention cleanup
//! ```
//!
//! Collaborators are injected: the `StateStore` (registry + check log,
//! the sources of truth), an `Arc<dyn StatusCache>` (derived state, fail
//! soft), and an `Arc<dyn Prober>`. Losing every cache entry costs
//! latency, never information.

pub mod engine;
pub mod error;
pub mod status;

pub use engine::HealthCheckEngine;
pub use error::{EngineError, EngineResult};
pub use status::{CachedStatus, ServiceListing, ServiceStatus, SweepEntry};
