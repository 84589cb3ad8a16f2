//! pulsewatch-cache — the status cache boundary for pulsewatch.
//!
//! The cache is a latency optimization layered over the state store, never
//! a source of truth. Backends are injected into the engine as explicit
//! `Arc<dyn StatusCache>` handles with a defined lifecycle; there is no
//! process-wide cache singleton.
//!
//! # Fail-soft contract
//!
//! Every backend must degrade rather than fail: an unreachable or broken
//! backend reports misses on reads and silently drops writes and deletes.
//! Callers never see a cache error, and the engine stays correct with
//! caching disabled entirely (see [`NullCache`]).

pub mod backend;
pub mod keys;
pub mod memory;

pub use backend::{get_json, set_json, NullCache, StatusCache};
pub use memory::MemoryCache;
