//! Engine error types.
//!
//! Only failures of the sources of truth surface here. Transport failures
//! become unhealthy check records, and cache failures are absorbed inside
//! the cache backend; neither ever reaches a caller as an error.

use thiserror::Error;

use pulsewatch_state::{ServiceId, StateError};

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown service id; client-visible as a not-found condition.
    #[error("service not found: {0}")]
    ServiceNotFound(ServiceId),

    /// Registry or check-log failure; the source of truth is compromised.
    #[error("state store error: {0}")]
    State(#[from] StateError),
}
