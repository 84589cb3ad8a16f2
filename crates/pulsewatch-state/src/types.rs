//! Domain types for the pulsewatch state store.
//!
//! These types represent the persisted state of monitored services and
//! their check history, plus the aggregate metrics snapshot derived from
//! them. All types are serializable to/from JSON for storage in redb
//! tables and for caching.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique identifier for a monitored service.
pub type ServiceId = u64;

/// Unique identifier for a check record within the log.
pub type CheckId = u64;

// ── Services ──────────────────────────────────────────────────────

/// Definition of a monitored HTTP(S) endpoint.
///
/// Field bounds (name ≤255 chars, interval 30–86400 s, expected status
/// 100–599, timeout 1000–30000 ms) are validated by the registry's outer
/// surface before a definition reaches the store; the engine trusts them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceDefinition {
    pub id: ServiceId,
    pub name: String,
    pub url: String,
    /// Seconds between checks; doubles as the status cache TTL.
    pub check_interval_secs: u32,
    /// HTTP status code that counts as healthy (2xx uses range semantics).
    pub expected_status: u16,
    /// Per-probe deadline in milliseconds.
    pub timeout_ms: u32,
    /// Unix timestamp (seconds) when this service was registered.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last definition update.
    pub updated_at: u64,
}

/// Payload for registering a new service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewService {
    pub name: String,
    pub url: String,
    pub check_interval_secs: u32,
    pub expected_status: u16,
    pub timeout_ms: u32,
}

impl Default for NewService {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            check_interval_secs: 300,
            expected_status: 200,
            timeout_ms: 5000,
        }
    }
}

/// Allow-listed partial update for a service definition.
///
/// `None` means "leave unchanged". Every patchable column is required in
/// the definition itself, so there is no explicitly-cleared form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub check_interval_secs: Option<u32>,
    pub expected_status: Option<u16>,
    pub timeout_ms: Option<u32>,
}

impl ServicePatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.check_interval_secs.is_none()
            && self.expected_status.is_none()
            && self.timeout_ms.is_none()
    }
}

// ── Check log ─────────────────────────────────────────────────────

/// One recorded probe outcome. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckRecord {
    pub id: CheckId,
    pub service_id: ServiceId,
    /// HTTP status of the probed endpoint; `None` on transport failure.
    pub status_code: Option<u16>,
    /// Wall-clock milliseconds from dispatch to response (or failure).
    pub response_time_ms: f64,
    pub is_healthy: bool,
    pub error_message: Option<String>,
    /// Unix timestamp (seconds), assigned by the store at append time.
    pub checked_at: u64,
}

/// Payload for appending a check record; id and timestamp are assigned
/// by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCheck {
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
    pub is_healthy: bool,
    pub error_message: Option<String>,
}

/// Health of a service as seen through its most recent check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    /// No check has ever been recorded for the service.
    Unknown,
}

impl HealthState {
    /// Map a recorded `is_healthy` flag to a state.
    pub fn from_healthy(is_healthy: bool) -> Self {
        if is_healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }
}

// ── Metrics ───────────────────────────────────────────────────────

/// Global aggregate snapshot over all services and all recorded checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub total_services: u64,
    pub total_checks: u64,
    pub healthy_checks: u64,
    pub unhealthy_checks: u64,
    /// Percentage of healthy checks, rounded to 2 decimals; 0 when no
    /// checks exist.
    pub success_rate: f64,
    /// Unix timestamp (seconds) when this snapshot was computed.
    pub last_updated: u64,
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
