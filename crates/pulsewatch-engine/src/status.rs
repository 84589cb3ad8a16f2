//! Engine view types.
//!
//! `CachedStatus` is the compact payload stored under `service_status:<id>`;
//! it omits the service's display name and URL to keep entries small.
//! `ServiceStatus` is what callers receive: the cached or fresh payload
//! merged with the service's name/URL and a `cached` annotation.

use serde::{Deserialize, Serialize};

use pulsewatch_state::{CheckRecord, HealthState, ServiceDefinition, ServiceId};

/// Fixed TTL for the `service_list` and `service_metrics` entries.
pub const GLOBAL_CACHE_TTL_SECS: u64 = 60;

/// Compact per-service status payload as stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedStatus {
    pub service_id: ServiceId,
    pub status: HealthState,
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
    pub error_message: Option<String>,
    pub last_checked: u64,
}

impl CachedStatus {
    /// Build the cache payload for a freshly appended check record.
    pub fn from_record(record: &CheckRecord) -> Self {
        Self {
            service_id: record.service_id,
            status: HealthState::from_healthy(record.is_healthy),
            status_code: record.status_code,
            response_time_ms: record.response_time_ms,
            error_message: record.error_message.clone(),
            last_checked: record.checked_at,
        }
    }

    /// Merge with the service definition into a full response view.
    pub fn into_status(self, service: &ServiceDefinition, cached: bool) -> ServiceStatus {
        ServiceStatus {
            service_id: self.service_id,
            service_name: service.name.clone(),
            service_url: service.url.clone(),
            status: self.status,
            status_code: self.status_code,
            response_time_ms: Some(self.response_time_ms),
            error_message: self.error_message,
            last_checked: Some(self.last_checked),
            cached,
        }
    }
}

/// Status of one service as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceStatus {
    pub service_id: ServiceId,
    pub service_name: String,
    pub service_url: String,
    pub status: HealthState,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<f64>,
    pub error_message: Option<String>,
    pub last_checked: Option<u64>,
    /// Whether this payload was served from the status cache.
    pub cached: bool,
}

impl ServiceStatus {
    /// Synthetic view for a service with no recorded checks.
    pub fn unknown(service: &ServiceDefinition) -> Self {
        Self {
            service_id: service.id,
            service_name: service.name.clone(),
            service_url: service.url.clone(),
            status: HealthState::Unknown,
            status_code: None,
            response_time_ms: None,
            error_message: None,
            last_checked: None,
            cached: false,
        }
    }
}

/// One entry in the enriched service listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceListing {
    #[serde(flatten)]
    pub service: ServiceDefinition,
    pub current_status: HealthState,
    pub last_check: Option<u64>,
}

/// Per-service outcome of a full sweep.
///
/// A failure on one service (a deleted-during-sweep race, a store error)
/// becomes an error entry in place; it never aborts the sweep.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SweepEntry {
    Checked(ServiceStatus),
    Failed {
        service_id: ServiceId,
        service_name: String,
        error_message: String,
    },
}

impl SweepEntry {
    pub fn service_id(&self) -> ServiceId {
        match self {
            SweepEntry::Checked(status) => status.service_id,
            SweepEntry::Failed { service_id, .. } => *service_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SweepEntry::Failed { .. })
    }
}
