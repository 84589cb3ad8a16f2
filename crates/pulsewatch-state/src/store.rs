//! StateStore — redb-backed persistence for pulsewatch.
//!
//! Provides the service registry (typed CRUD over definitions) and the
//! append-only check log with its aggregate count queries. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, WriteTransaction,
};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
///
/// Writes to the check log are appends; records are never mutated in
/// place. Deleting a service cascades to its history.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SERVICES).map_err(map_err!(Table))?;
        txn.open_table(CHECKS).map_err(map_err!(Table))?;
        txn.open_table(COUNTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Allocate the next value of a named monotonic counter (starts at 1).
    fn next_id(txn: &WriteTransaction, counter: &str) -> StateResult<u64> {
        let mut table = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
        let next = table
            .get(counter)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value())
            .unwrap_or(1);
        table.insert(counter, next + 1).map_err(map_err!(Write))?;
        Ok(next)
    }

    // ── Service registry ───────────────────────────────────────────

    /// Register a new service and return the stored definition.
    pub fn create_service(&self, new: &NewService) -> StateResult<ServiceDefinition> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let id = Self::next_id(&txn, "service_id")?;
        let now = epoch_secs();
        let service = ServiceDefinition {
            id,
            name: new.name.clone(),
            url: new.url.clone(),
            check_interval_secs: new.check_interval_secs,
            expected_status: new.expected_status,
            timeout_ms: new.timeout_ms,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_vec(&service).map_err(map_err!(Serialize))?;
        {
            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            table.insert(id, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(service_id = id, name = %service.name, "service registered");
        Ok(service)
    }

    /// Get a service definition by id.
    pub fn get_service(&self, id: ServiceId) -> StateResult<Option<ServiceDefinition>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let service: ServiceDefinition =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(service))
            }
            None => Ok(None),
        }
    }

    /// List all services, newest first.
    pub fn list_services(&self) -> StateResult<Vec<ServiceDefinition>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let service: ServiceDefinition =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(service);
        }
        // Ids are monotonic, so id order is registration order.
        results.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(results)
    }

    /// Apply an allow-listed patch to a service definition.
    ///
    /// Returns the updated definition, or `None` if the service does not
    /// exist. An empty patch leaves the record (and `updated_at`) untouched.
    pub fn update_service(
        &self,
        id: ServiceId,
        patch: &ServicePatch,
    ) -> StateResult<Option<ServiceDefinition>> {
        if patch.is_empty() {
            return self.get_service(id);
        }
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            let mut service: ServiceDefinition = match table.get(id).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Ok(None),
            };
            if let Some(name) = &patch.name {
                service.name = name.clone();
            }
            if let Some(url) = &patch.url {
                service.url = url.clone();
            }
            if let Some(interval) = patch.check_interval_secs {
                service.check_interval_secs = interval;
            }
            if let Some(expected) = patch.expected_status {
                service.expected_status = expected;
            }
            if let Some(timeout) = patch.timeout_ms {
                service.timeout_ms = timeout;
            }
            service.updated_at = epoch_secs();
            let value = serde_json::to_vec(&service).map_err(map_err!(Serialize))?;
            table.insert(id, value.as_slice()).map_err(map_err!(Write))?;
            updated = service;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(service_id = id, "service updated");
        Ok(Some(updated))
    }

    /// Delete a service and cascade-delete its check history.
    ///
    /// Returns true if the service existed.
    pub fn delete_service(&self, id: ServiceId) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        {
            let mut table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
            let keys: Vec<(u64, u64)> = table
                .range((id, 0u64)..=(id, u64::MAX))
                .map_err(map_err!(Read))?
                .filter_map(|entry| entry.ok().map(|(key, _)| key.value()))
                .collect();
            for key in keys {
                table.remove(key).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(service_id = id, existed, "service deleted");
        Ok(existed)
    }

    /// Number of registered services.
    pub fn service_count(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    // ── Check log ──────────────────────────────────────────────────

    /// Append a check outcome for a service.
    ///
    /// The record id and `checked_at` timestamp are assigned here, at
    /// write time. Returns the stored record.
    pub fn append_check(
        &self,
        service_id: ServiceId,
        new: &NewCheck,
    ) -> StateResult<CheckRecord> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let id = Self::next_id(&txn, "check_id")?;
        let record = CheckRecord {
            id,
            service_id,
            status_code: new.status_code,
            response_time_ms: new.response_time_ms,
            is_healthy: new.is_healthy,
            error_message: new.error_message.clone(),
            checked_at: epoch_secs(),
        };
        let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
        {
            let mut table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
            table
                .insert((service_id, id), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(service_id, check_id = id, healthy = record.is_healthy, "check appended");
        Ok(record)
    }

    /// The most recent check record for a service, if any.
    pub fn latest_check(&self, service_id: ServiceId) -> StateResult<Option<CheckRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
        match table
            .range((service_id, 0u64)..=(service_id, u64::MAX))
            .map_err(map_err!(Read))?
            .next_back()
        {
            Some(entry) => {
                let (_, value) = entry.map_err(map_err!(Read))?;
                let record: CheckRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Recent check history for a service, newest first.
    pub fn check_history(
        &self,
        service_id: ServiceId,
        limit: usize,
    ) -> StateResult<Vec<CheckRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table
            .range((service_id, 0u64)..=(service_id, u64::MAX))
            .map_err(map_err!(Read))?
            .rev()
            .take(limit)
        {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: CheckRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// Total number of recorded checks across all services.
    ///
    /// Row count from table metadata; no per-record decode.
    pub fn count_checks(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    /// Number of recorded checks that were healthy.
    pub fn count_healthy(&self) -> StateResult<u64> {
        self.count_where(|record| record.is_healthy)
    }

    /// Number of recorded checks that were unhealthy.
    pub fn count_unhealthy(&self) -> StateResult<u64> {
        self.count_where(|record| !record.is_healthy)
    }

    fn count_where(&self, predicate: impl Fn(&CheckRecord) -> bool) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
        let mut count = 0u64;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: CheckRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if predicate(&record) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Mean response time over a service's healthy checks, in milliseconds.
    ///
    /// Returns 0 when the service has no healthy checks.
    pub fn average_response_time(&self, service_id: ServiceId) -> StateResult<f64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
        let mut sum = 0.0;
        let mut count = 0u64;
        for entry in table
            .range((service_id, 0u64)..=(service_id, u64::MAX))
            .map_err(map_err!(Read))?
        {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: CheckRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if record.is_healthy {
                sum += record.response_time_ms;
                count += 1;
            }
        }
        if count == 0 {
            Ok(0.0)
        } else {
            Ok(sum / count as f64)
        }
    }

    /// Delete check records with `checked_at` strictly before the cutoff
    /// (unix seconds). Returns the number deleted.
    pub fn prune_checks_before(&self, cutoff: u64) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let deleted;
        {
            let mut table = txn.open_table(CHECKS).map_err(map_err!(Table))?;
            let keys: Vec<(u64, u64)> = {
                let mut stale = Vec::new();
                for entry in table.iter().map_err(map_err!(Read))? {
                    let (key, value) = entry.map_err(map_err!(Read))?;
                    let record: CheckRecord = serde_json::from_slice(value.value())
                        .map_err(map_err!(Deserialize))?;
                    if record.checked_at < cutoff {
                        stale.push(key.value());
                    }
                }
                stale
            };
            deleted = keys.len() as u64;
            for key in keys {
                table.remove(key).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(deleted, cutoff, "check history pruned");
        Ok(deleted)
    }
}
