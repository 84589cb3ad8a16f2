//! HealthCheckEngine — decides when to probe and layers the TTL cache.
//!
//! One engine instance serves all inbound requests. There is no shared
//! mutable in-process state beyond the injected store/cache handles, so
//! concurrent requests for different services proceed fully in parallel.
//!
//! Concurrent checks for the *same* service are deliberately not
//! serialized: both may probe, both append valid history entries, and the
//! final cache write is last-writer-wins. Callers needing at-most-one
//! in-flight probe per service must layer their own mutual exclusion
//! keyed by service id.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use pulsewatch_cache::{get_json, keys, set_json, StatusCache};
use pulsewatch_probe::{evaluate, Prober};
use pulsewatch_state::{
    epoch_secs, MetricsSnapshot, NewCheck, ServiceDefinition, ServiceId, StateStore,
};

use crate::error::{EngineError, EngineResult};
use crate::status::{
    CachedStatus, ServiceListing, ServiceStatus, SweepEntry, GLOBAL_CACHE_TTL_SECS,
};

/// The health-check orchestration engine.
///
/// All collaborators are injected at construction (no globals): the state
/// store is the source of truth, the cache is a fail-soft latency layer,
/// and the prober performs the outbound calls.
pub struct HealthCheckEngine {
    store: StateStore,
    cache: Arc<dyn StatusCache>,
    prober: Arc<dyn Prober>,
}

impl HealthCheckEngine {
    pub fn new(store: StateStore, cache: Arc<dyn StatusCache>, prober: Arc<dyn Prober>) -> Self {
        Self {
            store,
            cache,
            prober,
        }
    }

    /// Check one service, serving the cached status when it is still live.
    ///
    /// With `force_check` the cache read is skipped; the probe still
    /// refreshes the cache entry, restarting its TTL clock. Every executed
    /// probe is appended to the check log, forced or not, and triggers a
    /// metrics recount. A dead endpoint is not an error: the result simply
    /// reports unhealthy with a descriptive message.
    pub async fn check_service(
        &self,
        service_id: ServiceId,
        force_check: bool,
    ) -> EngineResult<ServiceStatus> {
        self.run_check(service_id, force_check, true).await
    }

    async fn run_check(
        &self,
        service_id: ServiceId,
        force_check: bool,
        recompute_metrics: bool,
    ) -> EngineResult<ServiceStatus> {
        let service = self.load_service(service_id)?;
        let key = keys::service_status(service_id);

        if !force_check {
            if let Some(cached) = get_json::<CachedStatus>(&*self.cache, &key).await {
                debug!(service_id, "serving cached status");
                return Ok(cached.into_status(&service, true));
            }
        }

        let timeout = Duration::from_millis(u64::from(service.timeout_ms));
        let outcome = self.prober.probe(&service.url, timeout).await;
        let verdict = evaluate(&outcome, service.expected_status);

        // History reflects every probe, cache-refreshing or not.
        let record = self.store.append_check(
            service_id,
            &NewCheck {
                status_code: outcome.status_code,
                response_time_ms: outcome.response_time_ms,
                is_healthy: verdict.is_healthy,
                error_message: verdict.error_message,
            },
        )?;
        info!(
            service_id,
            name = %service.name,
            healthy = record.is_healthy,
            status_code = record.status_code,
            "service checked"
        );

        let cached = CachedStatus::from_record(&record);
        let ttl = Duration::from_secs(u64::from(service.check_interval_secs));
        set_json(&*self.cache, &key, &cached, ttl).await;

        if recompute_metrics {
            self.update_metrics().await?;
        }

        Ok(cached.into_status(&service, false))
    }

    /// Read-only status view: cache, then latest recorded check, then a
    /// synthetic `unknown`. Never probes.
    pub async fn get_service_status(&self, service_id: ServiceId) -> EngineResult<ServiceStatus> {
        let service = self.load_service(service_id)?;
        let key = keys::service_status(service_id);

        if let Some(cached) = get_json::<CachedStatus>(&*self.cache, &key).await {
            return Ok(cached.into_status(&service, true));
        }

        match self.store.latest_check(service_id)? {
            Some(record) => Ok(CachedStatus::from_record(&record).into_status(&service, false)),
            None => Ok(ServiceStatus::unknown(&service)),
        }
    }

    /// Sweep every registered service sequentially.
    ///
    /// Each service goes through the same cache-or-probe path as
    /// `check_service`. A failure on one service (say, a concurrent delete
    /// between listing and checking) becomes an error entry in place and
    /// the sweep continues. Metrics are recounted once at the end instead
    /// of after every probe; the resulting snapshot is identical.
    pub async fn check_all_services(&self) -> EngineResult<Vec<SweepEntry>> {
        let services = self.store.list_services()?;
        let mut entries = Vec::with_capacity(services.len());

        for service in services {
            match self.run_check(service.id, false, false).await {
                Ok(status) => entries.push(SweepEntry::Checked(status)),
                Err(e) => {
                    warn!(service_id = service.id, error = %e, "sweep entry failed");
                    entries.push(SweepEntry::Failed {
                        service_id: service.id,
                        service_name: service.name,
                        error_message: e.to_string(),
                    });
                }
            }
        }

        self.update_metrics().await?;
        info!(count = entries.len(), "service sweep completed");
        Ok(entries)
    }

    /// Recount the global metrics and refresh the cached snapshot.
    ///
    /// Always a full recount over the check log; counts are cheap
    /// aggregate queries, not per-row work.
    pub async fn update_metrics(&self) -> EngineResult<MetricsSnapshot> {
        let total_services = self.store.service_count()?;
        let total_checks = self.store.count_checks()?;
        let healthy_checks = self.store.count_healthy()?;
        let unhealthy_checks = self.store.count_unhealthy()?;

        let success_rate = if total_checks > 0 {
            round2(healthy_checks as f64 / total_checks as f64 * 100.0)
        } else {
            0.0
        };

        let snapshot = MetricsSnapshot {
            total_services,
            total_checks,
            healthy_checks,
            unhealthy_checks,
            success_rate,
            last_updated: epoch_secs(),
        };

        set_json(
            &*self.cache,
            keys::SERVICE_METRICS,
            &snapshot,
            Duration::from_secs(GLOBAL_CACHE_TTL_SECS),
        )
        .await;
        debug!(total_checks, success_rate, "metrics recomputed");
        Ok(snapshot)
    }

    /// Serve the metrics snapshot, preferring the cached copy and
    /// recounting on a miss.
    pub async fn metrics(&self) -> EngineResult<MetricsSnapshot> {
        if let Some(snapshot) =
            get_json::<MetricsSnapshot>(&*self.cache, keys::SERVICE_METRICS).await
        {
            return Ok(snapshot);
        }
        self.update_metrics().await
    }

    /// Enriched listing of every service with its current status.
    ///
    /// Served from the `service_list` entry when warm; otherwise built via
    /// the read-only status path (no probes) and cached for 60 seconds.
    pub async fn list_services(&self) -> EngineResult<Vec<ServiceListing>> {
        if let Some(listing) =
            get_json::<Vec<ServiceListing>>(&*self.cache, keys::SERVICE_LIST).await
        {
            return Ok(listing);
        }

        let services = self.store.list_services()?;
        let mut listing = Vec::with_capacity(services.len());
        for service in services {
            let (current_status, last_check) = match self.get_service_status(service.id).await {
                Ok(status) => (status.status, status.last_checked),
                // Deleted out from under us; skip the stale row.
                Err(EngineError::ServiceNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            listing.push(ServiceListing {
                service,
                current_status,
                last_check,
            });
        }

        set_json(
            &*self.cache,
            keys::SERVICE_LIST,
            &listing,
            Duration::from_secs(GLOBAL_CACHE_TTL_SECS),
        )
        .await;
        Ok(listing)
    }

    /// Drop every cache entry derived from a service.
    ///
    /// The registry layer must call this whenever a definition is created,
    /// updated, or deleted; it is the engine's only externally triggered
    /// mutation hook.
    pub async fn invalidate_service_cache(&self, service_id: ServiceId) {
        self.cache.delete(&keys::service_status(service_id)).await;
        self.cache.delete(keys::SERVICE_LIST).await;
        self.cache.delete(keys::SERVICE_METRICS).await;
        debug!(service_id, "service cache invalidated");
    }

    /// Delete check records older than the retention window.
    ///
    /// The window is a policy parameter supplied by the caller; the engine
    /// never schedules this itself.
    pub async fn prune_history(&self, older_than: Duration) -> EngineResult<u64> {
        let cutoff = epoch_secs().saturating_sub(older_than.as_secs());
        let deleted = self.store.prune_checks_before(cutoff)?;
        if deleted > 0 {
            info!(deleted, "pruned check history");
        }
        Ok(deleted)
    }

    fn load_service(&self, service_id: ServiceId) -> EngineResult<ServiceDefinition> {
        self.store
            .get_service(service_id)?
            .ok_or(EngineError::ServiceNotFound(service_id))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use pulsewatch_cache::{MemoryCache, NullCache};
    use pulsewatch_probe::ProbeOutcome;
    use pulsewatch_state::{HealthState, NewService};

    /// Prober that returns a configurable outcome and counts invocations.
    struct StubProber {
        outcome: Mutex<ProbeOutcome>,
        probes: AtomicU64,
        /// Optional one-shot hook run before the first probe, used to
        /// simulate concurrent registry mutations mid-sweep.
        on_first_probe: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl StubProber {
        fn returning(outcome: ProbeOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(outcome),
                probes: AtomicU64::new(0),
                on_first_probe: Mutex::new(None),
            })
        }

        fn healthy() -> Arc<Self> {
            Self::returning(ProbeOutcome {
                status_code: Some(200),
                response_time_ms: 12.5,
                error: None,
            })
        }

        fn set_outcome(&self, outcome: ProbeOutcome) {
            *self.outcome.lock().unwrap() = outcome;
        }

        fn probe_count(&self) -> u64 {
            self.probes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Prober for StubProber {
        async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
            if let Some(hook) = self.on_first_probe.lock().unwrap().take() {
                hook();
            }
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.outcome.lock().unwrap().clone()
        }
    }

    struct Fixture {
        engine: HealthCheckEngine,
        store: StateStore,
        cache: Arc<MemoryCache>,
        prober: Arc<StubProber>,
    }

    fn fixture_with(prober: Arc<StubProber>) -> Fixture {
        let store = StateStore::open_in_memory().unwrap();
        let cache = Arc::new(MemoryCache::new());
        let engine = HealthCheckEngine::new(store.clone(), cache.clone(), prober.clone());
        Fixture {
            engine,
            store,
            cache,
            prober,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(StubProber::healthy())
    }

    fn register(store: &StateStore, name: &str) -> ServiceId {
        register_with_interval(store, name, 300)
    }

    fn register_with_interval(store: &StateStore, name: &str, interval: u32) -> ServiceId {
        store
            .create_service(&NewService {
                name: name.to_string(),
                url: format!("http://{name}.internal/healthz"),
                check_interval_secs: interval,
                ..NewService::default()
            })
            .unwrap()
            .id
    }

    // ── check_service ──────────────────────────────────────────────

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let fx = fixture();
        let err = fx.engine.check_service(404, false).await.unwrap_err();
        assert!(matches!(err, EngineError::ServiceNotFound(404)));
        assert_eq!(fx.prober.probe_count(), 0);
    }

    #[tokio::test]
    async fn fresh_check_probes_and_records() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        let status = fx.engine.check_service(id, false).await.unwrap();

        assert!(!status.cached);
        assert_eq!(status.status, HealthState::Healthy);
        assert_eq!(status.status_code, Some(200));
        assert_eq!(status.service_name, "api");
        assert_eq!(status.service_url, "http://api.internal/healthz");
        assert!(status.error_message.is_none());
        assert_eq!(fx.prober.probe_count(), 1);
        assert_eq!(fx.store.count_checks().unwrap(), 1);
    }

    #[tokio::test]
    async fn warm_cache_serves_without_probe_or_write() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        let first = fx.engine.check_service(id, false).await.unwrap();
        let second = fx.engine.check_service(id, false).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        // Zero extra probes, zero extra log writes.
        assert_eq!(fx.prober.probe_count(), 1);
        assert_eq!(fx.store.count_checks().unwrap(), 1);
        // Payloads agree apart from the annotation.
        assert_eq!(second.status_code, first.status_code);
        assert_eq!(second.last_checked, first.last_checked);
    }

    #[tokio::test]
    async fn forced_check_bypasses_cache_and_always_appends() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        fx.engine.check_service(id, false).await.unwrap();
        let forced = fx.engine.check_service(id, true).await.unwrap();

        assert!(!forced.cached);
        assert_eq!(fx.prober.probe_count(), 2);
        assert_eq!(fx.store.count_checks().unwrap(), 2);
    }

    #[tokio::test]
    async fn forced_check_overwrites_cache_entry() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        fx.engine.check_service(id, false).await.unwrap();
        fx.prober.set_outcome(ProbeOutcome {
            status_code: Some(500),
            response_time_ms: 40.0,
            error: None,
        });
        fx.engine.check_service(id, true).await.unwrap();

        // The refreshed entry is what subsequent reads see.
        let status = fx.engine.get_service_status(id).await.unwrap();
        assert!(status.cached);
        assert_eq!(status.status, HealthState::Unhealthy);
        assert_eq!(status.status_code, Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_expiry_triggers_reprobe() {
        let fx = fixture();
        let id = register_with_interval(&fx.store, "api", 30);

        fx.engine.check_service(id, false).await.unwrap();
        assert_eq!(fx.prober.probe_count(), 1);

        // Within the TTL the cache still answers.
        tokio::time::advance(Duration::from_secs(29)).await;
        fx.engine.check_service(id, false).await.unwrap();
        assert_eq!(fx.prober.probe_count(), 1);

        // Past the TTL the next read probes again.
        tokio::time::advance(Duration::from_secs(2)).await;
        let status = fx.engine.check_service(id, false).await.unwrap();
        assert!(!status.cached);
        assert_eq!(fx.prober.probe_count(), 2);
    }

    #[tokio::test]
    async fn unexpected_status_is_unhealthy_not_an_error() {
        let fx = fixture_with(StubProber::returning(ProbeOutcome {
            status_code: Some(500),
            response_time_ms: 33.0,
            error: None,
        }));
        let id = register(&fx.store, "api");

        let status = fx.engine.check_service(id, true).await.unwrap();

        assert_eq!(status.status, HealthState::Unhealthy);
        assert_eq!(
            status.error_message.as_deref(),
            Some("Unexpected status code: 500")
        );
    }

    #[tokio::test]
    async fn transport_failure_is_unhealthy_with_error_text() {
        let fx = fixture_with(StubProber::returning(ProbeOutcome {
            status_code: None,
            response_time_ms: 1000.0,
            error: Some("request timed out after 1000ms".to_string()),
        }));
        let id = register(&fx.store, "api");

        let status = fx.engine.check_service(id, true).await.unwrap();

        assert_eq!(status.status, HealthState::Unhealthy);
        assert_eq!(status.status_code, None);
        assert_eq!(status.response_time_ms, Some(1000.0));
        assert!(status.error_message.unwrap().contains("timed out"));
        // The failed probe is history too.
        assert_eq!(fx.store.count_checks().unwrap(), 1);
    }

    #[tokio::test]
    async fn engine_stays_correct_with_caching_disabled() {
        let store = StateStore::open_in_memory().unwrap();
        let prober = StubProber::healthy();
        let engine = HealthCheckEngine::new(store.clone(), Arc::new(NullCache), prober.clone());
        let id = register(&store, "api");

        // Every read falls through to a fresh probe.
        let first = engine.check_service(id, false).await.unwrap();
        let second = engine.check_service(id, false).await.unwrap();
        assert!(!first.cached);
        assert!(!second.cached);
        assert_eq!(prober.probe_count(), 2);
        assert_eq!(store.count_checks().unwrap(), 2);

        // The read-only path serves the latest record from the log.
        let status = engine.get_service_status(id).await.unwrap();
        assert!(!status.cached);
        assert_eq!(status.status, HealthState::Healthy);
    }

    // ── get_service_status ─────────────────────────────────────────

    #[tokio::test]
    async fn status_unknown_without_history_and_never_probes() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        let status = fx.engine.get_service_status(id).await.unwrap();

        assert_eq!(status.status, HealthState::Unknown);
        assert_eq!(status.status_code, None);
        assert_eq!(status.last_checked, None);
        assert!(!status.cached);
        assert_eq!(fx.prober.probe_count(), 0);
    }

    #[tokio::test]
    async fn status_prefers_cache_then_falls_back_to_log() {
        let fx = fixture();
        let id = register(&fx.store, "api");
        fx.engine.check_service(id, false).await.unwrap();

        let warm = fx.engine.get_service_status(id).await.unwrap();
        assert!(warm.cached);

        fx.engine.invalidate_service_cache(id).await;
        let cold = fx.engine.get_service_status(id).await.unwrap();
        assert!(!cold.cached);
        // Same underlying record either way.
        assert_eq!(cold.status_code, warm.status_code);
        assert_eq!(cold.last_checked, warm.last_checked);
        // No probe was issued by either read.
        assert_eq!(fx.prober.probe_count(), 1);
    }

    #[tokio::test]
    async fn status_reads_are_idempotent() {
        let fx = fixture();
        let id = register(&fx.store, "api");
        fx.engine.check_service(id, false).await.unwrap();

        let a = fx.engine.get_service_status(id).await.unwrap();
        let b = fx.engine.get_service_status(id).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn status_for_unknown_service_is_not_found() {
        let fx = fixture();
        let err = fx.engine.get_service_status(9000).await.unwrap_err();
        assert!(matches!(err, EngineError::ServiceNotFound(9000)));
    }

    // ── check_all_services ─────────────────────────────────────────

    #[tokio::test]
    async fn sweep_checks_every_service_in_listing_order() {
        let fx = fixture();
        let a = register(&fx.store, "a");
        let b = register(&fx.store, "b");
        let c = register(&fx.store, "c");

        let entries = fx.engine.check_all_services().await.unwrap();

        let ids: Vec<_> = entries.iter().map(|e| e.service_id()).collect();
        // Newest-first listing order, one entry per service.
        assert_eq!(ids, vec![c, b, a]);
        assert!(entries.iter().all(|e| !e.is_failed()));
        assert_eq!(fx.prober.probe_count(), 3);
    }

    #[tokio::test]
    async fn sweep_isolates_a_service_deleted_mid_sweep() {
        let fx = fixture();
        let a = register(&fx.store, "a");
        let b = register(&fx.store, "b");

        // The sweep visits b first (newest first). While probing b, delete
        // a — its check then fails with NotFound but the sweep completes.
        let store = fx.store.clone();
        *fx.prober.on_first_probe.lock().unwrap() = Some(Box::new(move || {
            store.delete_service(a).unwrap();
        }));

        let entries = fx.engine.check_all_services().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].service_id(), b);
        assert!(!entries[0].is_failed());
        assert!(entries[1].is_failed());
        match &entries[1] {
            SweepEntry::Failed {
                service_id,
                service_name,
                error_message,
            } => {
                assert_eq!(*service_id, a);
                assert_eq!(service_name, "a");
                assert!(error_message.contains("not found"));
            }
            SweepEntry::Checked(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn sweep_metrics_cover_every_probe() {
        let fx = fixture();
        register(&fx.store, "a");
        register(&fx.store, "b");

        fx.engine.check_all_services().await.unwrap();

        // Batched recount at the end of the sweep still sees all probes.
        let snapshot = fx.engine.metrics().await.unwrap();
        assert_eq!(snapshot.total_services, 2);
        assert_eq!(snapshot.total_checks, 2);
        assert_eq!(snapshot.healthy_checks, 2);
    }

    #[tokio::test]
    async fn sweep_of_empty_registry_is_empty() {
        let fx = fixture();
        let entries = fx.engine.check_all_services().await.unwrap();
        assert!(entries.is_empty());
    }

    // ── metrics ────────────────────────────────────────────────────

    #[tokio::test]
    async fn metrics_with_zero_checks_has_zero_success_rate() {
        let fx = fixture();
        register(&fx.store, "api");

        let snapshot = fx.engine.update_metrics().await.unwrap();

        assert_eq!(snapshot.total_services, 1);
        assert_eq!(snapshot.total_checks, 0);
        assert_eq!(snapshot.success_rate, 0.0);
    }

    #[tokio::test]
    async fn metrics_success_rate_rounds_to_two_decimals() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        fx.engine.check_service(id, true).await.unwrap();
        fx.engine.check_service(id, true).await.unwrap();
        fx.prober.set_outcome(ProbeOutcome {
            status_code: Some(500),
            response_time_ms: 20.0,
            error: None,
        });
        fx.engine.check_service(id, true).await.unwrap();

        let snapshot = fx.engine.metrics().await.unwrap();
        assert_eq!(snapshot.total_checks, 3);
        assert_eq!(snapshot.healthy_checks, 2);
        assert_eq!(snapshot.unhealthy_checks, 1);
        assert_eq!(snapshot.success_rate, 66.67);
    }

    #[tokio::test]
    async fn metrics_read_prefers_cached_snapshot() {
        let fx = fixture();
        let id = register(&fx.store, "api");
        fx.engine.check_service(id, true).await.unwrap();

        let cached = fx.engine.metrics().await.unwrap();

        // A write that bypasses the engine is invisible until the cached
        // snapshot expires or is invalidated.
        fx.store
            .append_check(
                id,
                &NewCheck {
                    status_code: Some(200),
                    response_time_ms: 5.0,
                    is_healthy: true,
                    error_message: None,
                },
            )
            .unwrap();
        assert_eq!(fx.engine.metrics().await.unwrap(), cached);

        fx.engine.invalidate_service_cache(id).await;
        let fresh = fx.engine.metrics().await.unwrap();
        assert_eq!(fresh.total_checks, cached.total_checks + 1);
    }

    // ── list_services ──────────────────────────────────────────────

    #[tokio::test]
    async fn listing_enriches_with_current_status() {
        let fx = fixture();
        let a = register(&fx.store, "a");
        let b = register(&fx.store, "b");
        fx.engine.check_service(a, false).await.unwrap();

        let listing = fx.engine.list_services().await.unwrap();

        assert_eq!(listing.len(), 2);
        // Newest first: b has never been checked.
        assert_eq!(listing[0].service.id, b);
        assert_eq!(listing[0].current_status, HealthState::Unknown);
        assert_eq!(listing[0].last_check, None);
        assert_eq!(listing[1].service.id, a);
        assert_eq!(listing[1].current_status, HealthState::Healthy);
        assert!(listing[1].last_check.is_some());
        // Enrichment never probes.
        assert_eq!(fx.prober.probe_count(), 1);
    }

    #[tokio::test]
    async fn listing_is_cached_until_invalidated() {
        let fx = fixture();
        register(&fx.store, "a");

        let first = fx.engine.list_services().await.unwrap();
        assert_eq!(first.len(), 1);

        // A registration without invalidation is hidden by the cached list.
        let b = register(&fx.store, "b");
        assert_eq!(fx.engine.list_services().await.unwrap().len(), 1);

        // The registry layer invalidates after mutating; now both show.
        fx.engine.invalidate_service_cache(b).await;
        let fresh = fx.engine.list_services().await.unwrap();
        assert_eq!(fresh.len(), 2);
    }

    // ── invalidation ───────────────────────────────────────────────

    #[tokio::test]
    async fn invalidation_clears_all_derived_entries() {
        let fx = fixture();
        let id = register(&fx.store, "api");

        // Warm all three cache entries.
        fx.engine.check_service(id, false).await.unwrap();
        fx.engine.list_services().await.unwrap();
        fx.engine.update_metrics().await.unwrap();

        fx.engine.invalidate_service_cache(id).await;

        assert!(fx.cache.get(&keys::service_status(id)).await.is_none());
        assert!(fx.cache.get(keys::SERVICE_LIST).await.is_none());
        assert!(fx.cache.get(keys::SERVICE_METRICS).await.is_none());
    }

    #[tokio::test]
    async fn no_stale_read_survives_invalidation() {
        let fx = fixture();
        let id = register(&fx.store, "api");
        fx.engine.check_service(id, false).await.unwrap();

        // New outcome appended through a forced check, then invalidate.
        fx.prober.set_outcome(ProbeOutcome {
            status_code: Some(503),
            response_time_ms: 9.0,
            error: None,
        });
        fx.engine.check_service(id, true).await.unwrap();
        fx.engine.invalidate_service_cache(id).await;

        // The read reflects the last log write, not any earlier cache state.
        let status = fx.engine.get_service_status(id).await.unwrap();
        assert_eq!(status.status_code, Some(503));
        assert_eq!(status.status, HealthState::Unhealthy);
    }

    // ── retention ──────────────────────────────────────────────────

    #[tokio::test]
    async fn prune_respects_retention_window() {
        let fx = fixture();
        let id = register(&fx.store, "api");
        fx.engine.check_service(id, true).await.unwrap();
        fx.engine.check_service(id, true).await.unwrap();

        // A generous window keeps everything.
        assert_eq!(
            fx.engine.prune_history(Duration::from_secs(86400)).await.unwrap(),
            0
        );
        assert_eq!(fx.store.count_checks().unwrap(), 2);

        // A zero window prunes nothing newer than now; records written
        // this second survive (cutoff is strict).
        fx.engine.prune_history(Duration::ZERO).await.unwrap();
        assert!(fx.store.count_checks().unwrap() <= 2);
    }
}
