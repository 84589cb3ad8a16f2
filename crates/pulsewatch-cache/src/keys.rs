//! Cache key schema.
//!
//! Three kinds of entries exist: one per-service status entry (TTL = that
//! service's check interval) and two global entries with a fixed 60-second
//! TTL, for the enriched service listing and the metrics snapshot.

/// Key for a single service's cached status.
pub fn service_status(service_id: u64) -> String {
    format!("service_status:{service_id}")
}

/// Key for the enriched service listing.
pub const SERVICE_LIST: &str = "service_list";

/// Key for the global metrics snapshot.
pub const SERVICE_METRICS: &str = "service_metrics";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_status_key_embeds_id() {
        assert_eq!(service_status(7), "service_status:7");
    }
}
