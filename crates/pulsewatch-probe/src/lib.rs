//! pulsewatch-probe — probe execution and health classification.
//!
//! A probe is one GET request against a target URL with a bounded
//! deadline. Any HTTP status, 1xx through 5xx, is a successful transport
//! outcome; only transport-level failures (DNS, connection refused,
//! timeout, TLS) produce an errored outcome. Classification of a status
//! code against the service's expectation is a separate pure function, so
//! the engine can combine the two however it needs.
//!
//! No retries live here. Retry policy, if any, belongs to the caller.

pub mod classify;
pub mod prober;

pub use classify::{classify, evaluate, Verdict};
pub use prober::{HttpProber, ProbeOutcome, Prober};
