//! Pure health classification of probe outcomes.

use crate::prober::ProbeOutcome;

/// Decide whether a status code satisfies the expectation.
///
/// A 2xx expectation uses range semantics: expecting 200 accepts any 2xx.
/// Any other expectation must match exactly.
pub fn classify(status_code: u16, expected_status: u16) -> bool {
    if (200..300).contains(&expected_status) {
        (200..300).contains(&status_code)
    } else {
        status_code == expected_status
    }
}

/// Health verdict for one probe outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_healthy: bool,
    /// `None` when healthy; the transport error text or
    /// `"Unexpected status code: <code>"` otherwise.
    pub error_message: Option<String>,
}

/// Classify a full probe outcome against the expected status.
///
/// A transport failure (no status code) is always unhealthy and carries
/// the transport error text.
pub fn evaluate(outcome: &ProbeOutcome, expected_status: u16) -> Verdict {
    match outcome.status_code {
        Some(code) => {
            if classify(code, expected_status) {
                Verdict {
                    is_healthy: true,
                    error_message: None,
                }
            } else {
                Verdict {
                    is_healthy: false,
                    error_message: Some(format!("Unexpected status code: {code}")),
                }
            }
        }
        None => Verdict {
            is_healthy: false,
            error_message: Some(
                outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "request failed".to_string()),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status_code: Option<u16>, error: Option<&str>) -> ProbeOutcome {
        ProbeOutcome {
            status_code,
            response_time_ms: 12.0,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn two_xx_expectation_accepts_any_two_xx() {
        assert!(classify(200, 200));
        assert!(classify(204, 200));
        assert!(classify(299, 201));
        assert!(classify(201, 299));
    }

    #[test]
    fn two_xx_expectation_rejects_outside_range() {
        assert!(!classify(199, 200));
        assert!(!classify(300, 200));
        assert!(!classify(301, 204));
        assert!(!classify(500, 200));
    }

    #[test]
    fn non_two_xx_expectation_requires_exact_match() {
        assert!(classify(301, 301));
        assert!(classify(404, 404));
        assert!(classify(503, 503));
        assert!(!classify(302, 301));
        assert!(!classify(200, 404));
    }

    #[test]
    fn evaluate_healthy_has_no_error_message() {
        let verdict = evaluate(&outcome(Some(204), None), 200);
        assert!(verdict.is_healthy);
        assert!(verdict.error_message.is_none());
    }

    #[test]
    fn evaluate_unexpected_status_names_the_code() {
        let verdict = evaluate(&outcome(Some(500), None), 200);
        assert!(!verdict.is_healthy);
        assert_eq!(
            verdict.error_message.as_deref(),
            Some("Unexpected status code: 500")
        );
    }

    #[test]
    fn evaluate_transport_failure_keeps_error_text() {
        let verdict = evaluate(&outcome(None, Some("connection refused")), 200);
        assert!(!verdict.is_healthy);
        assert_eq!(verdict.error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn evaluate_transport_failure_without_text_still_reports() {
        let verdict = evaluate(&outcome(None, None), 200);
        assert!(!verdict.is_healthy);
        assert_eq!(verdict.error_message.as_deref(), Some("request failed"));
    }
}
