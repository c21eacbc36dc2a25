use crate::{
    bundle::BundleSpec,
    probe::{ProbeError, TrustFailure},
};

/// Operator-facing explanation of a failed probe, ready to embed in the
/// response envelope. Purely informational; building one never changes how
/// the failure is handled.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub description: String,
    pub reason: Option<String>,
    pub recommendation: Option<String>,
}

/// Classify a probe failure in the context of the bundle that was used.
///
/// Trust failures get the bundle's mismatch reason and a recommendation
/// pointing at the alternate route. Timeouts get a connectivity hint
/// regardless of bundle. Anything else is reported as-is with no
/// recommendation, so "target does not use this CA" and "target is
/// unreachable" stay distinguishable.
#[must_use]
pub fn explain(err: &ProbeError, bundle: &BundleSpec) -> ErrorReport {
    match err {
        ProbeError::Trust(failure) => trust_report(*failure, bundle),
        ProbeError::Timeout(_) => ErrorReport {
            code: "REQUEST_TIMEOUT".to_string(),
            message: err.to_string(),
            description: "The HTTPS request to the target timed out.".to_string(),
            reason: None,
            recommendation: Some(
                "Check network connectivity and target availability.".to_string(),
            ),
        },
        ProbeError::Transport { code, message } => ErrorReport {
            code: (*code).to_string(),
            message: message.clone(),
            description: "An unexpected error occurred during the TLS handshake or HTTP request."
                .to_string(),
            reason: None,
            recommendation: None,
        },
    }
}

fn trust_report(failure: TrustFailure, bundle: &BundleSpec) -> ErrorReport {
    ErrorReport {
        code: failure.code().to_string(),
        message: failure.to_string(),
        description: format!(
            "The server's certificate chain does not anchor to any of the trusted {} root CAs.",
            bundle.trust_store
        ),
        reason: Some(bundle.mismatch_reason.to_string()),
        recommendation: Some(bundle.mismatch_recommendation.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::bundle::{AMAZON, GOOGLE};
    use std::time::Duration;

    #[test]
    fn test_trust_failure_names_store_and_alternate_route() {
        let err = ProbeError::Trust(TrustFailure::UnknownIssuer);

        let report = explain(&err, &AMAZON);
        assert_eq!(report.code, "UNABLE_TO_GET_ISSUER_CERT");
        assert!(report.description.contains("Amazon Trust Services"));
        assert!(report.reason.unwrap().contains("Google Trust Services"));
        assert!(report.recommendation.unwrap().contains("/google"));

        let report = explain(&err, &GOOGLE);
        assert!(report.description.contains("Google Trust Services"));
        assert!(report.recommendation.unwrap().contains("/amazon"));
    }

    #[test]
    fn test_timeout_is_bundle_independent() {
        let err = ProbeError::Timeout(Duration::from_secs(10));

        let amazon = explain(&err, &AMAZON);
        let google = explain(&err, &GOOGLE);

        assert_eq!(amazon.code, "REQUEST_TIMEOUT");
        assert_eq!(amazon.description, google.description);
        assert!(amazon.description.contains("timed out"));
        assert!(amazon.recommendation.unwrap().contains("connectivity"));
        assert!(amazon.reason.is_none());
    }

    #[test]
    fn test_transport_keeps_code_and_gets_no_recommendation() {
        let err = ProbeError::Transport {
            code: "ECONNREFUSED",
            message: "failed to connect to example.com:443".to_string(),
        };

        let report = explain(&err, &AMAZON);
        assert_eq!(report.code, "ECONNREFUSED");
        assert!(report.message.contains("example.com"));
        assert!(report.reason.is_none());
        assert!(report.recommendation.is_none());
    }

    #[test]
    fn test_timeout_description_differs_from_trust_description() {
        let timeout = explain(&ProbeError::Timeout(Duration::from_secs(10)), &AMAZON);
        let trust = explain(&ProbeError::Trust(TrustFailure::Expired), &AMAZON);
        assert_ne!(timeout.description, trust.description);
    }
}
