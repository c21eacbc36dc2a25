use crate::{
    bundle::{BundleError, BundleSpec},
    classify::ErrorReport,
    probe::ProbeSuccess,
};
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Envelope returned by the two probe routes, success or failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub route: &'static str,
    pub pinning: Pinning,
    pub timestamp: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProbeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Which trust anchors were in effect for this request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pinning {
    pub trust_store: &'static str,
    pub roots_used: &'static [&'static str],
    pub target: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub tls_handshake: &'static str,
    pub certificate_validation: &'static str,
    pub chain_anchors_to: &'static str,
    pub http_status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    pub headers: ResponseHeaders,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_certificate: Option<PeerCertificateReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeaders {
    pub content_type: Option<String>,
    pub content_length: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerCertificateReport {
    pub subject: String,
    pub issuer: String,
    pub expires_in_days: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of the 404 fallback
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFound {
    pub success: bool,
    pub error: NotFoundError,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundError {
    pub code: &'static str,
    pub message: &'static str,
    pub available_routes: &'static [&'static str],
    pub description: &'static str,
}

/// ISO-8601 timestamp taken at request start, millisecond precision to match
/// the JavaScript-style wire format.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Envelope {
    fn base(bundle: &'static BundleSpec, target_url: &str, timestamp: String) -> Self {
        Self {
            route: bundle.route,
            pinning: Pinning {
                trust_store: bundle.trust_store,
                roots_used: bundle.files,
                target: target_url.to_string(),
            },
            timestamp,
            success: false,
            result: None,
            error: None,
        }
    }

    /// Success envelope for a validated chain
    #[must_use]
    pub fn success(
        bundle: &'static BundleSpec,
        target_url: &str,
        timestamp: String,
        probe: ProbeSuccess,
    ) -> Self {
        let mut envelope = Self::base(bundle, target_url, timestamp);
        envelope.success = true;
        envelope.result = Some(ProbeReport {
            tls_handshake: "completed",
            certificate_validation: "passed",
            chain_anchors_to: bundle.anchors_to,
            http_status: probe.http_status,
            message: format!(
                "Server certificate chain validated against trusted {} root CAs.",
                bundle.trust_store
            ),
            tls_version: probe.tls_version,
            cipher: probe.cipher,
            headers: ResponseHeaders {
                content_type: probe.content_type,
                content_length: probe.content_length,
            },
            peer_certificate: probe.peer_certificate.map(|peer| PeerCertificateReport {
                subject: peer.subject,
                issuer: peer.issuer,
                expires_in_days: peer.expires_in_days,
            }),
        });
        envelope
    }

    /// Failure envelope for a classified probe error
    #[must_use]
    pub fn probe_failure(
        bundle: &'static BundleSpec,
        target_url: &str,
        timestamp: String,
        report: ErrorReport,
    ) -> Self {
        let mut envelope = Self::base(bundle, target_url, timestamp);
        envelope.error = Some(ErrorBody {
            code: report.code,
            message: report.message,
            description: report.description,
            reason: report.reason,
            recommendation: report.recommendation,
            detail: None,
        });
        envelope
    }

    /// Failure envelope for a bundle that could not be loaded
    #[must_use]
    pub fn load_failure(
        bundle: &'static BundleSpec,
        target_url: &str,
        timestamp: String,
        err: &BundleError,
    ) -> Self {
        let mut envelope = Self::base(bundle, target_url, timestamp);
        envelope.error = Some(ErrorBody {
            code: "CA_LOAD_FAILED".to_string(),
            message: err.message.clone(),
            description: format!(
                "Failed to load one or more {} root CA files from certs/{}.",
                bundle.trust_store, bundle.dir
            ),
            reason: None,
            recommendation: None,
            detail: Some(err.detail.clone()),
        });
        envelope
    }
}

impl NotFound {
    #[must_use]
    pub fn new(timestamp: String) -> Self {
        Self {
            success: false,
            error: NotFoundError {
                code: "NOT_FOUND",
                message: "Route not found",
                available_routes: &["/amazon", "/google"],
                description: "Use GET /amazon to test Amazon Trust Services pinning, \
                              GET /google for Google Trust Services.",
            },
            timestamp,
        }
    }
}

/// Serialize a body as pretty-printed JSON with the content-type and CORS
/// headers every route shares.
#[must_use]
pub fn send_json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|e| {
        format!("{{\n  \"success\": false,\n  \"error\": \"serialization failed: {e}\"\n}}")
    });

    (
        status,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        json,
    )
        .into_response()
}
