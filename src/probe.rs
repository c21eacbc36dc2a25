use crate::{bundle::TrustBundle, target::ProbeTarget};
use chrono::Utc;
use rustls::{CertificateError, ClientConfig, pki_types::ServerName};
use std::{
    fmt, io,
    net::IpAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tokio_rustls::{TlsConnector, client::TlsStream};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Upper bound for one complete probe: connect, handshake, request, response.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

static CRYPTO_PROVIDER_INIT: OnceLock<()> = OnceLock::new();

/// Ensure the rustls crypto provider is initialized
///
/// This should be called before any TLS operations. It's safe to call
/// multiple times as initialization only happens once.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.get_or_init(|| {
        if let Err(err) = rustls::crypto::ring::default_provider().install_default() {
            eprintln!("failed to install ring crypto provider: {err:?}");
            std::process::exit(1);
        }
    });
}

/// Verification-failure subkinds the classifier distinguishes. Closed set;
/// anything rustls reports that has no mapping lands on `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustFailure {
    UnknownIssuer,
    Expired,
    NotValidYet,
    BadSignature,
    Revoked,
    HostnameMismatch,
    Other,
}

impl TrustFailure {
    /// Stable error code surfaced in the response envelope
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnknownIssuer => "UNABLE_TO_GET_ISSUER_CERT",
            Self::Expired => "CERT_HAS_EXPIRED",
            Self::NotValidYet => "CERT_NOT_YET_VALID",
            Self::BadSignature => "UNABLE_TO_VERIFY_LEAF_SIGNATURE",
            Self::Revoked => "CERT_REVOKED",
            Self::HostnameMismatch => "HOSTNAME_MISMATCH",
            Self::Other => "CERT_VERIFICATION_FAILED",
        }
    }
}

impl fmt::Display for TrustFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownIssuer => "chain terminates in an issuer outside the supplied anchors",
            Self::Expired => "certificate has expired",
            Self::NotValidYet => "certificate is not yet valid",
            Self::BadSignature => "unable to verify the leaf certificate signature",
            Self::Revoked => "certificate has been revoked",
            Self::HostnameMismatch => "certificate is not valid for the target hostname",
            Self::Other => "certificate verification failed",
        };
        f.write_str(text)
    }
}

impl From<&CertificateError> for TrustFailure {
    fn from(err: &CertificateError) -> Self {
        match err {
            CertificateError::UnknownIssuer => Self::UnknownIssuer,
            CertificateError::Expired | CertificateError::ExpiredContext { .. } => Self::Expired,
            CertificateError::NotValidYet | CertificateError::NotValidYetContext { .. } => {
                Self::NotValidYet
            }
            CertificateError::BadSignature => Self::BadSignature,
            CertificateError::Revoked => Self::Revoked,
            CertificateError::NotValidForName
            | CertificateError::NotValidForNameContext { .. } => Self::HostnameMismatch,
            _ => Self::Other,
        }
    }
}

/// Outcome of a failed probe. Exactly one of these is reported per attempt;
/// there is no retry anywhere.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Handshake reached verification and the chain was rejected against the
    /// supplied anchors
    #[error("certificate verification failed: {0}")]
    Trust(TrustFailure),

    /// No completed response within the configured bound
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Any other network or protocol failure (DNS, refused, reset, malformed
    /// response)
    #[error("{message}")]
    Transport {
        code: &'static str,
        message: String,
    },
}

/// Successful probe outcome: the handshake completed, the chain validated
/// against the bundle, and a minimal HTTP exchange went through.
#[derive(Debug, Clone, Default)]
pub struct ProbeSuccess {
    pub http_status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    /// Negotiated TLS protocol version (e.g. `TLSv1_3`)
    pub tls_version: Option<String>,
    pub cipher: Option<String>,
    pub peer_certificate: Option<PeerCertificate>,
}

/// Leaf certificate metadata captured from the completed handshake
#[derive(Debug, Clone)]
pub struct PeerCertificate {
    pub subject: String,
    pub issuer: String,
    /// Days until expiration (negative if expired)
    pub expires_in_days: i64,
}

/// Probe `target` over TLS using **only** the bundle's trust anchors, then
/// issue `GET /` and collect status plus a small header subset. The response
/// body is read to completion and discarded.
///
/// Stateless and safe to run concurrently; every call opens its own
/// connection and tears it down on return. When `timeout` elapses the
/// pending connection is dropped and the attempt fails with
/// [`ProbeError::Timeout`].
///
/// # Errors
///
/// Returns a [`ProbeError`] classified per the §7 taxonomy: trust failures,
/// timeout, or transport.
pub async fn run(
    target: &ProbeTarget,
    bundle: &TrustBundle,
    timeout: Duration,
) -> Result<ProbeSuccess, ProbeError> {
    match time::timeout(timeout, attempt(target, bundle)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}

async fn attempt(target: &ProbeTarget, bundle: &TrustBundle) -> Result<ProbeSuccess, ProbeError> {
    ensure_crypto_provider();

    // Scoped trust: only the bundle's anchors, never the system store.
    let config = ClientConfig::builder()
        .with_root_certificates(bundle.roots.clone())
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| transport(&e, &format!("failed to connect to {}:{}", target.host, target.port)))?;

    let server_name = server_name_from_host(&target.host)?;
    let mut tls_stream = connector.connect(server_name, stream).await.map_err(|e| {
        classify_handshake_error(&e)
            .map_or_else(|| transport(&e, "TLS handshake failed"), ProbeError::Trust)
    })?;

    let mut success = session_metadata(&tls_stream);

    let request = format!(
        "GET / HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}/{}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
        target.host,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );
    tls_stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| transport(&e, "failed to send HTTP request"))?;

    // Connection: close, so the peer ends the stream once the body is done.
    let mut raw = Vec::new();
    tls_stream
        .read_to_end(&mut raw)
        .await
        .map_err(|e| transport(&e, "failed to read HTTP response"))?;

    let head = parse_response_head(&raw)?;
    success.http_status = head.status;
    success.content_type = head.content_type;
    success.content_length = head.content_length;

    Ok(success)
}

fn transport(err: &io::Error, context: &str) -> ProbeError {
    ProbeError::Transport {
        code: transport_code(err.kind()),
        message: format!("{context}: {err}"),
    }
}

/// Map an I/O failure onto the errno-style codes operators expect to see in
/// the envelope. Unrecognized kinds share a generic code.
const fn transport_code(kind: io::ErrorKind) -> &'static str {
    match kind {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::NotFound | io::ErrorKind::AddrNotAvailable => "ENOTFOUND",
        io::ErrorKind::UnexpectedEof => "ECONNCLOSED",
        _ => "TRANSPORT_ERROR",
    }
}

/// Dig the rustls verification error out of a handshake I/O failure.
/// Non-certificate handshake failures (bad record, protocol mismatch) return
/// `None` and stay in the transport category.
fn classify_handshake_error(err: &io::Error) -> Option<TrustFailure> {
    let tls_err = err.get_ref()?.downcast_ref::<rustls::Error>()?;
    match tls_err {
        rustls::Error::InvalidCertificate(cert_err) => Some(TrustFailure::from(cert_err)),
        _ => None,
    }
}

fn server_name_from_host(host: &str) -> Result<ServerName<'static>, ProbeError> {
    host.parse::<IpAddr>().map_or_else(
        |_| {
            ServerName::try_from(host.to_string()).map_err(|_| ProbeError::Transport {
                code: "TRANSPORT_ERROR",
                message: format!("invalid server name: {host}"),
            })
        },
        |ip| Ok(ServerName::from(ip).to_owned()),
    )
}

/// TLS session details plus leaf certificate metadata, captured right after
/// the handshake while the connection state is still available.
fn session_metadata(stream: &TlsStream<TcpStream>) -> ProbeSuccess {
    let (_, connection) = stream.get_ref();

    let tls_version = connection.protocol_version().map(|v| format!("{v:?}"));
    let cipher = connection
        .negotiated_cipher_suite()
        .map(|s| format!("{:?}", s.suite()));
    let peer_certificate = connection
        .peer_certificates()
        .and_then(|certs| certs.first())
        .and_then(|cert| extract_cert_metadata(cert.as_ref()));

    ProbeSuccess {
        tls_version,
        cipher,
        peer_certificate,
        ..Default::default()
    }
}

fn extract_cert_metadata(cert_der: &[u8]) -> Option<PeerCertificate> {
    let (_, cert) = X509Certificate::from_der(cert_der).ok()?;

    let subject = cert.subject().to_string();
    let issuer = cert.issuer().to_string();

    let raw = cert.validity().not_after.to_datetime();
    let not_after =
        chrono::DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())?;
    let expires_in_days = (not_after - Utc::now()).num_days();

    Some(PeerCertificate {
        subject,
        issuer,
        expires_in_days,
    })
}

#[derive(Debug)]
struct ResponseHead {
    status: u16,
    content_type: Option<String>,
    content_length: Option<String>,
}

/// Minimal HTTP/1.x response-head parser: status code from the status line,
/// `content-type` and `content-length` from the headers. Everything after
/// the blank line is ignored.
fn parse_response_head(raw: &[u8]) -> Result<ResponseHead, ProbeError> {
    let malformed = |message: &str| ProbeError::Transport {
        code: "BAD_RESPONSE",
        message: message.to_string(),
    };

    let text = String::from_utf8_lossy(raw);
    let head = text
        .split("\r\n\r\n")
        .next()
        .ok_or_else(|| malformed("empty HTTP response"))?;
    let mut lines = head.lines();

    let status_line = lines
        .next()
        .ok_or_else(|| malformed("empty HTTP response"))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| malformed("malformed HTTP status line"))?;

    let mut content_type = None;
    let mut content_length = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-type" => content_type = Some(value.trim().to_string()),
                "content-length" => content_length = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    Ok(ResponseHead {
        status,
        content_type,
        content_length,
    })
}
