use url::Url;

/// Probed when no `TARGET_URL` is configured, or when the configured value
/// does not parse.
pub const DEFAULT_TARGET_URL: &str = "https://uatv2.patpat.lk";

const DEFAULT_TLS_PORT: u16 = 443;

/// Fixed probe destination, resolved once at process start.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    /// Original URL as configured, echoed back in every response envelope
    pub url: String,
    /// Hostname used for the TCP connect and as SNI
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    /// Parse a target URL into host and port.
    ///
    /// Returns `None` if the URL does not parse or carries no hostname.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_string();
        let port = url.port().unwrap_or(DEFAULT_TLS_PORT);

        Some(Self {
            url: raw.to_string(),
            host,
            port,
        })
    }

    /// Resolve the probe target from a configured URL, falling back silently
    /// to [`DEFAULT_TARGET_URL`] when the value is malformed.
    #[must_use]
    pub fn from_config(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(Self::fallback)
    }

    fn fallback() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
            host: "uatv2.patpat.lk".to_string(),
            port: DEFAULT_TLS_PORT,
        }
    }
}
