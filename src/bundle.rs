use rustls::RootCertStore;
use std::{io::Cursor, path::Path};
use thiserror::Error;
use tokio::fs;

/// Static identity of a named root-CA bundle: where its PEM files live, what
/// the trust store is called, and the diagnostic text used when a probed
/// chain does not anchor to it.
#[derive(Debug)]
pub struct BundleSpec {
    /// Route name, also the JSON `route` field ("amazon", "google")
    pub route: &'static str,
    /// Path the route is served under ("/amazon", "/google")
    pub path: &'static str,
    /// Human-readable trust store name
    pub trust_store: &'static str,
    /// Subdirectory under the certs root holding the PEM files
    pub dir: &'static str,
    /// Expected PEM filenames, in load order
    pub files: &'static [&'static str],
    /// Statement reported when a chain validates against this bundle
    pub anchors_to: &'static str,
    /// Most likely alternate CA when a chain fails to anchor here
    pub mismatch_reason: &'static str,
    /// Cross-route hint attached to trust failures
    pub mismatch_recommendation: &'static str,
}

pub static AMAZON: BundleSpec = BundleSpec {
    route: "amazon",
    path: "/amazon",
    trust_store: "Amazon Trust Services",
    dir: "amazon",
    files: &[
        "AmazonRootCA1.pem",
        "AmazonRootCA2.pem",
        "AmazonRootCA3.pem",
        "AmazonRootCA4.pem",
    ],
    anchors_to: "Amazon Trust Services root CA",
    mismatch_reason:
        "The target uses Google Trust Services (GTS) certificates, not Amazon Trust Services (ACM).",
    mismatch_recommendation: "Use the /google route for targets with GTS-issued certificates.",
};

pub static GOOGLE: BundleSpec = BundleSpec {
    route: "google",
    path: "/google",
    trust_store: "Google Trust Services",
    dir: "google",
    files: &["r1.pem", "r2.pem", "r3.pem", "r4.pem", "gsr4.pem"],
    anchors_to: "Google Trust Services root CA",
    mismatch_reason:
        "The target may use a different CA (e.g., Amazon Trust Services, Let's Encrypt).",
    mismatch_recommendation: "Use the /amazon route for targets with ACM-issued certificates.",
};

/// Failure while assembling a bundle's trust anchors. Loading is atomic: a
/// single unreadable or unparsable file fails the whole bundle.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BundleError {
    pub message: String,
    /// Underlying I/O or parse diagnostic
    pub detail: String,
}

/// A bundle's trust anchors, loaded and ready to back a scoped TLS probe.
pub struct TrustBundle {
    pub spec: &'static BundleSpec,
    pub roots: RootCertStore,
}

impl BundleSpec {
    /// Load every expected PEM file under `certs_root` into a fresh
    /// `RootCertStore`. Invoked once per incoming request; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns a [`BundleError`] if any file is missing, unreadable, holds no
    /// certificate, or holds a certificate rustls rejects as a trust anchor.
    pub async fn load(&'static self, certs_root: &Path) -> Result<TrustBundle, BundleError> {
        let mut roots = RootCertStore::empty();

        for file in self.files {
            let path = certs_root.join(self.dir).join(file);

            let data = fs::read(&path).await.map_err(|e| BundleError {
                message: format!("failed to read {}", path.display()),
                detail: e.to_string(),
            })?;

            let ders = rustls_pemfile::certs(&mut Cursor::new(data))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| BundleError {
                    message: format!("invalid PEM in {}", path.display()),
                    detail: e.to_string(),
                })?;

            if ders.is_empty() {
                return Err(BundleError {
                    message: format!("no certificates found in {}", path.display()),
                    detail: "file parsed but contained no CERTIFICATE blocks".to_string(),
                });
            }

            for der in ders {
                roots.add(der).map_err(|e| BundleError {
                    message: format!("rejected trust anchor in {}", path.display()),
                    detail: e.to_string(),
                })?;
            }
        }

        Ok(TrustBundle { spec: self, roots })
    }
}
