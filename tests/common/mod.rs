#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use pinprobe::{bundle::BundleSpec, probe::ensure_crypto_provider, target::ProbeTarget};
use rustls::ServerConfig;
use std::{
    collections::HashMap,
    io::Cursor,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;

/// Bundle specs pointing at the committed test fixtures. `GOOD` holds the
/// root that signed the local test server's leaf; `OTHER` holds an unrelated
/// root, so probes through it must fail with an unknown issuer.
pub static GOOD_BUNDLE: BundleSpec = BundleSpec {
    route: "good",
    path: "/good",
    trust_store: "Pinprobe Test Root",
    dir: "good",
    files: &["root.pem"],
    anchors_to: "Pinprobe Test Root CA",
    mismatch_reason: "The target uses a different test CA.",
    mismatch_recommendation: "Use the other test bundle.",
};

pub static OTHER_BUNDLE: BundleSpec = BundleSpec {
    route: "other",
    path: "/other",
    trust_store: "Unrelated Test Root",
    dir: "other",
    files: &["root.pem"],
    anchors_to: "Unrelated Test Root CA",
    mismatch_reason: "The target uses a different test CA.",
    mismatch_recommendation: "Use the other test bundle.",
};

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn localhost_target(port: u16) -> ProbeTarget {
    ProbeTarget {
        url: format!("https://localhost:{port}"),
        host: "localhost".to_string(),
        port,
    }
}

/// Start a minimal HTTPS server backed by the fixture leaf certificate
/// (`CN=localhost`, signed by `good/root.pem`). Serves any number of
/// connections; each gets a small fixed HTTP/1.1 response. Handshakes that
/// the client aborts (e.g. because it distrusts the certificate) are simply
/// dropped.
pub async fn spawn_tls_server() -> (SocketAddr, JoinHandle<()>) {
    ensure_crypto_provider();

    let dir = fixtures_dir().join("server");
    let cert_pem = std::fs::read(dir.join("leaf.pem")).unwrap();
    let key_pem = std::fs::read(dir.join("leaf.key")).unwrap();

    let certs = rustls_pemfile::certs(&mut Cursor::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut Cursor::new(key_pem))
        .unwrap()
        .unwrap();

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _peer)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };

                // Read until the end of the request head before answering
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(chunk.get(..n).unwrap()),
                    }
                }

                let body = r#"{"status":"ok"}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = tls.write_all(response.as_bytes()).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    (addr, handle)
}

/// Parsed raw HTTP response from the diagnostic API
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

/// Issue a plain HTTP/1.1 request against the running app and parse the
/// JSON body. Raw sockets on purpose: no HTTP client dependency needed for a
/// response this small.
pub async fn raw_get(addr: SocketAddr, path: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();

    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();
    let status = lines
        .next()
        .unwrap()
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse::<u16>()
        .unwrap();

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: serde_json::from_str(body).unwrap(),
    }
}

/// Spawn the app router on an ephemeral local port
pub async fn spawn_app(state: pinprobe::server::AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = pinprobe::server::app(Arc::new(state));

    tokio::spawn(async move {
        let _ = axum::serve(listener, router.into_make_service()).await;
    });

    addr
}

/// Build a throwaway certs root where the amazon/ bundle trusts the local
/// test server (copies of `good/root.pem`) and the google/ bundle holds the
/// unrelated root, so `/amazon` validates and `/google` fails on trust.
pub fn certs_root_trusting_local_server(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("pinprobe-{tag}-{}", std::process::id()));
    let good = std::fs::read(fixtures_dir().join("good/root.pem")).unwrap();
    let other = std::fs::read(fixtures_dir().join("other/root.pem")).unwrap();

    let amazon = root.join("amazon");
    std::fs::create_dir_all(&amazon).unwrap();
    for file in pinprobe::bundle::AMAZON.files {
        std::fs::write(amazon.join(file), &good).unwrap();
    }

    let google = root.join("google");
    std::fs::create_dir_all(&google).unwrap();
    for file in pinprobe::bundle::GOOGLE.files {
        std::fs::write(google.join(file), &other).unwrap();
    }

    root
}
