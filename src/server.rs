use crate::{
    bundle::{self, BundleSpec},
    classify, probe,
    response::{Envelope, NotFound, send_json, timestamp_now},
    target::ProbeTarget,
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Response,
    routing::any,
};
use chrono::{SecondsFormat, Utc};
use std::{net::IpAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;

/// Immutable per-process state shared by every request handler.
pub struct AppState {
    pub target: ProbeTarget,
    pub certs_dir: PathBuf,
    pub probe_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(target: ProbeTarget, certs_dir: PathBuf) -> Self {
        Self {
            target,
            certs_dir,
            probe_timeout: probe::PROBE_TIMEOUT,
        }
    }
}

/// Build the router: the two probe routes plus the 404 fallback. Method is
/// deliberately not checked; any method on a matched path behaves like GET.
#[must_use]
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(bundle::AMAZON.path, any(amazon_handler))
        .route(bundle::GOOGLE.path, any(google_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Bind and serve until process termination.
///
/// With no explicit listen address the server binds `[::]` first so both
/// IPv6 and IPv4 are accepted, falling back to `0.0.0.0` when IPv6 is
/// unavailable.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn start(listen: Option<IpAddr>, port: u16, state: AppState) -> anyhow::Result<()> {
    let (listener, bind_addr) = match listen {
        Some(addr) => {
            let socket_addr = format!("{addr}:{port}");
            let listener = TcpListener::bind(&socket_addr).await?;
            (listener, socket_addr)
        }
        None => {
            if let Ok(l) = TcpListener::bind(format!("::0:{port}")).await {
                (l, format!("[::]:{port}"))
            } else {
                let socket_addr = format!("0.0.0.0:{port}");
                (TcpListener::bind(&socket_addr).await?, socket_addr)
            }
        }
    };

    println!(
        "{} - Listening on {}, probing {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        bind_addr,
        state.target.url
    );
    println!("  GET /amazon  - test pinning with Amazon Trust Services roots");
    println!("  GET /google  - test pinning with Google Trust Services roots");

    let router = app(Arc::new(state));
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}

async fn amazon_handler(State(state): State<Arc<AppState>>) -> Response {
    handle_bundle(&bundle::AMAZON, &state).await
}

async fn google_handler(State(state): State<Arc<AppState>>) -> Response {
    handle_bundle(&bundle::GOOGLE, &state).await
}

async fn not_found_handler() -> Response {
    send_json(StatusCode::NOT_FOUND, &NotFound::new(timestamp_now()))
}

/// One full probe cycle for the bundle a route is bound to: load the
/// anchors, run the scoped probe, and convert whatever happened into an
/// envelope. Every failure is converted here; nothing escapes to crash the
/// process for a single bad request.
async fn handle_bundle(spec: &'static BundleSpec, state: &AppState) -> Response {
    let timestamp = timestamp_now();

    let loaded = match spec.load(&state.certs_dir).await {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!(
                "{} - {}: CA load failed: {err}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                spec.route
            );
            return send_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &Envelope::load_failure(spec, &state.target.url, timestamp, &err),
            );
        }
    };

    match probe::run(&state.target, &loaded, state.probe_timeout).await {
        Ok(success) => send_json(
            StatusCode::OK,
            &Envelope::success(spec, &state.target.url, timestamp, success),
        ),
        Err(err) => {
            let report = classify::explain(&err, spec);
            send_json(
                StatusCode::BAD_GATEWAY,
                &Envelope::probe_failure(spec, &state.target.url, timestamp, report),
            )
        }
    }
}
