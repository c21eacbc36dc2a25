//! pinprobe - diagnostic HTTP service that probes a fixed TLS endpoint with
//! an explicit, named root-CA bundle and reports whether the certificate
//! chain anchors to it.

pub mod bundle;
pub mod classify;
pub mod cli;
pub mod probe;
pub mod response;
pub mod server;
pub mod target;
