use crate::{
    cli::actions::Action,
    target::{DEFAULT_TARGET_URL, ProbeTarget},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::{net::IpAddr, path::PathBuf};

/// Convert `ArgMatches` into typed Action enum with validation
///
/// The target URL is deliberately permissive: a malformed `TARGET_URL`
/// falls back to the built-in default instead of failing startup.
///
/// # Errors
///
/// Returns an error if the listen address is not a valid IP
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3000);

    let raw_target = matches
        .get_one::<String>("target-url")
        .map_or(DEFAULT_TARGET_URL, String::as_str);
    let target = ProbeTarget::from_config(raw_target);

    let listen = matches
        .get_one::<String>("listen")
        .map(|addr| {
            addr.parse::<IpAddr>()
                .with_context(|| format!("Invalid IP address: {addr}"))
        })
        .transpose()?;

    let certs_dir = matches
        .get_one::<String>("certs-dir")
        .map_or_else(|| PathBuf::from("certs"), PathBuf::from);

    Ok(Action::Serve {
        listen,
        port,
        target,
        certs_dir,
    })
}
