use crate::target::DEFAULT_TARGET_URL;
use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .default_value("3000")
                .env("PORT")
                .help("listening port for the diagnostic API")
                .long("port")
                .short('p')
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("target-url")
                .default_value(DEFAULT_TARGET_URL)
                .env("TARGET_URL")
                .help("HTTPS endpoint whose certificate chain is probed")
                .long("target-url")
                .short('t')
                .value_name("URL"),
        )
        .arg(
            Arg::new("listen")
                .env("PINPROBE_LISTEN")
                .help("IP address to bind to (default: [::]:port, accepts both IPv6 and IPv4)")
                .long("listen")
                .long_help(
                    "IP address to bind to:\n\
                    Not specified (default) binds to [::]:port which accepts both IPv6 and IPv4 connections.\n\
                    Falls back to 0.0.0.0:port if IPv6 is unavailable.\n\n\
                    Specific IPv4 examples: '0.0.0.0', '127.0.0.1'\n\
                    Specific IPv6: '::', '::1'",
                )
                .short('l')
                .value_name("IP"),
        )
        .arg(
            Arg::new("certs-dir")
                .default_value("certs")
                .env("PINPROBE_CERTS_DIR")
                .help("directory holding the amazon/ and google/ root CA bundles")
                .long("certs-dir")
                .short('c')
                .value_name("PATH"),
        )
}
