#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI entry point: parse argv, validate it into a [`Config`], run one
//! IMAP session, and translate the result into the exit codes and
//! stderr text spec.md §6/§7 require. This is the only place in the
//! crate allowed to call `std::process::exit`.

use clap::Parser;
use imap_fetch::{Cli, Config, ImapClient};
use tracing_subscriber::EnvFilter;

fn main() {
    // rustls 0.23 requires a process-wide crypto provider before any
    // `ClientConfig` is built; install it once, here, regardless of
    // whether this run ends up using TLS.
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let client = ImapClient::new(config);
    if let Err(err) = client.run() {
        eprintln!("Runtime error: {err}");
        std::process::exit(1);
    }
}
