//! Command-line surface and validated session configuration.
//!
//! [`Cli`] is the raw shape of argv; [`Config`] is what the core engine
//! actually consumes, after mandatory-field checks and port defaulting.

use crate::error::{Error, Result};
use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::Parser;

/// Command-line arguments, as typed by the user.
#[cfg_attr(
    feature = "cli",
    derive(Parser),
    command(
        name = "imap-fetch",
        disable_help_flag = true,
        about = "Download a mailbox to individual files, with incremental sync"
    )
)]
#[derive(Debug, Clone)]
pub struct Cli {
    /// IMAP server hostname or IP address
    pub server: Option<String>,

    /// Auth file: username on line 1, password on line 2
    #[cfg_attr(feature = "cli", arg(short = 'a'))]
    pub auth_file: Option<PathBuf>,

    /// Output directory for downloaded messages and sync state
    #[cfg_attr(feature = "cli", arg(short = 'o'))]
    pub out_dir: Option<PathBuf>,

    /// Server port (default 143, or 993 with -T)
    #[cfg_attr(feature = "cli", arg(short = 'p'))]
    pub port: Option<String>,

    /// Only fetch messages the server marks \Recent
    #[cfg_attr(feature = "cli", arg(short = 'n'))]
    pub only_new: bool,

    /// Fetch only message headers (BODY[HEADER]) instead of full bodies
    #[cfg_attr(feature = "cli", arg(short = 'h'))]
    pub only_headers: bool,

    /// Mailbox to select (default INBOX)
    #[cfg_attr(feature = "cli", arg(short = 'b'))]
    pub mailbox: Option<String>,

    /// Use implicit TLS
    #[cfg_attr(feature = "cli", arg(short = 'T'))]
    pub secured: bool,

    /// PEM file of TLS trust anchors
    #[cfg_attr(feature = "cli", arg(short = 'c'))]
    pub certfile: Option<PathBuf>,

    /// Directory of hashed TLS trust anchors
    #[cfg_attr(feature = "cli", arg(short = 'C'))]
    pub certaddr: Option<PathBuf>,

    #[cfg_attr(feature = "cli", arg(long = "help", action = clap::ArgAction::Help))]
    help: Option<bool>,
}

/// Validated, defaulted configuration consumed by the core engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub auth_file: PathBuf,
    pub out_dir: PathBuf,
    pub port: u16,
    pub mailbox: String,
    pub secured: bool,
    pub certfile: Option<PathBuf>,
    pub certaddr: Option<PathBuf>,
    pub only_new: bool,
    pub only_headers: bool,
}

impl Config {
    /// Validate a [`Cli`] into a [`Config`], applying the defaulting
    /// rules of the CLI surface: mandatory-argument check, numeric port
    /// parsing, the 143→993 rewrite under `-T`, and the `-c`/`-C`
    /// without `-T` warning.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let server = cli
            .server
            .ok_or_else(|| Error::Config("Mandatory arguments not provided.".into()))?;
        let auth_file = cli
            .auth_file
            .ok_or_else(|| Error::Config("Mandatory arguments not provided.".into()))?;
        let out_dir = cli
            .out_dir
            .ok_or_else(|| Error::Config("Mandatory arguments not provided.".into()))?;

        let secured = cli.secured;

        let mut port = match cli.port {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::Config("port must be a number".into()))?,
            None => {
                if secured {
                    993
                } else {
                    143
                }
            }
        };
        if secured && port == 143 {
            port = 993;
        }

        if (cli.certfile.is_some() || cli.certaddr.is_some()) && !secured {
            eprintln!("Warning: -c/-C given without -T; TLS trust anchors will be ignored.");
        }

        Ok(Self {
            server,
            auth_file,
            out_dir,
            port,
            mailbox: cli.mailbox.unwrap_or_else(|| "INBOX".to_string()),
            secured,
            certfile: cli.certfile,
            certaddr: cli.certaddr,
            only_new: cli.only_new,
            only_headers: cli.only_headers,
        })
    }
}
