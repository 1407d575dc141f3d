#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! IMAP4rev1 incremental-sync fetch client, as a library.
//!
//! Downloads a mailbox to individual files under an output directory,
//! using `.uidvalidity`/`.uidnext` sidecar files so repeated runs only
//! fetch new messages. The binary under `src/bin/` is a thin CLI
//! wrapper around [`ImapClient`]; everything else -- transport,
//! response lexer, state machine, persistence -- lives here so it can
//! be tested and driven independently of argv and `std::process::exit`.

mod client;
mod config;
mod error;
mod lexer;
mod persistence;
mod session;
mod transport;

pub use client::{ImapClient, Summary};
pub use config::{Cli, Config};
pub use error::{Error, Result};
pub use persistence::{message_path, read_credentials, Credentials};
