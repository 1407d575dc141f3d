//! Scripted IMAP server for end-to-end tests.
//!
//! This is deliberately not a mailbox engine: spec.md §8 already spells
//! out exact server transcripts for each scenario (S1-S6), so the test
//! server just plays back a fixed script of responses keyed to "read
//! one request line, then write these bytes" -- a `std::net::TcpListener`
//! on a background thread, mirroring the shape of the teacher's fake
//! server but synchronous instead of tokio-based.
//!
//! - `script` -- `Step` and the response-line builders tests compose
//!   scripts out of
//! - `server` -- the plain-TCP and TLS-wrapped listener threads
//! - `fixtures` -- scratch output directories and auth files

#![allow(clippy::pedantic, clippy::nursery)]

mod fixtures;
mod script;
mod server;

pub use fixtures::{scratch_dir, write_auth_file};
pub use script::{fetch_line, reply, search_line, send, tagged_bad, tagged_no, tagged_ok, untagged_ok_code, Step};
pub use server::{ScriptedServer, TlsScriptedServer};
