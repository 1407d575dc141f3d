//! Error types for the IMAP fetch client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing/malformed CLI argument, detected before any network I/O.
    /// The message is the exact wording spec.md §6 requires on stderr
    /// (e.g. "Mandatory arguments not provided."), printed unprefixed.
    #[error("{0}")]
    Config(String),

    /// Name resolution or TCP connect failed on every candidate address.
    #[error("{0}")]
    Connect(String),

    /// TLS context setup, trust-anchor load, handshake, or verification failed.
    #[error("{0}")]
    Tls(String),

    /// A tagged NO, a tagged BAD, or an unexpected EOF from the server.
    #[error("{0}")]
    Protocol(String),

    /// Auth file or on-disk sidecar/message file I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
