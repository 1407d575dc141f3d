//! Response lexer: splits the inbound byte stream into IMAP response
//! units -- CRLF-terminated lines, plus byte-exact literal payloads of
//! declared length embedded inside FETCH responses.
//!
//! The lexer is oblivious to IMAP grammar beyond CRLF framing and
//! literal framing; higher-level tokenisation (response codes, FETCH
//! atoms) is the state machine's job. It never calls `read_line` on the
//! transport -- literals can contain arbitrary bytes, including CRLF --
//! so everything funnels through one accumulator that the caller fills
//! from blocking reads.

use std::collections::VecDeque;

/// Inbound byte accumulator shared between line mode and literal mode.
#[derive(Debug, Default)]
pub struct Lexer {
    buf: VecDeque<u8>,
}

impl Lexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly-read bytes to the accumulator.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// In line mode: pull the next CRLF-terminated line (CRLF included),
    /// or `None` if the accumulator doesn't yet hold a full line.
    pub fn try_take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self
            .buf
            .iter()
            .zip(self.buf.iter().skip(1))
            .position(|(a, b)| *a == b'\r' && *b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..pos + 2).collect();
        Some(line)
    }

    /// In literal mode: take whatever prefix of the still-pending
    /// literal is already available (up to `remaining` bytes). Returns
    /// an empty vec if nothing has arrived yet -- the caller should read
    /// more from the transport and retry.
    pub fn take_literal_chunk(&mut self, remaining: usize) -> Vec<u8> {
        let n = remaining.min(self.buf.len());
        self.buf.drain(..n).collect()
    }

    /// Discard the `)\r\n` that closes a FETCH literal's parenthesised
    /// list. Returns `false` (without consuming anything) if fewer than
    /// 3 bytes are available yet.
    pub fn try_discard_literal_close(&mut self) -> bool {
        if self.buf.len() < 3 {
            return false;
        }
        self.buf.drain(..3);
        true
    }
}
