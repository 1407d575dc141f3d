//! The state machine: interprets one response line (or one completed
//! literal) at a time and tracks session phase, sync bookkeeping, and
//! the scratch needed to stream a FETCH literal to disk.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::persistence;
use std::fs::File;
use std::io::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connected,
    LoggedIn,
    Selected,
    Searching,
    Fetching,
    LoggingOut,
}

/// What the orchestrator should do after handing a line to the state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Keep reading lines in the current phase.
    Continue,
    /// Switch the lexer to literal mode for `nbytes`.
    BeginLiteral { nbytes: usize },
    /// The tagged completion for the in-flight command arrived.
    CommandComplete,
}

pub struct SessionState {
    pub phase: Phase,
    pub tag: u32,
    pub uidvalidity_matches: bool,
    pub uidnext_local: String,
    pub synced: bool,
    pub new_uids: Vec<String>,
    pub n_downloaded: u32,

    current_uid: Option<String>,
    current_file: Option<File>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Disconnected,
            tag: 1,
            uidvalidity_matches: false,
            uidnext_local: "1".to_string(),
            synced: false,
            new_uids: Vec::new(),
            n_downloaded: 0,
            current_uid: None,
            current_file: None,
        }
    }

    pub fn begin_searching(&mut self) {
        self.phase = Phase::Searching;
    }

    pub fn begin_fetching(&mut self) {
        self.phase = Phase::Fetching;
    }

    pub fn begin_logging_out(&mut self) {
        self.phase = Phase::LoggingOut;
    }

    /// Wait for the server greeting; the only line handled outside the
    /// per-command tagged-response machinery.
    pub fn handle_greeting(&mut self, raw: &[u8]) -> Result<()> {
        let line = strip_crlf(raw);
        if line.starts_with("* OK") {
            self.phase = Phase::Connected;
            Ok(())
        } else {
            Err(Error::Protocol(format!("unexpected greeting: {line}")))
        }
    }

    pub fn handle_line(&mut self, raw: &[u8], config: &Config) -> Result<LineOutcome> {
        let line = strip_crlf(raw).to_string();
        let tag_prefix = format!("A{}", self.tag);

        match self.phase {
            Phase::Disconnected => Ok(LineOutcome::Continue),

            Phase::Connected => {
                if let Some(rest) = tagged_rest(&line, &tag_prefix) {
                    return self.handle_tagged(rest, "Invalid credentials.");
                }
                Ok(LineOutcome::Continue)
            }

            Phase::LoggedIn => {
                if line.starts_with("* OK") {
                    self.handle_select_response_code(&line, config)?;
                    return Ok(LineOutcome::Continue);
                }
                if let Some(rest) = tagged_rest(&line, &tag_prefix) {
                    return self.handle_tagged(rest, "Mailbox missing.");
                }
                Ok(LineOutcome::Continue)
            }

            Phase::Searching => {
                if let Some(rest) = line.strip_prefix("* SEARCH") {
                    self.new_uids
                        .extend(rest.split_whitespace().map(ToString::to_string));
                    return Ok(LineOutcome::Continue);
                }
                if let Some(rest) = tagged_rest(&line, &tag_prefix) {
                    return self.handle_tagged(rest, "Search failed.");
                }
                Ok(LineOutcome::Continue)
            }

            Phase::Fetching => {
                if line.starts_with('*') && line.contains("FETCH") {
                    let (uid, nbytes) = parse_fetch_header(&line)?;
                    let path = persistence::message_path(
                        &config.out_dir,
                        &uid,
                        &config.mailbox,
                        &config.server,
                    );
                    self.current_file = Some(persistence::create_message_file(&path)?);
                    self.current_uid = Some(uid);
                    return Ok(LineOutcome::BeginLiteral { nbytes });
                }
                if let Some(rest) = tagged_rest(&line, &tag_prefix) {
                    return self.handle_tagged(rest, "Fetch failed.");
                }
                Ok(LineOutcome::Continue)
            }

            Phase::Selected => {
                if let Some(rest) = tagged_rest(&line, &tag_prefix) {
                    return self.handle_tagged(rest, "Command failed.");
                }
                Ok(LineOutcome::Continue)
            }

            Phase::LoggingOut => {
                if line.starts_with("* BYE") {
                    self.phase = Phase::Disconnected;
                    return Ok(LineOutcome::CommandComplete);
                }
                if let Some(rest) = tagged_rest(&line, &tag_prefix) {
                    return self.handle_tagged(rest, "Logout failed.");
                }
                Ok(LineOutcome::Continue)
            }
        }
    }

    /// Append a chunk of the in-flight literal to its destination file
    /// as it arrives, so the engine never holds a whole message body
    /// in memory.
    pub fn write_literal_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self
            .current_file
            .as_mut()
            .ok_or_else(|| Error::Protocol("literal chunk delivered with no open message file".into()))?;
        file.write_all(chunk)?;
        Ok(())
    }

    /// The literal's closing `)\r\n` has been discarded: close the
    /// message file, bump the download counter, and advance
    /// `.uidnext` unless this run is header-only or new-only
    /// (invariant 3).
    pub fn finish_literal(&mut self, config: &Config) -> Result<()> {
        let file = self
            .current_file
            .take()
            .ok_or_else(|| Error::Protocol("literal finished with no open message file".into()))?;
        drop(file);

        let uid = self
            .current_uid
            .take()
            .ok_or_else(|| Error::Protocol("literal finished with no pending UID".into()))?;

        self.n_downloaded += 1;

        if !config.only_headers && !config.only_new {
            persistence::advance_uidnext(&config.out_dir, &uid)?;
        }
        Ok(())
    }

    fn handle_tagged(&mut self, rest: &str, no_message: &str) -> Result<LineOutcome> {
        let rest = rest.trim_start();
        if rest.starts_with("OK") {
            self.advance_on_ok();
            Ok(LineOutcome::CommandComplete)
        } else if rest.starts_with("NO") {
            Err(Error::Protocol(no_message.to_string()))
        } else if rest.starts_with("BAD") {
            Err(Error::Protocol("Internal error.".to_string()))
        } else {
            Ok(LineOutcome::Continue)
        }
    }

    fn advance_on_ok(&mut self) {
        self.phase = match self.phase {
            Phase::Connected => Phase::LoggedIn,
            Phase::LoggedIn => Phase::Selected,
            Phase::Searching | Phase::Fetching => Phase::Selected,
            Phase::LoggingOut => Phase::Disconnected,
            other => other,
        };
    }

    fn handle_select_response_code(&mut self, line: &str, config: &Config) -> Result<()> {
        let Some(open) = line.find('[') else {
            return Ok(());
        };
        let Some(close) = line[open..].find(']') else {
            return Ok(());
        };
        let code = &line[open + 1..open + close];
        let mut parts = code.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Ok(());
        };

        match keyword {
            "UIDVALIDITY" => {
                // Header/new-only runs don't track full sync (spec §4.3 rule 1).
                if config.only_headers || config.only_new {
                    return Ok(());
                }
                if let Some(value) = parts.next() {
                    let check = persistence::check_and_store_uidvalidity(&config.out_dir, value)?;
                    self.uidvalidity_matches = check.matches;
                }
            }
            "UIDNEXT" => {
                let local = persistence::load_or_init_uidnext(&config.out_dir)?;
                if let Some(server_value) = parts.next() {
                    if server_value == local {
                        self.synced = true;
                    }
                }
                self.uidnext_local = local;
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_crlf(raw: &[u8]) -> std::borrow::Cow<'_, str> {
    let s = String::from_utf8_lossy(raw);
    match s {
        std::borrow::Cow::Borrowed(b) => std::borrow::Cow::Borrowed(b.trim_end_matches(['\r', '\n'])),
        std::borrow::Cow::Owned(o) => std::borrow::Cow::Owned(o.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// Match `line` against the exact current tag token (not just a
/// string prefix, so tag `A1`'s tagged completion doesn't also match a
/// line that happens to start with `A10`).
fn tagged_rest<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(tag)?;
    rest.is_empty().then_some(rest).or_else(|| rest.starts_with(' ').then_some(rest))
}

fn parse_fetch_header(line: &str) -> Result<(String, usize)> {
    let uid_idx = line
        .find("UID")
        .ok_or_else(|| Error::Protocol(format!("FETCH response missing UID: {line}")))?;
    let uid = line[uid_idx..]
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| Error::Protocol(format!("FETCH response missing UID value: {line}")))?
        .to_string();

    let open = line
        .rfind('{')
        .ok_or_else(|| Error::Protocol(format!("FETCH response missing literal length: {line}")))?;
    let close = line[open..]
        .find('}')
        .map(|i| i + open)
        .ok_or_else(|| Error::Protocol(format!("malformed literal length: {line}")))?;
    let nbytes: usize = line[open + 1..close]
        .parse()
        .map_err(|_| Error::Protocol(format!("non-numeric literal length: {line}")))?;

    Ok((uid, nbytes))
}
