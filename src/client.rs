//! Session orchestrator: sequences connect → login → select →
//! (search?) → fetch → logout, driving the command encoder and the
//! read/parse loop.

use std::io::{Read, Write};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::persistence;
use crate::session::{LineOutcome, Phase, SessionState};
use crate::transport::{self, Transport};

/// Outcome of a run, for the binary to turn into the required stdout
/// summary line.
pub struct Summary {
    pub n_downloaded: u32,
    pub already_synced: bool,
}

pub struct ImapClient {
    config: Config,
}

impl ImapClient {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run one full session against the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error from any layer (connect, TLS, protocol refusal,
    /// I/O). LOGOUT is attempted before returning whenever the phase
    /// has advanced past `Disconnected`, matching spec §4.6/§7.
    pub fn run(&self) -> Result<Summary> {
        let mut transport = transport::connect(&self.config)?;
        let mut lexer = Lexer::new();
        let mut session = SessionState::new();

        let result = self.run_session(transport.as_mut(), &mut lexer, &mut session);

        if session.phase != Phase::Disconnected {
            session.begin_logging_out();
            if let Err(e) = self.send_command(transport.as_mut(), &mut lexer, &mut session, "LOGOUT") {
                debug!(error = %e, "logout attempt after session failed");
            }
        }

        result
    }

    fn run_session(
        &self,
        transport: &mut dyn Transport,
        lexer: &mut Lexer,
        session: &mut SessionState,
    ) -> Result<Summary> {
        self.await_greeting(transport, lexer, session)?;

        let creds = persistence::read_credentials(&self.config.auth_file)?;
        self.send_command(
            transport,
            lexer,
            session,
            &format!("LOGIN {} {}", creds.username, creds.password),
        )?;
        info!("logged in");

        self.send_command(transport, lexer, session, &format!("SELECT {}", self.config.mailbox))?;
        info!(
            mailbox = %self.config.mailbox,
            uidvalidity_matches = session.uidvalidity_matches,
            "mailbox selected"
        );

        let already_synced = !self.config.only_new && session.synced && session.uidvalidity_matches;
        if already_synced {
            println!("All emails from server are already downloaded.");
            return Ok(Summary {
                n_downloaded: 0,
                already_synced: true,
            });
        }

        if self.config.only_new {
            session.begin_searching();
            self.send_command(transport, lexer, session, "UID SEARCH NEW")?;
            let uids = session.new_uids.clone();
            session.begin_fetching();
            for uid in &uids {
                self.send_command(
                    transport,
                    lexer,
                    session,
                    &format!("UID FETCH {uid} ({})", fetch_item(&self.config)),
                )?;
            }
        } else {
            session.begin_fetching();
            let range = if session.uidvalidity_matches {
                format!("{}:*", session.uidnext_local)
            } else {
                "1:*".to_string()
            };
            self.send_command(
                transport,
                lexer,
                session,
                &format!("UID FETCH {range} ({})", fetch_item(&self.config)),
            )?;
        }

        let summary = Summary {
            n_downloaded: session.n_downloaded,
            already_synced: false,
        };
        print_summary(&summary, &self.config);
        Ok(summary)
    }

    fn await_greeting(
        &self,
        transport: &mut dyn Transport,
        lexer: &mut Lexer,
        session: &mut SessionState,
    ) -> Result<()> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(line) = lexer.try_take_line() {
                session.handle_greeting(&line)?;
                return Ok(());
            }
            let n = transport
                .read(&mut buf)
                .map_err(|e| Error::Protocol(format!("read failed: {e}")))?;
            if n == 0 {
                return Err(Error::Protocol("Server closed the connection.".into()));
            }
            lexer.push(&buf[..n]);
        }
    }

    fn send_command(
        &self,
        transport: &mut dyn Transport,
        lexer: &mut Lexer,
        session: &mut SessionState,
        cmd: &str,
    ) -> Result<()> {
        let line = format!("A{} {}\r\n", session.tag, cmd);
        debug!(tag = session.tag, command = %redact(cmd), "sending command");

        transport
            .write_all(line.as_bytes())
            .map_err(|e| Error::Protocol(format!("write failed: {e}")))?;

        self.read_until_complete(transport, lexer, session)?;
        session.tag += 1;
        Ok(())
    }

    fn read_until_complete(
        &self,
        transport: &mut dyn Transport,
        lexer: &mut Lexer,
        session: &mut SessionState,
    ) -> Result<()> {
        let mut literal_remaining: Option<usize> = None;
        let mut buf = [0u8; 4096];

        loop {
            if let Some(remaining) = literal_remaining {
                if remaining == 0 {
                    if lexer.try_discard_literal_close() {
                        session.finish_literal(&self.config)?;
                        literal_remaining = None;
                        continue;
                    }
                } else {
                    let chunk = lexer.take_literal_chunk(remaining);
                    if !chunk.is_empty() {
                        session.write_literal_chunk(&chunk)?;
                        literal_remaining = Some(remaining - chunk.len());
                        continue;
                    }
                }
            } else if let Some(line) = lexer.try_take_line() {
                match session.handle_line(&line, &self.config)? {
                    LineOutcome::Continue => {}
                    LineOutcome::BeginLiteral { nbytes } => literal_remaining = Some(nbytes),
                    LineOutcome::CommandComplete => return Ok(()),
                }
                continue;
            }

            let n = transport
                .read(&mut buf)
                .map_err(|e| Error::Protocol(format!("read failed: {e}")))?;
            if n == 0 {
                return Err(Error::Protocol("Server closed the connection.".into()));
            }
            lexer.push(&buf[..n]);
        }
    }
}

fn fetch_item(config: &Config) -> &'static str {
    if config.only_headers {
        "BODY[HEADER]"
    } else {
        "BODY[]"
    }
}

fn print_summary(summary: &Summary, config: &Config) {
    if config.only_new {
        println!("Downloaded {} new mails.", summary.n_downloaded);
    } else if config.only_headers {
        println!("Downloaded {} email headers.", summary.n_downloaded);
    } else {
        println!("Downloaded {} emails.", summary.n_downloaded);
    }
}

/// Redact the password out of a `LOGIN <user> <pass>` command line
/// before it is logged at any level (spec §9 design note).
fn redact(cmd: &str) -> String {
    if let Some(rest) = cmd.strip_prefix("LOGIN ") {
        if let Some((user, _pass)) = rest.split_once(' ') {
            return format!("LOGIN {user} ****");
        }
    }
    cmd.to_string()
}
