//! Auth file, sidecar state, and per-message output files.
//!
//! `.uidvalidity` and `.uidnext` live at the top level of `out_dir`,
//! not keyed by mailbox -- preserved from the reference tool rather
//! than "fixed" (see DESIGN.md).

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Read exactly two lines from the auth file: username, then password.
/// A file with fewer than two lines is fatal.
pub fn read_credentials(path: &Path) -> Result<Credentials> {
    let file = fs::File::open(path)?;
    let mut lines = std::io::BufReader::new(file).lines();

    let username = lines
        .next()
        .ok_or_else(|| Error::Config("Wrong auth file format.".into()))??;
    let password = lines
        .next()
        .ok_or_else(|| Error::Config("Wrong auth file format.".into()))??;

    Ok(Credentials { username, password })
}

fn uidvalidity_path(out_dir: &Path) -> PathBuf {
    out_dir.join(".uidvalidity")
}

fn uidnext_path(out_dir: &Path) -> PathBuf {
    out_dir.join(".uidnext")
}

/// Result of comparing the server-reported UIDVALIDITY against disk.
pub struct UidvalidityCheck {
    pub matches: bool,
}

/// Implements spec §4.3 rule 1's UIDVALIDITY handling: absent file is
/// created and `matches=false`; present+equal is `matches=true`;
/// present+differing is rewritten and `matches=false`.
pub fn check_and_store_uidvalidity(out_dir: &Path, server_value: &str) -> Result<UidvalidityCheck> {
    let path = uidvalidity_path(out_dir);
    match fs::read_to_string(&path) {
        Ok(existing) => {
            let existing = existing.trim();
            if existing == server_value {
                Ok(UidvalidityCheck { matches: true })
            } else {
                fs::write(&path, server_value)?;
                Ok(UidvalidityCheck { matches: false })
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::write(&path, server_value)?;
            Ok(UidvalidityCheck { matches: false })
        }
        Err(e) => Err(e.into()),
    }
}

/// Implements spec §4.3 rule 1's UIDNEXT handling: absent file is
/// created with `"1"`; present file's value is loaded into
/// `uidnext_local`.
pub fn load_or_init_uidnext(out_dir: &Path) -> Result<String> {
    let path = uidnext_path(out_dir);
    match fs::read_to_string(&path) {
        Ok(existing) => Ok(existing.trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::write(&path, "1")?;
            Ok("1".to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// Rewrite `.uidnext` after a full message has been successfully
/// written (invariant 3); caller is responsible for gating this on
/// `!only_headers && !only_new`.
pub fn advance_uidnext(out_dir: &Path, uid: &str) -> Result<()> {
    let next: u64 = uid
        .parse::<u64>()
        .map_err(|_| Error::Protocol(format!("non-numeric UID in FETCH response: {uid}")))?
        + 1;
    fs::write(uidnext_path(out_dir), next.to_string())?;
    Ok(())
}

/// Deterministic per-message filename: `<UID>.<mailbox>.<server>`.
pub fn message_path(out_dir: &Path, uid: &str, mailbox: &str, server: &str) -> PathBuf {
    out_dir.join(format!("{uid}.{mailbox}.{server}"))
}

/// Truncate-create a message file and return the open handle so its
/// body can be streamed in as literal chunks arrive off the wire,
/// rather than buffered whole in memory first.
pub fn create_message_file(path: &Path) -> Result<fs::File> {
    Ok(fs::File::create(path)?)
}
