use std::fs;
use std::path::PathBuf;

/// A fresh, empty scratch directory under the OS temp dir, unique to
/// this test name and process.
#[must_use]
pub fn scratch_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("imap-fetch-e2e-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Write a two-line auth file (username, password) into `dir` and
/// return its path.
#[must_use]
pub fn write_auth_file(dir: &std::path::Path, user: &str, pass: &str) -> PathBuf {
    let path = dir.join("auth.txt");
    fs::write(&path, format!("{user}\n{pass}\n")).expect("write auth file");
    path
}
