//! One step of a scripted exchange, plus builders for the response
//! lines spec.md §8 spells out verbatim.

/// One step of the scripted exchange.
pub enum Step {
    /// Send bytes unprompted (the server greeting).
    Send(Vec<u8>),
    /// Read one request line from the client (captured for
    /// assertions), then send the given bytes.
    Reply(Vec<u8>),
}

#[must_use]
pub fn send(bytes: impl Into<Vec<u8>>) -> Step {
    Step::Send(bytes.into())
}

#[must_use]
pub fn reply(bytes: impl Into<Vec<u8>>) -> Step {
    Step::Reply(bytes.into())
}

/// `A<tag> OK <text>\r\n`
#[must_use]
pub fn tagged_ok(tag: u32, text: &str) -> Vec<u8> {
    format!("A{tag} OK {text}\r\n").into_bytes()
}

/// `A<tag> NO <text>\r\n`
#[must_use]
pub fn tagged_no(tag: u32, text: &str) -> Vec<u8> {
    format!("A{tag} NO {text}\r\n").into_bytes()
}

/// `A<tag> BAD <text>\r\n`
#[must_use]
pub fn tagged_bad(tag: u32, text: &str) -> Vec<u8> {
    format!("A{tag} BAD {text}\r\n").into_bytes()
}

/// `* OK [<KEYWORD> <value>] <text>\r\n` -- the SELECT response code
/// lines that carry UIDVALIDITY/UIDNEXT.
#[must_use]
pub fn untagged_ok_code(keyword: &str, value: u64, text: &str) -> Vec<u8> {
    format!("* OK [{keyword} {value}] {text}\r\n").into_bytes()
}

/// `* SEARCH <uids...>\r\n`
#[must_use]
pub fn search_line(uids: &[&str]) -> Vec<u8> {
    format!("* SEARCH {}\r\n", uids.join(" ")).into_bytes()
}

/// One untagged FETCH response carrying a literal body:
/// `* <seq> FETCH (UID <uid> <spec> {<n>}\r\n<body>)\r\n`
#[must_use]
pub fn fetch_line(seq: u32, uid: &str, spec: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!("* {seq} FETCH (UID {uid} {spec} {{{}}}\r\n", body.len()).into_bytes();
    out.extend_from_slice(body);
    out.extend_from_slice(b")\r\n");
    out
}
