use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use rustls::pki_types::PrivatePkcs8KeyDer;

use super::script::Step;

/// A fake server speaking plain-text IMAP: accepts exactly one
/// connection on a background thread and plays back `script`.
pub struct ScriptedServer {
    port: u16,
    requests: mpsc::Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedServer {
    #[must_use]
    pub fn start(script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            run_script(BufReader::new(stream), script, &tx);
        });

        Self {
            port,
            requests: rx,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Join the background thread and return every request line the
    /// client sent, in order.
    #[must_use]
    pub fn finish(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.requests.try_iter().collect()
    }
}

/// A fake server wrapping the same scripted behavior in an implicit TLS
/// handshake, using a freshly generated self-signed certificate --
/// deliberately untrusted by any real trust store, for exercising the
/// verification-failure path (spec.md §8 S6). The client is expected to
/// abort before the handshake completes, so `script` never actually
/// gets played back in that scenario; it exists so the same harness can
/// also cover a hypothetical trusted-cert TLS run.
pub struct TlsScriptedServer {
    port: u16,
    handle: Option<JoinHandle<()>>,
}

impl TlsScriptedServer {
    #[must_use]
    pub fn start(script: Vec<Step>) -> Self {
        let cert = rcgen::generate_simple_self_signed(vec!["imap.example.test".to_string()])
            .expect("generate self-signed cert");
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");
        let tls_config = Arc::new(tls_config);

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, _rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let Ok((mut tcp, _)) = listener.accept() else {
                return;
            };
            let Ok(mut conn) = rustls::ServerConnection::new(tls_config) else {
                return;
            };
            if conn.complete_io(&mut tcp).is_err() {
                // Expected: the client aborts once it rejects our
                // certificate, before the handshake can complete.
                return;
            }
            let stream = rustls::StreamOwned::new(conn, tcp);
            run_script(BufReader::new(stream), script, &tx);
        });

        Self {
            port,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_script<S: Read + Write>(mut stream: BufReader<S>, script: Vec<Step>, tx: &mpsc::Sender<String>) {
    for step in script {
        match step {
            Step::Send(bytes) => {
                if stream.get_mut().write_all(&bytes).is_err() {
                    return;
                }
            }
            Step::Reply(bytes) => {
                let mut line = String::new();
                match stream.read_line(&mut line) {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {}
                }
                let _ = tx.send(line.trim_end_matches(['\r', '\n']).to_string());
                if stream.get_mut().write_all(&bytes).is_err() {
                    return;
                }
            }
        }
    }
}
