//! Connection establishment: plain TCP and implicit TLS, both blocking.
//!
//! `Transport` is a marker trait over `Read + Write` so the rest of the
//! engine never has to care whether it is talking to a bare
//! `TcpStream` or a `rustls::StreamOwned` wrapping one.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::config::Config;
use crate::error::{Error, Result};

pub trait Transport: Read + Write + Send {}

impl Transport for TcpStream {}
impl Transport for StreamOwned<ClientConnection, TcpStream> {}

/// Resolve `host:port` and connect to the first address that accepts,
/// as spec.md §4.1 requires. Fatal only once every candidate has failed.
fn connect_tcp(host: &str, port: u16) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Connect(format!("could not resolve {host}:{port}: {e}")))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                tracing::debug!(%addr, "tcp connect succeeded");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "tcp connect failed, trying next address");
                last_err = Some(e);
            }
        }
    }
    Err(Error::Connect(format!(
        "could not connect to any address for {host}:{port}: {}",
        last_err.map_or_else(|| "no addresses resolved".to_string(), |e| e.to_string())
    )))
}

/// Root store precedence: `certfile` (PEM) > `certaddr` (directory of
/// hashed anchors, each entry parsed as PEM or DER) > system default
/// (native OS store, falling back to the bundled Mozilla roots).
fn build_root_store(config: &Config) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();

    if let Some(path) = &config.certfile {
        load_pem_file(&mut store, path)?;
        return Ok(store);
    }

    if let Some(dir) = &config.certaddr {
        load_cert_dir(&mut store, dir)?;
        return Ok(store);
    }

    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        tracing::debug!(%err, "skipping unreadable native root cert");
    }
    for cert in native.certs {
        let _ = store.add(cert);
    }
    if store.is_empty() {
        tracing::debug!("native trust store empty or unreadable, falling back to bundled webpki roots");
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    Ok(store)
}

fn load_pem_file(store: &mut RootCertStore, path: &Path) -> Result<()> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(path)?);
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| Error::Tls(format!("malformed certfile {}: {e}", path.display())))?;
        store
            .add(cert)
            .map_err(|e| Error::Tls(format!("rejected certificate in {}: {e}", path.display())))?;
    }
    if store.is_empty() {
        return Err(Error::Tls(format!("certfile {} contained no certificates", path.display())));
    }
    Ok(())
}

fn load_cert_dir(store: &mut RootCertStore, dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::Tls(format!("cannot read certaddr directory {}: {e}", dir.display())))?;
    let mut loaded = 0usize;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let bytes = std::fs::read(entry.path())?;
        if let Some(cert) = rustls_pemfile::certs(&mut bytes.as_slice()).next() {
            let cert = cert.map_err(|e| {
                Error::Tls(format!("malformed anchor {}: {e}", entry.path().display()))
            })?;
            store.add(cert).map_err(|e| {
                Error::Tls(format!("rejected anchor {}: {e}", entry.path().display()))
            })?;
            loaded += 1;
        } else {
            let cert = rustls::pki_types::CertificateDer::from(bytes);
            store
                .add(cert)
                .map_err(|e| Error::Tls(format!("rejected anchor {}: {e}", entry.path().display())))?;
            loaded += 1;
        }
    }
    if loaded == 0 {
        return Err(Error::Tls(format!(
            "certaddr directory {} contained no usable trust anchors",
            dir.display()
        )));
    }
    Ok(())
}

/// rustls surfaces a certificate-verification failure as an `io::Error`
/// wrapping a `rustls::Error::InvalidCertificate`; give that specific
/// case the plain wording spec.md §8's S6 scenario expects instead of
/// the raw rustls error text.
fn handshake_error_message(e: &std::io::Error) -> String {
    let is_invalid_cert = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .is_some_and(|rustls_err| matches!(rustls_err, rustls::Error::InvalidCertificate(_)));
    if is_invalid_cert {
        "Cannot verify the certificate.".to_string()
    } else {
        format!("TLS handshake failed: {e}")
    }
}

/// Open a transport to `config.server:config.port`, performing an
/// implicit TLS handshake first when `config.secured` is set.
/// Certificate verification is always the standard rustls WebPKI
/// verifier over the resolved root store -- there is no bypass path.
pub fn connect(config: &Config) -> Result<Box<dyn Transport>> {
    let tcp = connect_tcp(&config.server, config.port)?;

    if !config.secured {
        return Ok(Box::new(tcp));
    }

    let root_store = build_root_store(config)?;
    let tls_config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let server_name = ServerName::try_from(config.server.clone())
        .map_err(|e| Error::Tls(format!("invalid server name {:?}: {e}", config.server)))?;

    let conn = ClientConnection::new(Arc::new(tls_config), server_name)
        .map_err(|e| Error::Tls(format!("TLS handshake setup failed: {e}")))?;

    let mut conn = conn;
    let mut tcp = tcp;
    // Force the handshake now so a verification failure surfaces here,
    // before the caller thinks the connection is ready for IMAP traffic.
    conn.complete_io(&mut tcp)
        .map_err(|e| Error::Tls(handshake_error_message(&e)))?;
    let stream = StreamOwned::new(conn, tcp);

    tracing::info!(server = %config.server, port = config.port, "TLS handshake complete");
    Ok(Box::new(stream))
}
