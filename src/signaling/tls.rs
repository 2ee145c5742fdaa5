use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::Arc;

use rustls::{
    ClientConfig, ClientConnection, RootCertStore, ServerConfig, ServerConnection, StreamOwned,
    pki_types::{CertificateDer, PrivateKeyDer, ServerName},
};
use rustls_pemfile::{Item, certs, read_one};

use crate::config::TlsSettings;
use crate::signaling::errors::SignalingError;

/// A TCP stream, optionally wrapped in TLS on either side.
pub enum MaybeTlsStream {
    Plain(TcpStream),
    ServerTls(Box<StreamOwned<ServerConnection, TcpStream>>),
    ClientTls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl MaybeTlsStream {
    /// Wrap an accepted socket; `None` serves plain `ws://`.
    pub fn accept(
        sock: TcpStream,
        tls: Option<&Arc<ServerConfig>>,
    ) -> Result<Self, SignalingError> {
        match tls {
            None => Ok(Self::Plain(sock)),
            Some(config) => {
                let conn = ServerConnection::new(config.clone())?;
                Ok(Self::ServerTls(Box::new(StreamOwned::new(conn, sock))))
            }
        }
    }

    /// Wrap a connected socket for `wss://` towards `server_name`.
    pub fn connect_tls(
        sock: TcpStream,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<Self, SignalingError> {
        let name = ServerName::try_from(server_name.to_owned())
            .map_err(|e| SignalingError::TlsMaterial(format!("server name {server_name}: {e}")))?;
        let conn = ClientConnection::new(config, name)?;
        Ok(Self::ClientTls(Box::new(StreamOwned::new(conn, sock))))
    }
}

impl Read for MaybeTlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(s) => s.read(buf),
            Self::ServerTls(s) => s.read(buf),
            Self::ClientTls(s) => s.read(buf),
        }
    }
}

impl Write for MaybeTlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(s) => s.write(buf),
            Self::ServerTls(s) => s.write(buf),
            Self::ClientTls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(s) => s.flush(),
            Self::ServerTls(s) => s.flush(),
            Self::ClientTls(s) => s.flush(),
        }
    }
}

/// Loads a certificate chain from a PEM file.
pub fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening cert {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid certs: {e}")))?;

    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} did not contain any certificates", path.display()),
        ));
    }

    Ok(certs)
}

/// Loads a private key from a PEM file.
/// Supports PKCS1, PKCS8, and Sec1 (EC) formats.
pub fn load_private_key(path: &Path) -> io::Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening key {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    loop {
        match read_one(&mut reader) {
            Ok(Some(Item::Pkcs1Key(key))) => return Ok(key.into()),
            Ok(Some(Item::Pkcs8Key(key))) => return Ok(key.into()),
            Ok(Some(Item::Sec1Key(key))) => return Ok(key.into()),
            Ok(None) => break,
            Ok(Some(_)) => {}
            Err(e) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("key parse error: {e}"),
                ));
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("no private key found in {}", path.display()),
    ))
}

/// Builds a `RootCertStore` that trusts ONLY the CA(s) in `ca_path`.
pub fn build_pinned_root_store(ca_path: &Path) -> io::Result<RootCertStore> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        root_store
            .add(cert)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad CA cert: {e}")))?;
    }
    Ok(root_store)
}

/// ServerConfig for `wss://`, no client auth.
///
/// Built once at startup; each accepted socket gets its own `ServerConnection`.
pub fn build_signaling_server_config(
    settings: &TlsSettings,
) -> Result<Arc<ServerConfig>, SignalingError> {
    let certs = load_certs(&settings.cert_path)?;
    let key = load_private_key(&settings.key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}

/// ClientConfig for the signaling client, trusting only the pinned CA.
pub fn build_signaling_client_config(ca_path: &Path) -> Result<Arc<ClientConfig>, SignalingError> {
    let root_store = build_pinned_root_store(ca_path)?;

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}
