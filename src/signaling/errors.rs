use std::io;

use thiserror::Error;

/// Failures of the signaling server runtime (bind, TLS, handshakes).
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid tls material: {0}")]
    TlsMaterial(String),

    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),

    #[error("websocket handshake timed out")]
    HandshakeTimeout,
}
