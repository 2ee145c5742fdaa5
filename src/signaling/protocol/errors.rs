use thiserror::Error;

/// Protocol-level errors (payload parsing/format issues, etc.).
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {actual} bytes (max {max})")]
    TooLarge { max: usize, actual: usize },

    #[error("binary frames are not part of the protocol")]
    BinaryFrame,
}

/// Frame-level error wrapper: WebSocket transport vs protocol.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("connection closed")]
    Closed,
}

impl FrameError {
    /// A bad payload leaves the connection usable; everything else does not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Proto(_))
    }
}
