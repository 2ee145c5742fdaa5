use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tungstenite::{Message, WebSocket};

use super::{FrameError, ProtoError, decode_msg, encode_msg};

/// Write a single protocol message as one text frame and flush it.
pub fn write_msg<S, M>(ws: &mut WebSocket<S>, msg: &M) -> Result<(), FrameError>
where
    S: Read + Write,
    M: Serialize,
{
    let text = encode_msg(msg)?;
    ws.send(Message::text(text))?;
    Ok(())
}

/// Read at most one protocol message.
///
/// Returns `Ok(None)` when the underlying socket read timed out or when a
/// control frame (ping/pong) was consumed, so callers can poll.
pub fn read_msg<S, M>(ws: &mut WebSocket<S>) -> Result<Option<M>, FrameError>
where
    S: Read + Write,
    M: DeserializeOwned,
{
    match ws.read() {
        Ok(Message::Text(text)) => Ok(Some(decode_msg(text.as_str())?)),
        Ok(Message::Binary(_)) => Err(ProtoError::BinaryFrame.into()),
        Ok(Message::Close(_)) => Err(FrameError::Closed),
        Ok(_) => Ok(None),
        Err(tungstenite::Error::Io(e)) if is_timeout(&e) => Ok(None),
        Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
            Err(FrameError::Closed)
        }
        Err(e) => Err(e.into()),
    }
}

/// True for the error kinds a socket read timeout surfaces as.
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
