use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use rustls::ServerConfig;
use tungstenite::{HandshakeError, WebSocket};

use crate::log::LogSink;
use crate::signaling::errors::SignalingError;
use crate::signaling::protocol::{ClientMsg, FrameError, ServerMsg, read_msg, write_msg};
use crate::signaling::server_event::ServerEvent;
use crate::signaling::tls::MaybeTlsStream;
use crate::signaling::types::ConnectionId;
use crate::{sink_debug, sink_info, sink_warn};

/// Timing knobs for one connection thread.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionTiming {
    pub poll_interval: Duration,
    pub handshake_timeout: Duration,
}

/// Thin wrapper over a WebSocket that speaks in protocol messages.
pub struct Connection<S: Read + Write> {
    pub conn_id: ConnectionId,
    ws: WebSocket<S>,
}

impl<S> Connection<S>
where
    S: Read + Write,
{
    pub fn new(conn_id: ConnectionId, ws: WebSocket<S>) -> Self {
        Self { conn_id, ws }
    }

    /// `Ok(None)` when nothing arrived within the socket read timeout.
    pub fn recv(&mut self) -> Result<Option<ClientMsg>, FrameError> {
        read_msg(&mut self.ws)
    }

    pub fn send(&mut self, msg: &ServerMsg) -> Result<(), FrameError> {
        write_msg(&mut self.ws, msg)
    }

    pub fn close(&mut self) {
        let _ = self.ws.close(None);
        let _ = self.ws.flush();
    }
}

/// Server side of the WebSocket upgrade, retrying reads that hit the
/// socket timeout until `timeout` has elapsed.
pub fn accept_websocket<S>(stream: S, timeout: Duration) -> Result<WebSocket<S>, SignalingError>
where
    S: Read + Write,
{
    let deadline = Instant::now() + timeout;
    let mut attempt = tungstenite::accept(stream);
    loop {
        match attempt {
            Ok(ws) => return Ok(ws),
            Err(HandshakeError::Interrupted(mid)) => {
                if Instant::now() >= deadline {
                    return Err(SignalingError::HandshakeTimeout);
                }
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(e)) => return Err(SignalingError::Handshake(e)),
        }
    }
}

/// Spawn the thread serving one accepted socket.
///
/// The thread performs the TLS/WebSocket handshake, registers with the
/// server loop, then alternates between reading one frame (bounded by
/// `poll_interval`) and draining its outbound channel.
pub fn spawn_connection_thread(
    conn_id: ConnectionId,
    sock: TcpStream,
    tls: Option<Arc<ServerConfig>>,
    timing: ConnectionTiming,
    server_tx: Sender<ServerEvent>,
    log: Arc<dyn LogSink>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("conn-{conn_id}"))
        .spawn(move || {
            let conn = match open_connection(conn_id, sock, tls.as_ref(), timing) {
                Ok(conn) => conn,
                Err(e) => {
                    sink_warn!(log, "[conn {}] handshake failed: {}", conn_id, e);
                    return;
                }
            };

            let (to_client_tx, to_client_rx) = mpsc::channel::<ServerMsg>();
            if server_tx
                .send(ServerEvent::RegisterClient {
                    conn_id,
                    to_client: to_client_tx,
                })
                .is_err()
            {
                sink_warn!(log, "[conn {}] server loop is gone", conn_id);
                return;
            }

            serve_connection(conn, to_client_rx, &server_tx, log.as_ref());
            let _ = server_tx.send(ServerEvent::Disconnected { conn_id });
        })?;
    Ok(())
}

fn open_connection(
    conn_id: ConnectionId,
    sock: TcpStream,
    tls: Option<&Arc<ServerConfig>>,
    timing: ConnectionTiming,
) -> Result<Connection<MaybeTlsStream>, SignalingError> {
    sock.set_nodelay(true)?;
    sock.set_read_timeout(Some(timing.poll_interval))?;
    let stream = MaybeTlsStream::accept(sock, tls)?;
    let ws = accept_websocket(stream, timing.handshake_timeout)?;
    Ok(Connection::new(conn_id, ws))
}

/// Pump frames until the peer goes away or the server loop drops us.
pub fn serve_connection<S>(
    mut conn: Connection<S>,
    to_client_rx: Receiver<ServerMsg>,
    server_tx: &Sender<ServerEvent>,
    log: &dyn LogSink,
) where
    S: Read + Write,
{
    let conn_id = conn.conn_id;
    loop {
        loop {
            match to_client_rx.try_recv() {
                Ok(msg) => {
                    match conn.send(&msg) {
                        Ok(()) => {}
                        // Unencodable (e.g. grown past the size cap by relaying):
                        // drop this message, keep the connection.
                        Err(e) if e.is_recoverable() => {
                            sink_warn!(
                                log,
                                "[conn {}] dropping outbound {}: {}",
                                conn_id,
                                msg.event_name(),
                                e
                            );
                        }
                        Err(e) => {
                            sink_warn!(
                                log,
                                "[conn {}] error sending {}: {}",
                                conn_id,
                                msg.event_name(),
                                e
                            );
                            return;
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    sink_debug!(log, "[conn {}] outbound channel closed", conn_id);
                    conn.close();
                    return;
                }
            }
        }

        match conn.recv() {
            Ok(Some(msg)) => {
                if server_tx
                    .send(ServerEvent::MsgFromClient { conn_id, msg })
                    .is_err()
                {
                    conn.close();
                    return;
                }
            }
            Ok(None) => {}
            Err(e) if e.is_recoverable() => {
                sink_warn!(log, "[conn {}] skipping malformed frame: {}", conn_id, e);
            }
            Err(FrameError::Closed) => {
                sink_info!(log, "[conn {}] closed by peer", conn_id);
                return;
            }
            Err(e) => {
                sink_warn!(log, "[conn {}] transport error: {}", conn_id, e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tungstenite::protocol::Role;

    use crate::log::{LogLevel, MemoryLogSink};
    use crate::signaling::protocol::{CallerInfo, CallType, IncomingOffer, MAX_BODY_LEN};

    /// Never has anything to read; records every byte written.
    #[derive(Clone, Default)]
    struct IdleStream {
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl Read for IdleStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    impl Write for IdleStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn oversized_relayed_message_is_dropped_not_fatal() {
        let stream = IdleStream::default();
        let written = stream.written.clone();
        let conn = Connection::new(7, WebSocket::from_raw_socket(stream, Role::Server, None));

        let (to_client_tx, to_client_rx) = mpsc::channel();
        let (server_tx, server_rx) = mpsc::channel();
        to_client_tx
            .send(ServerMsg::CallOffer(IncomingOffer {
                from: "a".into(),
                signal: serde_json::json!({"type": "offer", "sdp": "x".repeat(MAX_BODY_LEN)}),
                call_type: CallType::Video,
                caller_info: CallerInfo {
                    name: "User".into(),
                    avatar: None,
                },
            }))
            .unwrap();
        to_client_tx
            .send(ServerMsg::OnlineUsers(vec!["a".into(), "b".into()]))
            .unwrap();
        drop(to_client_tx);

        let log = MemoryLogSink::new();
        serve_connection(conn, to_client_rx, &server_tx, &log);

        let out = String::from_utf8_lossy(&written.lock().unwrap()).into_owned();
        assert!(out.contains(r#"{"event":"onlineUsers","data":["a","b"]}"#));
        assert!(!out.contains("call-offer"));
        assert!(log.contains(LogLevel::Warn, "dropping outbound call-offer"));
        assert!(server_rx.try_recv().is_err());
    }
}
