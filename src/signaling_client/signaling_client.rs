use std::net::TcpStream;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tungstenite::http::Uri;
use tungstenite::{HandshakeError, WebSocket};

use crate::config::ClientSettings;
use crate::log::LogSink;
use crate::signaling::SignalingError;
use crate::signaling::protocol::{ClientMsg, FrameError, ServerMsg, UserId, read_msg, write_msg};
use crate::signaling::tls::{MaybeTlsStream, build_signaling_client_config};
use crate::signaling_client::{SignalingClientError, SignalingCommand, SignalingEvent};
use crate::{sink_debug, sink_info, sink_warn};

/// Cloneable handle for pushing messages to the network thread.
#[derive(Debug, Clone)]
pub struct SignalingSender {
    cmd_tx: Sender<SignalingCommand>,
}

impl SignalingSender {
    pub fn send(&self, msg: ClientMsg) -> Result<(), SignalingClientError> {
        self.cmd_tx
            .send(SignalingCommand::Send(msg))
            .map_err(|_| SignalingClientError::Disconnected)
    }
}

/// Client end of the signaling WebSocket.
///
/// A single network thread owns the socket. It alternates between flushing
/// queued commands and reading one frame bounded by the poll interval.
pub struct SignalingClient {
    user_id: UserId,
    sender: SignalingSender,
    evt_rx: Receiver<SignalingEvent>,
    worker: Option<JoinHandle<()>>,
}

impl SignalingClient {
    /// Connect to `url` (`ws://` or `wss://`) and announce `user_id`.
    pub fn connect(
        url: &str,
        user_id: impl Into<UserId>,
        settings: &ClientSettings,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SignalingClientError> {
        let user_id = user_id.into();
        let uri: Uri = url
            .parse()
            .map_err(|_| SignalingClientError::InvalidUrl(url.to_string()))?;
        let secure = match uri.scheme_str() {
            Some("ws") => false,
            Some("wss") => true,
            _ => return Err(SignalingClientError::InvalidUrl(url.to_string())),
        };
        let host = uri
            .host()
            .ok_or_else(|| SignalingClientError::InvalidUrl(url.to_string()))?
            .to_string();
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });

        let sock = TcpStream::connect((host.as_str(), port))?;
        sock.set_nodelay(true)?;
        sock.set_read_timeout(Some(settings.poll_interval))?;

        let stream = if secure {
            let ca = settings
                .ca_path
                .as_ref()
                .ok_or(SignalingClientError::MissingCa)?;
            let config = build_signaling_client_config(ca)?;
            MaybeTlsStream::connect_tls(sock, &host, config)?
        } else {
            MaybeTlsStream::Plain(sock)
        };

        let mut ws = connect_websocket(url, stream, settings.handshake_timeout)?;
        write_msg(&mut ws, &ClientMsg::Join(user_id.clone()))?;
        sink_info!(log, "signaling connected to {} as '{}'", url, user_id);

        let (cmd_tx, cmd_rx) = mpsc::channel::<SignalingCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<SignalingEvent>();
        let _ = evt_tx.send(SignalingEvent::Connected);

        let worker = thread::Builder::new()
            .name(format!("signaling-{user_id}"))
            .spawn(move || network_loop(ws, cmd_rx, evt_tx, log))?;

        Ok(Self {
            user_id,
            sender: SignalingSender { cmd_tx },
            evt_rx,
            worker: Some(worker),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn send(&self, msg: ClientMsg) -> Result<(), SignalingClientError> {
        self.sender.send(msg)
    }

    pub fn sender(&self) -> SignalingSender {
        self.sender.clone()
    }

    /// Next pending event, if any.
    pub fn try_recv(&self) -> Option<SignalingEvent> {
        match self.evt_rx.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SignalingEvent> {
        match self.evt_rx.recv_timeout(timeout) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Close the WebSocket and wait for the network thread. Idempotent.
    pub fn disconnect(&mut self) {
        let _ = self.sender.cmd_tx.send(SignalingCommand::Disconnect);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn connect_websocket(
    url: &str,
    stream: MaybeTlsStream,
    timeout: Duration,
) -> Result<WebSocket<MaybeTlsStream>, SignalingClientError> {
    let deadline = Instant::now() + timeout;
    let mut attempt = tungstenite::client(url, stream);
    loop {
        match attempt {
            Ok((ws, _response)) => return Ok(ws),
            Err(HandshakeError::Interrupted(mid)) => {
                if Instant::now() >= deadline {
                    return Err(SignalingError::HandshakeTimeout.into());
                }
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(e)) => return Err(SignalingError::Handshake(e).into()),
        }
    }
}

fn network_loop(
    mut ws: WebSocket<MaybeTlsStream>,
    cmd_rx: Receiver<SignalingCommand>,
    evt_tx: Sender<SignalingEvent>,
    log: Arc<dyn LogSink>,
) {
    let reason = loop {
        match drain_commands(&mut ws, &cmd_rx, log.as_ref()) {
            Ok(true) => {}
            Ok(false) => break "disconnected by client".to_string(),
            Err(e) => break format!("send failed: {e}"),
        }

        match read_msg::<_, ServerMsg>(&mut ws) {
            Ok(Some(msg)) => {
                if evt_tx.send(SignalingEvent::Message(msg)).is_err() {
                    let _ = ws.close(None);
                    let _ = ws.flush();
                    break "event receiver dropped".to_string();
                }
            }
            Ok(None) => {}
            Err(e) if e.is_recoverable() => {
                sink_warn!(log, "skipping malformed server frame: {}", e);
            }
            Err(FrameError::Closed) => break "closed by server".to_string(),
            Err(e) => break e.to_string(),
        }
    };

    sink_debug!(log, "signaling network thread exiting: {}", reason);
    let _ = evt_tx.send(SignalingEvent::Disconnected { reason });
}

/// Returns `Ok(false)` once the application asked to disconnect.
fn drain_commands(
    ws: &mut WebSocket<MaybeTlsStream>,
    cmd_rx: &Receiver<SignalingCommand>,
    log: &dyn LogSink,
) -> Result<bool, FrameError> {
    loop {
        match cmd_rx.try_recv() {
            Ok(SignalingCommand::Send(msg)) => {
                sink_debug!(log, "sending {}", msg.event_name());
                write_msg(ws, &msg)?;
            }
            Ok(SignalingCommand::Disconnect) | Err(TryRecvError::Disconnected) => {
                let _ = ws.close(None);
                let _ = ws.flush();
                return Ok(false);
            }
            Err(TryRecvError::Empty) => return Ok(true),
        }
    }
}
