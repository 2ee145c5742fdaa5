use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use rustls::ServerConfig;

use crate::config::ServerSettings;
use crate::log::LogSink;
use crate::signaling::auth::{AllowAllIdentities, IdentityResolver};
use crate::signaling::errors::SignalingError;
use crate::signaling::router::Router;
use crate::signaling::runtime::run_server_loop;
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::tls::build_signaling_server_config;
use crate::signaling::transport::{ConnectionTiming, spawn_connection_thread};
use crate::signaling::types::ConnectionId;
use crate::{sink_info, sink_warn};

/// Top-level runtime object for the signaling service.
///
/// This owns:
/// - the bound listener
/// - logging sink
/// - identity resolver
/// and knows how to spin up the central server loop plus per-connection threads.
pub struct SignalingServer {
    listener: TcpListener,
    timing: ConnectionTiming,
    tls: Option<Arc<ServerConfig>>,
    log: Arc<dyn LogSink>,
    identities: Box<dyn IdentityResolver>,
}

impl SignalingServer {
    /// Bind with an arbitrary identity resolver (good for tests).
    pub fn bind_with_identities<I>(
        settings: &ServerSettings,
        log: Arc<dyn LogSink>,
        identities: I,
    ) -> Result<Self, SignalingError>
    where
        I: IdentityResolver + 'static,
    {
        let listener =
            TcpListener::bind(&settings.bind_addr).map_err(|source| SignalingError::Bind {
                addr: settings.bind_addr.clone(),
                source,
            })?;

        let tls = settings
            .tls
            .as_ref()
            .map(build_signaling_server_config)
            .transpose()?;

        Ok(Self {
            listener,
            timing: ConnectionTiming {
                poll_interval: settings.poll_interval,
                handshake_timeout: settings.handshake_timeout,
            },
            tls,
            log,
            identities: Box::new(identities),
        })
    }

    /// Bind accepting any user id.
    pub fn bind(settings: &ServerSettings, log: Arc<dyn LogSink>) -> Result<Self, SignalingError> {
        Self::bind_with_identities(settings, log, AllowAllIdentities)
    }

    /// Actual listening address (useful when bound to port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, SignalingError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> Result<JoinHandle<()>, SignalingError> {
        let log = self.log.clone();
        let handle = thread::Builder::new()
            .name("signaling-accept".into())
            .spawn(move || {
                if let Err(e) = self.run() {
                    sink_warn!(log, "signaling server stopped: {}", e);
                }
            })?;
        Ok(handle)
    }

    /// Blocking main loop: spawn the central server loop, accept TCP clients.
    pub fn run(self) -> Result<(), SignalingError> {
        let Self {
            listener,
            timing,
            tls,
            log,
            identities,
        } = self;

        let (server_tx, server_rx) = mpsc::channel::<ServerEvent>();

        {
            let log_for_loop = log.clone();
            let log_for_engine = log.clone();
            thread::Builder::new()
                .name("signaling-loop".into())
                .spawn(move || {
                    sink_info!(log_for_loop, "[signaling] server loop started");
                    let engine = ServerEngine::with_log_and_identities(log_for_engine, identities);
                    run_server_loop(Router::with_engine(engine), log_for_loop, server_rx);
                })?;
        }

        let mut next_conn_id: ConnectionId = 1;
        sink_info!(
            log,
            "signaling server listening on {} ({})",
            listener.local_addr()?,
            if tls.is_some() { "wss" } else { "ws" }
        );

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(
                        log,
                        "incoming TCP accept failed: {:?} (continuing to accept)",
                        e
                    );
                    continue;
                }
            };

            let conn_id = next_conn_id;
            next_conn_id += 1;

            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "?".into());
            sink_info!(log, "accepted TCP connection {} from {}", conn_id, peer);

            if let Err(e) = spawn_connection_thread(
                conn_id,
                stream,
                tls.clone(),
                timing,
                server_tx.clone(),
                log.clone(),
            ) {
                sink_warn!(
                    log,
                    "failed to spawn connection thread for {}: {:?}",
                    conn_id,
                    e
                );
            }
        }

        Ok(())
    }
}
