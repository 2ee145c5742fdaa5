use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::auth::{AllowAllIdentities, IdentityResolver};
use crate::signaling::chat_relay::ChatRelay;
use crate::signaling::presence::PresenceDirectory;
use crate::signaling::protocol::{ClientMsg, UserId};
use crate::signaling::relay::{SignalEnvelope, SignalRelay};
use crate::signaling::types::{ConnectionId, OutgoingMsg};
use crate::{sink_debug, sink_info, sink_warn};

/// Pure signaling state machine: presence, chat delivery and call relay.
///
/// Transport-free; every entrypoint returns the messages to send.
pub struct ServerEngine {
    directory: PresenceDirectory,
    relay: SignalRelay,
    chat: ChatRelay,
    identities: Box<dyn IdentityResolver>,
    log: Arc<dyn LogSink>,
}

impl ServerEngine {
    pub fn new() -> Self {
        Self::with_log_and_identities(Arc::new(NoopLogSink), Box::new(AllowAllIdentities))
    }

    /// Engine with a custom logger, accepting any user id.
    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_log_and_identities(log, Box::new(AllowAllIdentities))
    }

    pub fn with_identities(identities: Box<dyn IdentityResolver>) -> Self {
        Self::with_log_and_identities(Arc::new(NoopLogSink), identities)
    }

    pub fn with_log_and_identities(
        log: Arc<dyn LogSink>,
        identities: Box<dyn IdentityResolver>,
    ) -> Self {
        Self {
            directory: PresenceDirectory::new(),
            relay: SignalRelay::new(log.clone()),
            chat: ChatRelay::new(log.clone()),
            identities,
            log,
        }
    }

    pub fn directory(&self) -> &PresenceDirectory {
        &self.directory
    }

    /// A transport connection was accepted.
    pub fn handle_connect(&mut self, conn_id: ConnectionId) -> Vec<OutgoingMsg> {
        self.directory.connect(conn_id);
        sink_debug!(
            self.log,
            "connection {} tracked ({} total)",
            conn_id,
            self.directory.connection_count()
        );
        Vec::new()
    }

    /// Main entrypoint: handle a message from a connection.
    pub fn handle(&mut self, from: ConnectionId, msg: ClientMsg) -> Vec<OutgoingMsg> {
        let msg = match SignalEnvelope::from_client_msg(msg) {
            Ok(envelope) => {
                return self
                    .relay
                    .forward(&self.directory, self.identities.as_ref(), envelope)
                    .into_iter()
                    .collect();
            }
            Err(other) => other,
        };

        match msg {
            ClientMsg::Join(user_id) => self.handle_join(from, user_id),
            ClientMsg::SendMessage(chat) => {
                self.chat.deliver(&self.directory, chat).into_iter().collect()
            }
            other => {
                sink_warn!(
                    self.log,
                    "unexpected {} from connection {}",
                    other.event_name(),
                    from
                );
                Vec::new()
            }
        }
    }

    /// Called when a transport connection closes, to clean up state.
    pub fn handle_disconnect(&mut self, conn_id: ConnectionId) -> Vec<OutgoingMsg> {
        let user = self.directory.user_for(conn_id).cloned();
        let out = self.directory.remove(conn_id);

        match user {
            Some(user_id) if !self.directory.is_online(&user_id) => {
                sink_info!(
                    self.log,
                    "connection {} ({}) disconnected; user offline",
                    conn_id,
                    user_id
                );
            }
            Some(user_id) => {
                sink_info!(
                    self.log,
                    "connection {} ({}) disconnected; user still online elsewhere",
                    conn_id,
                    user_id
                );
            }
            None => {
                sink_debug!(self.log, "connection {} disconnected before join", conn_id);
            }
        }
        out
    }

    fn handle_join(&mut self, conn_id: ConnectionId, user_id: UserId) -> Vec<OutgoingMsg> {
        let user_id = user_id.trim().to_string();
        if let Err(err) = self.identities.verify_join(&user_id) {
            sink_warn!(
                self.log,
                "join rejected on connection {}: {}",
                conn_id,
                err
            );
            return Vec::new();
        }

        if let Some(previous) = self.directory.lookup(&user_id) {
            if previous != conn_id {
                sink_info!(
                    self.log,
                    "'{}' moved from connection {} to {}",
                    user_id,
                    previous,
                    conn_id
                );
            }
        }

        sink_info!(self.log, "'{}' joined on connection {}", user_id, conn_id);
        self.directory.join(user_id, conn_id)
    }
}

impl Default for ServerEngine {
    fn default() -> Self {
        Self::new()
    }
}
