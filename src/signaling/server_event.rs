use std::sync::mpsc::Sender;

use crate::signaling::{
    protocol::{ClientMsg, ServerMsg},
    types::ConnectionId,
};

/// Events sent *to* the central server thread.
pub enum ServerEvent {
    /// A new connection is registered with its outgoing channel.
    RegisterClient {
        conn_id: ConnectionId,
        to_client: Sender<ServerMsg>,
    },

    /// A connection sent a well-formed protocol message.
    MsgFromClient {
        conn_id: ConnectionId,
        msg: ClientMsg,
    },

    /// A connection closed or errored.
    Disconnected { conn_id: ConnectionId },
}
