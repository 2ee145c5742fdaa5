use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use crate::log::LogSink;
use crate::signaling::protocol::ServerMsg;
use crate::signaling::router::Router;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::ConnectionId;
use crate::{sink_debug, sink_info, sink_warn};

/// Central server loop: owns the Router and maps conn_id -> Sender<ServerMsg>.
///
/// Runs until every event sender is dropped.
pub fn run_server_loop(mut router: Router, log: Arc<dyn LogSink>, rx: Receiver<ServerEvent>) {
    use ServerEvent::*;

    let mut clients: HashMap<ConnectionId, Sender<ServerMsg>> = HashMap::new();

    while let Ok(ev) = rx.recv() {
        match ev {
            RegisterClient { conn_id, to_client } => {
                clients.insert(conn_id, to_client);
                router.register_client(conn_id);

                sink_info!(
                    log,
                    "registered connection {} in server loop (now {} connections)",
                    conn_id,
                    clients.len()
                );
            }

            MsgFromClient { conn_id, msg } => {
                sink_debug!(log, "{} from connection {}", msg.event_name(), conn_id);
                router.handle_from_client(conn_id, msg);
            }

            Disconnected { conn_id } => {
                sink_info!(log, "connection {} disconnected (transport)", conn_id);
                clients.remove(&conn_id);
                router.unregister_client(conn_id);
            }
        }

        deliver(&mut router, &clients, log.as_ref());
    }

    sink_info!(
        log,
        "ServerEvent channel closed; server loop shutting down ({} connections left)",
        clients.len()
    );
}

/// Hand every pending message to its connection thread.
fn deliver(router: &mut Router, clients: &HashMap<ConnectionId, Sender<ServerMsg>>, log: &dyn LogSink) {
    for (target, out_msg) in router.drain_all_outgoing() {
        match clients.get(&target) {
            Some(tx) => {
                if tx.send(out_msg).is_err() {
                    sink_warn!(
                        log,
                        "failed to deliver message to connection {} (channel closed)",
                        target
                    );
                }
            }
            None => {
                sink_warn!(log, "no connection {} to deliver outgoing message", target);
            }
        }
    }
}
