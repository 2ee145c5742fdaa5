use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::call::{
    CallEvent, CallMachine, MediaDevices, PeerConnectionFactory, SignalSink,
};
use crate::config::CallSettings;
use crate::log::{LogSink, log_msg::now_millis};
use crate::signaling::protocol::{ChatBody, ClientMsg, DeliveredChat, OutgoingChat, ServerMsg, UserId};
use crate::signaling_client::{SignalingClient, SignalingClientError, SignalingEvent};
use crate::{sink_debug, sink_info, sink_warn};

/// One logged-in user: online list, chat inbox and the call machine.
///
/// All inbound traffic goes through [`ChatClient::dispatch`]; nothing else
/// mutates call state on behalf of the server.
pub struct ChatClient {
    user_id: UserId,
    online_users: Vec<UserId>,
    inbox: Vec<DeliveredChat>,
    connected: bool,
    calls: CallMachine,
    signals: Arc<dyn SignalSink>,
    log: Arc<dyn LogSink>,
}

impl ChatClient {
    pub fn new(
        user_id: impl Into<UserId>,
        signals: Arc<dyn SignalSink>,
        factory: Box<dyn PeerConnectionFactory>,
        devices: Box<dyn MediaDevices>,
        call_events: Sender<CallEvent>,
        settings: &CallSettings,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let user_id = user_id.into();
        let calls = CallMachine::new(
            user_id.clone(),
            factory,
            devices,
            signals.clone(),
            call_events,
            settings,
            log.clone(),
        );
        Self {
            user_id,
            online_users: Vec::new(),
            inbox: Vec::new(),
            connected: false,
            calls,
            signals,
            log,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Everyone online, ourselves included, in join order.
    pub fn online_users(&self) -> &[UserId] {
        &self.online_users
    }

    /// Users we could call or message.
    pub fn online_peers(&self) -> Vec<&str> {
        self.online_users
            .iter()
            .map(String::as_str)
            .filter(|u| *u != self.user_id)
            .collect()
    }

    pub fn inbox(&self) -> &[DeliveredChat] {
        &self.inbox
    }

    pub fn take_inbox(&mut self) -> Vec<DeliveredChat> {
        std::mem::take(&mut self.inbox)
    }

    pub fn calls(&self) -> &CallMachine {
        &self.calls
    }

    pub fn calls_mut(&mut self) -> &mut CallMachine {
        &mut self.calls
    }

    pub fn send_chat(&self, to: &str, message: ChatBody) -> Result<(), SignalingClientError> {
        self.signals.send_signal(ClientMsg::SendMessage(OutgoingChat {
            receiver_id: to.to_string(),
            sender_id: self.user_id.clone(),
            message,
            timestamp: serde_json::Value::from(now_millis() as u64),
        }))
    }

    /// Map one server message onto the inbox, presence list or call machine.
    pub fn dispatch(&mut self, msg: ServerMsg) {
        sink_debug!(self.log, "[{}] <- {}", self.user_id, msg.event_name());
        match msg {
            ServerMsg::OnlineUsers(users) => self.online_users = users,
            ServerMsg::ReceiveMessage(chat) => self.inbox.push(chat),
            ServerMsg::CallOffer(offer) => self.calls.handle_offer(
                &offer.from,
                &offer.signal,
                offer.call_type,
                offer.caller_info,
            ),
            ServerMsg::CallAnswer(answer) => self.calls.handle_answer(&answer.from, &answer.signal),
            ServerMsg::CallCandidate(cand) => self.calls.handle_candidate(&cand.from, &cand.signal),
            ServerMsg::CallReject(notice) => self.calls.handle_reject(&notice.from),
            ServerMsg::CallEnd(notice) => self.calls.handle_end(&notice.from),
        }
    }

    pub fn handle_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected => {
                sink_info!(self.log, "[{}] signaling connected", self.user_id);
                self.connected = true;
            }
            SignalingEvent::Message(msg) => self.dispatch(msg),
            SignalingEvent::Disconnected { reason } => {
                sink_warn!(self.log, "[{}] signaling lost: {}", self.user_id, reason);
                self.connected = false;
                self.online_users.clear();
                self.calls.on_transport_lost();
            }
        }
    }

    /// Drain every pending event from `client`, then drive the ring timer.
    /// Returns the number of events handled.
    pub fn poll(&mut self, client: &SignalingClient) -> usize {
        let mut handled = 0;
        while let Some(event) = client.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        self.tick(Instant::now());
        handled
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.calls.tick(now)
    }
}
