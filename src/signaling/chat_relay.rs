use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink, log_msg::now_millis};
use crate::signaling::presence::PresenceDirectory;
use crate::signaling::protocol::{ChatSender, DeliveredChat, OutgoingChat, ServerMsg};
use crate::signaling::types::OutgoingMsg;
use crate::sink_debug;

/// Point-to-point delivery of chat messages to online users.
///
/// Offline receivers simply miss the message; persistence belongs to the
/// chat backend.
pub struct ChatRelay {
    next_seq: u64,
    log: Arc<dyn LogSink>,
}

impl ChatRelay {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self { next_seq: 1, log }
    }

    pub fn deliver(
        &mut self,
        directory: &PresenceDirectory,
        chat: OutgoingChat,
    ) -> Option<OutgoingMsg> {
        let Some(target) = directory.lookup(&chat.receiver_id) else {
            sink_debug!(
                self.log,
                "chat from '{}' to offline '{}' not delivered",
                chat.sender_id,
                chat.receiver_id
            );
            return None;
        };

        let id = self.alloc_message_id();
        let OutgoingChat {
            sender_id,
            message,
            timestamp,
            ..
        } = chat;

        let delivered = DeliveredChat {
            id,
            content: message.display_content(),
            image: message.image,
            sender: ChatSender {
                id: sender_id,
                name: message.sender_name,
                avatar: message.sender_avatar,
            },
            timestamp,
            is_own: false,
        };

        Some(OutgoingMsg {
            target,
            msg: ServerMsg::ReceiveMessage(delivered),
        })
    }

    /// `<millis>-<seq>`: unique per relay even within one millisecond.
    fn alloc_message_id(&mut self) -> String {
        let id = format!("{}-{}", now_millis(), self.next_seq);
        self.next_seq += 1;
        id
    }
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new(Arc::new(NoopLogSink))
    }
}
