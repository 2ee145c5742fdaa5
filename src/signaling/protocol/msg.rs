use serde::{Deserialize, Serialize};

use super::types::{CallType, CallerInfo, DeliveredChat, OutgoingChat, SignalPayload, UserId};

/// `call-offer` as sent by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOfferRequest {
    pub to: UserId,
    pub from: UserId,
    pub signal: SignalPayload,
    #[serde(rename = "type", default)]
    pub call_type: CallType,
}

/// `call-answer` / `call-candidate` as sent by either party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub to: UserId,
    pub from: UserId,
    pub signal: SignalPayload,
}

/// `call-reject` / `call-end` as sent by either party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallControl {
    pub to: UserId,
    pub from: UserId,
}

/// `call-offer` as delivered to the callee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingOffer {
    pub from: UserId,
    pub signal: SignalPayload,
    #[serde(rename = "type", default)]
    pub call_type: CallType,
    pub caller_info: CallerInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingSignal {
    pub from: UserId,
    pub signal: SignalPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNotice {
    pub from: UserId,
}

/// Messages a client sends to the signaling server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMsg {
    #[serde(rename = "join")]
    Join(UserId),
    #[serde(rename = "sendMessage")]
    SendMessage(OutgoingChat),
    #[serde(rename = "call-offer")]
    CallOffer(CallOfferRequest),
    #[serde(rename = "call-answer")]
    CallAnswer(SignalRequest),
    #[serde(rename = "call-candidate")]
    CallCandidate(SignalRequest),
    #[serde(rename = "call-reject")]
    CallReject(CallControl),
    #[serde(rename = "call-end")]
    CallEnd(CallControl),
}

impl ClientMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMsg::Join(_) => "join",
            ClientMsg::SendMessage(_) => "sendMessage",
            ClientMsg::CallOffer(_) => "call-offer",
            ClientMsg::CallAnswer(_) => "call-answer",
            ClientMsg::CallCandidate(_) => "call-candidate",
            ClientMsg::CallReject(_) => "call-reject",
            ClientMsg::CallEnd(_) => "call-end",
        }
    }
}

/// Messages the signaling server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMsg {
    #[serde(rename = "onlineUsers")]
    OnlineUsers(Vec<UserId>),
    #[serde(rename = "receiveMessage")]
    ReceiveMessage(DeliveredChat),
    #[serde(rename = "call-offer")]
    CallOffer(IncomingOffer),
    #[serde(rename = "call-answer")]
    CallAnswer(IncomingSignal),
    #[serde(rename = "call-candidate")]
    CallCandidate(IncomingSignal),
    #[serde(rename = "call-reject")]
    CallReject(CallNotice),
    #[serde(rename = "call-end")]
    CallEnd(CallNotice),
}

impl ServerMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMsg::OnlineUsers(_) => "onlineUsers",
            ServerMsg::ReceiveMessage(_) => "receiveMessage",
            ServerMsg::CallOffer(_) => "call-offer",
            ServerMsg::CallAnswer(_) => "call-answer",
            ServerMsg::CallCandidate(_) => "call-candidate",
            ServerMsg::CallReject(_) => "call-reject",
            ServerMsg::CallEnd(_) => "call-end",
        }
    }

    /// Sender of a call-related event, `None` for presence and chat.
    pub fn call_peer(&self) -> Option<&str> {
        match self {
            ServerMsg::CallOffer(o) => Some(&o.from),
            ServerMsg::CallAnswer(s) | ServerMsg::CallCandidate(s) => Some(&s.from),
            ServerMsg::CallReject(n) | ServerMsg::CallEnd(n) => Some(&n.from),
            ServerMsg::OnlineUsers(_) | ServerMsg::ReceiveMessage(_) => None,
        }
    }
}
