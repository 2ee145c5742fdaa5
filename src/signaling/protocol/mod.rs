//! JSON event protocol spoken over WebSocket text frames.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`. Event names and
//! payload field names are the ones browser clients already use.
pub mod codec;
pub mod constants;
pub mod errors;
pub mod framing;
pub mod msg;
pub mod types;

pub use codec::{decode_msg, encode_msg};
pub use constants::*;
pub use errors::{FrameError, ProtoError};
pub use framing::{is_timeout, read_msg, write_msg};
pub use msg::{
    CallControl, CallNotice, CallOfferRequest, ClientMsg, IncomingOffer, IncomingSignal,
    ServerMsg, SignalRequest,
};
pub use types::{
    CallType, CallerInfo, ChatBody, ChatSender, DeliveredChat, OutgoingChat, SignalPayload,
    UserId,
};
