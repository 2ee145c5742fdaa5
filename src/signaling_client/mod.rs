pub mod signaling_client;
pub mod signaling_client_error;
pub mod signaling_command;
pub mod signaling_event;
pub use signaling_client::{SignalingClient, SignalingSender};
pub use signaling_client_error::SignalingClientError;
pub use signaling_command::SignalingCommand;
pub use signaling_event::SignalingEvent;
