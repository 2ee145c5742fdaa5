//! Chat presence, chat delivery and one-to-one call signaling.
//!
//! The server side (`signaling`) keeps the online-user directory and relays
//! chat and WebRTC negotiation messages between connected users. The client
//! side (`signaling_client`, `client`, `call`) connects to it, keeps the
//! online list and inbox, and runs the per-user call state machine.

/// Per-user call state machine and the peer-connection seams it drives.
pub mod call;
/// Chat client: dispatches server traffic into presence, inbox and calls.
pub mod client;
/// Handles configuration loading and management.
pub mod config;
/// Logging utilities for the application.
pub mod log;
/// Signaling server: presence directory, relays and the WebSocket transport.
pub mod signaling;
/// Signaling client for communicating with the signaling server.
pub mod signaling_client;
