pub mod auth;
pub mod chat_relay;
pub mod errors;
pub mod presence;
pub mod protocol;
pub mod relay;
pub mod router;
pub mod run;
pub mod runtime;
pub mod server_engine;
pub mod server_event;
pub mod signaling_server;
pub mod tls;
pub mod transport;
pub mod types;

pub use auth::{AllowAllIdentities, IdentityError, IdentityResolver, InMemoryIdentities};
pub use errors::SignalingError;
pub use signaling_server::SignalingServer;
