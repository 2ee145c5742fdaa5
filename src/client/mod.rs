//! Application-side glue between the signaling connection, the chat inbox
//! and the call state machine.

pub mod chat_client;

pub use chat_client::ChatClient;

#[cfg(test)]
mod tests;
