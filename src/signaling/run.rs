use std::sync::Arc;

use crate::config::{Config, ConfigError, ServerSettings};
use crate::log::LogSink;
use crate::signaling::errors::SignalingError;
use crate::signaling::signaling_server::SignalingServer;

/// Environment variable naming the config file when none is given.
pub const CONFIG_ENV_VAR: &str = "CHATRELAY_CONFIG";

/// Bind and run the signaling server until the listener fails.
pub fn run_signaling_server(
    settings: &ServerSettings,
    log: Arc<dyn LogSink>,
) -> Result<(), SignalingError> {
    SignalingServer::bind(settings, log)?.run()
}

/// Load the config from `path`, or from `CHATRELAY_CONFIG`, or fall back to
/// built-in defaults when neither is set.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => Config::load(p),
        None => match std::env::var(CONFIG_ENV_VAR) {
            Ok(p) if !p.is_empty() => Config::load(&p),
            _ => Ok(Config::empty()),
        },
    }
}
