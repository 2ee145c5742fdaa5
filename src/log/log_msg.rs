use std::time::{SystemTime, UNIX_EPOCH};

use crate::log::log_level::LogLevel;

/// One captured line, as kept by [`MemoryLogSink`](crate::log::MemoryLogSink).
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Wall clock, ms since the epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Module path of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn now(level: LogLevel, text: impl Into<String>, target: &'static str) -> Self {
        Self {
            level,
            ts_ms: now_millis(),
            text: text.into(),
            target,
        }
    }
}

/// Milliseconds since the UNIX epoch; `0` if the clock is before it.
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
