use std::sync::Mutex;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink};

/// Keeps every line in memory. Mostly helpful in tests that need to assert
/// a warning was (or was not) emitted.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<LogMsg>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<LogMsg> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// True if any line at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|m| m.level == level && m.text.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(LogMsg::now(level, msg, target));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn records_level_text_and_target() {
        let sink = MemoryLogSink::new();
        sink.log(LogLevel::Warn, "peer went away", "chatrelay::test");

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].level, LogLevel::Warn);
        assert_eq!(lines[0].target, "chatrelay::test");
        assert!(lines[0].ts_ms > 0);
        assert!(sink.contains(LogLevel::Warn, "went away"));
        assert!(!sink.contains(LogLevel::Info, "went away"));
    }
}
