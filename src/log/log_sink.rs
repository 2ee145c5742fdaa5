use crate::log::log_level::LogLevel;

/// Destination for log lines emitted through the `sink_*!` macros.
///
/// Components hold an `Arc<dyn LogSink>` so tests can swap in a
/// [`NoopLogSink`](crate::log::NoopLogSink) or a
/// [`MemoryLogSink`](crate::log::MemoryLogSink).
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
