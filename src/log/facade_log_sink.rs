use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Forwards every line to the `log` crate facade, keeping the original
/// module path as the record target.
///
/// Whatever logger the binary installed (`env_logger` for the server)
/// decides formatting and filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLogSink;

impl LogSink for FacadeLogSink {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        log::log!(target: target, level.into(), "{msg}");
    }
}
