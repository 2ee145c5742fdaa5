/// Maximum accepted size of one text frame (to avoid OOM on a hostile peer).
pub const MAX_BODY_LEN: usize = 1_048_576; // 1 MiB

/// Display name used in `callerInfo` when the identity resolver knows nothing.
pub const DEFAULT_CALLER_NAME: &str = "User";
